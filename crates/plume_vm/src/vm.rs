//! Stack-based virtual machine for Plume bytecode.
//!
//! The VM owns everything a running program touches: the value stack (with
//! call frames folded into it), the heap, the constant pool and the native
//! bridge. [`Vm::step`] executes one instruction; [`Vm::run`] steps until the
//! program halts or fails.
//!
//! Every error is fatal. The failing instruction is attached to the error
//! and the VM refuses to execute anything afterwards.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]

mod frame;
mod native;
mod ops;

pub use native::{NativeBridge, NativeFn, NativeProvider, StaticProvider};

use ops::{add_values, compare_values, is_truthy, mul_values, sub_values};

use plume_bytecode::{Comparator, Constant, Instruction, LibraryEntry, Opcode, Program};
use plume_foundation::{
    BlockKind, Decoded, Error, ErrorContext, ErrorKind, GcStats, Heap, Result, Value, ValueType,
};

use crate::config::VmConfig;
use crate::stack::Stack;

/// Execution state of a [`Vm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmState {
    /// More instructions to run.
    Ready,
    /// Stopped by `Halt` or by running off the end of the program.
    Halted,
    /// Stopped by a fatal error.
    Faulted,
}

/// Stack-based virtual machine.
pub struct Vm {
    /// Value stack.
    stack: Stack,
    /// Heap of strings, lists and cells.
    heap: Heap,
    /// Instruction stream.
    code: Vec<Instruction>,
    /// Constant pool; strings are pinned heap values.
    constants: Vec<Value>,
    /// Libraries declared by the program.
    libraries: Vec<LibraryEntry>,
    /// Native function cache.
    bridge: NativeBridge,
    /// Program arguments as a pinned list of strings.
    args: Value,
    /// Heap values allocated by natives that have not returned yet.
    native_roots: Vec<Value>,
    /// Number of native calls in progress.
    native_depth: usize,
    /// Program counter.
    pc: usize,
    /// Base pointer of the current frame.
    bp: usize,
    /// Number of open frames.
    depth: usize,
    state: VmState,
    config: VmConfig,
    source: Option<String>,
}

impl Vm {
    /// Creates a VM for `program` with the default configuration and no
    /// native libraries.
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    /// Creates a VM for `program`.
    #[must_use]
    pub fn with_config(program: Program, config: VmConfig) -> Self {
        let mut heap = Heap::new(config.gc_threshold);
        let constants = program
            .constants
            .into_iter()
            .map(|constant| match constant {
                Constant::Integer(n) => Value::integer(n),
                Constant::Float(f) => Value::float(f),
                Constant::String(s) => {
                    let v = heap.alloc_string(s, std::iter::empty());
                    heap.pin(v);
                    v
                }
            })
            .collect();
        let args = heap.alloc_list(Vec::new(), std::iter::empty());
        heap.pin(args);

        let bridge = NativeBridge::new(Box::new(StaticProvider::new()), &program.libraries);
        let stack = Stack::new(config.globals_size, config.stack_capacity);

        Self {
            bp: stack.floor(),
            stack,
            heap,
            code: program.instructions,
            constants,
            libraries: program.libraries,
            bridge,
            args,
            native_roots: Vec::new(),
            native_depth: 0,
            pc: 0,
            depth: 0,
            state: VmState::Ready,
            config,
            source: None,
        }
    }

    /// Installs the source of native functions. Clears the native cache.
    #[must_use]
    pub fn with_provider(mut self, provider: impl NativeProvider + 'static) -> Self {
        self.bridge = NativeBridge::new(Box::new(provider), &self.libraries);
        self
    }

    /// Sets the program arguments, exposed to natives as a list of strings.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.heap.unpin(self.args);
        let mut items = Vec::new();
        for arg in args {
            // Strings not yet in the list have no other root.
            let s = self.heap.alloc_string(arg, items.iter().copied());
            items.push(s);
        }
        self.args = self.heap.alloc_list(items, std::iter::empty());
        self.heap.pin(self.args);
        self
    }

    /// Names the program in error messages.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Runs until the program halts.
    ///
    /// Returns the value on top of the operand stack, if any.
    pub fn run(&mut self) -> Result<Option<Value>> {
        while self.step()? == VmState::Ready {}
        Ok(self.stack.peek().ok())
    }

    /// Executes one instruction and returns the resulting state.
    pub fn step(&mut self) -> Result<VmState> {
        match self.state {
            VmState::Faulted => return Err(Error::new(ErrorKind::Faulted)),
            VmState::Halted => return Ok(VmState::Halted),
            VmState::Ready => {}
        }

        let pc = self.pc;
        let Some(&instr) = self.code.get(pc) else {
            self.state = VmState::Halted;
            return Ok(self.state);
        };

        tracing::trace!(pc, sp = self.stack.sp(), instruction = %instr, "dispatch");

        if let Err(err) = self.execute(instr) {
            self.state = VmState::Faulted;
            let mut context = ErrorContext::new().with_instruction(pc, instr.opcode.name());
            if let Some(source) = &self.source {
                context = context.with_source(source.clone());
            }
            return Err(err.with_context(context));
        }

        if self.state == VmState::Ready && self.pc == self.code.len() {
            self.state = VmState::Halted;
        }
        Ok(self.state)
    }

    fn execute(&mut self, instr: Instruction) -> Result<()> {
        let pc = self.pc;
        self.pc += 1;
        let a = i64::from(instr.a());

        match instr.opcode {
            // === Variables ===
            Opcode::LoadLocal => {
                let v = self.load_local(a)?;
                self.push(v)?;
            }

            Opcode::StoreLocal => {
                let v = self.pop()?;
                self.store_local(a, v)?;
            }

            Opcode::LoadConstant => {
                let v = self.constant(a)?;
                self.push(v)?;
            }

            Opcode::LoadGlobal => {
                let v = self.stack.load_global(a)?;
                self.push(v)?;
            }

            Opcode::StoreGlobal => {
                let v = self.pop()?;
                self.stack.store_global(a, v)?;
            }

            // === Functions ===
            Opcode::Return => {
                if self.depth == 0 {
                    return Err(Error::new(ErrorKind::ReturnOutsideFrame));
                }
                let v = self.pop()?;
                self.return_value(v)?;
            }

            Opcode::ReturnConst => {
                let v = self.constant(a)?;
                self.return_value(v)?;
            }

            Opcode::MakeLambda => {
                let entry = u16::try_from(pc + 1)
                    .map_err(|_| Error::new(ErrorKind::AddressOutOfRange((pc + 1) as i64)))?;
                let frame_size = u16::try_from(instr.b())
                    .map_err(|_| Error::new(ErrorKind::AddressOutOfRange(i64::from(instr.b()))))?;
                self.push(Value::function(entry, frame_size))?;
                self.jump(pc, a + 1)?;
            }

            Opcode::Call => {
                let argc = usize::try_from(instr.a())
                    .map_err(|_| Error::new(ErrorKind::StackUnderflow))?;
                let callee = self.pop()?;
                self.call(pc, callee, argc)?;
            }

            Opcode::LoadNative => {
                let name = self.constant(a)?;
                self.heap.string(name)?;
                self.push(Value::integer(instr.b()))?;
                self.push(Value::integer(instr.c()))?;
                self.push(name)?;
            }

            // === Control Flow ===
            Opcode::JumpRel => self.jump(pc, a)?,

            Opcode::JumpIfRel => {
                if self.pop()?.get_int()? == 0 {
                    self.jump(pc, a)?;
                }
            }

            Opcode::CompareJumpRel => {
                let cmp = Comparator::try_from(instr.a())?;
                let y = self.pop()?;
                let x = self.pop()?;
                if !compare_values(&self.heap, cmp, x, y)? {
                    self.jump(pc, i64::from(instr.b()))?;
                }
            }

            Opcode::Halt => self.state = VmState::Halted,

            // === Comparison & Logic ===
            Opcode::Compare => {
                let cmp = Comparator::try_from(instr.a())?;
                let y = self.pop()?;
                let x = self.pop()?;
                let result = compare_values(&self.heap, cmp, x, y)?;
                self.push(Value::from(result))?;
            }

            Opcode::And => {
                let y = is_truthy(self.pop()?)?;
                let x = is_truthy(self.pop()?)?;
                self.push(Value::from(x && y))?;
            }

            Opcode::Or => {
                let y = is_truthy(self.pop()?)?;
                let x = is_truthy(self.pop()?)?;
                self.push(Value::from(x || y))?;
            }

            // === Arithmetic ===
            Opcode::Add => self.binary_op(add_values)?,
            Opcode::Sub => self.binary_op(sub_values)?,
            Opcode::Mul => self.binary_op(mul_values)?,

            Opcode::AddConst => self.constant_op(a, add_values)?,
            Opcode::SubConst => self.constant_op(a, sub_values)?,
            Opcode::MulConst => self.constant_op(a, mul_values)?,

            // === Lists ===
            Opcode::MakeList => {
                let count = usize::try_from(instr.a())
                    .map_err(|_| Error::new(ErrorKind::StackUnderflow))?;
                let items = self.stack.pop_n(count)?;
                let list = self.alloc_list(items);
                self.push(list)?;
            }

            Opcode::ListGet => {
                let list = self.pop()?;
                let v = self.heap.list_get(list, a)?;
                self.push(v)?;
            }

            Opcode::GetIndex => {
                let index = self.pop()?.get_int()?;
                let list = self.pop()?;
                let v = self.heap.list_get(list, i64::from(index))?;
                self.push(v)?;
            }

            Opcode::Slice => {
                let list = self.pop()?;
                let items = self.heap.list(list)?;
                let tail = usize::try_from(a)
                    .ok()
                    .and_then(|start| items.get(start..))
                    .ok_or_else(|| Error::index_out_of_bounds(a, items.len()))?
                    .to_vec();
                let slice = self.alloc_list(tail);
                self.push(slice)?;
            }

            Opcode::ListLength => {
                let list = self.pop()?;
                let len = self.heap.list(list)?.len();
                let len = i32::try_from(len)
                    .map_err(|_| Error::index_out_of_bounds(i64::MAX, len))?;
                self.push(Value::integer(len))?;
            }

            Opcode::Special => self.push(Value::special())?,

            // === Mutable Cells ===
            Opcode::MakeMutable => {
                let v = self.pop()?;
                let cell = self
                    .heap
                    .alloc_mutable(v, self.stack.live().iter().chain(&self.native_roots).copied());
                self.push(cell)?;
            }

            Opcode::UnMut => {
                let cell = self.pop()?;
                let v = self.heap.cell(cell)?;
                self.push(v)?;
            }

            Opcode::Update => {
                let cell = self.pop()?;
                let v = self.pop()?;
                self.heap.update(cell, v)?;
            }

            // === Introspection ===
            Opcode::TypeOf => {
                let v = self.pop()?;
                let ty = self.heap.type_of(v)?;
                let name = self.alloc_string(ty.name());
                self.push(name)?;
            }

            Opcode::ConstructorName => {
                let v = self.pop()?;
                let name = self.heap.constructor_name(v)?;
                self.push(name)?;
            }
        }

        if self.pc > self.code.len() {
            return Err(Error::new(ErrorKind::JumpOutOfRange {
                target: self.pc as i64,
                length: self.code.len(),
            }));
        }
        Ok(())
    }

    // Control flow

    /// Moves the pc to `from + offset`, which must lie in `[0, len]`.
    fn jump(&mut self, from: usize, offset: i64) -> Result<()> {
        let target = from as i64 + offset;
        self.pc = usize::try_from(target)
            .ok()
            .filter(|&t| t <= self.code.len())
            .ok_or_else(|| {
                Error::new(ErrorKind::JumpOutOfRange {
                    target,
                    length: self.code.len(),
                })
            })?;
        Ok(())
    }

    fn call(&mut self, pc: usize, callee: Value, argc: usize) -> Result<()> {
        let (entry, frame_size) = match callee.decode() {
            Decoded::Function(f) => (usize::from(f.entry), usize::from(f.frame_size)),
            Decoded::Pointer(p) if p.kind == BlockKind::String => {
                return self.call_native(callee, argc);
            }
            Decoded::Pointer(p) if p.kind == BlockKind::List => {
                let (entry, frame_size) = match self.heap.list(callee)? {
                    [entry, size] => (entry.get_int()?, size.get_int()?),
                    _ => return Err(Error::type_mismatch(ValueType::Function, ValueType::List)),
                };
                let entry = usize::try_from(entry)
                    .map_err(|_| Error::new(ErrorKind::AddressOutOfRange(i64::from(entry))))?;
                let frame_size = usize::try_from(frame_size)
                    .map_err(|_| Error::new(ErrorKind::AddressOutOfRange(i64::from(frame_size))))?;
                (entry, frame_size)
            }
            _ => {
                return Err(Error::type_mismatch(ValueType::Function, callee.get_type()));
            }
        };

        self.create_frame(pc + 1, frame_size, argc)?;
        self.pc = entry;
        Ok(())
    }

    /// Calls the native named by `callee`, popping the slot and library
    /// index `LoadNative` pushed beneath it.
    fn call_native(&mut self, callee: Value, argc: usize) -> Result<()> {
        let slot = self.pop()?.get_int()?;
        let library = self.pop()?.get_int()?;
        let function =
            self.bridge
                .lookup(i64::from(library), i64::from(slot), self.heap.string(callee)?)?;

        // Arguments stay on the stack, and so stay rooted, until the call returns.
        let base = self.stack.sp().checked_sub(argc).filter(|&b| b >= self.stack.floor());
        let base = base.ok_or_else(|| Error::new(ErrorKind::StackUnderflow))?;
        let args = self.stack.operands()[base - self.stack.floor()..].to_vec();

        let mark = self.native_roots.len();
        self.native_depth += 1;
        let result = function(self, &args);
        self.native_depth -= 1;
        self.native_roots.truncate(mark);

        self.stack.set_sp(base)?;
        self.push(result?)
    }

    fn return_value(&mut self, value: Value) -> Result<()> {
        let record = self.pop_frame()?;
        self.stack.set_sp(usize::from(record.stack_pointer))?;
        self.bp = usize::from(record.base_pointer);
        self.pc = usize::from(record.return_pc);
        self.push(value)
    }

    // Operands

    fn constant(&self, index: i64) -> Result<Value> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.constants.get(i).copied())
            .ok_or_else(|| Error::new(ErrorKind::InvalidConstant(index)))
    }

    fn binary_op<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(Value, Value) -> Result<Value>,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = op(a, b)?;
        self.push(result)
    }

    fn constant_op<F>(&mut self, index: i64, op: F) -> Result<()>
    where
        F: FnOnce(Value, Value) -> Result<Value>,
    {
        let c = self.constant(index)?;
        let a = self.pop()?;
        let result = op(a, c)?;
        self.push(result)
    }

    // Embedding API

    /// Pushes a value onto the operand stack.
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.stack.push(value)
    }

    /// Pops a value off the operand stack.
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop()
    }

    /// Allocates a string, rooting everything on the stack.
    pub fn alloc_string(&mut self, s: impl Into<String>) -> Value {
        let value = self
            .heap
            .alloc_string(s, self.stack.live().iter().chain(&self.native_roots).copied());
        self.root_native_allocation(value);
        value
    }

    /// Allocates a list, rooting everything on the stack.
    pub fn alloc_list(&mut self, items: Vec<Value>) -> Value {
        let value = self
            .heap
            .alloc_list(items, self.stack.live().iter().chain(&self.native_roots).copied());
        self.root_native_allocation(value);
        value
    }

    /// Values a running native allocated stay live until it returns.
    fn root_native_allocation(&mut self, value: Value) {
        if self.native_depth > 0 {
            self.native_roots.push(value);
        }
    }

    /// Runs a full collection with the stack as roots.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap
            .collect(self.stack.live().iter().chain(&self.native_roots).copied())
    }

    /// Program arguments as a list of strings.
    #[must_use]
    pub fn args(&self) -> Value {
        self.args
    }

    /// The heap.
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The heap, mutably. Allocations made through it must be given the
    /// stack as roots.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The value stack.
    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Collector statistics.
    #[must_use]
    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    /// Number of native symbol resolutions so far.
    #[must_use]
    pub fn native_resolutions(&self) -> u64 {
        self.bridge.resolutions()
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Base pointer of the current frame.
    #[must_use]
    pub fn bp(&self) -> usize {
        self.bp
    }

    /// Number of open frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Execution state.
    #[must_use]
    pub fn state(&self) -> VmState {
        self.state
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &VmConfig {
        &self.config
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("pc", &self.pc)
            .field("sp", &self.stack.sp())
            .field("bp", &self.bp)
            .field("depth", &self.depth)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
