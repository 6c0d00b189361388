//! Call frames folded into the value stack.
//!
//! A call turns the arguments already on the stack into the first locals of
//! a new frame:
//!
//! ```text
//! before:  .. | a0 | a1 |                 sp = S + 2
//! after:   .. | env | a0 | a1 | l2 | l3 |  bp = S, sp = S + 1 + max(locals, argc)
//! ```
//!
//! `env` is a function-environment value holding the return pc, the slot the
//! frame started at, and the caller's base pointer.

use plume_foundation::{Error, ErrorKind, FrameRecord, Result, Value};

use super::Vm;

fn field(n: usize) -> Result<u16> {
    u16::try_from(n).map_err(|_| {
        Error::new(ErrorKind::AddressOutOfRange(
            i64::try_from(n).unwrap_or(i64::MAX),
        ))
    })
}

impl Vm {
    /// Opens a frame over the top `argc` stack values.
    ///
    /// Arguments become locals `0..argc`; locals `argc..local_count` start
    /// out special. Returns the new base pointer.
    pub fn create_frame(&mut self, return_pc: usize, local_count: usize, argc: usize) -> Result<usize> {
        if self.depth >= self.config.max_frames {
            tracing::debug!(limit = self.config.max_frames, "call stack overflow");
            return Err(Error::new(ErrorKind::CallStackOverflow {
                limit: self.config.max_frames,
            }));
        }

        let sp = self.stack.sp();
        if sp < self.stack.floor() + argc {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        let start = sp - argc;
        let top = start + 1 + local_count.max(argc);
        if top > self.stack.capacity() {
            return Err(Error::new(ErrorKind::StackOverflow));
        }

        let marker = Value::from(FrameRecord {
            return_pc: field(return_pc)?,
            stack_pointer: field(start)?,
            base_pointer: field(self.bp)?,
        });

        let args = self.stack.pop_n(argc)?;
        self.stack.push(marker)?;
        self.stack.push_n(&args)?;
        for _ in argc..local_count {
            self.stack.push(Value::special())?;
        }

        self.bp = start;
        self.depth += 1;
        Ok(start)
    }

    /// Closes the innermost frame and returns its record.
    ///
    /// The caller restores `pc`, `sp` and `bp` from the record.
    pub fn pop_frame(&mut self) -> Result<FrameRecord> {
        if self.depth == 0 {
            return Err(Error::new(ErrorKind::ReturnOutsideFrame));
        }
        let record = self.stack.get(self.bp)?.get_funcenv()?;
        self.depth -= 1;
        Ok(record)
    }

    /// First stack slot of the current frame's locals.
    ///
    /// At top level there is no frame marker and locals start at the bottom
    /// of the operand region.
    pub(crate) fn locals_base(&self) -> usize {
        if self.depth == 0 {
            self.stack.floor()
        } else {
            self.bp + 1
        }
    }

    fn local_slot(&self, slot: i64) -> Result<usize> {
        usize::try_from(slot)
            .ok()
            .map(|s| self.locals_base() + s)
            .filter(|&idx| idx < self.stack.sp())
            .ok_or_else(|| Error::new(ErrorKind::LocalOutOfBounds { slot }))
    }

    /// Reads local `slot` of the current frame.
    pub fn load_local(&self, slot: i64) -> Result<Value> {
        self.stack.get(self.local_slot(slot)?)
    }

    /// Writes local `slot` of the current frame.
    pub fn store_local(&mut self, slot: i64, value: Value) -> Result<()> {
        let idx = self.local_slot(slot)?;
        self.stack.set(idx, value)
    }
}
