//! The program container: constants, libraries and instructions.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::opcode::{Comparator, Opcode};

/// A single fixed-width instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instruction {
    /// The operation.
    pub opcode: Opcode,
    /// Operands; unused ones are zero.
    pub operands: [i32; 3],
}

impl Instruction {
    /// Creates an instruction with no operands.
    #[must_use]
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: [0; 3],
        }
    }

    /// Creates an instruction with one operand.
    #[must_use]
    pub const fn with1(opcode: Opcode, a: i32) -> Self {
        Self {
            opcode,
            operands: [a, 0, 0],
        }
    }

    /// Creates an instruction with two operands.
    #[must_use]
    pub const fn with2(opcode: Opcode, a: i32, b: i32) -> Self {
        Self {
            opcode,
            operands: [a, b, 0],
        }
    }

    /// Creates an instruction with all three operands.
    #[must_use]
    pub const fn with3(opcode: Opcode, a: i32, b: i32, c: i32) -> Self {
        Self {
            opcode,
            operands: [a, b, c],
        }
    }

    /// First operand.
    #[must_use]
    pub const fn a(&self) -> i32 {
        self.operands[0]
    }

    /// Second operand.
    #[must_use]
    pub const fn b(&self) -> i32 {
        self.operands[1]
    }

    /// Third operand.
    #[must_use]
    pub const fn c(&self) -> i32 {
        self.operands[2]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match self.opcode {
            Opcode::Compare => match Comparator::try_from(self.a()) {
                Ok(cmp) => write!(f, " {cmp}"),
                Err(_) => write!(f, " ?{}", self.a()),
            },
            Opcode::CompareJumpRel => match Comparator::try_from(self.a()) {
                Ok(cmp) => write!(f, " {cmp} {:+}", self.b()),
                Err(_) => write!(f, " ?{} {:+}", self.a(), self.b()),
            },
            Opcode::JumpRel | Opcode::JumpIfRel => write!(f, " {:+}", self.a()),
            op => {
                for operand in &self.operands[..op.arity()] {
                    write!(f, " {operand}")?;
                }
                Ok(())
            }
        }
    }
}

/// A constant-pool entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Constant {
    /// 32-bit integer.
    Integer(i32),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string; becomes a pinned heap string at load time.
    String(String),
}

impl Constant {
    /// Wire tag of the entry.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Float(_) => 1,
            Self::String(_) => 2,
        }
    }
}

impl From<i32> for Constant {
    fn from(n: i32) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Constant {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A native library the program links against.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LibraryEntry {
    /// Resolve `name` against the standard library path rather than the
    /// program's directory.
    pub standard: bool,
    /// Library path or name.
    pub name: String,
    /// Number of function slots the program uses.
    pub function_count: usize,
}

impl LibraryEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, function_count: usize, standard: bool) -> Self {
        Self {
            standard,
            name: name.into(),
            function_count,
        }
    }
}

/// A complete bytecode program.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    /// Constant pool.
    pub constants: Vec<Constant>,
    /// Linked native libraries, indexed by `LoadNative`.
    pub libraries: Vec<LibraryEntry>,
    /// Instruction stream.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let idx = self.instructions.len();
        self.instructions.push(instruction);
        idx
    }

    /// Adds a constant and returns its pool index, reusing an identical
    /// entry if one exists.
    pub fn constant(&mut self, constant: impl Into<Constant>) -> i32 {
        let constant = constant.into();
        let idx = match self.constants.iter().position(|c| same_constant(c, &constant)) {
            Some(idx) => idx,
            None => {
                self.constants.push(constant);
                self.constants.len() - 1
            }
        };
        i32::try_from(idx).unwrap_or(i32::MAX)
    }

    /// Adds a library and returns its index.
    pub fn library(&mut self, entry: LibraryEntry) -> i32 {
        self.libraries.push(entry);
        i32::try_from(self.libraries.len() - 1).unwrap_or(i32::MAX)
    }

    /// Returns the current instruction count (next instruction index).
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if there are no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Patches the jump at `idx` so it lands on `target`.
    ///
    /// # Panics
    /// Panics if the instruction at `idx` is not a jump instruction.
    pub fn patch_jump(&mut self, idx: usize, target: usize) {
        let offset = i32::try_from(target).unwrap_or(i32::MAX) - i32::try_from(idx).unwrap_or(0);
        let instr = &mut self.instructions[idx];
        match instr.opcode {
            Opcode::JumpRel | Opcode::JumpIfRel => instr.operands[0] = offset,
            Opcode::CompareJumpRel => instr.operands[1] = offset,
            other => panic!("Cannot patch non-jump instruction: {other}"),
        }
    }

    /// Renders the instruction stream, one instruction per line.
    #[must_use]
    pub fn disassemble(&self) -> String {
        let width = self.instructions.len().to_string().len();
        self.instructions
            .iter()
            .enumerate()
            .map(|(pc, instr)| format!("{pc:>width$}  {instr}\n"))
            .collect()
    }
}

fn same_constant(a: &Constant, b: &Constant) -> bool {
    match (a, b) {
        (Constant::Float(x), Constant::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}
