//! Instruction set for the Plume VM.
//!
//! The VM is stack-based. Most operations consume operands from the stack
//! and push results back. Every instruction carries three signed 32-bit
//! operands; the table below lists the ones each opcode reads.

#![allow(clippy::doc_markdown)]

use std::fmt;

use plume_foundation::{Error, ErrorKind, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Operation selector of an [`Instruction`](crate::Instruction).
///
/// The discriminant is the byte stored in the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Opcode {
    // === Variables ===
    /// Push local `slot`: `[] -> [local]`
    LoadLocal = 0,
    /// Pop into local `slot`: `[v] -> []`
    StoreLocal = 1,
    /// Push constant `index`: `[] -> [c]`
    LoadConstant = 2,
    /// Push global `index`: `[] -> [global]`
    LoadGlobal = 3,
    /// Pop into global `index`: `[v] -> []`
    StoreGlobal = 4,

    // === Control Flow ===
    /// Close the frame, returning the top of stack.
    Return = 5,

    // === Comparison & Logic ===
    /// Compare with `comparator`: `[x, y] -> [x ⋄ y]`
    Compare = 6,
    /// Logical and of two integers: `[x, y] -> [x && y]`
    And = 7,
    /// Logical or of two integers: `[x, y] -> [x || y]`
    Or = 8,

    // === Native Functions ===
    /// Push a native callee (name constant, library, slot):
    /// `[] -> [library, slot, name]`
    LoadNative = 9,

    // === Lists ===
    /// Pop `count` values into a new list: `[v1 .. vn] -> [list]`
    MakeList = 10,
    /// Push element `index`: `[list] -> [list[index]]`
    ListGet = 11,

    // === Control Flow ===
    /// Call with `argc` arguments: `[a1 .. an, callee] -> [result]`
    Call = 12,
    /// Jump by `offset` if the popped integer is zero: `[cond] -> []`
    JumpIfRel = 13,

    // === Introspection ===
    /// Push the type name: `[v] -> [name]`
    TypeOf = 14,
    /// Push the constructor name of an ADT value: `[adt] -> [name]`
    ConstructorName = 15,

    // === Functions ===
    /// Push the function whose body follows (body length, frame size) and
    /// skip over the body: `[] -> [fn]`
    MakeLambda = 16,

    // === Lists ===
    /// Index with a stack operand: `[list, index] -> [list[index]]`
    GetIndex = 17,
    /// Push the special value: `[] -> [special]`
    Special = 18,
    /// Unconditional jump by `offset`.
    JumpRel = 19,
    /// Copy the tail from `start`: `[list] -> [list[start..]]`
    Slice = 20,
    /// List length: `[list] -> [len]`
    ListLength = 21,

    // === Control Flow ===
    /// Stop execution without error.
    Halt = 22,

    // === Mutable Cells ===
    /// Overwrite a cell: `[v, cell] -> []`
    Update = 23,
    /// Box a value in a new cell: `[v] -> [cell]`
    MakeMutable = 24,
    /// Read a cell: `[cell] -> [v]`
    UnMut = 25,

    // === Arithmetic ===
    /// Add: `[x, y] -> [x + y]`
    Add = 26,
    /// Subtract: `[x, y] -> [x - y]`
    Sub = 27,
    /// Multiply: `[x, y] -> [x * y]`
    Mul = 28,

    // === Superinstructions ===
    /// Close the frame, returning constant `index`.
    ReturnConst = 29,
    /// Add a constant: `[x] -> [x + c]`
    AddConst = 30,
    /// Subtract a constant: `[x] -> [x - c]`
    SubConst = 31,
    /// Multiply by a constant: `[x] -> [x * c]`
    MulConst = 32,
    /// Compare with `comparator` and jump by `offset` when false:
    /// `[x, y] -> []`
    CompareJumpRel = 33,
}

impl Opcode {
    /// Every opcode, in byte order.
    pub const ALL: [Self; 34] = [
        Self::LoadLocal,
        Self::StoreLocal,
        Self::LoadConstant,
        Self::LoadGlobal,
        Self::StoreGlobal,
        Self::Return,
        Self::Compare,
        Self::And,
        Self::Or,
        Self::LoadNative,
        Self::MakeList,
        Self::ListGet,
        Self::Call,
        Self::JumpIfRel,
        Self::TypeOf,
        Self::ConstructorName,
        Self::MakeLambda,
        Self::GetIndex,
        Self::Special,
        Self::JumpRel,
        Self::Slice,
        Self::ListLength,
        Self::Halt,
        Self::Update,
        Self::MakeMutable,
        Self::UnMut,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::ReturnConst,
        Self::AddConst,
        Self::SubConst,
        Self::MulConst,
        Self::CompareJumpRel,
    ];

    /// Returns the wire byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Number of operands the instruction reads (the rest are ignored).
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Return
            | Self::And
            | Self::Or
            | Self::TypeOf
            | Self::ConstructorName
            | Self::GetIndex
            | Self::Special
            | Self::ListLength
            | Self::Halt
            | Self::Update
            | Self::MakeMutable
            | Self::UnMut
            | Self::Add
            | Self::Sub
            | Self::Mul => 0,
            Self::MakeLambda | Self::CompareJumpRel => 2,
            Self::LoadNative => 3,
            _ => 1,
        }
    }

    /// Returns true for instructions that move the program counter by a
    /// relative offset.
    #[must_use]
    pub const fn is_jump(self) -> bool {
        matches!(self, Self::JumpRel | Self::JumpIfRel | Self::CompareJumpRel)
    }

    /// Returns the mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LoadLocal => "LoadLocal",
            Self::StoreLocal => "StoreLocal",
            Self::LoadConstant => "LoadConstant",
            Self::LoadGlobal => "LoadGlobal",
            Self::StoreGlobal => "StoreGlobal",
            Self::Return => "Return",
            Self::Compare => "Compare",
            Self::And => "And",
            Self::Or => "Or",
            Self::LoadNative => "LoadNative",
            Self::MakeList => "MakeList",
            Self::ListGet => "ListGet",
            Self::Call => "Call",
            Self::JumpIfRel => "JumpIfRel",
            Self::TypeOf => "TypeOf",
            Self::ConstructorName => "ConstructorName",
            Self::MakeLambda => "MakeLambda",
            Self::GetIndex => "GetIndex",
            Self::Special => "Special",
            Self::JumpRel => "JumpRel",
            Self::Slice => "Slice",
            Self::ListLength => "ListLength",
            Self::Halt => "Halt",
            Self::Update => "Update",
            Self::MakeMutable => "MakeMutable",
            Self::UnMut => "UnMut",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::ReturnConst => "ReturnConst",
            Self::AddConst => "AddConst",
            Self::SubConst => "SubConst",
            Self::MulConst => "MulConst",
            Self::CompareJumpRel => "CompareJumpRel",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(byte))
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::UnknownOpcode(byte)))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator selected by the operand of `Compare` and `CompareJumpRel`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Comparator {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `=` (structural equality)
    Equal,
    /// `≠`
    NotEqual,
    /// `≤`
    LessEqual,
    /// `≥`
    GreaterEqual,
    /// Logical and of two integers.
    And,
    /// Logical or of two integers.
    Or,
}

impl Comparator {
    /// Returns the operand code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Less => 0,
            Self::Greater => 1,
            Self::Equal => 2,
            Self::NotEqual => 3,
            Self::LessEqual => 4,
            Self::GreaterEqual => 5,
            Self::And => 6,
            Self::Or => 7,
        }
    }

    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Greater => ">",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl TryFrom<i32> for Comparator {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::Less,
            1 => Self::Greater,
            2 => Self::Equal,
            3 => Self::NotEqual,
            4 => Self::LessEqual,
            5 => Self::GreaterEqual,
            6 => Self::And,
            7 => Self::Or,
            _ => return Err(Error::new(ErrorKind::UnknownComparator(code))),
        })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
