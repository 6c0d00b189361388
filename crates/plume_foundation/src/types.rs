//! Runtime type descriptors.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The dynamic type of a [`Value`](crate::Value).
///
/// Every type is read straight from the value's tag. `String`, `List` and
/// `Mutable` live on the heap; their pointers carry the block kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    /// 32-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// Heap string.
    String,
    /// Heap list of values.
    List,
    /// The special/null singleton.
    Special,
    /// Heap cell holding one value.
    Mutable,
    /// Bytecode function (entry address and frame size).
    Function,
    /// Activation record (return pc, saved sp, saved bp).
    FuncEnv,
    /// Bit pattern outside every known signature.
    Unknown,
}

impl ValueType {
    /// Returns the name the `TypeOf` instruction reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Special => "special",
            Self::Mutable => "mutable",
            Self::Function => "function",
            Self::FuncEnv => "function_env",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for types stored in a heap block.
    #[must_use]
    pub const fn is_heap(self) -> bool {
        matches!(self, Self::String | Self::List | Self::Mutable)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
