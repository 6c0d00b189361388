//! NaN-boxed value representation.
//!
//! A [`Value`] is 64 bits. Ordinary doubles are stored as themselves; every
//! other variant hides in the quiet-NaN space, where the top 16 bits act as
//! a signature selecting the variant and the low 48 bits carry its payload:
//!
//! ```text
//! 0x7FF8_0000_0000_0000  canonical NaN (a float)
//! 0x7FF9_xxxx_xxxx_xxxx  special (payload ignored, always zero)
//! 0x7FFA_0000_iiii_iiii  integer, i32 in the low 32 bits
//! 0x7FFC_0000_ffff_eeee  function: entry e, frame size f
//! 0x7FFD_bbbb_ssss_pppp  function environment: pc p, sp s, bp b
//! 0xFFF8_kggg_iiii_iiii  pointer: arena index i, generation g, block kind k
//! ```
//!
//! Constructors never produce a NaN other than the canonical one, so float
//! arithmetic cannot forge a tagged value. Payloads are only read through
//! [`Value::decode`] or the checked `get_*` accessors.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::gc::{GENERATION_MASK, HeapRef};
use crate::heap::BlockKind;
use crate::types::ValueType;

const MASK_SIGNATURE: u64 = 0xFFFF_0000_0000_0000;
const MASK_QUIET_NAN: u64 = 0x7FF8_0000_0000_0000;
const MASK_PAYLOAD: u64 = 0x0000_FFFF_FFFF_FFFF;
const MASK_INT: u64 = 0x0000_0000_FFFF_FFFF;

const SIGNATURE_NAN: u64 = MASK_QUIET_NAN;
const SIGNATURE_SPECIAL: u64 = MASK_QUIET_NAN | 0x0001_0000_0000_0000;
const SIGNATURE_INTEGER: u64 = MASK_QUIET_NAN | 0x0002_0000_0000_0000;
const SIGNATURE_FUNCTION: u64 = MASK_QUIET_NAN | 0x0004_0000_0000_0000;
const SIGNATURE_FUNCENV: u64 = MASK_QUIET_NAN | 0x0005_0000_0000_0000;
const SIGNATURE_POINTER: u64 = MASK_QUIET_NAN | 0x8000_0000_0000_0000;

const POINTER_GENERATION_SHIFT: u32 = 32;
const POINTER_KIND_SHIFT: u32 = 46;

/// Bit pattern of the one NaN a float value may hold.
pub const CANONICAL_NAN: u64 = SIGNATURE_NAN;

/// A 64-bit NaN-boxed value.
///
/// `PartialEq` compares bit patterns, which is identity for heap values.
/// Structural equality needs the heap; see [`Heap::equal`](crate::Heap::equal).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value(u64);

/// Bytecode function: an entry address and the number of local slots its
/// frame needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    /// Instruction index of the first body instruction.
    pub entry: u16,
    /// Local slots to reserve above the frame marker.
    pub frame_size: u16,
}

/// Activation record stored in the frame-marker slot of the stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameRecord {
    /// Instruction to resume at after the call.
    pub return_pc: u16,
    /// Stack pointer to restore (the slot where the frame started).
    pub stack_pointer: u16,
    /// Base pointer of the caller's frame.
    pub base_pointer: u16,
}

/// A pointer to a heap block, tagged with the block's kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pointer {
    /// Kind of block the handle names.
    pub kind: BlockKind,
    /// Arena handle of the block.
    pub handle: HeapRef,
}

/// A value with its payload unpacked according to its signature.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Decoded {
    /// A double (including the canonical NaN and infinities).
    Float(f64),
    /// A 32-bit integer.
    Integer(i32),
    /// The special/null singleton.
    Special,
    /// A bytecode function.
    Function(FunctionRef),
    /// An activation record.
    FuncEnv(FrameRecord),
    /// A heap pointer.
    Pointer(Pointer),
    /// A quiet-NaN pattern no constructor produces.
    Unknown(u64),
}

impl Value {
    /// Creates an integer value.
    #[must_use]
    pub const fn integer(n: i32) -> Self {
        Self(SIGNATURE_INTEGER | (n as u32 as u64))
    }

    /// Creates a float value. Every NaN is stored as [`CANONICAL_NAN`].
    #[must_use]
    pub fn float(f: f64) -> Self {
        if f.is_nan() {
            Self(CANONICAL_NAN)
        } else {
            Self(f.to_bits())
        }
    }

    /// Creates the special/null value.
    #[must_use]
    pub const fn special() -> Self {
        Self(SIGNATURE_SPECIAL)
    }

    /// Creates a function value from an entry address and frame size.
    #[must_use]
    pub const fn function(entry: u16, frame_size: u16) -> Self {
        Self(SIGNATURE_FUNCTION | entry as u64 | ((frame_size as u64) << 16))
    }

    /// Creates a function-environment value.
    #[must_use]
    pub const fn funcenv(return_pc: u16, stack_pointer: u16, base_pointer: u16) -> Self {
        Self(
            SIGNATURE_FUNCENV
                | return_pc as u64
                | ((stack_pointer as u64) << 16)
                | ((base_pointer as u64) << 32),
        )
    }

    /// Creates a pointer value.
    #[must_use]
    pub const fn pointer(pointer: Pointer) -> Self {
        let handle = pointer.handle;
        Self(
            SIGNATURE_POINTER
                | handle.index as u64
                | (((handle.generation & GENERATION_MASK) as u64) << POINTER_GENERATION_SHIFT)
                | ((pointer.kind.bits() as u64) << POINTER_KIND_SHIFT),
        )
    }

    /// Reinterprets raw bits as a value.
    ///
    /// Any bit pattern is accepted; unrecognised patterns decode as
    /// [`Decoded::Unknown`] and dangling pointers fail when dereferenced.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw 64-bit encoding.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns true if the bits are an ordinary double rather than a tag.
    #[must_use]
    pub const fn is_float(self) -> bool {
        self.0 & MASK_QUIET_NAN != MASK_QUIET_NAN || self.0 == CANONICAL_NAN
    }

    /// Unpacks the value according to its signature.
    #[must_use]
    pub fn decode(self) -> Decoded {
        if self.is_float() {
            return Decoded::Float(f64::from_bits(self.0));
        }

        let payload = self.0 & MASK_PAYLOAD;
        match self.0 & MASK_SIGNATURE {
            SIGNATURE_SPECIAL => Decoded::Special,
            SIGNATURE_INTEGER if payload <= MASK_INT => {
                Decoded::Integer((payload & MASK_INT) as u32 as i32)
            }
            SIGNATURE_FUNCTION if payload <= MASK_INT => Decoded::Function(FunctionRef {
                entry: payload as u16,
                frame_size: (payload >> 16) as u16,
            }),
            SIGNATURE_FUNCENV => Decoded::FuncEnv(FrameRecord {
                return_pc: payload as u16,
                stack_pointer: (payload >> 16) as u16,
                base_pointer: (payload >> 32) as u16,
            }),
            SIGNATURE_POINTER => {
                match BlockKind::from_bits((payload >> POINTER_KIND_SHIFT) as u8) {
                    Some(kind) => Decoded::Pointer(Pointer {
                        kind,
                        handle: HeapRef::new(
                            payload as u32,
                            (payload >> POINTER_GENERATION_SHIFT) as u16,
                        ),
                    }),
                    None => Decoded::Unknown(self.0),
                }
            }
            _ => Decoded::Unknown(self.0),
        }
    }

    /// Classifies the value in O(1).
    #[must_use]
    pub fn get_type(self) -> ValueType {
        match self.decode() {
            Decoded::Float(_) => ValueType::Float,
            Decoded::Integer(_) => ValueType::Integer,
            Decoded::Special => ValueType::Special,
            Decoded::Function(_) => ValueType::Function,
            Decoded::FuncEnv(_) => ValueType::FuncEnv,
            Decoded::Pointer(p) => p.kind.value_type(),
            Decoded::Unknown(_) => ValueType::Unknown,
        }
    }

    /// Returns true if this is the special value.
    #[must_use]
    pub const fn is_special(self) -> bool {
        self.0 & MASK_SIGNATURE == SIGNATURE_SPECIAL
    }

    /// Extracts an integer payload.
    pub fn get_int(self) -> Result<i32> {
        match self.decode() {
            Decoded::Integer(n) => Ok(n),
            _ => Err(Error::type_mismatch(ValueType::Integer, self.get_type())),
        }
    }

    /// Extracts a float payload.
    pub fn get_float(self) -> Result<f64> {
        match self.decode() {
            Decoded::Float(f) => Ok(f),
            _ => Err(Error::type_mismatch(ValueType::Float, self.get_type())),
        }
    }

    /// Extracts a heap pointer of any block kind.
    pub fn get_ptr(self) -> Result<Pointer> {
        match self.decode() {
            Decoded::Pointer(p) => Ok(p),
            _ => Err(Error::type_mismatch(ValueType::List, self.get_type())),
        }
    }

    /// Extracts a heap pointer, requiring a specific block kind.
    pub fn get_block(self, kind: BlockKind) -> Result<HeapRef> {
        match self.decode() {
            Decoded::Pointer(p) if p.kind == kind => Ok(p.handle),
            _ => Err(Error::type_mismatch(kind.value_type(), self.get_type())),
        }
    }

    /// Extracts a function payload.
    pub fn get_function(self) -> Result<FunctionRef> {
        match self.decode() {
            Decoded::Function(f) => Ok(f),
            _ => Err(Error::type_mismatch(ValueType::Function, self.get_type())),
        }
    }

    /// Extracts a function-environment payload.
    pub fn get_funcenv(self) -> Result<FrameRecord> {
        match self.decode() {
            Decoded::FuncEnv(record) => Ok(record),
            _ => Err(Error::type_mismatch(ValueType::FuncEnv, self.get_type())),
        }
    }

    /// Extracts the `n`th 16-bit field of a function (2 fields) or
    /// function-environment (3 fields).
    pub fn get_nth_field(self, n: usize) -> Result<u16> {
        let fields: &[u16] = match self.decode() {
            Decoded::Function(f) => &[f.entry, f.frame_size],
            Decoded::FuncEnv(r) => &[r.return_pc, r.stack_pointer, r.base_pointer],
            _ => {
                return Err(Error::type_mismatch(ValueType::Function, self.get_type()));
            }
        };
        fields.get(n).copied().ok_or_else(|| {
            Error::new(ErrorKind::IndexOutOfBounds {
                index: n as i64,
                length: fields.len(),
            })
        })
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::special()
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::integer(i32::from(b))
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Self::function(f.entry, f.frame_size)
    }
}

impl From<FrameRecord> for Value {
    fn from(r: FrameRecord) -> Self {
        Self::funcenv(r.return_pc, r.stack_pointer, r.base_pointer)
    }
}

impl From<Pointer> for Value {
    fn from(p: Pointer) -> Self {
        Self::pointer(p)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Decoded::Float(x) => write!(f, "Float({x:?})"),
            Decoded::Integer(n) => write!(f, "Integer({n})"),
            Decoded::Special => write!(f, "Special"),
            Decoded::Function(func) => {
                write!(f, "Function(@{}, {} locals)", func.entry, func.frame_size)
            }
            Decoded::FuncEnv(r) => write!(
                f,
                "FuncEnv(pc={}, sp={}, bp={})",
                r.return_pc, r.stack_pointer, r.base_pointer
            ),
            Decoded::Pointer(p) => write!(f, "{:?}({})", p.kind, p.handle),
            Decoded::Unknown(bits) => write!(f, "Unknown({bits:#018x})"),
        }
    }
}
