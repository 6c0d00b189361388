//! Error types for the Plume VM.
//!
//! Every error the VM can detect is fatal: there is no recovery mechanism
//! inside a running program. Errors are a closed set of [`ErrorKind`]s,
//! optionally decorated with the instruction that raised them.

use std::fmt;

use thiserror::Error;

use crate::gc::HeapRef;
use crate::types::ValueType;

/// The main error type for Plume operations.
#[derive(Debug, Error)]
#[error("{kind}{}", .context.as_ref().map(|c| format!(" {c}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

/// Result alias used throughout the Plume crates.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    ///
    /// Context that is already present is kept; the innermost location wins.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
        }
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: ValueType, actual: ValueType) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an index out of bounds error.
    #[must_use]
    pub fn index_out_of_bounds(index: i64, length: usize) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds { index, length })
    }

    /// Creates a malformed constructor error.
    #[must_use]
    pub fn malformed_constructor(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedConstructor(reason.into()))
    }

    /// Creates a bytecode decoding error at a byte offset.
    #[must_use]
    pub fn decode(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode {
            offset,
            message: message.into(),
        })
    }

    /// Creates a stale heap reference error.
    #[must_use]
    pub fn stale_reference(handle: HeapRef) -> Self {
        Self::new(ErrorKind::StaleReference(handle))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err.to_string()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Operand had the wrong type for the operation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: ValueType,
        /// The actual type encountered.
        actual: ValueType,
    },

    /// A push would exceed the stack capacity.
    #[error("stack overflow")]
    StackOverflow,

    /// A pop would go below the operand region floor.
    #[error("stack underflow")]
    StackUnderflow,

    /// The call depth reached the configured frame limit.
    #[error("call stack overflow: more than {limit} nested calls")]
    CallStackOverflow {
        /// The configured frame limit.
        limit: usize,
    },

    /// `Return` executed with no open frame.
    #[error("return outside of a function frame")]
    ReturnOutsideFrame,

    /// List access past the end (or before the start).
    #[error("index out of bounds: {index} (length {length})")]
    IndexOutOfBounds {
        /// The index that was accessed.
        index: i64,
        /// The actual length of the list.
        length: usize,
    },

    /// Global slot outside the globals region.
    #[error("global slot {index} out of bounds (globals region holds {size})")]
    GlobalOutOfBounds {
        /// The requested slot.
        index: i64,
        /// Size of the globals region.
        size: usize,
    },

    /// Local slot outside the current frame.
    #[error("local slot {slot} outside the current frame")]
    LocalOutOfBounds {
        /// The requested local slot.
        slot: i64,
    },

    /// Constant pool index out of range.
    #[error("invalid constant index {0}")]
    InvalidConstant(i64),

    /// Comparison selector not in the comparator table.
    #[error("unknown comparator: {0}")]
    UnknownComparator(i32),

    /// Opcode byte not in the instruction set.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// A jump or call moved the program counter outside the program.
    #[error("jump target {target} outside program of {length} instructions")]
    JumpOutOfRange {
        /// The computed target.
        target: i64,
        /// Number of instructions in the program.
        length: usize,
    },

    /// A code address or stack index does not fit its 16-bit encoding field.
    #[error("address {0} does not fit in a 16-bit field")]
    AddressOutOfRange(i64),

    /// Value is not shaped `[special, name, ...]`.
    #[error("malformed constructor: {0}")]
    MalformedConstructor(String),

    /// Heap handle refers to a collected object.
    #[error("stale heap reference: {0}")]
    StaleReference(HeapRef),

    /// Call targets a library that was never loaded.
    #[error("native library {library} is not loaded (calling {symbol})")]
    NativeLibraryMissing {
        /// The library index.
        library: usize,
        /// The symbol being called.
        symbol: String,
    },

    /// Symbol not exported by the library.
    #[error("native function {symbol} not found in library {library}")]
    NativeSymbolMissing {
        /// The library index.
        library: usize,
        /// The symbol being called.
        symbol: String,
    },

    /// Function slot beyond the library's declared function count.
    #[error("native slot {slot} out of range for library {library} ({count} functions)")]
    NativeSlotOutOfRange {
        /// The library index.
        library: usize,
        /// The requested slot.
        slot: i64,
        /// Declared function count.
        count: usize,
    },

    /// A standard library entry needs `PLUME_PATH`, which is unset.
    #[error("standard library path not found (set PLUME_PATH to load {library})")]
    StandardPathMissing {
        /// The library name.
        library: String,
    },

    /// A shared library could not be opened.
    #[error("failed to load library '{path}': {message}")]
    LibraryLoad {
        /// The resolved path.
        path: String,
        /// Loader message.
        message: String,
    },

    /// Bytecode can only run on little-endian hosts.
    #[error("unsupported host endianness: bytecode requires little-endian")]
    UnsupportedEndianness,

    /// Malformed bytecode input.
    #[error("malformed bytecode at byte {offset}: {message}")]
    Decode {
        /// Byte offset of the failure.
        offset: usize,
        /// Description of the failure.
        message: String,
    },

    /// I/O failure while reading input.
    #[error("I/O error: {0}")]
    Io(String),

    /// The VM already stopped on a fatal error.
    #[error("the VM already stopped on a fatal error")]
    Faulted,

    /// Error raised by a native function body.
    #[error("native error: {0}")]
    Native(String),

    /// A value whose bit pattern carries no known type signature.
    #[error("value {0:#018x} has no known type")]
    UnknownValue(u64),
}

/// Where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Bytecode file or program name.
    pub source: Option<String>,
    /// Index of the failing instruction.
    pub pc: Option<usize>,
    /// Mnemonic of the failing instruction.
    pub opcode: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the failing instruction.
    #[must_use]
    pub fn with_instruction(mut self, pc: usize, opcode: impl Into<String>) -> Self {
        self.pc = Some(pc);
        self.opcode = Some(opcode.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pc, &self.opcode) {
            (Some(pc), Some(op)) => write!(f, "at instruction {pc} ({op})")?,
            (Some(pc), None) => write!(f, "at instruction {pc}")?,
            _ => {}
        }
        if let Some(source) = &self.source {
            write!(f, " in {source}")?;
        }
        Ok(())
    }
}
