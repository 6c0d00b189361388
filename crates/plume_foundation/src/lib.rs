//! Core types for the Plume virtual machine.
//!
//! This crate provides:
//! - [`Value`] - The NaN-boxed 64-bit value every other layer passes around
//! - [`ValueType`] - Dynamic type descriptors
//! - [`Heap`] - Strings, lists and mutable cells under a mark-sweep [`Collector`]
//! - [`Error`] - The closed set of fatal errors, with instruction context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod gc;
pub mod heap;
pub mod types;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use gc::{Collector, DEFAULT_THRESHOLD, GcStats, HeapRef};
pub use heap::{BlockKind, Heap, HeapBlock, handle_of};
pub use types::ValueType;
pub use value::{CANONICAL_NAN, Decoded, FrameRecord, FunctionRef, Pointer, Value};
