//! The Plume bytecode interpreter.
//!
//! This crate provides:
//! - [`Stack`] - The value stack: a globals region below the operands
//! - [`Vm`] - The dispatch loop, call frames and native calls
//! - [`NativeProvider`] - The seam through which natives are found
//! - [`VmConfig`] - Sizes and limits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod stack;
pub mod vm;

pub use config::{GLOBALS_SIZE, MAX_FRAMES, STACK_CAPACITY, VmConfig};
pub use stack::Stack;
pub use vm::{NativeBridge, NativeFn, NativeProvider, StaticProvider, Vm, VmState};
