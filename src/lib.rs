//! Plume - NaN-boxed bytecode virtual machine
//!
//! This crate re-exports all layers of the Plume system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: plume_runtime     — CLI, library path resolution, shared-library natives
//! Layer 2: plume_vm          — Stack, call frames, native bridge, dispatch loop
//! Layer 1: plume_bytecode    — Opcodes, program container, wire format
//! Layer 0: plume_foundation  — Value encoding, heap & collector, Error
//! ```

pub use plume_bytecode as bytecode;
pub use plume_foundation as foundation;
pub use plume_runtime as runtime;
pub use plume_vm as vm;
