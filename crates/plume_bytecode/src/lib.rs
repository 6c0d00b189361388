//! Plume bytecode: the instruction set and the program container.
//!
//! A [`Program`] is what the VM executes: a constant pool, the native
//! libraries it links against, and a flat array of fixed-width
//! [`Instruction`]s. [`decode`] reads the little-endian wire format and
//! [`encode`] writes it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod decode;
pub mod encode;
pub mod opcode;
pub mod program;

pub use decode::{decode, read_file};
pub use encode::{encode, write_to};
pub use opcode::{Comparator, Opcode};
pub use program::{Constant, Instruction, LibraryEntry, Program};
