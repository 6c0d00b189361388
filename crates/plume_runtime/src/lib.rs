//! Process entry for Plume: loading bytecode files and their native
//! libraries, and setting up logging.
//!
//! This crate provides:
//! - [`load`] - Decode a bytecode file and build a ready-to-run [`Vm`]
//! - [`DylibProvider`] - Natives from shared libraries
//! - [`RuntimeConfig`] - `PLUME_PATH` and CLI switches
//! - [`init_tracing`] - The `tracing` subscriber for the binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod library;
pub mod logging;

pub use config::{RuntimeConfig, STD_PATH_VAR};
pub use library::{DylibProvider, RawNative, library_path};
pub use logging::{TRACE_FILTER, init_tracing};

use std::path::Path;

use plume_bytecode::read_file;
use plume_foundation::{Error, ErrorKind, Result};
use plume_vm::Vm;

/// Fails on hosts whose byte order differs from the bytecode's.
pub fn check_endianness() -> Result<()> {
    if cfg!(target_endian = "little") {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::UnsupportedEndianness))
    }
}

/// Reads the bytecode file at `path`, opens the libraries it declares, and
/// returns a VM positioned at its first instruction.
///
/// `args` become the program arguments.
pub fn load<I, S>(path: &Path, args: I, config: &RuntimeConfig) -> Result<Vm>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    check_endianness()?;

    let program = read_file(path)?;
    tracing::debug!(
        path = %path.display(),
        constants = program.constants.len(),
        libraries = program.libraries.len(),
        instructions = program.instructions.len(),
        "loaded program"
    );

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let provider = DylibProvider::open(&program.libraries, dir, config.std_path.as_deref())?;

    Ok(Vm::with_config(program, config.vm.clone())
        .with_provider(provider)
        .with_args(args)
        .with_source(path.display().to_string()))
}
