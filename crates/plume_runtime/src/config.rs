//! Process-level configuration.

use std::env;
use std::path::PathBuf;

use plume_vm::VmConfig;

/// Environment variable naming the standard library directory.
pub const STD_PATH_VAR: &str = "PLUME_PATH";

/// Settings for one run of the `plume` binary.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Directory holding the standard libraries, if known.
    pub std_path: Option<PathBuf>,
    /// Log every dispatched instruction.
    pub trace: bool,
    /// Print collector statistics after the run.
    pub stats: bool,
    /// Interpreter sizes and limits.
    pub vm: VmConfig,
}

impl RuntimeConfig {
    /// Reads the standard library path from `PLUME_PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            std_path: env::var_os(STD_PATH_VAR)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Sets the standard library path.
    #[must_use]
    pub fn with_std_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.std_path = Some(path.into());
        self
    }

    /// Enables instruction tracing.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Enables the statistics report.
    #[must_use]
    pub fn with_stats(mut self, stats: bool) -> Self {
        self.stats = stats;
        self
    }

    /// Replaces the interpreter configuration.
    #[must_use]
    pub fn with_vm(mut self, vm: VmConfig) -> Self {
        self.vm = vm;
        self
    }
}
