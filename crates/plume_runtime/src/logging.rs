//! Log output for the `plume` binary.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static TRACING_INIT: Once = Once::new();

/// Filter used by `--trace` when `RUST_LOG` is unset.
pub const TRACE_FILTER: &str = "plume=trace";

/// Installs the global subscriber. Later calls do nothing.
///
/// `RUST_LOG` takes precedence. Without it, `trace` selects
/// [`TRACE_FILTER`] and otherwise only warnings are shown.
pub fn init_tracing(trace: bool) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if trace { TRACE_FILTER } else { "warn" })
        });

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
