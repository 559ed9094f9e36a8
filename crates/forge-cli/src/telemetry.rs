//! Tracing setup for the `forge` binary.
//!
//! Every log line goes to stderr; stdout is reserved for echoed CMake output,
//! summaries and `--json` results.

use std::io;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the stderr filter: `RUST_LOG` when set, otherwise `level`.
fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let json_layer = json.then(|| fmt::layer().with_target(false).with_writer(io::stderr).json());
    let text_layer = (!json).then(|| fmt::layer().with_target(false).with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(log_filter(level))
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .ok();
}
