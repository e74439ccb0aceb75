//! Structured trace capture for offline inspection.
//!
//! Events are appended as JSON lines so a session can be examined after the
//! fact with `jq` or similar. The subscriber follows the same switches as the
//! debug log and stays silent unless file logging is on.

use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Capture our own debug events unless `RUST_LOG` says otherwise.
const DEFAULT_DIRECTIVE: &str = "medivox=debug";

/// Trace destination. `MEDIVOX_TRACE_LOG` overrides the temp-dir default.
pub(crate) fn tracing_log_path() -> PathBuf {
    env::var("MEDIVOX_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("medivox_trace.jsonl"))
}

/// Install the global JSON trace subscriber and report where events land.
///
/// Returns `None` when logging is disabled, when the trace file cannot be
/// opened, or when a subscriber was already installed.
pub fn init_tracing(config: &AppConfig) -> Option<PathBuf> {
    if !config.logs || config.no_logs {
        return None;
    }

    let mut installed = None;
    TRACING_INIT.get_or_init(|| {
        let path = tracing_log_path();
        let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
            return;
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            installed = Some(path);
        }
    });
    installed
}
