//! Structured logging setup
//!
//! Level is taken from `RUST_LOG` (default `info`). Timestamps are UTC with
//! millisecond precision. `LogFormat::Json` emits one JSON object per line.

use crate::infra::config::LogFormat;
use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_timer(timer).with_target(false);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
}
