//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//!
//! - **Configurable log levels**: `RUST_LOG` wins; otherwise the caller's default filter.
//! - **Compact** format for development (no module prefix, spans inline).
//! - **JSON** format for log shippers.
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: `Actor started` / `Shutdown` per entity (debug level).
//! - **Actions**: `Action applied` with the new `version`, `Action absorbed` for no-ops,
//!   `Action failed` with the error, `Stale version` for optimistic-concurrency losses.
//! - **Removal**: `Deleted` / `Delete refused`.
//!
//! ```bash
//! RUST_LOG=info cargo run                       # one line per committed change
//! RUST_LOG=debug cargo run                      # full action payloads
//! RUST_LOG=entity_actor=debug,info cargo run    # actor internals only
//! ```

use tracing_subscriber::EnvFilter;

/// Output format for [`setup_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Installs the global subscriber.
///
/// Returns an error if a global subscriber is already set, which lets tests call it
/// repeatedly and ignore the result.
pub fn setup_tracing(
    default_filter: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false); // entity_type / order_id fields carry the context

    match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
