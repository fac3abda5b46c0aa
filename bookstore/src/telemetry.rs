// bookstore/src/telemetry.rs

use crate::config::AppConfig;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Span close events are logged so each
/// flow stage shows up with its duration. Calling this twice is harmless: the second
/// install attempt is ignored.
pub fn init_tracing(config: &AppConfig) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);

  let installed = if config.log_json {
    builder.json().try_init()
  } else {
    builder.try_init()
  };

  if installed.is_err() {
    tracing::debug!("Tracing subscriber already installed; keeping the existing one.");
  }
}
