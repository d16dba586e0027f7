//! Logging initialization for hosts that don't bring their own subscriber.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber. `RUST_LOG` wins over the configured
/// level; calling this twice is harmless.
pub fn init(log_level: &str) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.try_init();
}
