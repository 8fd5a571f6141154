use tracing_subscriber::EnvFilter;

/// Environment variable holding a full tracing filter directive.
pub const LOG_ENV: &str = "RESOURCER_LOG";

/// Installs the stderr subscriber. `RESOURCER_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
	let fallback = if verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}
