use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only; the reporter already prints run progress
	// 1 (-v) = stage and browser lifecycle
	// 2+ (-vv) = everything, including launcher output
	let filter = match verbosity {
		0 => "error",
		1 => "warn,wct=info",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(false)
		.compact()
		.init();
}
