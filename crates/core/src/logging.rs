use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Installs a process-wide `tracing` subscriber. Call exactly once, from a binary's `main`.
///
/// Library crates never call this: they only emit events through the `tracing` macros and
/// leave subscription to whoever embeds them.
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_span_events(FmtSpan::CLOSE)
		.init();
}
