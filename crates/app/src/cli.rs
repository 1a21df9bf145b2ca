use clap::Parser;
use mtconnect_client::Configuration;

/// Command-line entry point for the MTConnect session client (spec.md §3 `Configuration`,
/// expanded with env-overridable flags the way the teacher's `Args` struct does).
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct Args {
	/// Base URL of the MTConnect agent, e.g. `http://agent.local:5000`.
	#[arg(long, env = "MTCONNECT_BASE_URL")]
	pub base_url: String,

	/// Restrict Probe/Current/Sample requests to a single device.
	#[arg(long, env = "MTCONNECT_DEVICE")]
	pub device: Option<String>,

	/// Sample long-poll interval, passed through as `interval=` on the sample URL.
	#[arg(long, env = "MTCONNECT_INTERVAL_MS", default_value_t = 500)]
	pub interval_ms: u64,

	/// Per-request timeout for Probe/Current/Assets and the sample stream's connect phase.
	#[arg(long, env = "MTCONNECT_TIMEOUT_MS", default_value_t = 5000)]
	pub timeout_ms: u64,

	/// Wait between a failed phase and its retry.
	#[arg(long, env = "MTCONNECT_RETRY_INTERVAL_MS", default_value_t = 10_000)]
	pub retry_interval_ms: u64,

	/// Upper bound on sequence numbers requested per sample chunk.
	#[arg(long, env = "MTCONNECT_MAX_SAMPLE_COUNT", default_value_t = 200)]
	pub max_sample_count: u64,
}

impl From<Args> for Configuration {
	fn from(args: Args) -> Self {
		let mut config = Configuration::new(args.base_url)
			.with_interval_ms(args.interval_ms)
			.with_timeout_ms(args.timeout_ms)
			.with_retry_interval_ms(args.retry_interval_ms)
			.with_max_sample_count(args.max_sample_count);
		if let Some(device) = args.device {
			config = config.with_device_name(device);
		}
		config
	}
}
