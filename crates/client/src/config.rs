/// Immutable-after-`Start` client configuration (spec.md §3).
#[derive(Clone, Debug)]
pub struct Configuration {
	pub base_url: String,
	pub device_name: Option<String>,
	pub interval_ms: u64,
	pub timeout_ms: u64,
	pub retry_interval_ms: u64,
	pub max_sample_count: u64,
}

impl Configuration {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			..Self::defaults()
		}
	}

	fn defaults() -> Self {
		Self {
			base_url: String::new(),
			device_name: None,
			interval_ms: 500,
			timeout_ms: 5000,
			retry_interval_ms: 10_000,
			max_sample_count: 200,
		}
	}

	pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
		self.device_name = Some(device_name.into());
		self
	}

	pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
		self.interval_ms = interval_ms;
		self
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn with_retry_interval_ms(mut self, retry_interval_ms: u64) -> Self {
		self.retry_interval_ms = retry_interval_ms;
		self
	}

	pub fn with_max_sample_count(mut self, max_sample_count: u64) -> Self {
		self.max_sample_count = max_sample_count;
		self
	}
}
