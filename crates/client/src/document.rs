use bytes::Bytes;

/// Header fields every Current/Sample response carries (spec.md §3 `AgentHeader`).
///
/// Consumed, not owned: the Session Loop reads it once per response and folds it into
/// `SequenceRange`; nothing holds onto it past that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentHeader {
	pub instance_id: i64,
	pub first_sequence: u64,
	pub next_sequence: u64,
	pub last_sequence: u64,
	pub buffer_size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataItem {
	pub data_item_type: String,
	pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceStream {
	pub device_name: String,
	pub data_items: Vec<DataItem>,
}

#[derive(Clone, Debug)]
pub struct DevicesDocument {
	pub raw: Bytes,
}

#[derive(Clone, Debug)]
pub struct StreamsDocument {
	pub header: AgentHeader,
	pub device_streams: Vec<DeviceStream>,
	pub raw: Bytes,
}

impl StreamsDocument {
	/// Total count of DataItem entries across the selected device's stream — this is the
	/// `itemCount` the sample-chunk handler adds to `SequenceRange.from` (spec.md §4.E).
	pub fn item_count(&self, device_name: Option<&str>) -> usize {
		self
			.select_device(device_name)
			.map(|d| d.data_items.len())
			.unwrap_or(0)
	}

	/// Device selection per spec.md §4.E: matching name if configured, otherwise the first.
	pub fn select_device(&self, device_name: Option<&str>) -> Option<&DeviceStream> {
		match device_name {
			Some(name) => self
				.device_streams
				.iter()
				.find(|d| d.device_name == name)
				.or_else(|| self.device_streams.first()),
			None => self.device_streams.first(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct AssetsDocument {
	pub raw: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolErrorDocument {
	pub code: String,
	pub message: String,
}

/// Total replacement for the "return null on non-match" parser shape spec.md §9 calls out:
/// every parse attempt lands in exactly one of these variants.
#[derive(Clone, Debug)]
pub enum ParsedDocument {
	Devices(DevicesDocument),
	Streams(StreamsDocument),
	Assets(AssetsDocument),
	Error(ProtocolErrorDocument),
	Unrecognized,
}

/// The XML→document parser collaborator (spec.md §6), contracted but not implemented here.
/// A concrete implementation lives in the `mtconnect-xml` crate.
pub trait DocumentParser: Send + Sync {
	fn parse_devices(&self, body: &[u8]) -> ParsedDocument;
	fn parse_streams(&self, body: &[u8]) -> ParsedDocument;
	fn parse_assets(&self, body: &[u8]) -> ParsedDocument;
}

/// URL composition collaborator (spec.md §6), contracted but not implemented here.
pub trait UrlBuilder: Send + Sync {
	fn probe(&self, base_url: &str, device_name: Option<&str>) -> String;
	fn current(&self, base_url: &str, device_name: Option<&str>) -> String;
	fn sample(
		&self,
		base_url: &str,
		device_name: Option<&str>,
		from: u64,
		count: u64,
		interval_ms: u64,
	) -> String;
	fn assets(&self, base_url: &str) -> String;
}
