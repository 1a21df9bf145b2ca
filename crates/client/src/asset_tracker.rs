const ASSET_CHANGED: &str = "AssetChanged";
const UNAVAILABLE: &str = "UNAVAILABLE";

use crate::document::StreamsDocument;

/// Watches `AssetChanged` DataItems and decides which asset ids are worth a fresh fetch
/// (spec.md §4.D). Pure bookkeeping: the Session Loop is responsible for actually spawning
/// the detached asset-fetch tasks this yields ids for, so the tracker itself never blocks.
#[derive(Default)]
pub struct AssetChangeTracker {
	last_changed_asset_id: Option<String>,
}

impl AssetChangeTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Scans the selected DeviceStream's DataItems for `AssetChanged` entries and returns the
	/// distinct new ids to fetch, in order, deduplicating consecutive repeats and ids already
	/// seen (spec.md §4.D, P5).
	pub fn scan(&mut self, doc: &StreamsDocument, device_name: Option<&str>) -> Vec<String> {
		let Some(device) = doc.select_device(device_name) else {
			return Vec::new();
		};
		let mut to_fetch = Vec::new();
		for item in &device.data_items {
			if item.data_item_type != ASSET_CHANGED {
				continue;
			}
			if item.value == UNAVAILABLE {
				continue;
			}
			if self.last_changed_asset_id.as_deref() == Some(item.value.as_str()) {
				continue;
			}
			self.last_changed_asset_id = Some(item.value.clone());
			to_fetch.push(item.value.clone());
		}
		to_fetch
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::document::{AgentHeader, DataItem, DeviceStream};
	use bytes::Bytes;

	fn header() -> AgentHeader {
		AgentHeader {
			instance_id: 1,
			first_sequence: 0,
			next_sequence: 0,
			last_sequence: 0,
			buffer_size: 1000,
		}
	}

	fn doc_with_asset_changed(value: &str) -> StreamsDocument {
		StreamsDocument {
			header: header(),
			device_streams: vec![DeviceStream {
				device_name: "dev".into(),
				data_items: vec![DataItem {
					data_item_type: ASSET_CHANGED.into(),
					value: value.into(),
				}],
			}],
			raw: Bytes::new(),
		}
	}

	#[test]
	fn dedups_consecutive_repeats_and_unavailable() {
		// P5: v1, v2, v2, v3, v3, v3 -> exactly 3 fetches triggered
		let mut tracker = AssetChangeTracker::new();
		let sequence = ["v1", "v2", "v2", "v3", "v3", "v3"];
		let mut triggered = Vec::new();
		for value in sequence {
			let doc = doc_with_asset_changed(value);
			triggered.extend(tracker.scan(&doc, None));
		}
		assert_eq!(triggered, vec!["v1", "v2", "v3"]);
	}

	#[test]
	fn unavailable_never_triggers() {
		let mut tracker = AssetChangeTracker::new();
		let doc = doc_with_asset_changed(UNAVAILABLE);
		assert!(tracker.scan(&doc, None).is_empty());
	}
}
