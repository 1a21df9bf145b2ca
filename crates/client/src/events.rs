use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::document::{AssetsDocument, DevicesDocument, ProtocolErrorDocument, StreamsDocument};
use crate::error::ConnectionFailure;

/// One fan-out event (spec.md §6 downstream interface / §9 design notes).
#[derive(Clone, Debug)]
pub enum Event {
	ProbeReceived(Arc<DevicesDocument>),
	CurrentReceived(Arc<StreamsDocument>),
	SampleReceived(Arc<StreamsDocument>),
	AssetsReceived(Arc<AssetsDocument>),
	Error(Arc<ProtocolErrorDocument>),
	ConnectionError(Arc<ConnectionFailure>),
	XmlError(Arc<Bytes>),
	Started,
	Stopped,
}

type Observer = Box<dyn Fn(Event) + Send + Sync>;

/// Typed observer registry: one shared list of subscribers, delivered to synchronously on
/// whichever task produced the event (spec.md §9 design notes — "typed observer registry...
/// deliver synchronously on the producing task"). Subscribe is permitted both before and
/// after `Start`, guarded by a lock (spec.md §5).
#[derive(Clone, Default)]
pub struct Subscribers {
	observers: Arc<Mutex<Vec<Observer>>>,
}

impl Subscribers {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, observer: impl Fn(Event) + Send + Sync + 'static) {
		self.observers.lock().unwrap().push(Box::new(observer));
	}

	pub fn publish(&self, event: Event) {
		for observer in self.observers.lock().unwrap().iter() {
			observer(event.clone());
		}
	}
}
