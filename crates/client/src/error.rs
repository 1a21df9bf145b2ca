use std::fmt;

use crate::document::ProtocolErrorDocument;

/// A driver-level transport failure: I/O error, DNS, TLS, non-2xx status, timeout, or an
/// explicit cancellation. `Clone` so the same failure can be both published to subscribers
/// and used to decide the next state-machine transition.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConnectionFailure {
	#[error("transport error: {0}")]
	Transport(String),
	#[error("non-2xx HTTP status: {0}")]
	Status(u16),
	#[error("request timed out after {0:?}")]
	Timeout(std::time::Duration),
	#[error("cancelled")]
	Cancelled,
}

/// The three failure domains a Request Driver's result can fall into (spec.md §4.B).
#[derive(Clone, Debug, thiserror::Error)]
pub enum Failure {
	#[error("connection failure: {0}")]
	Connection(#[from] ConnectionFailure),
	#[error("protocol error: {0}")]
	Protocol(ProtocolErrorDocument),
	/// Body was non-empty but parsed as none of the expected document shapes.
	#[error("unparseable response body")]
	Transport(bytes::Bytes),
}

impl fmt::Display for ProtocolErrorDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code, self.message)
	}
}
