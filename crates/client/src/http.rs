use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cancel::CancelToken;
use crate::error::ConnectionFailure;

/// HTTP request execution collaborator (spec.md §6, out of the core's implementation
/// responsibility). `mtconnect-app` supplies a `reqwest`-backed implementation; tests supply
/// an in-memory fake.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
	/// One-shot GET used by Probe, Current and Assets.
	async fn get(
		&self,
		url: &str,
		timeout: Duration,
		cancel: &CancelToken,
	) -> Result<Bytes, ConnectionFailure>;

	/// Long-poll chunked GET used by Sample. Invokes `on_chunk` once per boundary-delimited
	/// payload on the caller's task (spec.md §5) until the agent closes the connection or
	/// `cancel` fires; the terminal result is always a `ConnectionFailure`, including the
	/// benign "stopped" case (spec.md §4.B).
	async fn get_stream(
		&self,
		url: &str,
		timeout: Duration,
		cancel: &CancelToken,
		on_chunk: &mut (dyn FnMut(Bytes) + Send),
	) -> ConnectionFailure;
}
