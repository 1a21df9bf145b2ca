//! `reqwest`-backed [`HttpExecutor`], including the multipart/mixed boundary framing the
//! streamed `sample` endpoint uses (spec.md §5, §7): each chunk is one boundary-delimited part's
//! body, handed to the caller's `on_chunk` as soon as a full part has arrived.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use mtconnect_client::{CancelToken, ConnectionFailure, HttpExecutor};
use tracing::debug;

/// How often a long-running await races against `cancel.is_cancelled()`. `CancelToken` only
/// hands out a shared reference at this boundary (the owned, `&mut`-polled `cancelled()` future
/// is reserved for the Backoff wait in the session loop), so in-flight requests fall back to
/// polling rather than an edge-triggered wakeup.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Thin wrapper so the collaborator boundary (spec.md §6) owns its own `reqwest::Client`
/// rather than reaching for a process-global one.
pub struct ReqwestExecutor {
	client: reqwest::Client,
}

impl ReqwestExecutor {
	pub fn new() -> anyhow::Result<Self> {
		let client = reqwest::Client::builder().build()?;
		Ok(Self { client })
	}
}

fn classify_status(status: reqwest::StatusCode) -> Option<ConnectionFailure> {
	if status.is_success() {
		None
	} else {
		Some(ConnectionFailure::Status(status.as_u16()))
	}
}

fn classify_transport(err: reqwest::Error) -> ConnectionFailure {
	if err.is_timeout() {
		ConnectionFailure::Timeout(Duration::default())
	} else {
		ConnectionFailure::Transport(err.to_string())
	}
}

#[async_trait::async_trait]
impl HttpExecutor for ReqwestExecutor {
	async fn get(&self, url: &str, timeout: Duration, cancel: &CancelToken) -> Result<Bytes, ConnectionFailure> {
		let response = race_cancel(self.client.get(url).timeout(timeout).send(), cancel)
			.await?
			.map_err(classify_transport)?;
		if let Some(failure) = classify_status(response.status()) {
			return Err(failure);
		}
		race_cancel(response.bytes(), cancel).await?.map_err(classify_transport)
	}

	async fn get_stream(
		&self,
		url: &str,
		timeout: Duration,
		cancel: &CancelToken,
		on_chunk: &mut (dyn FnMut(Bytes) + Send),
	) -> ConnectionFailure {
		let response = match race_cancel(self.client.get(url).timeout(timeout).send(), cancel).await {
			Ok(Ok(response)) => response,
			Ok(Err(err)) => return classify_transport(err),
			Err(failure) => return failure,
		};
		if let Some(failure) = classify_status(response.status()) {
			return failure;
		}
		let boundary = response
			.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.and_then(boundary_from_content_type);
		let Some(boundary) = boundary else {
			return ConnectionFailure::Transport("missing multipart boundary on sample response".into());
		};
		let mut splitter = MultipartSplitter::new(boundary);
		let mut stream = response.bytes_stream();
		loop {
			match race_cancel(stream.next(), cancel).await {
				Ok(Some(Ok(bytes))) => {
					for part in splitter.feed(bytes) {
						on_chunk(part);
					}
				},
				Ok(Some(Err(err))) => return classify_transport(err),
				Ok(None) => {
					debug!("sample stream closed by agent");
					return ConnectionFailure::Transport("stream closed".into());
				},
				Err(failure) => return failure,
			}
		}
	}
}

/// Races `fut` against a poll loop on `cancel`, returning `Err(Cancelled)` as soon as a poll
/// observes it set.
async fn race_cancel<F: std::future::Future>(fut: F, cancel: &CancelToken) -> Result<F::Output, ConnectionFailure> {
	tokio::pin!(fut);
	loop {
		tokio::select! {
			biased;
			output = &mut fut => return Ok(output),
			_ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
				if cancel.is_cancelled() {
					return Err(ConnectionFailure::Cancelled);
				}
			},
		}
	}
}

fn boundary_from_content_type(content_type: &str) -> Option<String> {
	content_type.split(';').find_map(|segment| {
		let segment = segment.trim();
		segment.strip_prefix("boundary=").map(|b| b.trim_matches('"').to_string())
	})
}

/// Incremental multipart/mixed reader: accumulates bytes across chunks and yields one
/// complete part body per boundary delimiter as soon as it has arrived in full.
struct MultipartSplitter {
	delimiter: Vec<u8>,
	buf: BytesMut,
}

impl MultipartSplitter {
	fn new(boundary: String) -> Self {
		Self {
			delimiter: format!("--{boundary}").into_bytes(),
			buf: BytesMut::new(),
		}
	}

	fn feed(&mut self, chunk: Bytes) -> Vec<Bytes> {
		self.buf.extend_from_slice(&chunk);
		let mut parts = Vec::new();
		// Two independent exit conditions (opening delimiter, then closing delimiter) rule out
		// a single `while let`.
		#[allow(clippy::while_let_loop)]
		loop {
			let Some(first) = find(&self.buf, &self.delimiter) else {
				break;
			};
			let after_first = first + self.delimiter.len();
			let Some(second_rel) = find(&self.buf[after_first..], &self.delimiter) else {
				break;
			};
			let second = after_first + second_rel;
			let part_span = &self.buf[after_first..second];
			if let Some(body) = extract_body(part_span) {
				parts.push(Bytes::copy_from_slice(body));
			}
			let _ = self.buf.split_to(second);
		}
		parts
	}
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len().max(1)).position(|w| w == needle)
}

/// Strips MIME part headers (everything up to the first blank line) and surrounding whitespace.
fn extract_body(part: &[u8]) -> Option<&[u8]> {
	let header_end = find(part, b"\r\n\r\n").map(|i| i + 4).or_else(|| find(part, b"\n\n").map(|i| i + 2))?;
	let body = &part[header_end..];
	let trimmed = trim_ascii_whitespace(body);
	if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
	let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
	let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map(|i| i + 1).unwrap_or(start);
	&bytes[start..end]
}
