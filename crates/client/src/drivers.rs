use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cancel::CancelToken;
use crate::document::{AssetsDocument, DevicesDocument, DocumentParser, ParsedDocument, StreamsDocument, UrlBuilder};
use crate::error::Failure;
use crate::http::HttpExecutor;

/// Shared collaborators every Request Driver needs. Stateless and cheap to clone — one
/// instance is threaded through the whole Session Loop.
pub struct Drivers<E, P, U> {
	pub(crate) http: Arc<E>,
	pub(crate) parser: Arc<P>,
	pub(crate) urls: Arc<U>,
}

// Hand-written so cloning only requires `Arc`, not `E: Clone` (the `derive` would add that
// bound even though every field is already an `Arc`).
impl<E, P, U> Clone for Drivers<E, P, U> {
	fn clone(&self) -> Self {
		Self {
			http: self.http.clone(),
			parser: self.parser.clone(),
			urls: self.urls.clone(),
		}
	}
}

impl<E: HttpExecutor, P: DocumentParser, U: UrlBuilder> Drivers<E, P, U> {
	pub fn new(http: Arc<E>, parser: Arc<P>, urls: Arc<U>) -> Self {
		Self { http, parser, urls }
	}

	pub async fn probe(
		&self,
		base_url: &str,
		device_name: Option<&str>,
		timeout: Duration,
		cancel: &CancelToken,
	) -> Result<DevicesDocument, Failure> {
		let url = self.urls.probe(base_url, device_name);
		let body = self.http.get(&url, timeout, cancel).await?;
		match self.parser.parse_devices(&body) {
			ParsedDocument::Devices(doc) => Ok(doc),
			ParsedDocument::Error(err) => Err(Failure::Protocol(err)),
			_ => Err(Failure::Transport(body)),
		}
	}

	pub async fn current(
		&self,
		base_url: &str,
		device_name: Option<&str>,
		timeout: Duration,
		cancel: &CancelToken,
	) -> Result<StreamsDocument, Failure> {
		let url = self.urls.current(base_url, device_name);
		let body = self.http.get(&url, timeout, cancel).await?;
		match self.parser.parse_streams(&body) {
			ParsedDocument::Streams(doc) => Ok(doc),
			ParsedDocument::Error(err) => Err(Failure::Protocol(err)),
			_ => Err(Failure::Transport(body)),
		}
	}

	pub async fn assets(
		&self,
		base_url: &str,
		timeout: Duration,
		cancel: &CancelToken,
	) -> Result<AssetsDocument, Failure> {
		let url = self.urls.assets(base_url);
		let body = self.http.get(&url, timeout, cancel).await?;
		match self.parser.parse_assets(&body) {
			ParsedDocument::Assets(doc) => Ok(doc),
			ParsedDocument::Error(err) => Err(Failure::Protocol(err)),
			_ => Err(Failure::Transport(body)),
		}
	}

	/// Opens the sample stream and feeds every chunk through `on_chunk` after classifying it.
	/// Returns once the stream terminates for any reason (spec.md §4.B).
	pub async fn sample(
		&self,
		request: SampleRequest<'_>,
		cancel: &CancelToken,
		mut on_chunk: impl FnMut(SampleChunk) + Send,
	) -> Failure {
		let url = self
			.urls
			.sample(request.base_url, request.device_name, request.from, request.count, request.interval_ms);
		let parser = self.parser.clone();
		let mut dispatch = move |body: Bytes| {
			let chunk = match parser.parse_streams(&body) {
				ParsedDocument::Streams(doc) => SampleChunk::Streams(doc),
				ParsedDocument::Error(err) => SampleChunk::Protocol(err),
				_ => SampleChunk::Unrecognized(body),
			};
			on_chunk(chunk);
		};
		let failure = self.http.get_stream(&url, request.timeout, cancel, &mut dispatch).await;
		Failure::Connection(failure)
	}
}

/// Parameters for one sample-stream open (spec.md §4.E step 7).
pub struct SampleRequest<'a> {
	pub base_url: &'a str,
	pub device_name: Option<&'a str>,
	pub from: u64,
	pub count: u64,
	pub interval_ms: u64,
	pub timeout: Duration,
}

/// One classified unit of a sample stream, handed to the Session Loop's chunk handler.
pub enum SampleChunk {
	Streams(StreamsDocument),
	Protocol(crate::document::ProtocolErrorDocument),
	Unrecognized(Bytes),
}
