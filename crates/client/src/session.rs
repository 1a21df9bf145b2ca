use std::sync::Arc;
use std::time::Duration;

use mtconnect_core::metrics::IncrementRecorder;
use tracing::{debug, info, warn};

use crate::asset_tracker::AssetChangeTracker;
use crate::cancel::{CancelHandle, CancelToken, cancel_pair};
use crate::config::Configuration;
use crate::document::{DocumentParser, UrlBuilder};
use crate::drivers::{Drivers, SampleChunk, SampleRequest};
use crate::error::Failure;
use crate::events::{Event, Subscribers};
use crate::http::HttpExecutor;
use crate::metrics::{NoopMetrics, SessionMetric};
use crate::sequence::SequenceRange;

/// -1 sentinel for "no instance observed yet" (spec.md §3 `SessionState.last_instance_id`).
const NO_INSTANCE: i64 = -1;

/// Where a `Backoff` wait resumes (spec.md §4.E).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BackoffTarget {
	Probing,
	CurrentFetch,
}

#[derive(Debug)]
enum Phase {
	Probing,
	/// `force_initialize` is set whenever this transition follows a successful Probe (fresh
	/// start, or re-probe after an instance change): spec.md §4.E "On success ... enter
	/// CurrentFetch with initialize=true" (I4).
	CurrentFetch { force_initialize: bool },
	Streaming,
	Backoff(BackoffTarget),
	Stopped,
}

/// Private Session Loop bookkeeping (spec.md §3 `SessionState`). `current_sample_stream` from
/// the spec has no field here: the loop body only ever has one sample stream in flight at a
/// time because it `.await`s to completion before re-entering CurrentFetch (I5 is structural,
/// not guarded).
struct RunState {
	last_instance_id: i64,
	initialize: bool,
	range: SequenceRange,
	asset_tracker: AssetChangeTracker,
}

impl RunState {
	fn new() -> Self {
		Self {
			last_instance_id: NO_INSTANCE,
			initialize: true,
			range: SequenceRange::default(),
			asset_tracker: AssetChangeTracker::new(),
		}
	}
}

/// The long-running MTConnect client. Inert until [`Session::start`] is called.
pub struct Session<E, P, U, M = NoopMetrics> {
	config: Configuration,
	drivers: Drivers<E, P, U>,
	subscribers: Subscribers,
	metrics: M,
}

impl<E, P, U> Session<E, P, U, NoopMetrics>
where
	E: HttpExecutor,
	P: DocumentParser,
	U: UrlBuilder,
{
	pub fn new(config: Configuration, http: Arc<E>, parser: Arc<P>, urls: Arc<U>) -> Self {
		Self {
			config,
			drivers: Drivers::new(http, parser, urls),
			subscribers: Subscribers::new(),
			metrics: NoopMetrics,
		}
	}
}

impl<E, P, U, M> Session<E, P, U, M>
where
	E: HttpExecutor,
	P: DocumentParser,
	U: UrlBuilder,
{
	pub fn with_metrics<M2>(self, metrics: M2) -> Session<E, P, U, M2> {
		Session {
			config: self.config,
			drivers: self.drivers,
			subscribers: self.subscribers,
			metrics,
		}
	}

	/// Subscribers may attach before or after `Start` (spec.md §3 lifecycle).
	pub fn subscribe(&self, observer: impl Fn(Event) + Send + Sync + 'static) {
		self.subscribers.subscribe(observer);
	}
}

impl<E, P, U, M> Session<E, P, U, M>
where
	E: HttpExecutor + 'static,
	P: DocumentParser + 'static,
	U: UrlBuilder + 'static,
	M: IncrementRecorder<SessionMetric> + Clone + Send + Sync + 'static,
{
	/// Launches the Session Loop on its own task and returns a handle for cancellation and
	/// late subscription.
	pub fn start(self) -> SessionHandle {
		let (cancel_handle, cancel_token) = cancel_pair();
		let subscribers = self.subscribers.clone();
		let join = tokio::spawn(run_loop(
			self.config,
			self.drivers,
			self.subscribers,
			self.metrics,
			cancel_token,
		));
		SessionHandle {
			cancel: cancel_handle,
			subscribers,
			join,
		}
	}
}

/// Handle returned by `Session::start`. `Stop` (here, `stop`) only requests cooperative
/// cancellation and returns immediately (spec.md §5) — it does not wait for the loop to exit.
pub struct SessionHandle {
	cancel: CancelHandle,
	subscribers: Subscribers,
	join: tokio::task::JoinHandle<()>,
}

impl SessionHandle {
	pub fn subscribe(&self, observer: impl Fn(Event) + Send + Sync + 'static) {
		self.subscribers.subscribe(observer);
	}

	pub fn stop(&self) {
		self.cancel.cancel();
	}

	/// Waits for the loop to actually exit. Primarily useful in tests; production callers
	/// generally just call `stop` and move on.
	pub async fn join(self) {
		let _ = self.join.await;
	}
}

async fn run_loop<E, P, U, M>(
	config: Configuration,
	drivers: Drivers<E, P, U>,
	subscribers: Subscribers,
	metrics: M,
	mut cancel: CancelToken,
) where
	E: HttpExecutor + 'static,
	P: DocumentParser + 'static,
	U: UrlBuilder + 'static,
	M: IncrementRecorder<SessionMetric> + Clone + Send + Sync + 'static,
{
	subscribers.publish(Event::Started);
	let mut state = RunState::new();
	let mut phase = Phase::Probing;
	loop {
		if cancel.is_cancelled() {
			phase = Phase::Stopped;
		}
		debug!(?phase, "session loop phase");
		phase = match phase {
			Phase::Probing => probe(&config, &drivers, &subscribers, &metrics, &cancel).await,
			Phase::CurrentFetch { force_initialize } => {
				if force_initialize {
					state.initialize = true;
				}
				current_fetch(&config, &drivers, &subscribers, &metrics, &mut state, &cancel).await
			},
			Phase::Streaming => {
				streaming(&config, &drivers, &subscribers, &metrics, &mut state, &cancel).await
			},
			Phase::Backoff(target) => backoff(&config, target, &mut cancel).await,
			Phase::Stopped => {
				subscribers.publish(Event::Stopped);
				return;
			},
		};
	}
}

fn route_failure<M>(failure: &Failure, subscribers: &Subscribers, metrics: &M)
where
	M: IncrementRecorder<SessionMetric>,
{
	match failure {
		Failure::Connection(cause) => {
			warn!(%cause, "connection failure");
			subscribers.publish(Event::ConnectionError(Arc::new(cause.clone())));
			metrics.increment(SessionMetric::ConnectionFailure);
		},
		Failure::Protocol(doc) => {
			warn!(code = %doc.code, message = %doc.message, "protocol error");
			subscribers.publish(Event::Error(Arc::new(doc.clone())));
			metrics.increment(SessionMetric::ProtocolError);
		},
		Failure::Transport(body) => {
			warn!(bytes = body.len(), "unparseable response body");
			subscribers.publish(Event::XmlError(Arc::new(body.clone())));
			metrics.increment(SessionMetric::TransportError);
		},
	}
}

async fn probe<E, P, U, M>(
	config: &Configuration,
	drivers: &Drivers<E, P, U>,
	subscribers: &Subscribers,
	metrics: &M,
	cancel: &CancelToken,
) -> Phase
where
	E: HttpExecutor,
	P: DocumentParser,
	U: UrlBuilder,
	M: IncrementRecorder<SessionMetric>,
{
	let timeout = Duration::from_millis(config.timeout_ms);
	match drivers
		.probe(&config.base_url, config.device_name.as_deref(), timeout, cancel)
		.await
	{
		Ok(doc) => {
			info!("probe received");
			subscribers.publish(Event::ProbeReceived(Arc::new(doc)));
			metrics.increment(SessionMetric::ProbeSucceeded);
			Phase::CurrentFetch { force_initialize: true }
		},
		Err(failure) => {
			route_failure(&failure, subscribers, metrics);
			Phase::Backoff(BackoffTarget::Probing)
		},
	}
}

/// Spawns a detached, best-effort asset fetch (spec.md §4.D: "the tracker never blocks the
/// Session Loop: asset fetches run as detached tasks and publish through `AssetsReceived`").
fn spawn_asset_fetch<E, P, U, M>(
	drivers: Drivers<E, P, U>,
	subscribers: Subscribers,
	metrics: M,
	base_url: String,
	timeout: Duration,
	cancel: CancelToken,
) where
	E: HttpExecutor + 'static,
	P: DocumentParser + 'static,
	U: UrlBuilder + 'static,
	M: IncrementRecorder<SessionMetric> + Send + Sync + 'static,
{
	tokio::spawn(async move {
		match drivers.assets(&base_url, timeout, &cancel).await {
			Ok(doc) => subscribers.publish(Event::AssetsReceived(Arc::new(doc))),
			Err(failure) => route_failure(&failure, &subscribers, &metrics),
		}
	});
}

async fn current_fetch<E, P, U, M>(
	config: &Configuration,
	drivers: &Drivers<E, P, U>,
	subscribers: &Subscribers,
	metrics: &M,
	state: &mut RunState,
	cancel: &CancelToken,
) -> Phase
where
	E: HttpExecutor + 'static,
	P: DocumentParser + 'static,
	U: UrlBuilder + 'static,
	M: IncrementRecorder<SessionMetric> + Clone + Send + Sync + 'static,
{
	// Best-effort asset refresh on every CurrentFetch entry; failures never affect the loop.
	spawn_asset_fetch(
		drivers.clone(),
		subscribers.clone(),
		metrics.clone(),
		config.base_url.clone(),
		Duration::from_millis(config.timeout_ms),
		cancel.clone(),
	);

	let timeout = Duration::from_millis(config.timeout_ms);
	let doc = match drivers
		.current(&config.base_url, config.device_name.as_deref(), timeout, cancel)
		.await
	{
		Err(failure) => {
			route_failure(&failure, subscribers, metrics);
			return Phase::Backoff(BackoffTarget::CurrentFetch);
		},
		Ok(doc) => doc,
	};
	metrics.increment(SessionMetric::CurrentSucceeded);

	let header = doc.header;
	let device_name = config.device_name.as_deref();

	// Step 1: if we weren't already re-initializing, check whether the agent's buffer has
	// advanced past our window and force a re-anchor.
	if !state.initialize {
		state.initialize = state.range.from() > 0 && header.first_sequence > state.range.from();
	}

	// Step 2
	if state.initialize {
		subscribers.publish(Event::CurrentReceived(Arc::new(doc.clone())));
		for asset_id in state.asset_tracker.scan(&doc, device_name) {
			metrics.increment(SessionMetric::AssetFetchTriggered);
			spawn_asset_fetch(
				drivers.clone(),
				subscribers.clone(),
				metrics.clone(),
				config.base_url.clone(),
				timeout,
				cancel.clone(),
			);
			debug!(asset_id, "asset change observed in current");
		}
	}

	// Step 3: instance-change / re-initialize forces a window reset.
	let instance_changed = header.instance_id != state.last_instance_id;
	let already_initialized = state.last_instance_id != NO_INSTANCE;
	if state.initialize || instance_changed {
		state.range.reset();
		state.last_instance_id = header.instance_id;
		if instance_changed {
			metrics.increment(SessionMetric::InstanceChanged);
		}
		if instance_changed && already_initialized {
			warn!(instance_id = header.instance_id, "agent instance changed, re-probing");
			return Phase::Probing;
		}
	}

	// Step 4 + 5: compute the window.
	let (from, to) = if state.initialize {
		(header.next_sequence, header.next_sequence)
	} else {
		let buffer_slack = header.buffer_size as i64 - 100;
		let replay_floor = (header.last_sequence as i64 - buffer_slack).max(header.first_sequence as i64);
		let from = (state.range.from() as i64).max(replay_floor) as u64;
		let to = header.next_sequence.min(from + config.max_sample_count);
		(from, to)
	};
	state.range.set(from, to);
	state.initialize = false;

	Phase::Streaming
}

async fn streaming<E, P, U, M>(
	config: &Configuration,
	drivers: &Drivers<E, P, U>,
	subscribers: &Subscribers,
	metrics: &M,
	state: &mut RunState,
	cancel: &CancelToken,
) -> Phase
where
	E: HttpExecutor + 'static,
	P: DocumentParser + 'static,
	U: UrlBuilder + 'static,
	M: IncrementRecorder<SessionMetric> + Clone + Send + Sync + 'static,
{
	let timeout = Duration::from_millis(config.timeout_ms);
	let device_name = config.device_name.clone();
	let from = state.range.from();

	let mut new_asset_ids = Vec::new();
	let request = SampleRequest {
		base_url: &config.base_url,
		device_name: device_name.as_deref(),
		from,
		count: config.max_sample_count,
		interval_ms: config.interval_ms,
		timeout,
	};
	let failure = drivers
		.sample(request, cancel, |chunk| match chunk {
			SampleChunk::Streams(doc) => {
				let item_count = doc.item_count(device_name.as_deref()) as u64;
				state.range.advance(item_count, doc.header.next_sequence);
				new_asset_ids.extend(state.asset_tracker.scan(&doc, device_name.as_deref()));
				subscribers.publish(Event::SampleReceived(Arc::new(doc)));
				metrics.increment(SessionMetric::SampleChunkReceived);
			},
			SampleChunk::Protocol(err) => {
				subscribers.publish(Event::Error(Arc::new(err)));
				metrics.increment(SessionMetric::ProtocolError);
			},
			SampleChunk::Unrecognized(body) => {
				subscribers.publish(Event::XmlError(Arc::new(body)));
				metrics.increment(SessionMetric::TransportError);
			},
		})
		.await;

	for asset_id in new_asset_ids {
		metrics.increment(SessionMetric::AssetFetchTriggered);
		spawn_asset_fetch(
			drivers.clone(),
			subscribers.clone(),
			metrics.clone(),
			config.base_url.clone(),
			timeout,
			cancel.clone(),
		);
		debug!(asset_id, "asset change observed in sample chunk");
	}

	route_failure(&failure, subscribers, metrics);
	Phase::Backoff(BackoffTarget::CurrentFetch)
}

async fn backoff(config: &Configuration, target: BackoffTarget, cancel: &mut CancelToken) -> Phase {
	let wait = tokio::time::sleep(Duration::from_millis(config.retry_interval_ms));
	tokio::select! {
		_ = wait => {},
		_ = cancel.cancelled() => return Phase::Stopped,
	}
	match target {
		BackoffTarget::Probing => Phase::Probing,
		BackoffTarget::CurrentFetch => Phase::CurrentFetch { force_initialize: false },
	}
}
