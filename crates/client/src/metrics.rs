use mtconnect_core::metrics::Recorder;

/// Session Loop transitions worth counting, mirroring the teacher's
/// `ConnectionTerminationReason` used by `agent_xds::AdsClient::run_loop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionMetric {
	ProbeSucceeded,
	CurrentSucceeded,
	SampleChunkReceived,
	ConnectionFailure,
	ProtocolError,
	TransportError,
	InstanceChanged,
	AssetFetchTriggered,
}

/// No-op `Recorder` used when a caller doesn't wire in a real metrics registry.
#[derive(Clone, Copy, Default)]
pub struct NoopMetrics;

impl Recorder<SessionMetric, u64> for NoopMetrics {
	fn record(&self, _event: SessionMetric, _meta: u64) {}
}
