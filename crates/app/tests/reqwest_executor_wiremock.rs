//! End-to-end coverage of `ReqwestExecutor` against a mocked agent HTTP endpoint
//! (SPEC_FULL.md §13): Probe → Current → Sample driven through the real `Session`, including
//! the chunked multipart/mixed framing the sample stream uses.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mtconnect_app::reqwest_executor::ReqwestExecutor;
use mtconnect_client::{Configuration, Event, Session};
use mtconnect_xml::{MTConnectUrlBuilder, QuickXmlParser};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICES_XML: &str = r#"<?xml version="1.0"?><MTConnectDevices/>"#;

const CURRENT_XML: &str = r#"<?xml version="1.0"?>
<MTConnectStreams>
  <Header instanceId="7" firstSequence="1" nextSequence="50" lastSequence="49" bufferSize="10000"/>
  <Streams>
    <DeviceStream name="VMC-3Axis" uuid="abc">
      <ComponentStream component="Controller" name="controller">
        <Samples><Load dataItemId="l1" sequence="49">88</Load></Samples>
      </ComponentStream>
    </DeviceStream>
  </Streams>
</MTConnectStreams>"#;

const ASSETS_XML: &str = r#"<?xml version="1.0"?><MTConnectAssets/>"#;

fn sample_chunk_xml(sequence: u64, next_sequence: u64) -> String {
	format!(
		r#"<?xml version="1.0"?>
<MTConnectStreams>
  <Header instanceId="7" firstSequence="1" nextSequence="{next_sequence}" lastSequence="{sequence}" bufferSize="10000"/>
  <Streams>
    <DeviceStream name="VMC-3Axis" uuid="abc">
      <ComponentStream component="Controller" name="controller">
        <Samples><Load dataItemId="l1" sequence="{sequence}">91</Load></Samples>
      </ComponentStream>
    </DeviceStream>
  </Streams>
</MTConnectStreams>"#
	)
}

fn multipart_body(boundary: &str, parts: &[String]) -> Vec<u8> {
	let mut body = Vec::new();
	for part in parts {
		body.extend_from_slice(format!("--{boundary}\r\nContent-Type: text/xml\r\n\r\n").as_bytes());
		body.extend_from_slice(part.as_bytes());
		body.extend_from_slice(b"\r\n");
	}
	body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
	body
}

#[tokio::test]
async fn probe_current_sample_pipeline_over_http() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/probe"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(DEVICES_XML, "text/xml"))
		.mount(&server)
		.await;

	Mock::given(method("GET"))
		.and(path("/current"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(CURRENT_XML, "text/xml"))
		.mount(&server)
		.await;

	Mock::given(method("GET"))
		.and(path("/assets"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(ASSETS_XML, "text/xml"))
		.mount(&server)
		.await;

	let parts = vec![sample_chunk_xml(49, 51), sample_chunk_xml(50, 51)];
	let body = multipart_body("mtconnectBoundary", &parts);
	Mock::given(method("GET"))
		.and(path("/sample"))
		.and(query_param("from", "50"))
		.and(query_param("count", "50"))
		.and(query_param("interval", "10"))
		.respond_with(
			ResponseTemplate::new(200)
				.insert_header("content-type", "multipart/mixed;boundary=mtconnectBoundary")
				.set_body_bytes(body),
		)
		.mount(&server)
		.await;

	let config = Configuration::new(server.uri())
		.with_interval_ms(10)
		.with_timeout_ms(2000)
		.with_retry_interval_ms(50)
		.with_max_sample_count(50);

	let http = Arc::new(ReqwestExecutor::new().unwrap());
	let parser = Arc::new(QuickXmlParser::new());
	let urls = Arc::new(MTConnectUrlBuilder::new());
	let session = Session::new(config, http, parser, urls);

	let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
	let sink = events.clone();
	session.subscribe(move |event| sink.lock().unwrap().push(event));

	let handle = session.start();

	let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
	loop {
		let sample_count = events
			.lock()
			.unwrap()
			.iter()
			.filter(|e| matches!(e, Event::SampleReceived(_)))
			.count();
		if sample_count >= 2 || tokio::time::Instant::now() >= deadline {
			break;
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}

	handle.stop();
	handle.join().await;

	let observed = events.lock().unwrap();
	assert!(observed.iter().any(|e| matches!(e, Event::ProbeReceived(_))), "probe never received");
	assert!(observed.iter().any(|e| matches!(e, Event::CurrentReceived(_))), "current never received");
	let sample_sequences: Vec<u64> = observed
		.iter()
		.filter_map(|e| match e {
			Event::SampleReceived(doc) => Some(doc.header.last_sequence),
			_ => None,
		})
		.collect();
	assert_eq!(sample_sequences, vec![49, 50], "expected both multipart parts split out in order");
}
