use std::sync::Arc;

use clap::Parser;
use mtconnect_app::cli::Args;
use mtconnect_app::reqwest_executor::ReqwestExecutor;
use mtconnect_client::{Configuration, Event, Session};
use mtconnect_xml::{MTConnectUrlBuilder, QuickXmlParser};
use tracing::{error, info, warn};

fn init_tracing() {
	mtconnect_core::logging::init_tracing();
}

fn log_event(event: Event) {
	match event {
		Event::Started => info!("session started"),
		Event::Stopped => info!("session stopped"),
		Event::ProbeReceived(_) => info!("probe received"),
		Event::CurrentReceived(doc) => info!(instance_id = doc.header.instance_id, "current received"),
		Event::SampleReceived(doc) => info!(next_sequence = doc.header.next_sequence, "sample chunk received"),
		Event::AssetsReceived(_) => info!("assets received"),
		Event::Error(err) => warn!(code = %err.code, message = %err.message, "agent reported protocol error"),
		Event::ConnectionError(cause) => warn!(%cause, "connection failure"),
		Event::XmlError(body) => warn!(bytes = body.len(), "unparseable response body"),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let args = Args::parse();
	let config: Configuration = args.into();

	let http = Arc::new(ReqwestExecutor::new()?);
	let parser = Arc::new(QuickXmlParser::new());
	let urls = Arc::new(MTConnectUrlBuilder::new());

	let session = Session::new(config, http, parser, urls);
	session.subscribe(log_event);
	let handle = session.start();

	if let Err(err) = tokio::signal::ctrl_c().await {
		error!(%err, "failed to listen for ctrl-c, stopping anyway");
	}
	info!("shutdown requested, stopping session");
	handle.stop();
	handle.join().await;
	Ok(())
}
