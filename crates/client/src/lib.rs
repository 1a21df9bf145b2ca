//! THE CORE: the MTConnect session state machine and sequence-range manager.
//!
//! This crate owns the Probe → Current → Sample pipeline, instance-change detection, window
//! computation and connection-failure recovery (spec.md §§1-9). XML parsing, HTTP execution
//! and URL composition are collaborator traits implemented elsewhere (`mtconnect-xml`,
//! `mtconnect-app`).

pub mod asset_tracker;
pub mod cancel;
pub mod config;
pub mod document;
pub mod drivers;
pub mod error;
pub mod events;
pub mod http;
pub mod metrics;
pub mod sequence;
pub mod session;

pub use cancel::CancelToken;
pub use config::Configuration;
pub use document::{AgentHeader, DataItem, DeviceStream, DocumentParser, ParsedDocument, UrlBuilder};
pub use error::{ConnectionFailure, Failure};
pub use events::Event;
pub use http::HttpExecutor;
pub use sequence::SequenceRange;
pub use session::{Session, SessionHandle};
