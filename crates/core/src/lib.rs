pub mod logging;
pub mod metrics;

pub mod prelude {
	pub use tracing::{debug, error, info, trace, warn};
}
