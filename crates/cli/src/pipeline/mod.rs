//! Pipeline composition and run statistics.

mod bootstrap;
mod stats;

pub use bootstrap::{build_dispatcher, load_service_config};
pub use stats::RunStats;
