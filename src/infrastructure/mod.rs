//! Adapters: browser services, surface sinks and the market-data pump.

pub mod polling;
pub mod services;
pub mod surface;

pub use polling::{PollingTasks, load_older_history, poll_once};
pub use services::*;
pub use surface::*;
