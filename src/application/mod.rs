pub mod backfill;
pub mod chart_controller;
pub mod config;
pub mod protocol;
pub mod render_bridge;

pub use backfill::*;
pub use chart_controller::*;
pub use config::*;
pub use protocol::*;
pub use render_bridge::*;
