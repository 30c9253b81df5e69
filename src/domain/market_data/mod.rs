//! Market data aggregate: candles, the series store and indicator math.

pub mod entities;
pub mod indicator_engine;
pub mod repositories;
pub mod value_objects;

pub use entities::*;
pub use indicator_engine::*;
pub use repositories::*;
pub use value_objects::*;
