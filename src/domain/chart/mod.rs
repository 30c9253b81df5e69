//! Chart aggregate: presentation settings and overlays.

pub mod overlays;
pub mod value_objects;

pub use overlays::*;
pub use value_objects::*;
