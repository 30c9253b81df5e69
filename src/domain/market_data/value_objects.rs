use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Raw time values at or above this are milliseconds, below it seconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Bring an upstream time value to whole seconds.
///
/// The market-data collaborator mixes units, so every raw time goes through
/// here before it is stored.
pub fn normalize_timestamp(raw: i64) -> i64 {
    if raw >= MILLIS_THRESHOLD { raw.div_euclid(1000) } else { raw }
}

/// Value Object - price
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - traded volume
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(f64);

impl Volume {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Value Object - candle open time in whole seconds since the epoch
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Deref,
    Constructor,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Build from an upstream value whose unit is unknown
    pub fn from_raw(raw: i64) -> Self {
        Self(normalize_timestamp(raw))
    }
}
