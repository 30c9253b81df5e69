use super::{CandleSeries, Timestamp};
use crate::domain::errors::ChartError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

/// Moving-average flavour
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    StrumDisplay,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum IndicatorKind {
    #[strum(to_string = "ma", serialize = "sma")]
    #[serde(rename = "ma")]
    MovingAverage,
    #[strum(to_string = "ema")]
    #[serde(rename = "ema")]
    ExponentialMovingAverage,
}

/// Identity of an overlay indicator. `(kind, period)` is the uniqueness key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IndicatorSpec {
    kind: IndicatorKind,
    period: usize,
}

impl IndicatorSpec {
    /// Rejects periods below one
    pub fn new(kind: IndicatorKind, period: i64) -> Result<Self, ChartError> {
        if period < 1 {
            return Err(ChartError::InvalidIndicator(format!(
                "{} period must be at least 1, got {}",
                kind, period
            )));
        }
        let period = usize::try_from(period)
            .map_err(|_| ChartError::InvalidIndicator(format!("period {} out of range", period)))?;
        Ok(Self { kind, period })
    }

    pub fn ma(period: i64) -> Result<Self, ChartError> {
        Self::new(IndicatorKind::MovingAverage, period)
    }

    pub fn ema(period: i64) -> Result<Self, ChartError> {
        Self::new(IndicatorKind::ExponentialMovingAverage, period)
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Stable string key, e.g. `ema:12`
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.period)
    }
}

/// Active indicator set, no duplicate `(kind, period)` keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSet {
    specs: BTreeSet<IndicatorSpec>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the key was already active
    pub fn insert(&mut self, spec: IndicatorSpec) -> bool {
        self.specs.insert(spec)
    }

    pub fn remove(&mut self, spec: &IndicatorSpec) -> bool {
        self.specs.remove(spec)
    }

    pub fn replace<I: IntoIterator<Item = IndicatorSpec>>(&mut self, specs: I) {
        self.specs = specs.into_iter().collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorSpec> {
        self.specs.iter()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.specs.iter().map(IndicatorSpec::key).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<IndicatorSpec> for IndicatorSet {
    fn from_iter<T: IntoIterator<Item = IndicatorSpec>>(iter: T) -> Self {
        Self { specs: iter.into_iter().collect() }
    }
}

/// One indicator sample; `value` is `None` during warm-up
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub time: Timestamp,
    pub value: Option<f64>,
}

/// Indicator values parallel to the candle series they were computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub key: String,
    #[serde(flatten)]
    pub spec: IndicatorSpec,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Trailing arithmetic mean of closes over `period` points.
///
/// Index `i < period - 1` is `None`. A period longer than the series yields
/// a series that is all warm-up. Each window is summed on its own; a running
/// sum would carry the rounding error of large closes into later windows.
pub fn moving_average(series: &CandleSeries, period: usize) -> Vec<IndicatorPoint> {
    let candles = series.candles();
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let value = (period > 0 && i + 1 >= period).then(|| {
                let window = &candles[i + 1 - period..=i];
                window.iter().map(|c| c.close.value()).sum::<f64>() / period as f64
            });
            IndicatorPoint { time: candle.time, value }
        })
        .collect()
}

/// Exponential moving average with `k = 2 / (period + 1)`.
///
/// The first defined value, at index `period - 1`, is the simple average of
/// the first `period` closes. Later values follow
/// `close * k + previous * (1 - k)`.
pub fn exponential_moving_average(series: &CandleSeries, period: usize) -> Vec<IndicatorPoint> {
    let candles = series.candles();
    let mut out = Vec::with_capacity(candles.len());
    let k = 2.0 / (period as f64 + 1.0);

    let mut seed_sum = 0.0;
    let mut previous: Option<f64> = None;
    for (i, candle) in candles.iter().enumerate() {
        let close = candle.close.value();
        let value = match previous {
            Some(prev) => Some(close * k + prev * (1.0 - k)),
            None if period > 0 => {
                seed_sum += close;
                (i + 1 == period).then(|| seed_sum / period as f64)
            }
            None => None,
        };
        previous = value.or(previous);
        out.push(IndicatorPoint { time: candle.time, value });
    }
    out
}

/// Stateless front for recomputing every active indicator from scratch
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn compute(series: &CandleSeries, spec: IndicatorSpec) -> IndicatorSeries {
        let points = match spec.kind {
            IndicatorKind::MovingAverage => moving_average(series, spec.period),
            IndicatorKind::ExponentialMovingAverage => {
                exponential_moving_average(series, spec.period)
            }
        };
        IndicatorSeries { key: spec.key(), spec, points }
    }

    pub fn compute_all(series: &CandleSeries, set: &IndicatorSet) -> Vec<IndicatorSeries> {
        set.iter().map(|spec| Self::compute(series, *spec)).collect()
    }
}
