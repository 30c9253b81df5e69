pub use super::value_objects::{Price, Timestamp, Volume};
use serde::{Deserialize, Serialize};

/// Domain entity - Candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
}

impl Candle {
    pub fn new(
        time: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Option<Volume>,
    ) -> Self {
        Self { time, open, high, low, close, volume }
    }

    /// OHLC all finite. High/low ordering is upstream's responsibility.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

/// One positional kline row as the market-data collaborator delivers it:
/// `[time, open, high, low, close, volume]`.
///
/// Numbers may arrive as JSON numbers or numeric strings and the time unit
/// may be seconds or milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RawCandleRow")]
pub struct RawCandle {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl RawCandle {
    pub fn new(time: f64, open: f64, high: f64, low: f64, close: f64, volume: Option<f64>) -> Self {
        Self { time, open, high, low, close, volume }
    }

    /// Normalized candle, or `None` when the row cannot be drawn
    pub fn to_candle(&self) -> Option<Candle> {
        if !self.time.is_finite() {
            return None;
        }
        let candle = Candle::new(
            Timestamp::from_raw(self.time.floor() as i64),
            Price::from(self.open),
            Price::from(self.high),
            Price::from(self.low),
            Price::from(self.close),
            self.volume.filter(|v| v.is_finite()).map(Volume::from),
        );
        candle.is_finite().then_some(candle)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
    Null(()),
}

impl Numeric {
    fn as_f64(&self) -> f64 {
        match self {
            Numeric::Number(v) => *v,
            Numeric::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Numeric::Null(()) => f64::NAN,
        }
    }
}

#[derive(Deserialize)]
struct RawCandleRow(
    Numeric,
    Numeric,
    Numeric,
    Numeric,
    Numeric,
    #[serde(default)] Option<Numeric>,
);

impl From<RawCandleRow> for RawCandle {
    fn from(row: RawCandleRow) -> Self {
        Self {
            time: row.0.as_f64(),
            open: row.1.as_f64(),
            high: row.2.as_f64(),
            low: row.3.as_f64(),
            close: row.4.as_f64(),
            volume: row.5.map(|v| v.as_f64()).filter(|v| v.is_finite()),
        }
    }
}

/// Domain entity - time-ordered candle store.
///
/// Times are strictly ascending and unique. Every update replaces the whole
/// window, nothing is patched in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by time and keep the last occurrence of each timestamp
    pub fn replace<I>(&mut self, candles: I)
    where
        I: IntoIterator<Item = Candle>,
    {
        let mut incoming: Vec<Candle> = candles.into_iter().collect();
        // Stable sort keeps arrival order within equal times
        incoming.sort_by_key(|c| c.time);

        let mut ordered: Vec<Candle> = Vec::with_capacity(incoming.len());
        for candle in incoming {
            match ordered.last_mut() {
                Some(last) if last.time == candle.time => *last = candle,
                _ => ordered.push(candle),
            }
        }
        self.candles = ordered;
    }

    /// Replace from raw rows; malformed rows are skipped. Returns how many
    /// were skipped.
    pub fn replace_raw(&mut self, rows: &[RawCandle]) -> usize {
        let candles: Vec<Candle> = rows.iter().filter_map(RawCandle::to_candle).collect();
        let skipped = rows.len() - candles.len();
        self.replace(candles);
        skipped
    }

    /// Splice an older history page in front of the current window.
    /// On timestamp collisions the current candle wins.
    pub fn merge_older<I>(&mut self, older: I)
    where
        I: IntoIterator<Item = Candle>,
    {
        let current = std::mem::take(&mut self.candles);
        self.replace(older.into_iter().chain(current));
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn earliest(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.candles.iter().map(|c| c.close.value())
    }

    /// Lowest low and highest high over the window
    pub fn price_range(&self) -> Option<(Price, Price)> {
        let first = self.candles.first()?;
        let init = (first.low, first.high);
        Some(self.candles.iter().fold(init, |(min, max), c| {
            (if c.low < min { c.low } else { min }, if c.high > max { c.high } else { max })
        }))
    }
}

impl FromIterator<Candle> for CandleSeries {
    fn from_iter<T: IntoIterator<Item = Candle>>(iter: T) -> Self {
        let mut series = Self::new();
        series.replace(iter);
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_row_accepts_strings_and_missing_volume() {
        let row: RawCandle =
            serde_json::from_str(r#"[1700000000000, "1.5", "2", "1", "1.75"]"#).unwrap();
        let candle = row.to_candle().unwrap();
        assert_eq!(candle.time.value(), 1_700_000_000);
        assert_eq!(candle.close.value(), 1.75);
        assert_eq!(candle.volume, None);
    }

    #[test]
    fn non_finite_row_is_rejected() {
        let row: RawCandle = serde_json::from_str(r#"[60, "abc", 2, 1, 1, 3]"#).unwrap();
        assert!(row.to_candle().is_none());
    }
}
