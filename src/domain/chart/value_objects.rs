use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Value Object - Chart type
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    #[default]
    #[display(fmt = "Candlestick")]
    #[strum(serialize = "candlestick", serialize = "candles")]
    Candlestick,
    #[display(fmt = "Line")]
    #[strum(serialize = "line")]
    Line,
    #[display(fmt = "Area")]
    #[strum(serialize = "area")]
    Area,
    #[display(fmt = "OHLC")]
    #[strum(serialize = "bar", serialize = "ohlc")]
    Bar,
}

/// Anchor of a trend line in chart coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: i64,
    pub price: f64,
}

impl ChartPoint {
    pub fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_host_names() {
        assert_eq!("Candlestick".parse::<ChartType>().unwrap(), ChartType::Candlestick);
        assert_eq!("ohlc".parse::<ChartType>().unwrap(), ChartType::Bar);
        assert!("renko".parse::<ChartType>().is_err());
    }

    #[test]
    fn every_type_has_a_wire_name() {
        for chart_type in ChartType::iter() {
            let json = serde_json::to_string(&chart_type).unwrap();
            assert!(json.starts_with('"'));
        }
    }
}
