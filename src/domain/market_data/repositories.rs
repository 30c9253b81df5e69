use super::{RawCandle, Timestamp};
use crate::domain::errors::ChartError;
use serde::Deserialize;

/// One poll of the market-data collaborator
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    #[serde(default)]
    pub candles: Vec<RawCandle>,
    #[serde(default)]
    pub last_price: Option<f64>,
}

impl PollResult {
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        serde_json::from_str(json)
            .map_err(|e| ChartError::MalformedPayload(format!("poll result: {}", e)))
    }
}

/// Market-data collaborator polled on a fixed interval.
///
/// Fetching, transport and authentication live behind this trait.
#[allow(async_fn_in_trait)]
pub trait MarketDataSource {
    /// Current visible window plus the live last price
    async fn poll(&self) -> Result<PollResult, ChartError>;

    /// Up to `limit` candles strictly older than `before`
    async fn fetch_older(&self, before: Timestamp, limit: usize) -> Result<Vec<RawCandle>, ChartError>;
}
