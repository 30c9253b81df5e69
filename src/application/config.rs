use crate::domain::chart::DEFAULT_OVERLAY_COLOR;
use crate::domain::errors::ChartError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REDELIVERY_DELAYS_MS: [u64; 3] = [100, 500, 1_500];
pub const DEFAULT_BACKFILL_COOLDOWN_MS: u64 = 2_000;
pub const DEFAULT_EDGE_THRESHOLD: usize = 5;
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 200;

/// Minimum number of re-issues after the initial candle push
pub const MIN_REDELIVERIES: usize = 3;

/// Fixed backoff for re-issuing the first candle payload after a change.
/// Delays are measured from the initial push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeliveryPolicy {
    pub delays_ms: Vec<u64>,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self { delays_ms: DEFAULT_REDELIVERY_DELAYS_MS.to_vec() }
    }
}

impl RedeliveryPolicy {
    pub fn new(delays_ms: Vec<u64>) -> Result<Self, ChartError> {
        let policy = Self { delays_ms };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.delays_ms.len() < MIN_REDELIVERIES {
            return Err(ChartError::Configuration(format!(
                "redelivery schedule needs at least {} delays, got {}",
                MIN_REDELIVERIES,
                self.delays_ms.len()
            )));
        }
        if self.delays_ms.windows(2).any(|w| w[0] > w[1]) {
            return Err(ChartError::Configuration(
                "redelivery delays must be non-decreasing".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute due times for a push made at `now_ms`
    pub fn schedule_from(&self, now_ms: u64) -> Vec<u64> {
        self.delays_ms.iter().map(|d| now_ms.saturating_add(*d)).collect()
    }
}

/// Tunables of the chart core. None of these are user-facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartConfig {
    pub poll_interval_ms: u64,
    pub redelivery: RedeliveryPolicy,
    pub backfill_cooldown_ms: u64,
    pub edge_threshold: usize,
    pub history_page_size: usize,
    pub default_overlay_color: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            redelivery: RedeliveryPolicy::default(),
            backfill_cooldown_ms: DEFAULT_BACKFILL_COOLDOWN_MS,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            default_overlay_color: DEFAULT_OVERLAY_COLOR.to_string(),
        }
    }
}

impl ChartConfig {
    /// Parse a partial JSON object; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ChartError::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.poll_interval_ms == 0 {
            return Err(ChartError::Configuration("poll interval must be positive".to_string()));
        }
        if self.history_page_size == 0 {
            return Err(ChartError::Configuration("history page size must be positive".to_string()));
        }
        self.redelivery.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ChartConfig::from_json(r#"{"backfillCooldownMs": 750}"#).unwrap();
        assert_eq!(config.backfill_cooldown_ms, 750);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.redelivery, RedeliveryPolicy::default());
    }

    #[test]
    fn short_schedule_is_rejected() {
        let err = ChartConfig::from_json(r#"{"redelivery": {"delaysMs": [100, 200]}}"#);
        assert!(matches!(err, Err(ChartError::Configuration(_))));
        assert!(RedeliveryPolicy::new(vec![500, 100, 900]).is_err());
    }

    #[test]
    fn schedule_is_relative_to_push() {
        assert_eq!(RedeliveryPolicy::default().schedule_from(1_000), vec![1_100, 1_500, 2_500]);
    }
}
