//! Closed message set crossing the host/surface boundary.
//!
//! Commands flow host -> surface, events flow surface -> host. Both are
//! tagged by `"type"` on the wire.

use crate::domain::{
    chart::{ChartType, Overlay},
    errors::ChartError,
    market_data::{Candle, IndicatorSeries},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceCommand {
    /// Whole-series replacement, safe to deliver any number of times
    SetCandles { candles: Vec<Candle> },
    #[serde(rename_all = "camelCase")]
    SetChartType { chart_type: ChartType },
    SetIndicators { indicators: Vec<IndicatorSeries> },
    SetShowVolume { visible: bool },
    /// Removals first, then additions
    ApplyOverlayDelta { add: Vec<Overlay>, remove: Vec<String> },
}

impl SurfaceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceCommand::SetCandles { .. } => "setCandles",
            SurfaceCommand::SetChartType { .. } => "setChartType",
            SurfaceCommand::SetIndicators { .. } => "setIndicators",
            SurfaceCommand::SetShowVolume { .. } => "setShowVolume",
            SurfaceCommand::ApplyOverlayDelta { .. } => "applyOverlayDelta",
        }
    }

    pub fn to_json(&self) -> Result<String, ChartError> {
        serde_json::to_string(self)
            .map_err(|e| ChartError::MalformedPayload(format!("{}: {}", self.name(), e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceEvent {
    Ready,
    Error { message: String },
    ViewportNearEdge,
}

impl SurfaceEvent {
    /// Unknown event types are an error, not silently dropped
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        serde_json::from_str(json)
            .map_err(|e| ChartError::MalformedPayload(format!("surface event: {}", e)))
    }
}
