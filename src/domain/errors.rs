use std::fmt::{Display, Formatter, Result as FmtResult};

/// Errors raised inside the chart core.
///
/// None of these reach the user directly. Callers recover by keeping the
/// previous state. A surface failure is not an error value; it travels as
/// `ChartStatus::Failed` with the surface's message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    /// Indicator spec rejected at construction
    InvalidIndicator(String),
    /// Overlay rejected at construction
    InvalidOverlay(String),
    /// Payload crossing a boundary could not be decoded
    MalformedPayload(String),
    /// Bad tunables
    Configuration(String),
    /// Market-data collaborator failure
    Source(String),
}

impl Display for ChartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ChartError::InvalidIndicator(msg) => write!(f, "Invalid indicator: {}", msg),
            ChartError::InvalidOverlay(msg) => write!(f, "Invalid overlay: {}", msg),
            ChartError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            ChartError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ChartError::Source(msg) => write!(f, "Market data error: {}", msg),
        }
    }
}

impl std::error::Error for ChartError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_boundary() {
        assert_eq!(
            ChartError::Source("upstream timeout".into()).to_string(),
            "Market data error: upstream timeout"
        );
        assert_eq!(
            ChartError::InvalidIndicator("period 0".into()).to_string(),
            "Invalid indicator: period 0"
        );
    }
}
