use super::{
    config::RedeliveryPolicy,
    protocol::{SurfaceCommand, SurfaceEvent},
};
use crate::domain::{
    chart::{ChartType, OverlayDelta},
    logging::LogComponent,
    market_data::{Candle, CandleSeries, IndicatorSeries},
};
use crate::{log_debug, log_error, log_info, log_trace, log_warn};
use std::collections::BTreeSet;

const COMPONENT: LogComponent = LogComponent::Application("RenderBridge");

/// One-way channel into the render surface. No acknowledgement exists.
pub trait CommandSink {
    fn send(&mut self, command: SurfaceCommand);
}

/// Records every command; handy for hosts that batch and for tests
impl CommandSink for Vec<SurfaceCommand> {
    fn send(&mut self, command: SurfaceCommand) {
        self.push(command);
    }
}

/// Readiness handshake. There is no way back from `Ready`; a recreated
/// surface gets a fresh bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Uninitialized,
    AwaitingReady,
    Ready,
}

/// What the bridge believes is materialized on the surface. A cache for
/// diffing, never a source of truth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryCache {
    pub last_candles: Option<Vec<Candle>>,
    pub last_chart_type: Option<ChartType>,
    pub last_indicator_keys: BTreeSet<String>,
    pub last_indicators: Option<Vec<IndicatorSeries>>,
    pub last_show_volume: Option<bool>,
    pub last_overlay_ids: BTreeSet<String>,
}

/// Outcome of feeding a surface event to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeSignal {
    /// Desired state must be re-derived and pushed again
    BecameReady,
    /// Terminal, shown verbatim
    Failed(String),
    NearEdge,
    Ignored,
}

/// Readiness state machine plus delivery bookkeeping for one surface session
pub struct RenderBridge<S: CommandSink> {
    sink: S,
    state: ReadinessState,
    failure: Option<String>,
    policy: RedeliveryPolicy,
    cache: DeliveryCache,
    pending_redeliveries: Vec<u64>,
}

impl<S: CommandSink> RenderBridge<S> {
    pub fn new(sink: S, policy: RedeliveryPolicy) -> Self {
        Self {
            sink,
            state: ReadinessState::Uninitialized,
            failure: None,
            policy,
            cache: DeliveryCache::default(),
            pending_redeliveries: Vec::new(),
        }
    }

    /// The surface object exists; its listener may not be attached yet
    pub fn surface_created(&mut self) {
        if self.state == ReadinessState::Uninitialized {
            self.state = ReadinessState::AwaitingReady;
            log_info!(COMPONENT, "surface created, awaiting ready");
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn cache(&self) -> &DeliveryCache {
        &self.cache
    }

    pub fn pending_redeliveries(&self) -> &[u64] {
        &self.pending_redeliveries
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn handle_event(&mut self, event: SurfaceEvent) -> BridgeSignal {
        if self.failure.is_some() {
            log_debug!(COMPONENT, "ignoring {:?} after surface failure", event);
            return BridgeSignal::Ignored;
        }
        match event {
            SurfaceEvent::Ready => {
                if self.state == ReadinessState::Ready {
                    return BridgeSignal::Ignored;
                }
                if self.state == ReadinessState::Uninitialized {
                    log_warn!(COMPONENT, "ready received before surface creation was reported");
                }
                self.state = ReadinessState::Ready;
                // Nothing sent before this point can be trusted to have landed
                self.cache = DeliveryCache::default();
                self.pending_redeliveries.clear();
                log_info!(COMPONENT, "surface ready");
                BridgeSignal::BecameReady
            }
            SurfaceEvent::Error { message } => {
                log_error!(COMPONENT, "surface error: {}", message);
                self.failure = Some(message.clone());
                self.pending_redeliveries.clear();
                BridgeSignal::Failed(message)
            }
            SurfaceEvent::ViewportNearEdge => BridgeSignal::NearEdge,
        }
    }

    /// Full-series replacement. Sent regardless of readiness and re-issued on
    /// the redelivery schedule; an unchanged series sends nothing.
    pub fn push_candles(&mut self, series: &CandleSeries, now_ms: u64) -> bool {
        if self.failure.is_some() || self.state == ReadinessState::Uninitialized {
            return false;
        }
        if self.cache.last_candles.as_deref() == Some(series.candles()) {
            return false;
        }
        let candles = series.candles().to_vec();
        self.sink.send(SurfaceCommand::SetCandles { candles: candles.clone() });
        self.cache.last_candles = Some(candles);
        self.pending_redeliveries = self.policy.schedule_from(now_ms);
        log_debug!(
            COMPONENT,
            "pushed {} candles, {} redeliveries scheduled",
            series.len(),
            self.pending_redeliveries.len()
        );
        true
    }

    /// Re-issue the latest candle payload if a redelivery is due. At most
    /// one scheduled entry is consumed per call, so a slow tick cadence
    /// still gets every re-issue, just later.
    pub fn tick(&mut self, now_ms: u64) -> usize {
        if self.failure.is_some() {
            return 0;
        }
        match self.pending_redeliveries.first() {
            Some(due) if *due <= now_ms => {}
            _ => return 0,
        }
        self.pending_redeliveries.remove(0);
        let Some(candles) = self.cache.last_candles.clone() else {
            self.pending_redeliveries.clear();
            return 0;
        };
        log_trace!(
            COMPONENT,
            "redelivering {} candles, {} left",
            candles.len(),
            self.pending_redeliveries.len()
        );
        self.sink.send(SurfaceCommand::SetCandles { candles });
        1
    }

    pub fn push_chart_type(&mut self, chart_type: ChartType) -> bool {
        if !self.accepts("setChartType") || self.cache.last_chart_type == Some(chart_type) {
            return false;
        }
        self.sink.send(SurfaceCommand::SetChartType { chart_type });
        self.cache.last_chart_type = Some(chart_type);
        true
    }

    pub fn push_indicators(&mut self, indicators: Vec<IndicatorSeries>) -> bool {
        if !self.accepts("setIndicators")
            || self.cache.last_indicators.as_ref() == Some(&indicators)
        {
            return false;
        }
        self.cache.last_indicator_keys = indicators.iter().map(|s| s.key.clone()).collect();
        self.cache.last_indicators = Some(indicators.clone());
        self.sink.send(SurfaceCommand::SetIndicators { indicators });
        true
    }

    pub fn push_show_volume(&mut self, visible: bool) -> bool {
        if !self.accepts("setShowVolume") || self.cache.last_show_volume == Some(visible) {
            return false;
        }
        self.sink.send(SurfaceCommand::SetShowVolume { visible });
        self.cache.last_show_volume = Some(visible);
        true
    }

    pub fn push_overlay_delta(&mut self, delta: OverlayDelta) -> bool {
        if !self.accepts("applyOverlayDelta") || delta.is_empty() {
            return false;
        }
        for id in &delta.to_remove {
            self.cache.last_overlay_ids.remove(id);
        }
        for overlay in &delta.to_add {
            self.cache.last_overlay_ids.insert(overlay.id().to_string());
        }
        self.sink.send(SurfaceCommand::ApplyOverlayDelta {
            add: delta.to_add,
            remove: delta.to_remove,
        });
        true
    }

    /// Drop cached delivery state and pending work before the surface goes away
    pub fn teardown(&mut self) {
        self.pending_redeliveries.clear();
        self.cache = DeliveryCache::default();
        log_info!(COMPONENT, "bridge torn down in state {:?}", self.state);
    }

    fn accepts(&self, command: &str) -> bool {
        if self.failure.is_some() {
            return false;
        }
        if self.state != ReadinessState::Ready {
            log_debug!(COMPONENT, "dropping {} while {:?}", command, self.state);
            return false;
        }
        true
    }
}
