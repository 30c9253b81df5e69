use super::{
    backfill::{BackfillController, should_fetch_history},
    config::ChartConfig,
    protocol::SurfaceEvent,
    render_bridge::{BridgeSignal, CommandSink, RenderBridge},
};
use crate::domain::{
    chart::{ChartType, Overlay, OverlayManager},
    errors::ChartError,
    logging::LogComponent,
    market_data::{CandleSeries, IndicatorEngine, IndicatorSet, IndicatorSpec, PollResult, RawCandle},
};
use crate::{log_debug, log_info, log_warn};
use serde::Serialize;

const COMPONENT: LogComponent = LogComponent::Application("ChartController");

/// What the host should display around the chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum ChartStatus {
    /// Surface not ready yet
    Loading,
    NoData,
    Live { candles: usize },
    /// Terminal surface error, verbatim
    Failed(String),
}

/// Host-side owner of chart state. Every mutation re-derives the desired
/// surface state and hands it to the bridge, which sends only what changed.
pub struct ChartController<S: CommandSink> {
    config: ChartConfig,
    series: CandleSeries,
    indicators: IndicatorSet,
    overlays: OverlayManager,
    chart_type: ChartType,
    show_volume: bool,
    last_price: Option<f64>,
    bridge: RenderBridge<S>,
    backfill: BackfillController,
    clock_ms: u64,
}

impl<S: CommandSink> ChartController<S> {
    pub fn new(sink: S, config: ChartConfig) -> Self {
        let bridge = RenderBridge::new(sink, config.redelivery.clone());
        let backfill = BackfillController::new(config.backfill_cooldown_ms);
        Self {
            config,
            series: CandleSeries::new(),
            indicators: IndicatorSet::new(),
            overlays: OverlayManager::new(),
            chart_type: ChartType::default(),
            show_volume: true,
            last_price: None,
            bridge,
            backfill,
            clock_ms: 0,
        }
    }

    pub fn surface_created(&mut self, now_ms: u64) {
        self.bridge.surface_created();
        self.sync(now_ms);
    }

    /// Throw away the current surface session and start a fresh handshake
    /// on `sink`. Chart state and the backfill hook survive.
    pub fn recreate_surface(&mut self, sink: S, now_ms: u64) {
        self.bridge.teardown();
        self.bridge = RenderBridge::new(sink, self.config.redelivery.clone());
        log_info!(COMPONENT, "surface recreated");
        self.surface_created(now_ms);
    }

    /// Apply one market-data poll: the candle window is replaced wholesale
    pub fn apply_poll(&mut self, poll: PollResult, now_ms: u64) {
        let skipped = self.series.replace_raw(&poll.candles);
        if skipped > 0 {
            log_warn!(COMPONENT, "skipped {} malformed candle rows", skipped);
        }
        if let Some(price) = poll.last_price.filter(|p| p.is_finite()) {
            self.last_price = Some(price);
        }
        log_debug!(COMPONENT, "poll applied, {} candles", self.series.len());
        self.sync(now_ms);
    }

    /// Splice an older history page in front of the loaded window
    pub fn merge_history(&mut self, rows: &[RawCandle], now_ms: u64) {
        let older: Vec<_> = rows.iter().filter_map(RawCandle::to_candle).collect();
        if older.len() < rows.len() {
            log_warn!(COMPONENT, "skipped {} malformed history rows", rows.len() - older.len());
        }
        self.series.merge_older(older);
        self.sync(now_ms);
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
        self.sync(self.clock_ms);
    }

    pub fn set_show_volume(&mut self, visible: bool) {
        self.show_volume = visible;
        self.sync(self.clock_ms);
    }

    /// Returns false when the same (kind, period) was already active
    pub fn add_indicator(&mut self, spec: IndicatorSpec) -> bool {
        let added = self.indicators.insert(spec);
        self.sync(self.clock_ms);
        added
    }

    pub fn remove_indicator(&mut self, spec: &IndicatorSpec) -> bool {
        let removed = self.indicators.remove(spec);
        self.sync(self.clock_ms);
        removed
    }

    pub fn set_indicators<I: IntoIterator<Item = IndicatorSpec>>(&mut self, specs: I) {
        self.indicators.replace(specs);
        self.sync(self.clock_ms);
    }

    pub fn upsert_overlay(&mut self, overlay: impl Into<Overlay>) {
        self.overlays.upsert(overlay);
        self.sync(self.clock_ms);
    }

    pub fn remove_overlay(&mut self, id: &str) -> bool {
        let removed = self.overlays.remove(id);
        self.sync(self.clock_ms);
        removed
    }

    pub fn handle_surface_event(&mut self, event: SurfaceEvent, now_ms: u64) -> BridgeSignal {
        self.clock_ms = self.clock_ms.max(now_ms);
        let signal = self.bridge.handle_event(event);
        match &signal {
            BridgeSignal::BecameReady => self.sync(now_ms),
            BridgeSignal::NearEdge => {
                self.backfill.signal(now_ms);
            }
            BridgeSignal::Failed(_) | BridgeSignal::Ignored => {}
        }
        signal
    }

    /// Hosts that track the viewport themselves report its first visible
    /// index here. Within `edge_threshold` of the loaded start it goes
    /// through the same throttle as a surface near-edge signal. Returns
    /// whether the hook fired.
    pub fn report_first_visible_index(&mut self, index: usize, now_ms: u64) -> bool {
        self.clock_ms = self.clock_ms.max(now_ms);
        if !should_fetch_history(index, self.config.edge_threshold) {
            return false;
        }
        self.backfill.signal(now_ms)
    }

    /// Decode and handle a raw surface message
    pub fn handle_surface_message(&mut self, json: &str, now_ms: u64) -> Result<BridgeSignal, ChartError> {
        let event = SurfaceEvent::from_json(json).inspect_err(|e| {
            log_warn!(COMPONENT, "unreadable surface message: {}", e);
        })?;
        Ok(self.handle_surface_event(event, now_ms))
    }

    /// Drive the redelivery schedule
    pub fn tick(&mut self, now_ms: u64) -> usize {
        self.clock_ms = self.clock_ms.max(now_ms);
        self.bridge.tick(now_ms)
    }

    pub fn on_backfill_requested<F>(&mut self, hook: F)
    where
        F: FnMut() + 'static,
    {
        self.backfill.on_backfill_requested(hook);
    }

    pub fn status(&self) -> ChartStatus {
        if let Some(message) = self.bridge.failure() {
            return ChartStatus::Failed(message.to_string());
        }
        if !self.bridge.is_ready() {
            return ChartStatus::Loading;
        }
        if self.series.is_empty() {
            ChartStatus::NoData
        } else {
            ChartStatus::Live { candles: self.series.len() }
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn show_volume(&self) -> bool {
        self.show_volume
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn bridge(&self) -> &RenderBridge<S> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut RenderBridge<S> {
        &mut self.bridge
    }

    pub fn backfill(&self) -> &BackfillController {
        &self.backfill
    }

    /// Push the current desired state. Non-candle commands only go out once
    /// the surface is ready; until then they are simply re-derived next time.
    fn sync(&mut self, now_ms: u64) {
        self.clock_ms = self.clock_ms.max(now_ms);
        self.bridge.push_candles(&self.series, now_ms);
        if !self.bridge.is_ready() {
            return;
        }
        self.bridge.push_chart_type(self.chart_type);
        self.bridge.push_show_volume(self.show_volume);
        self.bridge.push_indicators(IndicatorEngine::compute_all(&self.series, &self.indicators));
        let delta = self.overlays.delta_against(&self.bridge.cache().last_overlay_ids);
        self.bridge.push_overlay_delta(delta);
        self.overlays.mark_delivered();
    }
}
