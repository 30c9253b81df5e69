use crate::application::{ChartConfig, ChartController, CommandSink, SurfaceCommand};
use crate::domain::{
    chart::{ChartPoint, ChartType, PriceLineOverlay, TrendLineOverlay},
    errors::ChartError,
    logging::{LogComponent, get_time_provider},
    market_data::{
        IndicatorKind, IndicatorSpec, MarketDataSource, PollResult, RawCandle, Timestamp,
    },
};
use crate::infrastructure::PollingTasks;
use crate::{log_error, log_warn};
use js_sys::{Function, Promise};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

const COMPONENT: LogComponent = LogComponent::Presentation("ChartBridgeApi");

impl From<ChartError> for JsValue {
    fn from(error: ChartError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

fn js_error(context: &str, value: JsValue) -> ChartError {
    ChartError::Source(format!("{}: {}", context, value.as_string().unwrap_or_else(|| format!("{:?}", value))))
}

/// Posts each command to the surface as a JSON string
pub struct JsCommandSink {
    post: Function,
}

impl JsCommandSink {
    pub fn new(post: Function) -> Self {
        Self { post }
    }
}

impl CommandSink for JsCommandSink {
    fn send(&mut self, command: SurfaceCommand) {
        match command.to_json() {
            Ok(json) => {
                if let Err(e) = self.post.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    log_warn!(COMPONENT, "posting {} failed: {:?}", command.name(), e);
                }
            }
            Err(e) => log_error!(COMPONENT, "{}", e),
        }
    }
}

/// Market data collaborator backed by two JS functions returning promises
pub struct JsMarketDataSource {
    poll: Function,
    fetch_older: Function,
}

impl JsMarketDataSource {
    pub fn new(poll: Function, fetch_older: Function) -> Self {
        Self { poll, fetch_older }
    }

    async fn resolve_json(promise: JsValue, context: &str) -> Result<String, ChartError> {
        let value = JsFuture::from(Promise::from(promise)).await.map_err(|e| js_error(context, e))?;
        let json = js_sys::JSON::stringify(&value).map_err(|e| js_error(context, e))?;
        Ok(String::from(json))
    }
}

impl MarketDataSource for JsMarketDataSource {
    async fn poll(&self) -> Result<PollResult, ChartError> {
        let promise = self.poll.call0(&JsValue::NULL).map_err(|e| js_error("poll", e))?;
        PollResult::from_json(&Self::resolve_json(promise, "poll").await?)
    }

    async fn fetch_older(&self, before: Timestamp, limit: usize) -> Result<Vec<RawCandle>, ChartError> {
        let promise = self
            .fetch_older
            .call2(&JsValue::NULL, &JsValue::from_f64(before.value() as f64), &JsValue::from_f64(limit as f64))
            .map_err(|e| js_error("fetchOlder", e))?;
        let json = Self::resolve_json(promise, "fetchOlder").await?;
        serde_json::from_str(&json).map_err(|e| ChartError::MalformedPayload(format!("history page: {}", e)))
    }
}

fn now() -> u64 {
    get_time_provider().now_ms()
}

/// JavaScript facade over one chart instance and its surface session
#[wasm_bindgen]
pub struct ChartBridgeApi {
    controller: Rc<RefCell<ChartController<JsCommandSink>>>,
    tasks: PollingTasks,
}

impl ChartBridgeApi {
    fn with_controller<R>(
        &self,
        f: impl FnOnce(&mut ChartController<JsCommandSink>) -> R,
    ) -> Result<R, JsValue> {
        let mut controller = self
            .controller
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("chart controller is busy"))?;
        Ok(f(&mut controller))
    }

    fn default_color(&self) -> Option<String> {
        self.controller.try_borrow().ok().map(|c| c.config().default_overlay_color.clone())
    }
}

#[wasm_bindgen]
impl ChartBridgeApi {
    /// `postCommand(json)` delivers one command to the render surface.
    /// `configJson` may override any tunable.
    #[wasm_bindgen(constructor)]
    pub fn new(post_command: Function, config_json: Option<String>) -> Result<ChartBridgeApi, JsValue> {
        let config = match config_json {
            Some(json) => ChartConfig::from_json(&json)?,
            None => ChartConfig::default(),
        };
        let controller = ChartController::new(JsCommandSink::new(post_command), config);
        Ok(Self {
            controller: Rc::new(RefCell::new(controller)),
            tasks: PollingTasks::new(),
        })
    }

    #[wasm_bindgen(js_name = surfaceCreated)]
    pub fn surface_created(&self) -> Result<(), JsValue> {
        self.with_controller(|c| c.surface_created(now()))
    }

    #[wasm_bindgen(js_name = recreateSurface)]
    pub fn recreate_surface(&self, post_command: Function) -> Result<(), JsValue> {
        self.with_controller(|c| c.recreate_surface(JsCommandSink::new(post_command), now()))
    }

    /// Feed one `{"type": ...}` message emitted by the surface
    #[wasm_bindgen(js_name = handleSurfaceMessage)]
    pub fn handle_surface_message(&self, json: &str) -> Result<(), JsValue> {
        self.with_controller(|c| c.handle_surface_message(json, now()))??;
        Ok(())
    }

    #[wasm_bindgen(js_name = applyPoll)]
    pub fn apply_poll(&self, json: &str) -> Result<(), JsValue> {
        let poll = PollResult::from_json(json)?;
        self.with_controller(|c| c.apply_poll(poll, now()))
    }

    #[wasm_bindgen(js_name = mergeHistory)]
    pub fn merge_history(&self, json: &str) -> Result<(), JsValue> {
        let rows: Vec<RawCandle> = serde_json::from_str(json)
            .map_err(|e| ChartError::MalformedPayload(format!("history page: {}", e)))?;
        self.with_controller(|c| c.merge_history(&rows, now()))
    }

    #[wasm_bindgen(js_name = setChartType)]
    pub fn set_chart_type(&self, chart_type: &str) -> Result<(), JsValue> {
        let chart_type: ChartType = chart_type
            .parse()
            .map_err(|_| ChartError::Configuration(format!("unknown chart type {}", chart_type)))?;
        self.with_controller(|c| c.set_chart_type(chart_type))
    }

    #[wasm_bindgen(js_name = setShowVolume)]
    pub fn set_show_volume(&self, visible: bool) -> Result<(), JsValue> {
        self.with_controller(|c| c.set_show_volume(visible))
    }

    #[wasm_bindgen(js_name = addIndicator)]
    pub fn add_indicator(&self, kind: &str, period: i32) -> Result<bool, JsValue> {
        let spec = parse_indicator(kind, period)?;
        self.with_controller(|c| c.add_indicator(spec))
    }

    #[wasm_bindgen(js_name = removeIndicator)]
    pub fn remove_indicator(&self, kind: &str, period: i32) -> Result<bool, JsValue> {
        let spec = parse_indicator(kind, period)?;
        self.with_controller(|c| c.remove_indicator(&spec))
    }

    #[wasm_bindgen(js_name = addPriceLine)]
    pub fn add_price_line(&self, id: String, price: f64, color: Option<String>) -> Result<(), JsValue> {
        let color = color.or_else(|| self.default_color());
        let line = PriceLineOverlay::new(id, price, color)?;
        self.with_controller(|c| c.upsert_overlay(line))
    }

    #[wasm_bindgen(js_name = addTrendLine)]
    pub fn add_trend_line(
        &self,
        id: String,
        time1: f64,
        price1: f64,
        time2: f64,
        price2: f64,
        color: Option<String>,
    ) -> Result<(), JsValue> {
        let anchor = |time: f64, price: f64| {
            ChartPoint::new(Timestamp::from_raw(time.floor() as i64).value(), price)
        };
        let color = color.or_else(|| self.default_color());
        let line = TrendLineOverlay::new(id, anchor(time1, price1), anchor(time2, price2), color)?;
        self.with_controller(|c| c.upsert_overlay(line))
    }

    #[wasm_bindgen(js_name = removeOverlay)]
    pub fn remove_overlay(&self, id: &str) -> Result<bool, JsValue> {
        self.with_controller(|c| c.remove_overlay(id))
    }

    /// Advance the redelivery schedule; returns how many payloads went out
    pub fn tick(&self) -> Result<u32, JsValue> {
        self.with_controller(|c| c.tick(now()) as u32)
    }

    /// Report the first index the surface currently shows. Near the start
    /// of loaded data this counts as a backfill signal.
    #[wasm_bindgen(js_name = reportFirstVisibleIndex)]
    pub fn report_first_visible_index(&self, index: u32) -> Result<bool, JsValue> {
        self.with_controller(|c| c.report_first_visible_index(index as usize, now()))
    }

    /// `callback()` runs on a later microtask, so it may call back into
    /// this object.
    #[wasm_bindgen(js_name = onBackfillRequested)]
    pub fn on_backfill_requested(&self, callback: Function) -> Result<(), JsValue> {
        self.with_controller(|c| {
            c.on_backfill_requested(move || {
                let callback = callback.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = callback.call0(&JsValue::NULL) {
                        log_warn!(COMPONENT, "backfill callback threw: {:?}", e);
                    }
                });
            })
        })
    }

    /// Abort the loops started by `startPolling`. Host-driven calls keep
    /// working.
    #[wasm_bindgen(js_name = stopPolling)]
    pub fn stop_polling(&mut self) {
        self.tasks.stop();
    }

    #[wasm_bindgen(js_name = isPolling)]
    pub fn is_polling(&self) -> bool {
        self.tasks.is_running()
    }

    /// JSON such as `{"status":"live","detail":{"candles":200}}`
    pub fn status(&self) -> Result<String, JsValue> {
        let status = self.controller.try_borrow().map_err(|_| JsValue::from_str("chart controller is busy"))?.status();
        serde_json::to_string(&status).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = lastPrice)]
    pub fn last_price(&self) -> Option<f64> {
        self.controller.try_borrow().ok().and_then(|c| c.last_price())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl ChartBridgeApi {
    /// Hand polling, history paging and redelivery timing to this module.
    /// `poll()` resolves to `{candles, lastPrice}`, `fetchOlder(before,
    /// limit)` to an array of rows. Replaces any hook set with
    /// `onBackfillRequested` and any loops from an earlier call. Freeing
    /// the object stops them too.
    #[wasm_bindgen(js_name = startPolling)]
    pub fn start_polling(&mut self, poll: Function, fetch_older: Function, tick_ms: u32) {
        let source = Rc::new(JsMarketDataSource::new(poll, fetch_older));
        crate::infrastructure::polling::start_polling(&mut self.tasks, source, self.controller.clone(), tick_ms);
    }
}

fn parse_indicator(kind: &str, period: i32) -> Result<IndicatorSpec, ChartError> {
    let kind: IndicatorKind = kind
        .parse()
        .map_err(|_| ChartError::InvalidIndicator(format!("unknown indicator kind {}", kind)))?;
    IndicatorSpec::new(kind, period as i64)
}
