#![cfg(target_arch = "wasm32")]

use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, Reflect};
use price_chart_bridge::presentation::ChartBridgeApi;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn recording_sink(name: &str) -> Function {
    Reflect::set(&js_sys::global(), &JsValue::from_str(name), &Array::new()).unwrap();
    Function::new_with_args("json", &format!("globalThis.{}.push(JSON.parse(json));", name))
}

fn recorded_types(name: &str) -> Vec<String> {
    let commands: Array = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).unwrap().into();
    commands
        .iter()
        .filter_map(|c| Reflect::get(&c, &JsValue::from_str("type")).ok()?.as_string())
        .collect()
}

#[wasm_bindgen_test]
fn commands_reach_the_surface_after_ready() {
    let api = ChartBridgeApi::new(recording_sink("__handshake"), None).unwrap();
    api.set_chart_type("line").unwrap();
    api.surface_created().unwrap();
    assert_eq!(recorded_types("__handshake"), vec!["setCandles"]);

    api.handle_surface_message(r#"{"type":"ready"}"#).unwrap();
    let types = recorded_types("__handshake");
    assert!(types.contains(&"setChartType".to_string()));
    assert_eq!(api.status().unwrap(), r#"{"status":"noData"}"#);
}

#[wasm_bindgen_test]
fn bad_input_is_rejected() {
    let api = ChartBridgeApi::new(recording_sink("__errors"), Some(r#"{"pollIntervalMs": 1000}"#.into())).unwrap();
    assert!(api.add_indicator("rsi", 14).is_err());
    assert!(api.add_indicator("ema", 0).is_err());
    assert!(api.set_chart_type("pie").is_err());
    assert!(api.handle_surface_message(r#"{"type":"unknown"}"#).is_err());
    assert!(ChartBridgeApi::new(recording_sink("__config"), Some("{\"pollIntervalMs\": 0}".into())).is_err());
}

#[wasm_bindgen_test]
fn poll_json_updates_last_price() {
    let api = ChartBridgeApi::new(recording_sink("__poll"), None).unwrap();
    api.apply_poll(r#"{"candles": [[1700000000000, "1", "2", "0.5", "1.5", "10"]], "lastPrice": 1.5}"#)
        .unwrap();
    assert_eq!(api.last_price(), Some(1.5));
}

#[wasm_bindgen_test]
async fn backfill_callback_may_call_back_into_the_api() {
    let api = Rc::new(ChartBridgeApi::new(recording_sink("__reentry"), None).unwrap());
    api.surface_created().unwrap();
    api.handle_surface_message(r#"{"type":"ready"}"#).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let callback = {
        let api = api.clone();
        let seen = seen.clone();
        Closure::wrap(Box::new(move || {
            seen.borrow_mut().push(api.status().is_ok() && api.tick().is_ok());
        }) as Box<dyn FnMut()>)
    };
    api.on_backfill_requested(callback.as_ref().unchecked_ref::<Function>().clone()).unwrap();
    callback.forget();

    api.handle_surface_message(r#"{"type":"viewportNearEdge"}"#).unwrap();
    assert!(seen.borrow().is_empty());
    TimeoutFuture::new(10).await;
    assert_eq!(*seen.borrow(), vec![true]);
}

fn poll_count() -> f64 {
    Reflect::get(&js_sys::global(), &JsValue::from_str("__polls")).unwrap().as_f64().unwrap_or(0.0)
}

#[wasm_bindgen_test]
async fn stop_polling_ends_the_loop() {
    let mut api =
        ChartBridgeApi::new(recording_sink("__polling"), Some(r#"{"pollIntervalMs": 40}"#.into())).unwrap();
    Reflect::set(&js_sys::global(), &JsValue::from_str("__polls"), &JsValue::from_f64(0.0)).unwrap();
    let poll = Function::new_no_args(
        "globalThis.__polls += 1; \
         return Promise.resolve({candles: [[1700000000000, 1, 2, 0.5, 1.5, 10]], lastPrice: 2});",
    );
    let fetch_older = Function::new_no_args("return Promise.resolve([]);");

    api.start_polling(poll.clone(), fetch_older.clone(), 50);
    // A second start replaces the first loop instead of adding one
    api.start_polling(poll, fetch_older, 50);
    assert!(api.is_polling());
    TimeoutFuture::new(10).await;
    assert_eq!(poll_count(), 1.0);
    assert_eq!(api.last_price(), Some(2.0));

    api.stop_polling();
    assert!(!api.is_polling());
    TimeoutFuture::new(120).await;
    assert_eq!(poll_count(), 1.0);
}
