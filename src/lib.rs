use wasm_bindgen::prelude::*;

use crate::domain::logging::LogComponent;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

/// Wire the browser logger and clock before any chart is created
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();

    domain::logging::init_logger(Box::new(infrastructure::services::ConsoleLogger::new_development()));
    domain::logging::init_time_provider(Box::new(infrastructure::services::BrowserTimeProvider::new()));

    log_info!(LogComponent::Presentation("Initialize"), "price chart bridge initialized");
}
