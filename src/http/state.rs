use crate::bridge::CaptureBridge;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<CaptureBridge>,
}

impl AppState {
    pub fn new(bridge: Arc<CaptureBridge>) -> Self {
        Self { bridge }
    }
}
