//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::engine::ComfyEngine;
use crate::poller::Poller;

/// Shared application state passed to every tool call.
pub struct AppState {
    pub config: Config,
    pub engine: Arc<dyn ComfyEngine>,
    pub poller: Poller,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn ComfyEngine>) -> Self {
        let poller = Poller::new(engine.clone(), config.polling.interval());
        Self {
            config,
            engine,
            poller,
        }
    }
}
