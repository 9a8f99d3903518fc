//! Application state for connector service.

use std::sync::Arc;

use common::config::AppConfig;
use crate::connector::ConnectorFactory;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub connectors: Arc<ConnectorFactory>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig) -> Self {
        Self {
            connectors: Arc::new(ConnectorFactory::new(config.connect_timeout())),
            config,
        }
    }
}
