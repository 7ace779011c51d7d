//! Application state shared across handlers.

use std::sync::Arc;

use nbconvert_core::ExporterRegistry;

use crate::capabilities::{CapabilityService, build_registry};
use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Exporter discovery and the process-wide capability cache.
    capabilities: Arc<CapabilityService>,
}

impl AppState {
    /// Create application state with the registry described by `config`.
    pub fn new(config: ServerConfig) -> Self {
        let registry = build_registry(config.plugin_dir.as_deref());
        Self::with_registry(config, registry)
    }

    /// Create application state around an explicit registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<dyn ExporterRegistry>) -> Self {
        let capabilities = CapabilityService::new(registry, config.cache_policy);
        Self {
            config: Arc::new(config),
            capabilities: Arc::new(capabilities),
        }
    }

    /// Get a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the capability service.
    pub fn capabilities(&self) -> &CapabilityService {
        &self.capabilities
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
