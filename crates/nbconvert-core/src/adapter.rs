//! Async front for an [`ExporterRegistry`].
//!
//! Registry calls can touch the filesystem, so every call runs on tokio's
//! blocking pool. Resolution is additionally serialized by a single lock
//! shared by every clone of the adapter: at most one `resolve` is in flight
//! against the registry at any time, across all requests.
//!
//! The lock guard is moved into the blocking task and released only when
//! the registry call returns. Dropping the awaiting future does not release
//! it early.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::ExporterRegistry;
use crate::types::ExporterDescriptor;

/// Runs registry calls off the async runtime.
#[derive(Clone)]
pub struct RegistryAdapter {
    registry: Arc<dyn ExporterRegistry>,
    resolve_lock: Arc<Mutex<()>>,
}

impl RegistryAdapter {
    pub fn new(registry: Arc<dyn ExporterRegistry>) -> Self {
        Self {
            registry,
            resolve_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Probe whether the registry can be loaded.
    pub async fn check_available(&self) -> RegistryResult<()> {
        let registry = Arc::clone(&self.registry);
        run_blocking(move || registry.check_available()).await
    }

    /// List all registered exporter names. Not serialized.
    pub async fn list_names(&self) -> RegistryResult<Vec<String>> {
        let registry = Arc::clone(&self.registry);
        run_blocking(move || registry.list_names()).await
    }

    /// Resolve one exporter while holding the resolution lock.
    pub async fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
        let guard = Arc::clone(&self.resolve_lock).lock_owned().await;
        let registry = Arc::clone(&self.registry);
        let name = name.to_string();
        run_blocking(move || {
            let _guard = guard;
            registry.resolve(&name)
        })
        .await
    }
}

impl std::fmt::Debug for RegistryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAdapter").finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(f: F) -> RegistryResult<T>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| RegistryError::Worker(e.to_string()))?
}
