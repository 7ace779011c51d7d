//! Exporter capability discovery behind `GET /api/nbconvert`.
//!
//! A request runs: availability probe, cache lookup, discovery
//! (`list_names`), then one resolution per name under the adapter's
//! resolution lock. Names that disappear between listing and resolving are
//! left out of the mapping.

use std::path::Path;
use std::sync::Arc;

use nbconvert_core::{
    BuiltinRegistry, CapabilityMap, ExporterRegistry, LayeredRegistry, ManifestRegistry,
    RegistryAdapter, RegistryError, RegistryResult,
};
use tracing::{debug, info, warn};

use crate::cache::{CachePolicy, CacheStatus, CapabilityCache};

/// Built-in exporters, with plugin manifests layered on top when a plugin
/// directory is configured.
pub fn build_registry(plugin_dir: Option<&Path>) -> Arc<dyn ExporterRegistry> {
    match plugin_dir {
        Some(dir) => Arc::new(
            LayeredRegistry::new()
                .with_layer(BuiltinRegistry::default())
                .with_layer(ManifestRegistry::new(dir)),
        ),
        None => Arc::new(BuiltinRegistry::default()),
    }
}

/// Discovers exporter capabilities and caches them per the configured policy.
#[derive(Debug)]
pub struct CapabilityService {
    adapter: RegistryAdapter,
    cache: CapabilityCache,
}

impl CapabilityService {
    pub fn new(registry: Arc<dyn ExporterRegistry>, policy: CachePolicy) -> Self {
        Self {
            adapter: RegistryAdapter::new(registry),
            cache: CapabilityCache::new(policy),
        }
    }

    /// The current capability mapping.
    ///
    /// Fails with `RegistryError::Unavailable` before touching the cache if
    /// the registry cannot be loaded.
    pub async fn capabilities(&self) -> RegistryResult<Arc<CapabilityMap>> {
        self.adapter.check_available().await?;

        match self.cache.policy() {
            CachePolicy::Disabled => {
                let names = self.adapter.list_names().await?;
                Ok(Arc::new(self.resolve_all(&names).await))
            }
            CachePolicy::ProcessLifetime => {
                let mut slot = self.cache.slot().await;
                if let Some(cached) = slot.lookup(None) {
                    debug!(exporters = cached.len(), "Serving cached capabilities");
                    return Ok(cached);
                }

                let names = self.adapter.list_names().await?;
                let capabilities = Arc::new(self.resolve_all(&names).await);
                slot.populate(names, Arc::clone(&capabilities));
                info!(exporters = capabilities.len(), "Cached exporter capabilities");
                Ok(capabilities)
            }
            CachePolicy::Fingerprint => {
                // Listing runs unlocked; only the compare-and-rebuild holds the slot.
                let names = self.adapter.list_names().await?;
                let mut slot = self.cache.slot().await;
                if let Some(cached) = slot.lookup(Some(names.as_slice())) {
                    debug!(exporters = cached.len(), "Exporter set unchanged, serving cached capabilities");
                    return Ok(cached);
                }

                if slot.is_populated() {
                    info!("Exporter set changed, rebuilding capabilities");
                }
                let capabilities = Arc::new(self.resolve_all(&names).await);
                slot.populate(names, Arc::clone(&capabilities));
                Ok(capabilities)
            }
        }
    }

    /// Resolve each name in discovery order.
    async fn resolve_all(&self, names: &[String]) -> CapabilityMap {
        debug!(count = names.len(), "Resolving exporters");

        let mut capabilities = CapabilityMap::new();
        for name in names {
            match self.adapter.resolve(name).await {
                Ok(descriptor) => {
                    capabilities.insert(&descriptor);
                }
                Err(RegistryError::NotFound(_)) => {
                    debug!(exporter = %name, "Exporter unregistered after listing, skipping");
                }
                Err(e) => {
                    warn!(exporter = %name, error = %e, "Failed to resolve exporter, skipping");
                }
            }
        }
        capabilities
    }

    /// Drop the cached mapping.
    pub async fn invalidate(&self) -> bool {
        let invalidated = self.cache.invalidate().await;
        if invalidated {
            info!("Exporter capability cache invalidated");
        }
        invalidated
    }

    pub async fn cache_status(&self) -> CacheStatus {
        self.cache.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use nbconvert_core::ExporterDescriptor;

    /// Mutable registry that counts calls.
    #[derive(Default)]
    struct FakeRegistry {
        exporters: Mutex<Vec<ExporterDescriptor>>,
        vanished: Mutex<HashSet<String>>,
        unavailable: Mutex<Option<String>>,
        lists: AtomicUsize,
        lists_in_flight: AtomicUsize,
        max_lists_in_flight: AtomicUsize,
        resolves: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        list_delay: Duration,
        delay: Duration,
    }

    impl FakeRegistry {
        fn with(exporters: &[(&str, &str)]) -> Self {
            let registry = Self::default();
            for (name, mimetype) in exporters {
                registry.add(name, mimetype);
            }
            registry
        }

        fn add(&self, name: &str, mimetype: &str) {
            self.exporters
                .lock()
                .unwrap()
                .push(ExporterDescriptor::new(name, mimetype));
        }

        /// Listed, but gone by the time it is resolved.
        fn vanish(&self, name: &str) {
            self.vanished.lock().unwrap().insert(name.to_string());
        }
    }

    impl ExporterRegistry for FakeRegistry {
        fn check_available(&self) -> RegistryResult<()> {
            match self.unavailable.lock().unwrap().clone() {
                Some(cause) => Err(RegistryError::Unavailable(cause)),
                None => Ok(()),
            }
        }

        fn list_names(&self) -> RegistryResult<Vec<String>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            let now = self.lists_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_lists_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.list_delay);
            self.lists_in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(self
                .exporters
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.name.clone())
                .collect())
        }

        fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.resolves.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.vanished.lock().unwrap().contains(name) {
                return Err(RegistryError::NotFound(name.to_string()));
            }
            self.exporters
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.name == name)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))
        }
    }

    fn service(registry: &Arc<FakeRegistry>, policy: CachePolicy) -> CapabilityService {
        CapabilityService::new(registry.clone(), policy)
    }

    #[tokio::test]
    async fn maps_every_resolvable_exporter() {
        let registry = Arc::new(FakeRegistry::with(&[
            ("html", "text/html"),
            ("pdf", "application/pdf"),
            ("script", ""),
        ]));
        let caps = service(&registry, CachePolicy::Disabled)
            .capabilities()
            .await
            .unwrap();

        assert_eq!(caps.names().collect::<Vec<_>>(), vec!["html", "pdf", "script"]);
        assert_eq!(caps.get("pdf").unwrap().output_mimetype, "application/pdf");
        assert_eq!(caps.get("script").unwrap().output_mimetype, "");
    }

    #[tokio::test]
    async fn vanished_exporter_is_omitted() {
        let registry = Arc::new(FakeRegistry::with(&[
            ("html", "text/html"),
            ("docx", "application/msword"),
            ("pdf", "application/pdf"),
        ]));
        registry.vanish("docx");

        let caps = service(&registry, CachePolicy::Disabled)
            .capabilities()
            .await
            .unwrap();

        assert_eq!(caps.len(), 2);
        assert!(!caps.contains("docx"));
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_mapping() {
        let registry = Arc::new(FakeRegistry::default());
        let caps = service(&registry, CachePolicy::ProcessLifetime)
            .capabilities()
            .await
            .unwrap();
        assert!(caps.is_empty());
    }

    #[tokio::test]
    async fn unavailable_registry_fails_before_discovery() {
        let registry = Arc::new(FakeRegistry::with(&[("html", "text/html")]));
        *registry.unavailable.lock().unwrap() = Some("entry points missing".to_string());
        let service = service(&registry, CachePolicy::ProcessLifetime);

        let err = service.capabilities().await.unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable(ref cause) if cause == "entry points missing"));
        assert_eq!(registry.lists.load(Ordering::SeqCst), 0);
        assert!(!service.cache_status().await.populated);
    }

    #[tokio::test]
    async fn process_cache_skips_discovery_on_second_request() {
        let registry = Arc::new(FakeRegistry::with(&[("html", "text/html"), ("pdf", "application/pdf")]));
        let service = service(&registry, CachePolicy::ProcessLifetime);

        let first = service.capabilities().await.unwrap();
        let second = service.capabilities().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.lists.load(Ordering::SeqCst), 1);
        assert_eq!(registry.resolves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn process_cache_ignores_new_plugins_until_invalidated() {
        let registry = Arc::new(FakeRegistry::with(&[("html", "text/html")]));
        let service = service(&registry, CachePolicy::ProcessLifetime);

        assert_eq!(service.capabilities().await.unwrap().len(), 1);
        registry.add("docx", "application/msword");
        assert_eq!(service.capabilities().await.unwrap().len(), 1);

        assert!(service.invalidate().await);
        assert_eq!(service.capabilities().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fingerprint_cache_rebuilds_when_exporter_set_changes() {
        let registry = Arc::new(FakeRegistry::with(&[("html", "text/html")]));
        let service = service(&registry, CachePolicy::Fingerprint);

        service.capabilities().await.unwrap();
        service.capabilities().await.unwrap();
        assert_eq!(registry.lists.load(Ordering::SeqCst), 2);
        assert_eq!(registry.resolves.load(Ordering::SeqCst), 1);

        registry.add("docx", "application/msword");
        let caps = service.capabilities().await.unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(registry.resolves.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn disabled_cache_rebuilds_every_time() {
        let registry = Arc::new(FakeRegistry::with(&[("html", "text/html")]));
        let service = service(&registry, CachePolicy::Disabled);

        service.capabilities().await.unwrap();
        service.capabilities().await.unwrap();

        assert_eq!(registry.lists.load(Ordering::SeqCst), 2);
        assert!(!service.cache_status().await.populated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_requests_build_once() {
        let registry = Arc::new(FakeRegistry {
            delay: Duration::from_millis(5),
            ..FakeRegistry::with(&[("html", "text/html"), ("pdf", "application/pdf")])
        });
        let service = Arc::new(service(&registry, CachePolicy::ProcessLifetime));

        let requests: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.capabilities().await })
            })
            .collect();

        for request in requests {
            assert_eq!(request.await.unwrap().unwrap().len(), 2);
        }
        assert_eq!(registry.lists.load(Ordering::SeqCst), 1);
        assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn uncached_concurrent_requests_never_overlap_resolution() {
        let registry = Arc::new(FakeRegistry {
            delay: Duration::from_millis(3),
            ..FakeRegistry::with(&[("a", "text/a"), ("b", "text/b"), ("c", "text/c")])
        });
        let service = Arc::new(service(&registry, CachePolicy::Disabled));

        let (first, second) = tokio::join!(
            tokio::spawn({
                let service = Arc::clone(&service);
                async move { service.capabilities().await }
            }),
            tokio::spawn({
                let service = Arc::clone(&service);
                async move { service.capabilities().await }
            }),
        );

        assert_eq!(first.unwrap().unwrap().len(), 3);
        assert_eq!(second.unwrap().unwrap().len(), 3);
        assert_eq!(registry.resolves.load(Ordering::SeqCst), 6);
        assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fingerprint_listing_is_not_serialized() {
        let registry = Arc::new(FakeRegistry {
            list_delay: Duration::from_millis(50),
            ..FakeRegistry::with(&[("html", "text/html"), ("pdf", "application/pdf")])
        });
        let service = Arc::new(service(&registry, CachePolicy::Fingerprint));
        service.capabilities().await.unwrap();

        let requests: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.capabilities().await })
            })
            .collect();

        for request in requests {
            assert_eq!(request.await.unwrap().unwrap().len(), 2);
        }
        assert_eq!(registry.lists.load(Ordering::SeqCst), 5);
        assert!(registry.max_lists_in_flight.load(Ordering::SeqCst) > 1);
        assert_eq!(registry.resolves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn build_registry_layers_plugins_over_builtins() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("docx.json"),
            r#"{"name": "docx", "output_mimetype": "application/msword"}"#,
        )
        .unwrap();

        let registry = build_registry(Some(dir.path()));
        let names = registry.list_names().unwrap();
        assert_eq!(names.len(), 13);
        assert_eq!(names.last().map(String::as_str), Some("docx"));

        let builtins_only = build_registry(None);
        assert_eq!(builtins_only.list_names().unwrap().len(), 12);
    }
}
