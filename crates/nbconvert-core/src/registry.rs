//! The exporter registry seam.
//!
//! Registries are synchronous: listing and resolving may scan plugin
//! directories or load plugin metadata, so callers on an async runtime go
//! through [`RegistryAdapter`](crate::adapter::RegistryAdapter), which moves
//! the work onto the blocking pool.

use indexmap::IndexSet;

use crate::error::{RegistryError, RegistryResult};
use crate::types::ExporterDescriptor;

/// A source of exporters.
pub trait ExporterRegistry: Send + Sync {
    /// Whether the registry can be loaded at all.
    fn check_available(&self) -> RegistryResult<()> {
        Ok(())
    }

    /// All registered exporter names, in registry-defined order.
    fn list_names(&self) -> RegistryResult<Vec<String>>;

    /// Resolve one name to its descriptor.
    ///
    /// Returns [`RegistryError::NotFound`] if the name is not registered,
    /// including when it was removed after a previous `list_names` call.
    fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor>;
}

/// Stacks registries so later layers override earlier ones.
///
/// Listing yields every layer's names in layer order with duplicates
/// dropped, so an overridden exporter keeps the position of its first
/// occurrence. Resolution asks the layers from last to first and returns the
/// first answer that is not `NotFound`.
pub struct LayeredRegistry {
    layers: Vec<Box<dyn ExporterRegistry>>,
}

impl LayeredRegistry {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Adds a layer on top of the existing ones.
    pub fn with_layer(mut self, layer: impl ExporterRegistry + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl Default for LayeredRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterRegistry for LayeredRegistry {
    fn check_available(&self) -> RegistryResult<()> {
        self.layers
            .iter()
            .try_for_each(|layer| layer.check_available())
    }

    fn list_names(&self) -> RegistryResult<Vec<String>> {
        let mut names = IndexSet::new();
        for layer in &self.layers {
            names.extend(layer.list_names()?);
        }
        Ok(names.into_iter().collect())
    }

    fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
        for layer in self.layers.iter().rev() {
            match layer.resolve(name) {
                Err(RegistryError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(RegistryError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinRegistry;

    struct Unavailable;

    impl ExporterRegistry for Unavailable {
        fn check_available(&self) -> RegistryResult<()> {
            Err(RegistryError::Unavailable("no plugins".to_string()))
        }

        fn list_names(&self) -> RegistryResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
            Err(RegistryError::NotFound(name.to_string()))
        }
    }

    fn base() -> BuiltinRegistry {
        BuiltinRegistry::from_descriptors([
            ExporterDescriptor::new("html", "text/html"),
            ExporterDescriptor::new("pdf", "application/pdf"),
        ])
    }

    #[test]
    fn empty_layered_registry_lists_nothing() {
        let registry = LayeredRegistry::new();
        assert!(registry.list_names().unwrap().is_empty());
        assert!(registry.resolve("html").unwrap_err().is_not_found());
    }

    #[test]
    fn later_layer_overrides_but_keeps_position() {
        let overlay = BuiltinRegistry::from_descriptors([
            ExporterDescriptor::new("reveal", "text/html"),
            ExporterDescriptor::new("html", "application/xhtml+xml"),
        ]);
        let registry = LayeredRegistry::new().with_layer(base()).with_layer(overlay);

        assert_eq!(registry.layer_count(), 2);
        assert_eq!(registry.list_names().unwrap(), vec!["html", "pdf", "reveal"]);
        assert_eq!(
            registry.resolve("html").unwrap().output_mimetype,
            "application/xhtml+xml"
        );
        assert_eq!(
            registry.resolve("pdf").unwrap().output_mimetype,
            "application/pdf"
        );
    }

    #[test]
    fn unavailable_layer_makes_registry_unavailable() {
        let registry = LayeredRegistry::new().with_layer(base()).with_layer(Unavailable);
        assert!(matches!(
            registry.check_available(),
            Err(RegistryError::Unavailable(_))
        ));
    }
}
