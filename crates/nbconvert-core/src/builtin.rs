//! The stock exporter set shipped with the server.

use indexmap::IndexMap;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::ExporterRegistry;
use crate::types::ExporterDescriptor;

/// Stock exporters and their output media types, in listing order.
pub const BUILTIN_EXPORTERS: &[(&str, &str)] = &[
    ("asciidoc", "text/asciidoc"),
    ("custom", ""),
    ("html", "text/html"),
    ("latex", "text/latex"),
    ("markdown", "text/markdown"),
    ("notebook", "application/json"),
    ("pdf", "application/pdf"),
    ("python", "text/x-python"),
    ("rst", "text/restructuredtext"),
    ("script", ""),
    ("slides", "text/html"),
    ("webpdf", "application/pdf"),
];

/// An in-memory registry with a fixed exporter set.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    exporters: IndexMap<String, ExporterDescriptor>,
}

impl BuiltinRegistry {
    /// Builds a registry from arbitrary descriptors, keeping their order.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ExporterDescriptor>) -> Self {
        let exporters = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { exporters }
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::from_descriptors(
            BUILTIN_EXPORTERS
                .iter()
                .map(|(name, mimetype)| ExporterDescriptor::new(*name, *mimetype)),
        )
    }
}

impl ExporterRegistry for BuiltinRegistry {
    fn list_names(&self) -> RegistryResult<Vec<String>> {
        Ok(self.exporters.keys().cloned().collect())
    }

    fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
        self.exporters
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}
