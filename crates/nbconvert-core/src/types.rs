//! Exporter descriptors and the capability mapping returned to clients.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named document-conversion capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterDescriptor {
    /// Unique exporter name (e.g. "pdf", "markdown").
    pub name: String,
    /// Declared output media type. Empty for formats without a single
    /// MIME type, such as multi-file script bundles.
    #[serde(default)]
    pub output_mimetype: String,
}

impl ExporterDescriptor {
    /// Creates a new descriptor.
    pub fn new(name: impl Into<String>, output_mimetype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_mimetype: output_mimetype.into(),
        }
    }
}

/// Per-exporter metadata exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub output_mimetype: String,
}

impl From<&ExporterDescriptor> for CapabilityRecord {
    fn from(descriptor: &ExporterDescriptor) -> Self {
        Self {
            output_mimetype: descriptor.output_mimetype.clone(),
        }
    }
}

/// Exporter name to capability record, in discovery order.
///
/// Serializes as a plain JSON object:
///
/// ```json
/// { "html": { "output_mimetype": "text/html" }, "script": { "output_mimetype": "" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityMap(IndexMap<String, CapabilityRecord>);

impl CapabilityMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resolved exporter.
    ///
    /// An existing entry with the same name is overwritten in place and its
    /// previous record returned.
    pub fn insert(&mut self, descriptor: &ExporterDescriptor) -> Option<CapabilityRecord> {
        self.0
            .insert(descriptor.name.clone(), CapabilityRecord::from(descriptor))
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityRecord> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exporter names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapabilityRecord)> {
        self.0.iter().map(|(name, record)| (name.as_str(), record))
    }
}
