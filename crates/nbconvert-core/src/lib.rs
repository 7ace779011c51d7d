//! nbconvert-core: exporter discovery for the nbconvert capability service
//!
//! This crate provides:
//! - Exporter descriptors and the ordered capability mapping served to clients
//! - The `ExporterRegistry` trait and its built-in, plugin-manifest, and layered implementations
//! - `RegistryAdapter`, which runs registry calls on tokio's blocking pool and
//!   serializes resolution behind a single process-wide lock
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nbconvert_core::{BuiltinRegistry, RegistryAdapter};
//!
//! let adapter = RegistryAdapter::new(Arc::new(BuiltinRegistry::default()));
//! let names = adapter.list_names().await?;
//! let pdf = adapter.resolve("pdf").await?;
//! assert_eq!(pdf.output_mimetype, "application/pdf");
//! ```

pub mod adapter;
pub mod builtin;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod types;

pub use adapter::RegistryAdapter;
pub use builtin::BuiltinRegistry;
pub use error::{RegistryError, RegistryResult};
pub use manifest::ManifestRegistry;
pub use registry::{ExporterRegistry, LayeredRegistry};
pub use types::{CapabilityMap, CapabilityRecord, ExporterDescriptor};
