//! Error types for exporter registries.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while discovering or resolving exporters.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry cannot be loaded at all.
    #[error("exporter registry unavailable: {0}")]
    Unavailable(String),

    /// The name is not (or no longer) registered.
    #[error("exporter not found: {0}")]
    NotFound(String),

    /// A plugin manifest could not be parsed.
    #[error("invalid exporter manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// Filesystem error while scanning plugins.
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker panicked or was cancelled.
    #[error("registry worker failed: {0}")]
    Worker(String),
}

impl RegistryError {
    /// Whether this is the benign "unregistered between listing and resolving" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
