//! Plugin exporters declared by JSON manifests in a directory.
//!
//! Each `*.json` file in the plugin directory declares one exporter:
//!
//! ```json
//! { "name": "docx", "output_mimetype": "application/vnd.openxmlformats-officedocument.wordprocessingml.document" }
//! ```
//!
//! The directory is rescanned on every call, so plugins can be installed or
//! removed while the server runs. A plugin removed between `list_names` and
//! `resolve` resolves as `NotFound`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::ExporterRegistry;
use crate::types::ExporterDescriptor;

/// File extension of plugin manifests.
pub const MANIFEST_EXTENSION: &str = "json";

/// Registry backed by a directory of exporter manifests.
#[derive(Debug, Clone)]
pub struct ManifestRegistry {
    dir: PathBuf,
}

impl ManifestRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The plugin directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest paths in the plugin directory, sorted by file name.
    fn manifest_paths(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_manifest = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == MANIFEST_EXTENSION);
            if is_manifest {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Reads and parses one manifest.
fn read_manifest(path: &Path) -> RegistryResult<ExporterDescriptor> {
    let invalid = |reason: String| RegistryError::InvalidManifest {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path)?;
    let descriptor: ExporterDescriptor =
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    if descriptor.name.trim().is_empty() {
        return Err(invalid("exporter name is empty".to_string()));
    }
    Ok(descriptor)
}

impl ExporterRegistry for ManifestRegistry {
    fn check_available(&self) -> RegistryResult<()> {
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(RegistryError::Unavailable(format!(
                "plugin path {} is not a directory",
                self.dir.display()
            ))),
            Err(e) => Err(RegistryError::Unavailable(format!(
                "plugin directory {}: {}",
                self.dir.display(),
                e
            ))),
        }
    }

    fn list_names(&self) -> RegistryResult<Vec<String>> {
        let mut names = IndexSet::new();
        for path in self.manifest_paths()? {
            match read_manifest(&path) {
                Ok(descriptor) => {
                    names.insert(descriptor.name);
                }
                // A file deleted mid-scan is not worth a warning.
                Err(RegistryError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(error = %e, "Skipping exporter manifest"),
            }
        }
        names.sort();
        Ok(names.into_iter().collect())
    }

    fn resolve(&self, name: &str) -> RegistryResult<ExporterDescriptor> {
        let paths = match self.manifest_paths() {
            Ok(paths) => paths,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        for path in paths {
            let named_after = path.file_stem().is_some_and(|stem| stem == name);
            match read_manifest(&path) {
                Ok(descriptor) if descriptor.name == name => return Ok(descriptor),
                Ok(_) => {}
                Err(RegistryError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) if named_after => return Err(e),
                Err(_) => {}
            }
        }
        Err(RegistryError::NotFound(name.to_string()))
    }
}
