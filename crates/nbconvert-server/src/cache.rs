//! Process-wide cache of the capability mapping.
//!
//! The cache is a small state machine behind its own async mutex:
//!
//! - `Empty` until the first successful build
//! - `Populated` with the mapping, the exporter-name fingerprint it was
//!   built from, and when it was built
//! - back to `Empty` on [`CapabilityCache::invalidate`]
//!
//! Callers hold the slot guard for the whole build, so concurrent first
//! requests wait for a single build instead of racing to write the entry.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nbconvert_core::CapabilityMap;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

/// How capability mappings are reused between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Every request discovers and resolves again.
    #[serde(rename = "off")]
    Disabled,
    /// The first mapping is kept until explicitly invalidated.
    #[default]
    #[serde(rename = "process")]
    ProcessLifetime,
    /// Every request lists names; the cached mapping is reused only while
    /// the listed names match the ones it was built from.
    Fingerprint,
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "disabled" | "none" => Ok(Self::Disabled),
            "process" | "process_lifetime" => Ok(Self::ProcessLifetime),
            "fingerprint" => Ok(Self::Fingerprint),
            other => Err(format!(
                "unknown cache policy '{}' (expected off, process, or fingerprint)",
                other
            )),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "off",
            Self::ProcessLifetime => "process",
            Self::Fingerprint => "fingerprint",
        };
        f.write_str(name)
    }
}

/// A populated cache entry.
#[derive(Debug, Clone)]
pub struct CachedCapabilities {
    /// The mapping served to clients.
    pub capabilities: Arc<CapabilityMap>,
    /// Exporter names, in listing order, the mapping was built from.
    pub fingerprint: Vec<String>,
    /// When the entry was stored.
    pub cached_at: Instant,
}

impl CachedCapabilities {
    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// State of the cache slot.
#[derive(Debug, Default)]
pub enum CacheState {
    #[default]
    Empty,
    Populated(CachedCapabilities),
}

impl CacheState {
    /// The cached mapping, if any.
    ///
    /// With `fingerprint`, the entry only matches if it was built from
    /// exactly those names in that order.
    pub fn lookup(&self, fingerprint: Option<&[String]>) -> Option<Arc<CapabilityMap>> {
        match self {
            Self::Empty => None,
            Self::Populated(entry) => match fingerprint {
                Some(names) if entry.fingerprint != names => None,
                _ => Some(Arc::clone(&entry.capabilities)),
            },
        }
    }

    /// Store a freshly built mapping, replacing any previous entry.
    pub fn populate(&mut self, fingerprint: Vec<String>, capabilities: Arc<CapabilityMap>) {
        *self = Self::Populated(CachedCapabilities {
            capabilities,
            fingerprint,
            cached_at: Instant::now(),
        });
    }

    pub fn clear(&mut self) {
        *self = Self::Empty;
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Populated(_))
    }
}

/// Snapshot of the cache for diagnostics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStatus {
    pub policy: CachePolicy,
    pub populated: bool,
    /// Number of cached exporters.
    pub exporters: usize,
    pub age_secs: Option<u64>,
}

/// Capability cache shared by all requests.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    policy: CachePolicy,
    state: Mutex<CacheState>,
}

impl CapabilityCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(CacheState::Empty),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Lock the cache slot. Hold the guard across a build to single-flight it.
    pub async fn slot(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().await
    }

    /// Drop the cached mapping so the next request rebuilds it.
    ///
    /// Returns whether an entry was present.
    pub async fn invalidate(&self) -> bool {
        let mut state = self.state.lock().await;
        let was_populated = state.is_populated();
        state.clear();
        was_populated
    }

    pub async fn status(&self) -> CacheStatus {
        let state = self.state.lock().await;
        match &*state {
            CacheState::Empty => CacheStatus {
                policy: self.policy,
                populated: false,
                exporters: 0,
                age_secs: None,
            },
            CacheState::Populated(entry) => CacheStatus {
                policy: self.policy,
                populated: true,
                exporters: entry.capabilities.len(),
                age_secs: Some(entry.age().as_secs()),
            },
        }
    }
}
