//! Restyle result cache

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::recording::Artifact;
use crate::domain::restyle::Fingerprint;

/// Default lifetime of a cached restyle result (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Artifact,
    created_at: Instant,
}

/// Time-bounded cache of transformed artifacts, keyed by request fingerprint.
///
/// Deduplicates billed provider calls for identical requests. Eviction is
/// lazy: each lookup first drops every entry older than the TTL, and no
/// background sweeper exists. Growth stays bounded because keys are drawn
/// from a small style and enhancement vocabulary.
///
/// Interior mutability via a plain mutex; nothing awaits while holding it,
/// so concurrent lookups and inserts from in-flight transformations are safe.
#[derive(Debug)]
pub struct RestyleCache {
    ttl: Duration,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl RestyleCache {
    /// Create a cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Purge expired entries, then return the cached artifact if present.
    ///
    /// An entry expiring between two lookups is indistinguishable from one
    /// that never existed.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Artifact> {
        let mut entries = self.lock();
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.created_at) <= self.ttl);
        entries.get(fingerprint).map(|entry| entry.payload.clone())
    }

    /// Store a transformed artifact, replacing any existing entry for the
    /// same fingerprint and restarting its lifetime
    pub fn insert(&self, fingerprint: Fingerprint, payload: Artifact) {
        let entry = CacheEntry {
            payload,
            created_at: Instant::now(),
        };
        self.lock().insert(fingerprint, entry);
    }

    /// Number of entries currently stored, counting not-yet-purged expired
    /// ones
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RestyleCache {
    fn default() -> Self {
        Self::new()
    }
}
