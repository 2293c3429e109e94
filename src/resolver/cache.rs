//! TTL cache for resolved template content

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

/// Default time-to-live for cached content (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;

/// A cached piece of template content
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Revision reported by the content source, if any
    pub revision: Option<String>,
}

/// Snapshot of cache contents for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<CacheEntryStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryStats {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Unbounded cache with lazy TTL eviction
///
/// Entries are only evicted when looked up after they expire.
#[derive(Debug)]
pub struct TemplateCache {
    entries: HashMap<String, CacheEntry>,
    ttl: TimeDelta,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}

impl TemplateCache {
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Get unexpired content for `id`, evicting it if expired
    pub fn get(&mut self, id: &str) -> Option<&str> {
        self.get_at(id, Utc::now())
    }

    fn get_at(&mut self, id: &str, now: DateTime<Utc>) -> Option<&str> {
        let expired = match self.entries.get(id) {
            None => return None,
            Some(entry) => now.signed_duration_since(entry.timestamp) >= self.ttl,
        };

        if expired {
            debug!(%id, "get: entry expired, evicting");
            self.entries.remove(id);
            return None;
        }

        self.entries.get(id).map(|entry| entry.content.as_str())
    }

    /// Store content for `id`, replacing any previous entry
    pub fn insert(&mut self, id: impl Into<String>, content: impl Into<String>, revision: Option<String>) {
        self.insert_at(id.into(), content.into(), revision, Utc::now());
    }

    /// Store content with an explicit timestamp
    pub fn insert_at(&mut self, id: String, content: String, revision: Option<String>, timestamp: DateTime<Utc>) {
        debug!(%id, content_len = content.len(), "insert: called");
        self.entries.insert(
            id.clone(),
            CacheEntry {
                id,
                content,
                timestamp,
                revision,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries: Vec<CacheEntryStats> = self
            .entries
            .values()
            .map(|e| CacheEntryStats {
                id: e.id.clone(),
                timestamp: e.timestamp,
                revision: e.revision.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        CacheStats {
            size: self.entries.len(),
            entries,
        }
    }
}
