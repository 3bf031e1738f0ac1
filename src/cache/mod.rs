//! In-memory TTL cache for recently-fetched GET payloads.
//!
//! Each [`crate::ApiClient`] owns one `TtlCache`; there is no static or
//! cross-instance state. Keys are `"{METHOD} {url}"`, so write-path
//! invalidation can target every cached read by matching the `"GET "` prefix.
//! Expiry is lazy: an expired entry reads as absent but stays in the map until
//! superseded or explicitly invalidated.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Key prefix shared by every cached read.
const READ_PREFIX: &str = "GET ";

struct CacheEntry {
  value: Value,
  stored_at: Instant,
  ttl: Duration,
}

impl CacheEntry {
  fn is_valid(&self, now: Instant) -> bool {
    now.duration_since(self.stored_at) < self.ttl
  }
}

/// Keyed store of recently-fetched payloads with per-entry expiry.
#[derive(Default)]
pub struct TtlCache {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
  pub fn new() -> Self {
    Self::default()
  }

  // Entries are whole-value inserts, so a poisoned lock cannot expose a torn
  // entry; recover instead of propagating.
  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Look up a key. Expired entries read as absent and are left in place.
  pub fn get(&self, key: &str) -> Option<Value> {
    let entries = self.lock();
    let now = Instant::now();
    entries
      .get(key)
      .filter(|entry| entry.is_valid(now))
      .map(|entry| entry.value.clone())
  }

  /// Store a value under a key, superseding any previous entry.
  pub fn set(&self, key: String, value: Value, ttl: Duration) {
    let mut entries = self.lock();
    entries.insert(
      key,
      CacheEntry {
        value,
        stored_at: Instant::now(),
        ttl,
      },
    );
  }

  /// Remove every key containing `pattern` as a substring, or everything when
  /// no pattern is given.
  pub fn invalidate(&self, pattern: Option<&str>) {
    let mut entries = self.lock();
    match pattern {
      Some(p) => {
        entries.retain(|key, _| !key.contains(p));
      }
      None => entries.clear(),
    }
    debug!(pattern = ?pattern, remaining = entries.len(), "cache invalidated");
  }

  /// Remove every cached read. Called after any successful mutating request:
  /// all reads are considered stale after a write.
  pub fn invalidate_reads(&self) {
    let mut entries = self.lock();
    entries.retain(|key, _| !key.starts_with(READ_PREFIX));
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().len()
  }
}
