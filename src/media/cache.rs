//! In-memory payload cache keyed by content id.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::content_id::ContentId;

/// Thread-safe store for fetched media payloads.
///
/// Cloning the cache yields another handle to the same storage. Entries live
/// until process exit unless a bound is configured, in which case the least
/// recently used entry is evicted once the bound is reached.
#[derive(Clone)]
pub struct MediaCache {
  entries: Arc<Mutex<LruCache<ContentId, Bytes>>>,
}

impl MediaCache {
  /// Create a cache with no size bound.
  pub fn unbounded() -> Self {
    Self {
      entries: Arc::new(Mutex::new(LruCache::unbounded())),
    }
  }

  /// Create a cache holding at most `max_entries` payloads.
  pub fn bounded(max_entries: NonZeroUsize) -> Self {
    Self {
      entries: Arc::new(Mutex::new(LruCache::new(max_entries))),
    }
  }

  /// Build from an optional bound, `None` meaning unbounded.
  pub fn with_max_entries(max_entries: Option<NonZeroUsize>) -> Self {
    match max_entries {
      Some(max) => Self::bounded(max),
      None => Self::unbounded(),
    }
  }

  /// Look up the payload cached for `id`.
  pub fn value(&self, id: &ContentId) -> Option<Bytes> {
    // Bytes clones are reference-counted, no copy of the payload happens here
    self.lock().get(id).cloned()
  }

  /// Insert or replace the payload for `id`. Last write wins.
  pub fn store(&self, payload: Bytes, id: &ContentId) {
    if let Some((evicted, _)) = self.lock().push(id.clone(), payload) {
      if &evicted != id {
        tracing::debug!(content_id = %evicted, "evicted cached media");
      }
    }
  }

  pub fn contains(&self, id: &ContentId) -> bool {
    self.lock().contains(id)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Maximum number of entries, `None` when unbounded.
  pub fn capacity(&self) -> Option<usize> {
    let cap = self.lock().cap().get();
    (cap != usize::MAX).then_some(cap)
  }

  fn lock(&self) -> MutexGuard<'_, LruCache<ContentId, Bytes>> {
    // A panic while holding the lock cannot leave the map half-written
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Default for MediaCache {
  fn default() -> Self {
    Self::unbounded()
  }
}

impl std::fmt::Debug for MediaCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MediaCache")
      .field("len", &self.len())
      .field("capacity", &self.capacity())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> ContentId {
    ContentId::new(s)
  }

  #[test]
  fn test_lookup_miss_returns_none() {
    let cache = MediaCache::unbounded();
    assert_eq!(cache.value(&id("post-1")), None);
    assert!(cache.is_empty());
  }

  #[test]
  fn test_store_then_lookup() {
    let cache = MediaCache::unbounded();
    cache.store(Bytes::from_static(&[0xFF, 0xD8]), &id("post-1"));
    assert_eq!(
      cache.value(&id("post-1")),
      Some(Bytes::from_static(&[0xFF, 0xD8]))
    );
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_store_overwrites_existing_entry() {
    let cache = MediaCache::unbounded();
    cache.store(Bytes::from_static(b"old"), &id("post-1"));
    cache.store(Bytes::from_static(b"new"), &id("post-1"));
    assert_eq!(cache.value(&id("post-1")), Some(Bytes::from_static(b"new")));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_clones_share_storage() {
    let cache = MediaCache::unbounded();
    let other = cache.clone();
    other.store(Bytes::from_static(b"x"), &id("post-1"));
    assert!(cache.contains(&id("post-1")));
  }

  #[test]
  fn test_unbounded_has_no_capacity() {
    assert_eq!(MediaCache::unbounded().capacity(), None);
    assert_eq!(MediaCache::with_max_entries(NonZeroUsize::new(3)).capacity(), Some(3));
  }

  #[test]
  fn test_bounded_evicts_least_recently_used() {
    let cache = MediaCache::bounded(NonZeroUsize::new(2).unwrap());
    cache.store(Bytes::from_static(b"a"), &id("a"));
    cache.store(Bytes::from_static(b"b"), &id("b"));

    // Touch "a" so "b" becomes the eviction candidate
    assert!(cache.value(&id("a")).is_some());
    cache.store(Bytes::from_static(b"c"), &id("c"));

    assert!(cache.contains(&id("a")));
    assert!(!cache.contains(&id("b")));
    assert!(cache.contains(&id("c")));
    assert_eq!(cache.len(), 2);
  }

  #[test]
  fn test_concurrent_stores_are_safe() {
    let cache = MediaCache::unbounded();
    let handles: Vec<_> = (0..8)
      .map(|i| {
        let cache = cache.clone();
        std::thread::spawn(move || {
          for j in 0..50 {
            cache.store(Bytes::from(vec![i as u8]), &id(&format!("{}-{}", i, j)));
          }
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }
    assert_eq!(cache.len(), 400);
  }
}
