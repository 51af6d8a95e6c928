//! In-memory analytics cache keyed by survey and scoring version.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    survey_id: String,
    version_id: String,
}

impl CacheKey {
    fn new(survey_id: &str, version_id: &str) -> Self {
        Self {
            survey_id: survey_id.to_string(),
            version_id: version_id.to_string(),
        }
    }
}

/// Thread-safe cache of computed payloads.
///
/// An entry stays valid until a response is recorded against its version.
#[derive(Debug)]
pub struct AnalyticsCache<V> {
    state: RwLock<CacheState<V>>,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<CacheKey, Arc<V>>,
    /// Bumped per key by `record_response`.
    generations: HashMap<CacheKey, u64>,
    /// Bumped by survey-wide invalidation and `clear`.
    epoch: u64,
}

impl<V> CacheState<V> {
    fn stamp(&self, key: &CacheKey) -> (u64, u64) {
        (self.epoch, self.generations.get(key).copied().unwrap_or(0))
    }
}

impl<V> Default for AnalyticsCache<V> {
    fn default() -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
        }
    }
}

impl<V> AnalyticsCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, survey_id: &str, version_id: &str) -> Option<Arc<V>> {
        self.state
            .read()
            .entries
            .get(&CacheKey::new(survey_id, version_id))
            .cloned()
    }

    pub fn insert(&self, survey_id: &str, version_id: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.state
            .write()
            .entries
            .insert(CacheKey::new(survey_id, version_id), Arc::clone(&value));
        value
    }

    /// Cached value, or compute and store it. Errors are not cached.
    ///
    /// The lock is not held while computing, so concurrent misses on the same
    /// key may both compute; the last write wins. A value whose key was
    /// invalidated while it was being computed is returned but not stored.
    pub fn get_or_compute<F>(&self, survey_id: &str, version_id: &str, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let key = CacheKey::new(survey_id, version_id);
        let stamp = {
            let state = self.state.read();
            if let Some(hit) = state.entries.get(&key) {
                debug!(survey = survey_id, version = version_id, "analytics cache hit");
                return Ok(Arc::clone(hit));
            }
            state.stamp(&key)
        };
        debug!(survey = survey_id, version = version_id, "analytics cache miss");

        let value = Arc::new(compute()?);
        let mut state = self.state.write();
        if state.stamp(&key) == stamp {
            state.entries.insert(key, Arc::clone(&value));
        } else {
            debug!(survey = survey_id, version = version_id, "analytics cache skipped stale value");
        }
        Ok(value)
    }

    /// Drop the entry for the version a new response was recorded against.
    ///
    /// Returns whether an entry was invalidated.
    pub fn record_response(&self, survey_id: &str, version_id: &str) -> bool {
        let key = CacheKey::new(survey_id, version_id);
        let mut state = self.state.write();
        let removed = state.entries.remove(&key).is_some();
        *state.generations.entry(key).or_insert(0) += 1;
        if removed {
            debug!(survey = survey_id, version = version_id, "analytics cache invalidated");
        }
        removed
    }

    /// Drop every version of a survey. Returns the number of entries removed.
    pub fn invalidate_survey(&self, survey_id: &str) -> usize {
        let mut state = self.state.write();
        let before = state.entries.len();
        state.entries.retain(|key, _| key.survey_id != survey_id);
        state.epoch += 1;
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_or_compute_caches() {
        let cache = AnalyticsCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        };
        assert_eq!(*cache.get_or_compute("s1", "v1", compute).unwrap(), 42);
        assert_eq!(*cache.get_or_compute("s1", "v1", compute).unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keyed_by_survey_and_version() {
        let cache = AnalyticsCache::new();
        cache.insert("s1", "v1", 1);
        cache.insert("s1", "v2", 2);
        cache.insert("s2", "v1", 3);
        assert_eq!(cache.get("s1", "v2").as_deref(), Some(&2));
        assert_eq!(cache.get("s2", "v1").as_deref(), Some(&3));
        assert!(cache.get("s2", "v2").is_none());
    }

    #[test]
    fn test_record_response_invalidates_only_that_version() {
        let cache = AnalyticsCache::new();
        cache.insert("s1", "v1", 1);
        cache.insert("s1", "v2", 2);
        assert!(cache.record_response("s1", "v1"));
        assert!(!cache.record_response("s1", "v1"));
        assert!(cache.get("s1", "v1").is_none());
        assert!(cache.get("s1", "v2").is_some());
    }

    #[test]
    fn test_invalidate_survey() {
        let cache = AnalyticsCache::new();
        cache.insert("s1", "v1", 1);
        cache.insert("s1", "v2", 2);
        cache.insert("s2", "v1", 3);
        assert_eq!(cache.invalidate_survey("s1"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: AnalyticsCache<i32> = AnalyticsCache::new();
        let result = cache.get_or_compute("s1", "v1", || Err(Error::insufficient_data("none")));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_response_recorded_during_compute_is_not_cached() {
        let cache = AnalyticsCache::new();
        let value = cache
            .get_or_compute("s1", "v1", || {
                cache.record_response("s1", "v1");
                Ok("before-new-response")
            })
            .unwrap();
        assert_eq!(*value, "before-new-response");
        assert!(cache.get("s1", "v1").is_none());

        let fresh = cache.get_or_compute("s1", "v1", || Ok("after-new-response")).unwrap();
        assert_eq!(*fresh, "after-new-response");
        assert_eq!(cache.get("s1", "v1").as_deref(), Some(&"after-new-response"));
    }

    #[test]
    fn test_survey_invalidated_during_compute_is_not_cached() {
        let cache = AnalyticsCache::new();
        cache
            .get_or_compute("s1", "v1", || {
                cache.invalidate_survey("s1");
                Ok(1)
            })
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(AnalyticsCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert("s1", &format!("v{i}"), i);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }
}
