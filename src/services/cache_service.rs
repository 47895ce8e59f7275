use crate::utils::time::Clock;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// Short-lived cache for listing and count queries of one entity type.
///
/// Entries are keyed by the full filter/pagination signature. Any write to the
/// entity clears every entry at once; there is no per-row invalidation.
#[derive(Clone)]
pub struct QueryCache<T: Clone> {
    entries: Arc<DashMap<String, (DateTime<Utc>, T)>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: chrono::Duration::seconds(ttl_secs as i64),
            clock,
        }
    }

    pub fn key<K: Serialize>(prefix: &str, signature: &K) -> String {
        let encoded = serde_json::to_string(signature).unwrap_or_default();
        format!("{}:{}", prefix, encoded)
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let hit = self.entries.get(key).and_then(|entry| {
            let (stored_at, value) = entry.value();
            (now - *stored_at < self.ttl).then(|| value.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, (stored_at, _)| now - *stored_at >= self.ttl);
        }
        hit
    }

    pub fn insert(&self, key: String, value: T) {
        self.entries.insert(key, (self.clock.now(), value));
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::ManualClock;
    use chrono::TimeZone;

    fn cache() -> (QueryCache<i64>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        (QueryCache::new(300, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (cache, clock) = cache();
        cache.insert("orders:count:{}".into(), 7);
        clock.advance(chrono::Duration::seconds(299));
        assert_eq!(cache.get("orders:count:{}"), Some(7));
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get("orders:count:{}"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_all_clears_every_signature() {
        let (cache, _clock) = cache();
        cache.insert(QueryCache::<i64>::key("orders:count", &("a", 1)), 1);
        cache.insert(QueryCache::<i64>::key("orders:count", &("b", 2)), 2);
        assert_eq!(cache.len(), 2);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
