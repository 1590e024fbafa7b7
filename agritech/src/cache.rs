use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Small time-bounded cache keyed by rounded coordinates.
#[derive(Debug)]
pub(crate) struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` and drops every expired entry.
    pub(crate) fn insert(&self, key: String, value: T) {
        let mut entries = self.entries.lock();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::TtlCache;
    use std::time::Duration;

    #[test]
    fn returns_fresh_entries_and_expires_stale_ones() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("48.86_2.35".to_string(), 21.5);
        assert_eq!(cache.get("48.86_2.35"), Some(21.5));
        assert_eq!(cache.get("0.00_0.00"), None);

        let expired = TtlCache::new(Duration::ZERO);
        expired.insert("k".to_string(), 1);
        assert_eq!(expired.get("k"), None);
    }

    #[test]
    fn insert_prunes_entries_for_other_keys() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert("48.86_2.35".to_string(), 1);
        cache.insert("45.76_4.84".to_string(), 2);
        std::thread::sleep(Duration::from_millis(30));

        cache.insert("43.30_5.37".to_string(), 3);
        let entries = cache.entries.lock();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("43.30_5.37"));
    }
}
