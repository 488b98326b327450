//! Expiring cache backed by `moka`.

use moka::sync::Cache as MokaCache;
use std::time::Duration;

use super::Cache;

/// Longest time-to-live `moka` accepts.
const MAX_TTL: Duration = Duration::from_secs(1000 * 365 * 24 * 3600);

/// Key-value store where every entry lives for the same default expiration.
///
/// Expired entries are never returned by [`get`](Cache::get); `moka` evicts
/// them during its own housekeeping.
pub struct ExpiringCache<V> {
    inner: MokaCache<String, V>,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live for `default_expiration`
    /// (`None` keeps entries until the process exits).
    pub fn new(default_expiration: Option<Duration>) -> Self {
        let builder = MokaCache::builder();
        let inner = match default_expiration {
            // out-of-range lifetimes behave like no expiration
            Some(ttl) if ttl <= MAX_TTL => builder.time_to_live(ttl).build(),
            _ => builder.build(),
        };
        Self { inner }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl<V> Cache<V> for ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: V) {
        self.inner.insert(key.to_string(), value);
    }
}
