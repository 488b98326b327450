//! Pluggable key-value cache for installation clients.
//!
//! The resolver in [`crate::github::App`] owns the cache behind a read/write
//! lock: lookups run under the shared guard, stores under the exclusive one.
//! Implementations therefore need no synchronization of their own.

mod expiring;

pub use expiring::ExpiringCache;

/// Key-value store consulted before, and populated after, minting an
/// installation client.
pub trait Cache<V>: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent or expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores a value under the backing store's default expiration.
    fn set(&mut self, key: &str, value: V);
}

/// Cache that never holds anything. Every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<V> Cache<V> for NoCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set(&mut self, _key: &str, _value: V) {}
}
