//! # LRU Cache
//!
//! A bounded key/value cache built on top of the `lru` crate with one addition:
//! an eviction callback that runs synchronously, inside `put`, before the new
//! entry is inserted.
//!
//! ## Recency rules
//!
//! * `get` moves the entry to the most-recently-used position.
//! * `put` of a key that is already present replaces the value in place and
//!   leaves its recency untouched.
//! * `put` of a new key enters it as the most recent entry; if the cache is
//!   full the least-recently-used entry is handed to the callback first.
//!
//! The callback is the only path by which cached data reaches durable storage,
//! so it is never deferred.

use std::hash::Hash;
use std::num::NonZeroUsize;

use crate::error::{Result, StreamError};

/// Invoked with the evicted key and value while `put` is still running.
pub type EvictionCallback<K, V> = Box<dyn FnMut(K, V) + Send>;

/// A least-recently-used cache with a synchronous eviction hook.
pub struct LruCache<K: Hash + Eq, V> {
    entries: lru::LruCache<K, V>,
    on_evict: Option<EvictionCallback<K, V>>,
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`StreamError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(StreamError::ZeroCapacity)?;
        Ok(LruCache {
            entries: lru::LruCache::new(capacity),
            on_evict: None,
        })
    }

    /// Creates a cache that hands every evicted entry to `on_evict`.
    pub fn with_eviction(capacity: usize, on_evict: EvictionCallback<K, V>) -> Result<Self> {
        let mut cache = Self::new(capacity)?;
        cache.on_evict = Some(on_evict);
        Ok(cache)
    }

    /// Maximum number of entries held before the oldest is evicted.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces `value` under `key`.
    ///
    /// Replacing does not promote the entry. Inserting into a full cache evicts
    /// the least-recently-used entry through the callback before returning.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(existing) = self.entries.peek_mut(&key) {
            *existing = value;
            return;
        }

        if self.entries.len() == self.capacity() {
            if let Some((evicted_key, evicted_value)) = self.entries.pop_lru() {
                if let Some(on_evict) = self.on_evict.as_mut() {
                    on_evict(evicted_key, evicted_value);
                }
            }
        }

        self.entries.push(key, value);
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns true if `key` is cached, without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Hands every entry to the eviction callback, least recent first, leaving
    /// the cache empty. Used to flush cached data at shutdown.
    ///
    /// # Returns
    /// The number of entries evicted.
    pub fn evict_all(&mut self) -> usize {
        let mut evicted = 0;
        while let Some((key, value)) = self.entries.pop_lru() {
            if let Some(on_evict) = self.on_evict.as_mut() {
                on_evict(key, value);
            }
            evicted += 1;
        }
        evicted
    }

    /// Drops every entry. The eviction callback is not invoked.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
