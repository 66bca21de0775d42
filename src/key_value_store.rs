use std::{collections::HashMap, time::Duration};

use bytes::Bytes;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: Bytes,
    pub expiration: Option<Instant>,
}

impl Value {
    fn is_expired(&self, now: Instant) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

/// The keyspace shared by every connection of a server.
///
/// Expired entries are removed lazily by [`KeyValueStore::get`], which is what
/// reads rely on. [`KeyValueStore::remove_expired`] only reclaims memory early.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: HashMap<Bytes, Value>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`. With `ttl` the entry expires `ttl` from now.
    pub fn set(&mut self, key: Bytes, data: Bytes, ttl: Option<Duration>) {
        let expiration = ttl.map(|ttl| Instant::now() + ttl);

        self.entries.insert(key, Value { data, expiration });
    }

    /// Returns the value under `key`, deleting it first if it has expired.
    pub fn get(&mut self, key: &[u8]) -> Option<Bytes> {
        let now = Instant::now();

        if self.entries.get(key)?.is_expired(now) {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|value| value.data.clone())
    }

    /// Deletes every expired entry and returns how many were removed.
    pub fn remove_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();

        self.entries.retain(|_, value| !value.is_expired(now));

        before - self.entries.len()
    }

    /// Number of entries held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }
}
