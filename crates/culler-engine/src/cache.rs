//! Concurrent key/value cache with per-entry expiry.
//!
//! # Design
//! - Backed by `DashMap` so updates on one key never block readers of another.
//! - Entries expire lazily on access; `purge_expired` sweeps the rest.
//! - Sliding caches refresh an entry's deadline on every read and write;
//!   absolute caches keep the deadline set at insertion.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    expires_at: Instant,
}

/// How an entry's deadline evolves after insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Reads and writes push the deadline forward by the ttl.
    Sliding,
    /// The deadline is fixed when the entry is created.
    Absolute,
}

/// Cache whose entries disappear once their ttl elapses.
#[derive(Debug)]
pub struct ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Slot<V>>,
    ttl_millis: AtomicU64,
    expiry: Expiry,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, expiry: Expiry) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_millis: AtomicU64::new(duration_millis(ttl)),
            expiry,
        }
    }

    /// Current entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis.load(Ordering::Relaxed))
    }

    /// Change the lifetime applied to entries touched from now on.
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_millis.store(duration_millis(ttl), Ordering::Relaxed);
    }

    /// Atomically replace the value for `key` with `update(previous)`.
    ///
    /// Expired entries are passed to `update` as `None`.
    pub fn update<F>(&self, key: K, update: F) -> V
    where
        F: FnOnce(Option<V>) -> V,
    {
        let now = Instant::now();
        let expires_at = now + self.ttl();
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let live = slot.expires_at > now;
                let previous = live.then(|| slot.value.clone());
                slot.value = update(previous);
                if !live || self.expiry == Expiry::Sliding {
                    slot.expires_at = expires_at;
                }
                slot.value.clone()
            }
            Entry::Vacant(vacant) => {
                let value = update(None);
                vacant.insert(Slot {
                    value: value.clone(),
                    expires_at,
                });
                value
            }
        }
    }

    /// Insert `value` unless a live entry exists; returns whether it was inserted.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let now = Instant::now();
        let expires_at = now + self.ttl();
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at > now {
                    return false;
                }
                occupied.insert(Slot { value, expires_at });
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot { value, expires_at });
                true
            }
        }
    }

    /// Live value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(mut slot) = self.entries.get_mut(key) {
            if slot.expires_at > now {
                if self.expiry == Expiry::Sliding {
                    slot.expires_at = now + self.ttl();
                }
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }
        self.entries
            .remove_if(key, |_, slot| slot.expires_at <= now);
        None
    }

    /// Whether a live entry exists, without refreshing it.
    pub fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|slot| slot.expires_at > now)
    }

    /// Remove `key`, returning its live value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, slot)| (slot.expires_at > now).then_some(slot.value))
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, slot| slot.expires_at > now);
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache stores no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn duration_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
