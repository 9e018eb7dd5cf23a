//  Copyright 2026 netbuf contributors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The expiring base (spec §4.2, component C3): an insertion-ordered map
//! with an optional time-to-live and a single background sweeper, shared
//! by the LFU cache (C4) and the positive-list cache (C5) as their common
//! storage substrate. Replacement/admission policy is plugged in through
//! [`CacheAux`] rather than subclassing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use netbuf_common::time::now_ms;
use netbuf_common::{Key, Value};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::entry::CacheEntry;
use crate::stats::{CacheStats, Stats};

/// Hook for a replacement/admission policy plugged into [`ExpiringBase`].
///
/// All methods run with the base's lock held, mirroring the "every mutable
/// collection is guarded by the owning object's monitor" rule in spec §5.
pub(crate) trait CacheAux<K: Key, V: Value>: Send + 'static {
    /// Whether `key` may be admitted at all. Positive-list caches use this;
    /// everything else admits unconditionally.
    fn admit(&self, _key: &K) -> bool {
        true
    }

    /// Called when a *new* key is about to be inserted and the map is at
    /// `current_len` entries. Return a key to evict to make room, if any.
    fn make_room(&mut self, _current_len: usize) -> Option<K> {
        None
    }

    /// Called right after a brand-new key was inserted into the map.
    fn on_insert(&mut self, _key: &K) {}

    /// Called after a hit bumped `entry`'s counters to `access_count`.
    fn on_access(&mut self, _key: &K, _access_count: u64) {}

    /// Called after `key` was removed from the map, for any reason
    /// (explicit remove, eviction, or expiry).
    fn on_remove(&mut self, _key: &K) {}

    /// Called when the cache is cleared; drop any auxiliary indices but
    /// keep configuration (e.g. a positive list's membership set).
    fn on_clear(&mut self) {}
}

struct Inner<K: Key, V: Value, A> {
    map: IndexMap<K, CacheEntry<K, V>>,
    aux: A,
}

struct Shared<K: Key, V: Value, A> {
    state: Mutex<Inner<K, V, A>>,
    ttl_ms: i64,
    sweep_interval_secs: AtomicU64,
    sweeper_running: AtomicBool,
    stop: AtomicBool,
    interval_changed: Notify,
    stats: Stats,
    on_expired: Option<Box<dyn Fn(&K, &V) + Send + Sync>>,
    name: String,
}

pub(crate) struct ExpiringBase<K: Key, V: Value, A: CacheAux<K, V>> {
    shared: Arc<Shared<K, V, A>>,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<K: Key, V: Value, A: CacheAux<K, V>> ExpiringBase<K, V, A> {
    pub(crate) fn new(
        name: impl Into<String>,
        aux: A,
        ttl_secs: u64,
        sweep_interval_secs: u64,
        on_expired: Option<Box<dyn Fn(&K, &V) + Send + Sync>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    map: IndexMap::default(),
                    aux,
                }),
                ttl_ms: ttl_secs as i64 * 1000,
                sweep_interval_secs: AtomicU64::new(sweep_interval_secs.max(1)),
                sweeper_running: AtomicBool::new(false),
                stop: AtomicBool::new(false),
                interval_changed: Notify::new(),
                stats: Stats::default(),
                on_expired,
                name: name.into(),
            }),
            sweeper: Mutex::new(None),
        }
    }

    fn time_bounded(&self) -> bool {
        self.shared.ttl_ms > 0
    }

    /// Starts the sweeper task if this base is time-bounded and no sweeper
    /// is running yet. Idempotent (spec §4.2).
    pub(crate) fn ensure_sweeper_started(&self) {
        if !self.time_bounded() {
            return;
        }
        if self
            .shared
            .sweeper_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.shared.stop.store(false, Ordering::Release);
        let shared = self.shared.clone();
        let handle = tokio::spawn(Self::sweep_loop(shared));
        *self.sweeper.lock() = Some(handle);
        tracing::debug!(cache = %self.shared.name, "sweeper started");
    }

    /// Stops the sweeper. Idempotent; cooperative (spec §5): signals the
    /// sweeper, which finishes its current iteration before exiting.
    pub(crate) fn stop_sweeper(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.interval_changed.notify_waiters();
        self.shared.sweeper_running.store(false, Ordering::Release);
    }

    pub(crate) fn set_sweep_interval_secs(&self, secs: u64) -> netbuf_common::Result<()> {
        if secs == 0 {
            return Err(netbuf_common::Error::invalid_argument(
                "sweep interval must be > 0",
            ));
        }
        self.shared.sweep_interval_secs.store(secs, Ordering::Release);
        self.shared.interval_changed.notify_waiters();
        Ok(())
    }

    async fn sweep_loop(shared: Arc<Shared<K, V, A>>) {
        loop {
            let start = tokio::time::Instant::now();
            loop {
                let secs = shared.sweep_interval_secs.load(Ordering::Acquire).max(1);
                let deadline = start + Duration::from_secs(secs);
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    _ = shared.interval_changed.notified() => {
                        if shared.stop.load(Ordering::Acquire) {
                            break;
                        }
                        continue;
                    }
                }
            }
            if shared.stop.load(Ordering::Acquire) {
                tracing::debug!(cache = %shared.name, "sweeper stopped");
                return;
            }
            Self::sweep_once(&shared);
        }
    }

    fn sweep_once(shared: &Arc<Shared<K, V, A>>) -> usize {
        if shared.ttl_ms <= 0 {
            return 0;
        }
        let mut expired: Vec<CacheEntry<K, V>> = Vec::new();
        {
            let mut inner = shared.state.lock();
            let now = now_ms();
            loop {
                let is_expired = match inner.map.get_index(0) {
                    Some((_, entry)) => entry.is_expired(shared.ttl_ms, now),
                    None => false,
                };
                if !is_expired {
                    break;
                }
                let (key, entry) = inner.map.shift_remove_index(0).expect("checked above");
                inner.aux.on_remove(&key);
                expired.push(entry);
            }
        }
        // Lock released before firing hooks, so a slow or re-entrant hook
        // cannot stall concurrent `put`/`get` (spec §5: "the sweep does not
        // block on listeners").
        if let Some(hook) = shared.on_expired.as_ref() {
            for entry in &expired {
                hook(entry.key(), entry.value());
            }
        }
        expired.len()
    }

    pub(crate) fn put(&self, key: K, value: V) {
        self.ensure_sweeper_started();
        let mut inner = self.shared.state.lock();
        if !inner.aux.admit(&key) {
            return;
        }
        match inner.map.get_index_of(&key) {
            Some(idx) => {
                if let Some(entry) = inner.map.get_mut(&key) {
                    entry.replace_value(value);
                }
                let last = inner.map.len() - 1;
                inner.map.move_index(idx, last);
            }
            None => {
                if let Some(evict_key) = inner.aux.make_room(inner.map.len()) {
                    inner.map.shift_remove(&evict_key);
                    inner.aux.on_remove(&evict_key);
                }
                inner.map.insert(key.clone(), CacheEntry::new(key.clone(), value));
                inner.aux.on_insert(&key);
            }
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<CacheEntry<K, V>> {
        let mut inner = self.shared.state.lock();
        let Inner { map, aux } = &mut *inner;
        match map.get_mut(key) {
            Some(entry) => {
                let access_count = entry.touch();
                aux.on_access(key, access_count);
                self.shared.stats.record_hit(&self.shared.name);
                Some(entry.clone())
            }
            None => {
                self.shared.stats.record_miss(&self.shared.name);
                None
            }
        }
    }

    pub(crate) fn remove(&self, key: &K) {
        let mut inner = self.shared.state.lock();
        if inner.map.shift_remove(key).is_some() {
            inner.aux.on_remove(key);
        }
    }

    pub(crate) fn remove_expired(&self) -> usize {
        Self::sweep_once(&self.shared)
    }

    pub(crate) fn clear(&self) {
        let mut inner = self.shared.state.lock();
        inner.map.clear();
        inner.aux.on_clear();
        drop(inner);
        self.stop_sweeper();
    }

    pub(crate) fn statistics(&self) -> CacheStats {
        self.shared.stats.snapshot()
    }

    /// Mutates the auxiliary policy state (e.g. a positive list's
    /// membership set) and, in the same locked step, evicts any entry that
    /// is no longer admitted under the new state (spec §4.4).
    pub(crate) fn update_aux_and_trim(&self, f: impl FnOnce(&mut A)) {
        let mut inner = self.shared.state.lock();
        f(&mut inner.aux);
        let doomed: Vec<K> = inner
            .map
            .keys()
            .filter(|k| !inner.aux.admit(k))
            .cloned()
            .collect();
        for k in doomed {
            inner.map.shift_remove(&k);
            inner.aux.on_remove(&k);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.state.lock().map.len()
    }

    /// Snapshot of stored keys in current order, oldest-first. Test helper,
    /// mirrors the `dump()` helpers the teacher's eviction tests use.
    #[cfg(test)]
    pub(crate) fn keys_in_order(&self) -> Vec<K> {
        self.shared.state.lock().map.keys().cloned().collect()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.shared.state.lock().map.contains_key(key)
    }

    pub(crate) fn with_aux<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.shared.state.lock().aux)
    }
}

impl<K: Key, V: Value, A: CacheAux<K, V>> Drop for ExpiringBase<K, V, A> {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
