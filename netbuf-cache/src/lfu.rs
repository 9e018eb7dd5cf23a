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

//! The LFU cache (spec §4.3, component C4): a bounded cache with
//! least-frequently-used replacement, tie-broken by access count and
//! finally by insertion order.

use std::collections::BTreeMap;

use ahash::RandomState;
use hashbrown::HashMap;
use netbuf_common::{Key, Result, Value};

use crate::base::{CacheAux, ExpiringBase};
use crate::engine::Cache;
use crate::entry::CacheEntry;
use crate::stats::CacheStats;

type Order = (u64, u64, u64);

struct LfuIndex<K: Key> {
    capacity: usize,
    seq: u64,
    order: BTreeMap<Order, K>,
    pos: HashMap<K, Order, RandomState>,
}

impl<K: Key> LfuIndex<K> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seq: 0,
            order: BTreeMap::new(),
            pos: HashMap::default(),
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn reindex(&mut self, key: &K, tuple: Order) {
        if let Some(old) = self.pos.remove(key) {
            self.order.remove(&old);
        }
        self.order.insert(tuple, key.clone());
        self.pos.insert(key.clone(), tuple);
    }
}

impl<K: Key, V: Value> CacheAux<K, V> for LfuIndex<K> {
    fn make_room(&mut self, current_len: usize) -> Option<K> {
        if self.capacity == 0 || current_len < self.capacity {
            return None;
        }
        // Minimal by (usage_score, access_count, seq) ascending: BTreeMap's
        // first entry is exactly the least-frequently-used handle, tied
        // first by access count and finally by insertion order.
        let tuple = *self.order.keys().next()?;
        let key = self.order.remove(&tuple)?;
        self.pos.remove(&key);
        Some(key)
    }

    fn on_insert(&mut self, key: &K) {
        let seq = self.next_seq();
        self.reindex(key, (0, 0, seq));
    }

    fn on_access(&mut self, key: &K, access_count: u64) {
        let seq = self.next_seq();
        self.reindex(key, (access_count, access_count, seq));
    }

    fn on_remove(&mut self, key: &K) {
        if let Some(old) = self.pos.remove(key) {
            self.order.remove(&old);
        }
    }

    fn on_clear(&mut self) {
        self.order.clear();
        self.pos.clear();
        self.seq = 0;
    }
}

/// A bounded LFU cache with optional expiry and background sweeping.
///
/// Capacity 0 means unbounded (spec §4.3); negative capacity cannot occur
/// since `capacity` is a `usize`.
pub struct LfuCache<K: Key, V: Value> {
    base: ExpiringBase<K, V, LfuIndex<K>>,
}

impl<K: Key, V: Value> LfuCache<K, V> {
    pub fn new(name: impl Into<String>, capacity: usize, ttl_secs: u64, sweep_interval_secs: u64) -> Self {
        Self {
            base: ExpiringBase::new(
                name,
                LfuIndex::new(capacity),
                ttl_secs,
                sweep_interval_secs,
                None,
            ),
        }
    }

    pub fn with_expiry_hook(
        name: impl Into<String>,
        capacity: usize,
        ttl_secs: u64,
        sweep_interval_secs: u64,
        on_expired: impl Fn(&K, &V) + Send + Sync + 'static,
    ) -> Self {
        Self {
            base: ExpiringBase::new(
                name,
                LfuIndex::new(capacity),
                ttl_secs,
                sweep_interval_secs,
                Some(Box::new(on_expired)),
            ),
        }
    }

    /// Unbounded LFU cache with no expiry, the buffered link's default
    /// when `active` is set with no cache configured (spec §4.8).
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self::new(name, 0, 0, 60)
    }

    pub fn set_sweep_interval_secs(&self, secs: u64) -> Result<()> {
        self.base.set_sweep_interval_secs(secs)
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn keys_in_order(&self) -> Vec<K> {
        self.base.keys_in_order()
    }
}

impl<K: Key, V: Value> Cache<K, V> for LfuCache<K, V> {
    fn put(&self, key: K, value: V) {
        self.base.put(key, value);
    }

    fn get(&self, key: &K) -> Option<CacheEntry<K, V>> {
        self.base.get(key)
    }

    fn remove(&self, key: &K) {
        self.base.remove(key);
    }

    fn remove_expired(&self) -> usize {
        self.base.remove_expired()
    }

    fn clear(&self) {
        self.base.clear();
    }

    fn statistics(&self) -> CacheStats {
        self.base.statistics()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    #[test]
    fn evicts_least_frequently_used_on_capacity() {
        // Scenario 1: capacity 3; insert A,B,C; read A twice, B once; insert D.
        let cache = LfuCache::<String, i32>::new("lfu", 3, 0, 60);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("c".into(), 3);

        cache.get(&"a".to_string());
        cache.get(&"a".to_string());
        cache.get(&"b".to_string());

        cache.put("d".into(), 4);

        assert!(cache.get(&"c".to_string()).is_none(), "c should have been evicted");
        let a = cache.get(&"a".to_string()).unwrap();
        assert_eq!(a.access_count(), 3);
        assert!(cache.get(&"b".to_string()).is_some());
        assert!(cache.get(&"d".to_string()).is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn put_then_get_sets_access_count_to_one() {
        let cache = LfuCache::<u32, &'static str>::new("lfu", 0, 0, 60);
        cache.put(1, "x");
        let e = cache.get(&1).unwrap();
        assert_eq!(e.value(), &"x");
        assert_eq!(e.access_count(), 1);
    }

    #[test]
    fn put_twice_keeps_one_entry_with_latest_timestamp() {
        let cache = LfuCache::<u32, &'static str>::new("lfu", 0, 0, 60);
        cache.put(1, "first");
        let t0 = cache.get(&1).unwrap().timestamp_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put(1, "second");
        let e = cache.get(&1).unwrap();
        assert_eq!(e.value(), &"second");
        assert!(e.timestamp_ms() >= t0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unbounded_cache_never_evicts() {
        let cache = LfuCache::<u32, u32>::unbounded("lfu");
        for i in 0..1000 {
            cache.put(i, i);
        }
        assert_eq!(cache.len(), 1000);
    }

    #[test]
    fn statistics_reflect_hits_and_misses() {
        let cache = LfuCache::<u32, u32>::new("lfu", 0, 0, 60);
        cache.put(1, 10);
        cache.get(&1);
        cache.get(&1);
        cache.get(&2);
        let stats = cache.statistics();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.ratio - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn clear_is_idempotent() {
        let cache = LfuCache::<u32, u32>::new("lfu", 0, 0, 60);
        cache.put(1, 1);
        cache.clear();
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn sweeper_removes_expired_entries() {
        let cache = LfuCache::<u32, u32>::new("lfu", 0, 1, 1);
        cache.put(1, 1);
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        cache.put(2, 2);
        tokio::time::sleep(std::time::Duration::from_millis(800)).await;
        cache.remove_expired();
        assert!(cache.get(&1).is_none());
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn expiry_hook_fires_with_the_expired_entry() {
        let fired = Arc::new(StdMutex::new(Vec::new()));
        let fired2 = fired.clone();
        let cache = LfuCache::with_expiry_hook("lfu-expiring", 0, 1, 60, move |key, value| {
            fired2.lock().unwrap().push((*key, *value));
        });
        cache.put(7, 42);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        cache.remove_expired();
        assert_eq!(*fired.lock().unwrap(), vec![(7, 42)]);
    }

    #[test]
    fn expiry_hook_can_call_back_into_the_cache_without_deadlocking() {
        // Regression test: the hook used to run while the cache's own
        // mutex was still held, so a hook re-entering the cache would
        // deadlock against itself.
        let cache: Arc<LfuCache<u32, u32>> = Arc::new(LfuCache::new("lfu-plain", 0, 0, 60));
        let inner = cache.clone();
        let reentrant = Arc::new(LfuCache::with_expiry_hook(
            "lfu-reentrant",
            0,
            1,
            60,
            move |key, value| {
                inner.put(*key, *value);
            },
        ));
        reentrant.put(7, 42);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        reentrant.remove_expired();
        assert!(reentrant.get(&7).is_none());
        assert_eq!(cache.get(&7).unwrap().value(), &42);
    }
}
