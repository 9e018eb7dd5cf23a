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

//! The positive-list cache (spec §4.4, component C5): admission-controlled,
//! no size bound, only expiry can evict.

use ahash::RandomState;
use hashbrown::HashSet;
use netbuf_common::{Key, Result, Value};

use crate::base::{CacheAux, ExpiringBase};
use crate::engine::Cache;
use crate::entry::CacheEntry;
use crate::stats::CacheStats;

struct PositiveListAux<K: Key> {
    allowed: HashSet<K, RandomState>,
}

impl<K: Key, V: Value> CacheAux<K, V> for PositiveListAux<K> {
    fn admit(&self, key: &K) -> bool {
        self.allowed.contains(key)
    }
    // make_room/on_insert/on_access/on_remove stay at their no-op defaults:
    // this cache has no replacement policy, only admission control.
    // on_clear also stays default: the membership list survives a `clear`.
}

/// An admission-gated cache keyed by a positive (allow-)list. Entries
/// whose key is dropped from the list are evicted immediately.
pub struct PositiveListCache<K: Key, V: Value> {
    base: ExpiringBase<K, V, PositiveListAux<K>>,
}

impl<K: Key, V: Value> PositiveListCache<K, V> {
    pub fn new(
        name: impl Into<String>,
        positive_list: impl IntoIterator<Item = K>,
        ttl_secs: u64,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            base: ExpiringBase::new(
                name,
                PositiveListAux {
                    allowed: positive_list.into_iter().collect(),
                },
                ttl_secs,
                sweep_interval_secs,
                None,
            ),
        }
    }

    /// Replaces the admitted key set atomically; entries for keys no
    /// longer admitted are removed in the same step (spec §4.4, §8
    /// scenario 2).
    pub fn set_positive_list(&self, keys: impl IntoIterator<Item = K>) {
        let keys: HashSet<K, RandomState> = keys.into_iter().collect();
        self.base.update_aux_and_trim(|aux| aux.allowed = keys);
    }

    pub fn add_to_positive_list(&self, key: K) {
        self.base.update_aux_and_trim(|aux| {
            aux.allowed.insert(key);
        });
    }

    pub fn remove_from_positive_list(&self, key: &K) {
        let key = key.clone();
        self.base.update_aux_and_trim(|aux| {
            aux.allowed.remove(&key);
        });
    }

    /// Whether `key` is currently on the positive list (regardless of
    /// whether an entry for it is stored).
    pub fn is_admitted(&self, key: &K) -> bool {
        self.base.with_aux(|aux| CacheAux::<K, V>::admit(aux, key))
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
}

impl<K: Key, V: Value> Cache<K, V> for PositiveListCache<K, V> {
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
    use super::*;

    #[test]
    fn admits_only_listed_keys() {
        // Scenario 2.
        let cache = PositiveListCache::<String, i32>::new(
            "plist",
            ["1", "2", "3"].map(String::from),
            0,
            60,
        );
        for (k, v) in [("1", 1), ("2", 2), ("3", 3), ("4", 4)] {
            cache.put(k.into(), v);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&"4".to_string()).is_none());

        cache.set_positive_list(["1", "2"].map(String::from));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"3".to_string()).is_none());

        cache.remove_from_positive_list(&"2".to_string());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&"1".to_string()).is_some());
        assert!(cache.get(&"2".to_string()).is_none());
    }

    #[test]
    fn clear_keeps_the_list_but_drops_entries() {
        let cache = PositiveListCache::<u32, u32>::new("plist", [1, 2], 0, 60);
        cache.put(1, 10);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_admitted(&1));
        cache.put(1, 11);
        assert!(cache.get(&1).is_some());
    }
}
