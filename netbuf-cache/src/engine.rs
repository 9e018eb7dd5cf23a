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

use netbuf_common::{Key, Value};

use crate::entry::CacheEntry;
use crate::stats::CacheStats;

/// The cache engine contract (spec §4.1, component C2).
///
/// Implementations are `Send + Sync` so they can be shared behind an `Arc`
/// by the buffered link and its filters.
pub trait Cache<K: Key, V: Value>: Send + Sync {
    /// Inserts or replaces `key`. Always renews the entry's timestamp for
    /// an existing key. Bounded caches may evict first; admission-gated
    /// caches silently drop the put if `key` is not admitted.
    fn put(&self, key: K, value: V);

    /// On hit, increments the access count, refreshes the usage score, and
    /// returns a snapshot of the live entry. On miss, returns `None`.
    fn get(&self, key: &K) -> Option<CacheEntry<K, V>>;

    /// Removes `key` if present. Idempotent.
    fn remove(&self, key: &K);

    /// Scans for and removes expired entries, returning how many were
    /// removed.
    fn remove_expired(&self) -> usize;

    /// Empties the cache and stops any background maintenance.
    fn clear(&self);

    /// Hit/miss counters accumulated so far.
    fn statistics(&self) -> CacheStats;
}
