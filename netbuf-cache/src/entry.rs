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

use netbuf_common::time::now_ms;
use netbuf_common::{Key, Value};

/// A keyed cache entry: value plus usage/access counters and an insertion
/// timestamp (spec §3 "Cache entry").
///
/// `key` is fixed at construction. `value` is replaced in place by `put`.
/// `timestamp_ms` is reset on insert and on value replacement, never on a
/// plain `get`. `access_count` increments on every successful `get`;
/// `usage_score` tracks `access_count` for the policies implemented here.
#[derive(Debug, Clone)]
pub struct CacheEntry<K: Key, V: Value> {
    key: K,
    value: V,
    access_count: u64,
    usage_score: u64,
    timestamp_ms: i64,
}

impl<K: Key, V: Value> CacheEntry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            access_count: 0,
            usage_score: 0,
            timestamp_ms: now_ms(),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn usage_score(&self) -> u64 {
        self.usage_score
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Applied on a successful `get`: bumps the access count and sets the
    /// usage score to match it (spec §4.3).
    pub(crate) fn touch(&mut self) -> u64 {
        self.access_count += 1;
        self.usage_score = self.access_count;
        self.access_count
    }

    /// Applied on `put` against an existing key: replaces the value and
    /// renews the timestamp. Counters are untouched.
    pub(crate) fn replace_value(&mut self, value: V) {
        self.value = value;
        self.timestamp_ms = now_ms();
    }

    pub(crate) fn is_expired(&self, ttl_ms: i64, now_ms: i64) -> bool {
        ttl_ms > 0 && self.timestamp_ms + ttl_ms <= now_ms
    }
}
