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

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss counters exposed by [`crate::Cache::statistics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub ratio: f64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} ratio={:.4}",
            self.hits, self.misses, self.ratio
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Stats {
    /// Bumps the hot-path atomic and mirrors the count to the `metrics`
    /// crate for external export, labeled by cache `name`.
    pub(crate) fn record_hit(&self, name: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("netbuf_cache_hits_total", "cache" => name.to_string()).increment(1);
    }

    pub(crate) fn record_miss(&self, name: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("netbuf_cache_misses_total", "cache" => name.to_string()).increment(1);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let ratio = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };
        CacheStats {
            hits,
            misses,
            ratio,
        }
    }
}
