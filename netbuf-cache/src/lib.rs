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

//! The cache engine: expiring base, LFU replacement, positive-list
//! admission (spec §4.1-§4.4, components C1-C5).

mod base;
mod engine;
mod entry;
mod lfu;
mod positive_list;
mod stats;

pub use engine::Cache;
pub use entry::CacheEntry;
pub use lfu::LfuCache;
pub use positive_list::PositiveListCache;
pub use stats::CacheStats;
