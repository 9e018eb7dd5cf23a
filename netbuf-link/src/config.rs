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

//! The buffered link's configuration (spec §4.8-§4.9, component C9):
//! exclusively owns the cache and the filters plugged into a buffered
//! link, plus its activation and query-buffer-only switches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use netbuf_cache::{Cache, LfuCache};

use crate::address::GroupAddress;
use crate::datapoint::DatapointModel;
use crate::filter::{AcceptAllFilter, NetworkFilter, RequestFilter};
use crate::frame::Frame;

/// Owns the cache and filters a buffered link dispatches through. Starts
/// inactive with nothing configured; `set_active(true)` installs the
/// default unbounded LFU cache and accept-everything filter if nothing was
/// configured first (spec §4.8).
pub struct Configuration {
    cache: RwLock<Option<Arc<dyn Cache<GroupAddress, Frame>>>>,
    network_filter: RwLock<Option<Arc<dyn NetworkFilter>>>,
    request_filter: RwLock<Option<Arc<dyn RequestFilter>>>,
    model: RwLock<Option<Arc<dyn DatapointModel>>>,
    query_buffer_only: AtomicBool,
    active: AtomicBool,
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(None),
            network_filter: RwLock::new(None),
            request_filter: RwLock::new(None),
            model: RwLock::new(None),
            query_buffer_only: AtomicBool::new(false),
            active: AtomicBool::new(false),
        }
    }

    pub fn set_cache(&self, cache: Arc<dyn Cache<GroupAddress, Frame>>) {
        *self.cache.write() = Some(cache);
    }

    pub fn set_network_filter(&self, filter: Arc<dyn NetworkFilter>) {
        *self.network_filter.write() = Some(filter);
    }

    pub fn set_request_filter(&self, filter: Arc<dyn RequestFilter>) {
        *self.request_filter.write() = Some(filter);
    }

    pub fn set_model(&self, model: Arc<dyn DatapointModel>) {
        *self.model.write() = Some(model);
    }

    pub fn set_query_buffer_only(&self, query_buffer_only: bool) {
        self.query_buffer_only.store(query_buffer_only, Ordering::Release);
    }

    pub fn query_buffer_only(&self) -> bool {
        self.query_buffer_only.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cache(&self) -> Option<Arc<dyn Cache<GroupAddress, Frame>>> {
        self.cache.read().clone()
    }

    pub fn network_filter(&self) -> Option<Arc<dyn NetworkFilter>> {
        self.network_filter.read().clone()
    }

    pub fn request_filter(&self) -> Option<Arc<dyn RequestFilter>> {
        self.request_filter.read().clone()
    }

    pub fn model(&self) -> Option<Arc<dyn DatapointModel>> {
        self.model.read().clone()
    }

    /// Activates (or deactivates) the configuration. Activating installs
    /// an unbounded LFU cache and an accept-everything filter if nothing
    /// was configured beforehand; deactivating leaves cache contents
    /// untouched (spec §4.8).
    pub fn set_active(&self, active: bool) {
        if active {
            let cache = {
                let mut guard = self.cache.write();
                if guard.is_none() {
                    *guard = Some(Arc::new(LfuCache::unbounded("buffered-link")) as Arc<dyn Cache<_, _>>);
                }
                guard.clone().expect("just installed")
            };
            let mut network_filter = self.network_filter.write();
            if network_filter.is_none() {
                *network_filter = Some(Arc::new(AcceptAllFilter::new(cache)) as Arc<dyn NetworkFilter>);
            }
        }
        self.active.store(active, Ordering::Release);
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
