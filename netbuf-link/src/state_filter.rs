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

//! The state filter (spec §4.6, component C7): caches group-write and
//! group-response traffic for state-based datapoints, propagating updates
//! and invalidations across a cross-reference graph built from the
//! datapoint model.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use netbuf_common::time::now_ms;
use parking_lot::RwLock;

use netbuf_cache::Cache;

use crate::address::GroupAddress;
use crate::datapoint::{DatapointChangeListener, DatapointKind, DatapointModel};
use crate::filter::{NetworkFilter, RequestFilter};
use crate::frame::{Frame, GroupService, MessageCode};

/// `graph[secondary]` holds every main address that depends on traffic at
/// `secondary` (spec §3's "cross-reference graph"). Built from each
/// datapoint's `updating`/`invalidating` sets, which name the *secondary*
/// addresses relative to that datapoint's main address, so the graph keys
/// are the inverse of how a `Datapoint` stores them.
type Graph = HashMap<GroupAddress, HashSet<GroupAddress>>;

pub struct StateFilter {
    cache: Arc<dyn Cache<GroupAddress, Frame>>,
    model: Option<Arc<dyn DatapointModel>>,
    update_graph: RwLock<Graph>,
    invalidate_graph: RwLock<Graph>,
}

impl StateFilter {
    pub fn new(cache: Arc<dyn Cache<GroupAddress, Frame>>, model: Option<Arc<dyn DatapointModel>>) -> Arc<Self> {
        let filter = Arc::new(Self {
            cache,
            update_graph: RwLock::new(HashMap::new()),
            invalidate_graph: RwLock::new(HashMap::new()),
            model: model.clone(),
        });
        if let Some(model) = model {
            for dp in model.iter() {
                filter.index_datapoint(&dp);
            }
            model.subscribe(filter.clone());
        }
        filter
    }

    fn index_datapoint(&self, dp: &crate::datapoint::Datapoint) {
        let mut update_graph = self.update_graph.write();
        for secondary in &dp.updating {
            update_graph.entry(*secondary).or_default().insert(dp.main);
        }
        drop(update_graph);
        let mut invalidate_graph = self.invalidate_graph.write();
        for secondary in &dp.invalidating {
            invalidate_graph.entry(*secondary).or_default().insert(dp.main);
        }
    }

    fn deindex_datapoint(&self, dp: &crate::datapoint::Datapoint) {
        let mut update_graph = self.update_graph.write();
        for secondary in &dp.updating {
            if let Some(set) = update_graph.get_mut(secondary) {
                set.remove(&dp.main);
                if set.is_empty() {
                    update_graph.remove(secondary);
                }
            }
        }
        drop(update_graph);
        let mut invalidate_graph = self.invalidate_graph.write();
        for secondary in &dp.invalidating {
            if let Some(set) = invalidate_graph.get_mut(secondary) {
                set.remove(&dp.main);
                if set.is_empty() {
                    invalidate_graph.remove(secondary);
                }
            }
        }
    }

    /// Whether `destination` is eligible for state caching: no model
    /// configured, or the model has no opinion, or it names a state
    /// datapoint.
    fn admits(&self, destination: &GroupAddress) -> bool {
        match &self.model {
            None => true,
            Some(model) => model.lookup(destination).map(|dp| dp.is_state()).unwrap_or(true),
        }
    }
}

impl NetworkFilter for StateFilter {
    fn accept(&self, frame: &Frame) -> bool {
        let Some(destination) = frame.destination().as_group() else {
            return false;
        };
        let Ok(service) = frame.service() else {
            return false;
        };
        if !matches!(service, GroupService::Write | GroupService::Response) {
            return false;
        }
        if !self.admits(&destination) {
            tracing::trace!(%destination, "state filter: destination is not state-based, skipping");
            return false;
        }

        let mut stored = frame.clone();
        stored.set_message_code(MessageCode::Indication);
        if matches!(service, GroupService::Write) {
            let _ = stored.rewrite_write_to_response();
            stored.set_hop_count(stored.hop_count().max(6));
            stored.set_repeat(false);
        }
        self.cache.put(destination, stored.clone());

        let dependents: Vec<GroupAddress> = self
            .update_graph
            .read()
            .get(&destination)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for dependent in dependents {
            let mut rewritten = stored.clone();
            rewritten.set_destination(crate::frame::Destination::Group(dependent));
            self.cache.put(dependent, rewritten);
        }

        if matches!(service, GroupService::Write) {
            let invalidated: Vec<GroupAddress> = self
                .invalidate_graph
                .read()
                .get(&destination)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            for target in invalidated {
                tracing::trace!(%destination, %target, "state filter: invalidating dependent entry");
                self.cache.remove(&target);
            }
        }
        true
    }
}

impl RequestFilter for StateFilter {
    fn request(&self, destination: &GroupAddress) -> Option<Frame> {
        let entry = self.cache.get(destination)?;
        if let Some(model) = &self.model {
            if let Some(dp) = model.lookup(destination) {
                if let DatapointKind::State {
                    expiration_secs: Some(secs),
                } = dp.kind
                {
                    if secs > 0 {
                        let ttl_ms = secs as i64 * 1000;
                        if now_ms() - entry.timestamp_ms() >= ttl_ms {
                            return None;
                        }
                    }
                }
            }
        }
        Some(entry.value().clone())
    }
}

impl DatapointChangeListener for StateFilter {
    fn on_added(&self, datapoint: &crate::datapoint::Datapoint) {
        self.index_datapoint(datapoint);
    }

    fn on_removed(&self, datapoint: &crate::datapoint::Datapoint) {
        self.deindex_datapoint(datapoint);
    }
}
