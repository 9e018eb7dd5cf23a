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

//! The network and request filter contracts (spec §4.8, §6): a
//! [`NetworkFilter`] inspects frames arriving on the link; a
//! [`RequestFilter`] services a buffered group-read from what was stored.

use std::sync::Arc;

use netbuf_cache::Cache;

use crate::address::GroupAddress;
use crate::frame::{Frame, MessageCode};

/// Inspects an incoming frame and decides whether (and how) to store it.
/// Returns whether the frame matched the filter's acceptance policy;
/// storage-capacity drops downstream of acceptance are not reflected here
/// (spec's error model treats them as silent, observable only through
/// statistics).
pub trait NetworkFilter: Send + Sync {
    fn accept(&self, frame: &Frame) -> bool;
}

/// Services a group-read against whatever a network filter has stored.
pub trait RequestFilter: Send + Sync {
    fn request(&self, destination: &GroupAddress) -> Option<Frame>;
}

/// The default filter activated when a buffered link is turned on without
/// explicit configuration: every group-addressed frame is cached
/// unconditionally (spec §4.8).
pub struct AcceptAllFilter {
    cache: Arc<dyn Cache<GroupAddress, Frame>>,
}

impl AcceptAllFilter {
    pub fn new(cache: Arc<dyn Cache<GroupAddress, Frame>>) -> Self {
        Self { cache }
    }
}

impl NetworkFilter for AcceptAllFilter {
    fn accept(&self, frame: &Frame) -> bool {
        let Some(destination) = frame.destination().as_group() else {
            return false;
        };
        let mut stored = frame.clone();
        stored.set_message_code(MessageCode::Indication);
        self.cache.put(destination, stored);
        true
    }
}

impl RequestFilter for AcceptAllFilter {
    fn request(&self, destination: &GroupAddress) -> Option<Frame> {
        self.cache.get(destination).map(|e| e.value().clone())
    }
}
