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

//! The buffered link (spec §4.8-§4.9, component C9): a decorator over a
//! base [`Link`] that serves group reads from a cache and feeds accepted
//! traffic through a configured network filter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use netbuf_common::{Error, Result};
use netbuf_cache::Cache;

use crate::address::GroupAddress;
use crate::config::Configuration;
use crate::datapoint::DatapointModel;
use crate::filter::{NetworkFilter, RequestFilter};
use crate::frame::{Frame, GroupService};
use crate::link::{Link, LinkListener};

/// Wraps a base link, buffering group-read traffic through a configured
/// cache and filter pair. Construct via [`BufferedLinkBuilder`].
pub struct BufferedLink {
    base: Arc<dyn Link>,
    config: Arc<Configuration>,
    listeners: Mutex<Vec<Arc<dyn LinkListener>>>,
    closed: AtomicBool,
}

impl BufferedLink {
    fn new(base: Arc<dyn Link>, config: Arc<Configuration>) -> Arc<Self> {
        let link = Arc::new(Self {
            base: base.clone(),
            config,
            listeners: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        base.subscribe(link.clone());
        link
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.config
    }

    fn dispatch(&self, frame: Frame) {
        for listener in self.listeners.lock().iter() {
            listener.on_indication(frame.clone());
        }
    }

    fn is_group_read(frame: &Frame) -> bool {
        frame.destination().as_group().is_some()
            && matches!(frame.service(), Ok(GroupService::Read))
    }

    fn send_impl(&self, frame: Frame, with_ack: bool) -> Result<()> {
        if !self.is_open() {
            return Err(Error::Closed);
        }
        if Self::is_group_read(&frame) {
            let destination = frame.destination().as_group().expect("checked above");
            if let Some(request_filter) = self.config.request_filter() {
                if let Some(cached) = request_filter.request(&destination) {
                    self.dispatch(cached);
                    return Ok(());
                }
                if self.config.query_buffer_only() {
                    return Err(Error::timeout("buffered group read: no cached entry"));
                }
            }
        }
        if with_ack {
            self.base.send_with_ack(frame)
        } else {
            self.base.send_without_ack(frame)
        }
    }
}

impl Link for BufferedLink {
    fn send_with_ack(&self, frame: Frame) -> Result<()> {
        self.send_impl(frame, true)
    }

    fn send_without_ack(&self, frame: Frame) -> Result<()> {
        self.send_impl(frame, false)
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.base.is_open()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(link = %self.base.name(), "buffered link closing");
        self.config.set_active(false);
        self.base.close();
        self.listeners.lock().clear();
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn subscribe(&self, listener: Arc<dyn LinkListener>) {
        self.listeners.lock().push(listener);
    }
}

impl LinkListener for BufferedLink {
    fn on_indication(&self, frame: Frame) {
        if self.config.is_active() {
            if let Some(filter) = self.config.network_filter() {
                filter.accept(&frame);
            }
        }
        self.dispatch(frame);
    }

    fn on_confirmation(&self, frame: Frame, positive: bool) {
        if positive && self.config.is_active() {
            if let Some(filter) = self.config.network_filter() {
                filter.accept(&frame);
            }
        }
        for listener in self.listeners.lock().iter() {
            listener.on_confirmation(frame.clone(), positive);
        }
    }

    fn on_closed(&self) {
        self.config.set_active(false);
        self.closed.store(true, Ordering::Release);
        for listener in self.listeners.lock().iter() {
            listener.on_closed();
        }
        self.listeners.lock().clear();
    }
}

/// Builds a [`BufferedLink`] over a base link, wiring up the cache,
/// filters, datapoint model, and query-buffer-only switch before the link
/// is activated (mirrors the cache engine's own builder-style construction).
pub struct BufferedLinkBuilder {
    base: Arc<dyn Link>,
    config: Configuration,
    active: bool,
}

impl BufferedLinkBuilder {
    pub fn new(base: Arc<dyn Link>) -> Self {
        Self {
            base,
            config: Configuration::new(),
            active: false,
        }
    }

    pub fn cache(self, cache: Arc<dyn Cache<GroupAddress, Frame>>) -> Self {
        self.config.set_cache(cache);
        self
    }

    pub fn network_filter(self, filter: Arc<dyn NetworkFilter>) -> Self {
        self.config.set_network_filter(filter);
        self
    }

    pub fn request_filter(self, filter: Arc<dyn RequestFilter>) -> Self {
        self.config.set_request_filter(filter);
        self
    }

    pub fn model(self, model: Arc<dyn DatapointModel>) -> Self {
        self.config.set_model(model);
        self
    }

    pub fn query_buffer_only(self, query_buffer_only: bool) -> Self {
        self.config.set_query_buffer_only(query_buffer_only);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn build(self) -> Arc<BufferedLink> {
        let config = Arc::new(self.config);
        if self.active {
            config.set_active(true);
        }
        BufferedLink::new(self.base, config)
    }
}
