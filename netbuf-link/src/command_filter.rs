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

//! The command filter (spec §4.7, component C8): a bounded indication
//! queue per destination, with a FIFO of destinations that have new
//! indications pending delivery.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;
use netbuf_common::{Error, Result};
use parking_lot::{Mutex, RwLock};

use crate::address::GroupAddress;
use crate::datapoint::DatapointModel;
use crate::filter::{NetworkFilter, RequestFilter};
use crate::frame::{Frame, GroupService, MessageCode};
use crate::holder::QueueFrameHolder;

const QUEUE_CAPACITY: usize = 10;

pub struct CommandFilter {
    model: Option<Arc<dyn DatapointModel>>,
    queues: RwLock<HashMap<GroupAddress, Arc<QueueFrameHolder>>>,
    fifo: Mutex<VecDeque<GroupAddress>>,
    listener: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl CommandFilter {
    pub fn new(model: Option<Arc<dyn DatapointModel>>) -> Self {
        Self {
            model,
            queues: RwLock::new(HashMap::new()),
            fifo: Mutex::new(VecDeque::new()),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: impl Fn() + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    fn admits(&self, destination: &GroupAddress) -> bool {
        match &self.model {
            None => true,
            Some(model) => model.lookup(destination).map(|dp| dp.is_command()).unwrap_or(true),
        }
    }

    fn queue_for(&self, destination: GroupAddress) -> Arc<QueueFrameHolder> {
        if let Some(queue) = self.queues.read().get(&destination) {
            return queue.clone();
        }
        self.queues
            .write()
            .entry(destination)
            .or_insert_with(|| Arc::new(QueueFrameHolder::new(destination, QUEUE_CAPACITY, true, false)))
            .clone()
    }

    pub fn has_new_indication(&self) -> bool {
        !self.fifo.lock().is_empty()
    }

    /// Dequeues the oldest pending indication in arrival order.
    pub fn next_indication(&self) -> Result<(Frame, i64)> {
        let destination = self
            .fifo
            .lock()
            .pop_front()
            .ok_or_else(|| Error::illegal_state("no pending indication"))?;
        self.drain_one(&destination)
            .ok_or_else(|| Error::illegal_state("indication queue desynchronized"))
    }

    /// Services a buffered group-read for `destination`: removes the first
    /// FIFO record naming it (wherever it sits in arrival order) and
    /// returns the corresponding queued frame.
    pub fn request_indication(&self, destination: &GroupAddress) -> Option<(Frame, i64)> {
        let mut fifo = self.fifo.lock();
        let position = fifo.iter().position(|d| d == destination)?;
        fifo.remove(position);
        drop(fifo);
        self.drain_one(destination)
    }

    fn drain_one(&self, destination: &GroupAddress) -> Option<(Frame, i64)> {
        self.queues.read().get(destination).and_then(|q| q.get_item())
    }
}

impl NetworkFilter for CommandFilter {
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
            tracing::trace!(%destination, "command filter: destination is not command-based, skipping");
            return false;
        }

        let mut rewritten = frame.clone();
        rewritten.set_message_code(MessageCode::Indication);

        let queue = self.queue_for(destination);
        match queue.set_and_report_transition(rewritten) {
            Ok((true, became_non_empty)) => {
                self.fifo.lock().push_back(destination);
                if became_non_empty {
                    if let Some(listener) = &self.listener {
                        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener()));
                    }
                }
            }
            Ok((false, _)) => {
                tracing::trace!(%destination, "command filter: queue full, dropping newest indication");
            }
            Err(_) => {}
        }
        true
    }
}

impl RequestFilter for CommandFilter {
    fn request(&self, destination: &GroupAddress) -> Option<Frame> {
        self.request_indication(destination).map(|(frame, _)| frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::address::IndividualAddress;
    use crate::frame::{Destination, FrameBuilder};

    fn write_frame(dst: GroupAddress) -> Frame {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        FrameBuilder::new(src)
            .destination(Destination::Group(dst))
            .apdu([0x00, 0x80])
            .build()
            .unwrap()
    }

    #[test]
    fn fifo_preserves_arrival_order_across_destinations() {
        let filter = CommandFilter::new(None);
        let a = GroupAddress::from_raw(1);
        let b = GroupAddress::from_raw(2);
        filter.accept(&write_frame(a));
        filter.accept(&write_frame(b));
        filter.accept(&write_frame(a));

        let (f1, _) = filter.next_indication().unwrap();
        assert_eq!(f1.destination().as_group(), Some(a));
        let (f2, _) = filter.next_indication().unwrap();
        assert_eq!(f2.destination().as_group(), Some(b));
        let (f3, _) = filter.next_indication().unwrap();
        assert_eq!(f3.destination().as_group(), Some(a));
        assert!(!filter.has_new_indication());
    }

    #[test]
    fn request_pulls_a_specific_destination_out_of_order() {
        let filter = CommandFilter::new(None);
        let a = GroupAddress::from_raw(1);
        let b = GroupAddress::from_raw(2);
        filter.accept(&write_frame(a));
        filter.accept(&write_frame(b));

        let (frame, _) = filter.request_indication(&b).unwrap();
        assert_eq!(frame.destination().as_group(), Some(b));

        let (frame, _) = filter.next_indication().unwrap();
        assert_eq!(frame.destination().as_group(), Some(a));
    }

    #[test]
    fn queue_drops_newest_beyond_capacity() {
        let filter = CommandFilter::new(None);
        let a = GroupAddress::from_raw(1);
        for _ in 0..(QUEUE_CAPACITY + 5) {
            filter.accept(&write_frame(a));
        }
        let queue = filter.queue_for(a);
        assert_eq!(queue.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn listener_fires_once_on_first_fill_per_destination() {
        let fires = Arc::new(AtomicUsize::new(0));
        let fires2 = fires.clone();
        let filter = CommandFilter::new(None).with_listener(move || {
            fires2.fetch_add(1, Ordering::SeqCst);
        });
        let a = GroupAddress::from_raw(1);
        let b = GroupAddress::from_raw(2);
        filter.accept(&write_frame(a));
        filter.accept(&write_frame(a));
        filter.accept(&write_frame(b));
        assert_eq!(fires.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_arrivals_fire_the_listener_exactly_once() {
        // Two threads race to be the first frame for a previously-empty
        // destination. The empty-check and the enqueue must be atomic
        // (spec §5, §8) so exactly one of them observes the transition.
        let fires = Arc::new(AtomicUsize::new(0));
        let fires2 = fires.clone();
        let filter = Arc::new(CommandFilter::new(None).with_listener(move || {
            fires2.fetch_add(1, Ordering::SeqCst);
        }));
        let a = GroupAddress::from_raw(1);

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let filter = filter.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    filter.accept(&write_frame(a));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fires.load(Ordering::SeqCst), 1);
        assert_eq!(filter.queue_for(a).len(), 2);
    }
}
