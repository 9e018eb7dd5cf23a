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

//! Frame holders (spec §6, component C6): a single-slot holder and a
//! bounded queue holder, both keyed to one group address.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use netbuf_common::time::now_ms;
use netbuf_common::{Error, Result};
use parking_lot::Mutex;

use crate::address::GroupAddress;
use crate::frame::Frame;

fn destination_matches(frame: &Frame, key: GroupAddress) -> bool {
    frame.destination().as_group() == Some(key)
}

/// Holds at most one frame, keyed by the group address it was constructed
/// with. A `set` for any other destination is a programming error.
pub struct SingleFrameHolder {
    key: GroupAddress,
    slot: Mutex<Option<(Frame, i64)>>,
}

impl SingleFrameHolder {
    pub fn new(key: GroupAddress) -> Self {
        Self {
            key,
            slot: Mutex::new(None),
        }
    }

    pub fn key(&self) -> GroupAddress {
        self.key
    }

    pub fn set(&self, frame: Frame) -> Result<()> {
        if !destination_matches(&frame, self.key) {
            return Err(Error::invalid_argument("frame destination does not match holder key"));
        }
        *self.slot.lock() = Some((frame, now_ms()));
        Ok(())
    }

    pub fn get(&self) -> Option<Frame> {
        self.slot.lock().as_ref().map(|(f, _)| f.clone())
    }

    pub fn get_item(&self) -> Option<(Frame, i64)> {
        self.slot.lock().clone()
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

struct QueueState {
    items: VecDeque<(Frame, i64)>,
}

/// A bounded (or unbounded, if `capacity` is 0) FIFO of frames for one
/// destination, with overwrite-oldest or drop-newest behavior at capacity
/// and an optional listener fired on the not-full-to-full transition.
pub struct QueueFrameHolder {
    key: GroupAddress,
    capacity: usize,
    consuming_read: bool,
    overwrite_oldest: bool,
    fill_listener: Option<Box<dyn Fn() + Send + Sync>>,
    state: Mutex<QueueState>,
}

impl QueueFrameHolder {
    pub fn new(key: GroupAddress, capacity: usize, consuming_read: bool, overwrite_oldest: bool) -> Self {
        Self {
            key,
            capacity,
            consuming_read,
            overwrite_oldest,
            fill_listener: None,
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
            }),
        }
    }

    pub fn with_fill_listener(mut self, listener: impl Fn() + Send + Sync + 'static) -> Self {
        self.fill_listener = Some(Box::new(listener));
        self
    }

    pub fn key(&self) -> GroupAddress {
        self.key
    }

    fn is_full(&self, len: usize) -> bool {
        self.capacity > 0 && len >= self.capacity
    }

    /// Appends `frame`. Returns `Ok(true)` if stored, `Ok(false)` if dropped
    /// because the queue was full and configured to drop the newest frame.
    pub fn set(&self, frame: Frame) -> Result<bool> {
        self.set_and_report_transition(frame).map(|(stored, _)| stored)
    }

    /// Same as [`Self::set`], but also reports whether this call is the one
    /// that took the queue from empty to non-empty. The check and the
    /// enqueue happen under the same lock acquisition, so concurrent
    /// callers (spec §5) can use the result to fire a first-indication
    /// signal exactly once per transition, the same way the built-in
    /// not-full-to-full fill-listener below is itself race-free.
    pub fn set_and_report_transition(&self, frame: Frame) -> Result<(bool, bool)> {
        if !destination_matches(&frame, self.key) {
            return Err(Error::invalid_argument("frame destination does not match holder key"));
        }
        let mut st = self.state.lock();
        let now = now_ms();
        let was_empty = st.items.is_empty();
        let before_full = self.is_full(st.items.len());
        let stored = if st.items.len() < self.capacity || self.capacity == 0 {
            st.items.push_back((frame, now));
            true
        } else if self.overwrite_oldest {
            st.items.pop_front();
            st.items.push_back((frame, now));
            true
        } else {
            false
        };
        let after_full = self.is_full(st.items.len());
        drop(st);
        if stored && !before_full && after_full {
            if let Some(listener) = &self.fill_listener {
                let _ = catch_unwind(AssertUnwindSafe(|| listener()));
            }
        }
        Ok((stored, stored && was_empty))
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> Option<Frame> {
        self.get_item().map(|(f, _)| f)
    }

    pub fn get_item(&self) -> Option<(Frame, i64)> {
        let mut st = self.state.lock();
        if self.consuming_read {
            st.items.pop_front()
        } else {
            st.items.front().cloned()
        }
    }

    /// A snapshot of every queued frame, oldest first. When `consuming_read`
    /// is set, the queue is drained.
    pub fn get_all_frames(&self) -> Vec<(Frame, i64)> {
        let mut st = self.state.lock();
        if self.consuming_read {
            st.items.drain(..).collect()
        } else {
            st.items.iter().cloned().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::frame::{Destination, FrameBuilder};
    use netbuf_common::Error as NbError;
    use crate::address::IndividualAddress;

    fn frame_for(dst: GroupAddress) -> Frame {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        FrameBuilder::new(src)
            .destination(Destination::Group(dst))
            .apdu([0x00, 0x80])
            .build()
            .unwrap()
    }

    #[test]
    fn single_holder_rejects_mismatched_destination() {
        let key = GroupAddress::from_raw(1);
        let holder = SingleFrameHolder::new(key);
        let other = GroupAddress::from_raw(2);
        match holder.set(frame_for(other)) {
            Err(NbError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn queue_holder_overwrites_oldest_when_full() {
        let key = GroupAddress::from_raw(1);
        let holder = QueueFrameHolder::new(key, 2, false, true);
        for _ in 0..3 {
            holder.set(frame_for(key)).unwrap();
        }
        assert_eq!(holder.len(), 2);
    }

    #[test]
    fn queue_holder_drops_newest_when_full_and_not_overwriting() {
        let key = GroupAddress::from_raw(1);
        let holder = QueueFrameHolder::new(key, 2, false, false);
        assert!(holder.set(frame_for(key)).unwrap());
        assert!(holder.set(frame_for(key)).unwrap());
        assert!(!holder.set(frame_for(key)).unwrap());
        assert_eq!(holder.len(), 2);
    }

    #[test]
    fn fill_listener_fires_once_per_not_full_to_full_transition() {
        let key = GroupAddress::from_raw(1);
        let fires = Arc::new(AtomicUsize::new(0));
        let fires2 = fires.clone();
        let holder = QueueFrameHolder::new(key, 1, true, false).with_fill_listener(move || {
            fires2.fetch_add(1, Ordering::SeqCst);
        });
        holder.set(frame_for(key)).unwrap();
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        holder.get(); // drains back to empty
        holder.set(frame_for(key)).unwrap();
        assert_eq!(fires.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn consuming_read_drains_in_fifo_order() {
        let key = GroupAddress::from_raw(1);
        let holder = QueueFrameHolder::new(key, 0, true, false);
        for _ in 0..3 {
            holder.set(frame_for(key)).unwrap();
        }
        assert_eq!(holder.get_all_frames().len(), 3);
        assert!(holder.is_empty());
    }
}
