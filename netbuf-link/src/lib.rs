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

//! Addresses, frames, frame holders, the datapoint model contract, the
//! state and command network filters, and the buffered link (spec
//! §6-§9, components C6-C9).

mod address;
mod buffered_link;
mod command_filter;
mod config;
mod datapoint;
mod filter;
mod frame;
mod holder;
mod link;
mod state_filter;

pub use address::{GroupAddress, IndividualAddress};
pub use buffered_link::{BufferedLink, BufferedLinkBuilder};
pub use command_filter::CommandFilter;
pub use config::Configuration;
pub use datapoint::{Datapoint, DatapointChangeListener, DatapointKind, DatapointModel};
pub use filter::{AcceptAllFilter, NetworkFilter, RequestFilter};
pub use frame::{extract_service, rewrite_write_to_response, Destination, Frame, FrameBuilder, GroupService, MessageCode, Priority};
pub use holder::{QueueFrameHolder, SingleFrameHolder};
pub use link::{Link, LinkListener};
pub use state_filter::StateFilter;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use netbuf_cache::{Cache, LfuCache};

    use super::*;

    struct FakeLink {
        open: AtomicBool,
        sent: Mutex<Vec<Frame>>,
        listeners: Mutex<Vec<Arc<dyn LinkListener>>>,
    }

    impl FakeLink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                open: AtomicBool::new(true),
                sent: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
            })
        }

        fn deliver_indication(&self, frame: Frame) {
            for listener in self.listeners.lock().unwrap().iter() {
                listener.on_indication(frame.clone());
            }
        }
    }

    impl Link for FakeLink {
        fn send_with_ack(&self, frame: Frame) -> netbuf_common::Result<()> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }
        fn send_without_ack(&self, frame: Frame) -> netbuf_common::Result<()> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }
        fn is_open(&self) -> bool {
            self.open.load(Ordering::Acquire)
        }
        fn close(&self) {
            self.open.store(false, Ordering::Release);
        }
        fn name(&self) -> &str {
            "fake"
        }
        fn subscribe(&self, listener: Arc<dyn LinkListener>) {
            self.listeners.lock().unwrap().push(listener);
        }
    }

    struct RecordingListener {
        indications: Mutex<Vec<Frame>>,
    }

    impl RecordingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                indications: Mutex::new(Vec::new()),
            })
        }
    }

    impl LinkListener for RecordingListener {
        fn on_indication(&self, frame: Frame) {
            self.indications.lock().unwrap().push(frame);
        }
        fn on_confirmation(&self, _frame: Frame, _positive: bool) {}
        fn on_closed(&self) {}
    }

    fn write_frame(dst: GroupAddress, value: u8) -> Frame {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        FrameBuilder::new(src)
            .destination(Destination::Group(dst))
            .apdu([0x00, 0x80 | (value & 0x3F)])
            .build()
            .unwrap()
    }

    fn read_frame(dst: GroupAddress) -> Frame {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        FrameBuilder::new(src)
            .destination(Destination::Group(dst))
            .apdu([0x00, 0x00])
            .build()
            .unwrap()
    }

    #[test]
    fn group_read_is_served_from_the_cache_without_touching_the_base_link() {
        // Scenario 5 (without query-buffer-only).
        let base = FakeLink::new();
        let cache: Arc<dyn Cache<GroupAddress, Frame>> = Arc::new(LfuCache::unbounded("state"));
        let state_filter = StateFilter::new(cache.clone(), None);
        let link = BufferedLinkBuilder::new(base.clone())
            .cache(cache)
            .network_filter(state_filter.clone())
            .request_filter(state_filter)
            .active(true)
            .build();

        let dst = GroupAddress::from_raw(1);
        base.deliver_indication(write_frame(dst, 1));

        let listener = RecordingListener::new();
        link.subscribe(listener.clone());

        link.send_without_ack(read_frame(dst)).unwrap();
        assert!(base.sent.lock().unwrap().is_empty(), "should not reach the base link");
        assert_eq!(listener.indications.lock().unwrap().len(), 1);
    }

    #[test]
    fn query_buffer_only_times_out_on_a_cache_miss() {
        // Scenario 5.
        let base = FakeLink::new();
        let cache: Arc<dyn Cache<GroupAddress, Frame>> = Arc::new(LfuCache::unbounded("state"));
        let state_filter = StateFilter::new(cache.clone(), None);
        let link = BufferedLinkBuilder::new(base.clone())
            .cache(cache)
            .network_filter(state_filter.clone())
            .request_filter(state_filter)
            .query_buffer_only(true)
            .active(true)
            .build();

        let dst = GroupAddress::from_raw(1);
        let err = link.send_without_ack(read_frame(dst)).unwrap_err();
        assert!(matches!(err, netbuf_common::Error::Timeout(_)));
        assert!(base.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn without_query_buffer_only_a_cache_miss_falls_through_to_the_base_link() {
        let base = FakeLink::new();
        let cache: Arc<dyn Cache<GroupAddress, Frame>> = Arc::new(LfuCache::unbounded("state"));
        let state_filter = StateFilter::new(cache.clone(), None);
        let link = BufferedLinkBuilder::new(base.clone())
            .cache(cache)
            .network_filter(state_filter.clone())
            .request_filter(state_filter)
            .active(true)
            .build();

        let dst = GroupAddress::from_raw(1);
        link.send_without_ack(read_frame(dst)).unwrap();
        assert_eq!(base.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn closing_the_buffered_link_deactivates_and_clears_listeners() {
        let base = FakeLink::new();
        let link = BufferedLinkBuilder::new(base.clone()).active(true).build();
        let listener = RecordingListener::new();
        link.subscribe(listener.clone());

        link.close();
        assert!(!link.is_open());
        assert!(link.send_without_ack(write_frame(GroupAddress::from_raw(1), 0)).is_err());
    }

    #[test]
    fn activating_with_no_configuration_installs_defaults_that_cache_everything() {
        let base = FakeLink::new();
        let link = BufferedLinkBuilder::new(base.clone()).active(true).build();
        let dst = GroupAddress::from_raw(5);
        base.deliver_indication(write_frame(dst, 7));

        let cache = link.configuration().cache().expect("default cache installed on activation");
        assert!(cache.get(&dst).is_some(), "default accept-all filter should have cached the write");
    }
}
