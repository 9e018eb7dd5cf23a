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

//! Facade crate bundling the cache engine and the KNX network buffer link
//! behind a single dependency.

pub mod prelude {
    pub use netbuf_common::{Error, Key, Result, Value};

    pub use netbuf_cache::{Cache, CacheEntry, CacheStats, LfuCache, PositiveListCache};

    pub use netbuf_link::{
        AcceptAllFilter, BufferedLink, BufferedLinkBuilder, CommandFilter, Configuration, Datapoint,
        DatapointChangeListener, DatapointKind, DatapointModel, Destination, Frame, FrameBuilder, GroupAddress,
        GroupService, IndividualAddress, Link, LinkListener, MessageCode, NetworkFilter, Priority,
        QueueFrameHolder, RequestFilter, SingleFrameHolder, StateFilter,
    };
}

pub use prelude::*;
