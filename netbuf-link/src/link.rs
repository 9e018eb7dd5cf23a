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

//! The base link contract the buffered link decorates (spec §8-§9).

use std::sync::Arc;

use netbuf_common::Result;

use crate::frame::Frame;

pub trait Link: Send + Sync {
    fn send_with_ack(&self, frame: Frame) -> Result<()>;
    fn send_without_ack(&self, frame: Frame) -> Result<()>;
    fn is_open(&self) -> bool;
    fn close(&self);
    fn name(&self) -> &str;
    fn subscribe(&self, listener: Arc<dyn LinkListener>);
}

pub trait LinkListener: Send + Sync {
    fn on_indication(&self, frame: Frame);
    fn on_confirmation(&self, frame: Frame, positive: bool);
    fn on_closed(&self);
}
