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

//! The datapoint model contract (spec §7 dependency): a directory the
//! state and command filters consult to decide whether a group address is
//! eligible for caching, and to build their cross-reference graphs.

use std::sync::Arc;

use hashbrown::HashSet;
use netbuf_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::address::GroupAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatapointKind {
    /// Process-value datapoint; `expiration_secs` bounds how long a cached
    /// read stays servicable (spec §4.6).
    State { expiration_secs: Option<u64> },
    /// Command datapoint; serviced through the command filter's indication
    /// queues instead of the state cache.
    Command,
}

/// One logical KNX datapoint: a main address plus the secondary addresses
/// whose traffic should update or invalidate it (spec §3, §7). Deserialized
/// straight out of a gateway's datapoint configuration file; `new` is still
/// the only way to get a validated instance from code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datapoint {
    pub main: GroupAddress,
    pub updating: HashSet<GroupAddress>,
    pub invalidating: HashSet<GroupAddress>,
    pub kind: DatapointKind,
}

impl Datapoint {
    pub fn new(
        main: GroupAddress,
        updating: impl IntoIterator<Item = GroupAddress>,
        invalidating: impl IntoIterator<Item = GroupAddress>,
        kind: DatapointKind,
    ) -> Result<Self> {
        let updating: HashSet<GroupAddress> = updating.into_iter().collect();
        let invalidating: HashSet<GroupAddress> = invalidating.into_iter().collect();
        if updating.contains(&main) || invalidating.contains(&main) {
            return Err(Error::invalid_argument(
                "a datapoint's main address cannot also be one of its own dependent addresses",
            ));
        }
        Ok(Self {
            main,
            updating,
            invalidating,
            kind,
        })
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, DatapointKind::State { .. })
    }

    pub fn is_command(&self) -> bool {
        matches!(self.kind, DatapointKind::Command)
    }
}

/// Notified when the model's set of datapoints changes, so the state
/// filter can keep its cross-reference graph current without re-scanning
/// the whole model on every frame (spec §7).
pub trait DatapointChangeListener: Send + Sync {
    fn on_added(&self, datapoint: &Datapoint);
    fn on_removed(&self, datapoint: &Datapoint);
}

/// A directory of datapoints, keyed by main group address.
pub trait DatapointModel: Send + Sync {
    fn lookup(&self, address: &GroupAddress) -> Option<Datapoint>;
    fn iter(&self) -> Vec<Datapoint>;
    fn subscribe(&self, listener: Arc<dyn DatapointChangeListener>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_address_cannot_be_its_own_dependent() {
        let main = GroupAddress::from_raw(1);
        let other = GroupAddress::from_raw(2);
        assert!(Datapoint::new(main, [main], [other], DatapointKind::Command).is_err());
        assert!(Datapoint::new(main, [other], [main], DatapointKind::Command).is_err());
        assert!(Datapoint::new(main, [other], [], DatapointKind::Command).is_ok());
    }
}
