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

//! The L-Data frame (spec §6): message code, addressing, priority, hop
//! count, repeat flag, and an application-layer payload.

use netbuf_common::{Error, Result};

use crate::address::{GroupAddress, IndividualAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
    Request,
    Indication,
    PositiveConfirmation,
    NegativeConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    System,
    Alarm,
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Group(GroupAddress),
    Individual(IndividualAddress),
}

impl Destination {
    pub fn as_group(&self) -> Option<GroupAddress> {
        match self {
            Destination::Group(g) => Some(*g),
            Destination::Individual(_) => None,
        }
    }
}

/// The application-layer group service recognized by the network filters
/// (spec §6). `Other` carries the raw top two bits of the second APDU byte
/// for any service outside the three the filters act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupService {
    Read,
    Response,
    Write,
    Other(u8),
}

/// Extracts the group service from the two leading application bytes.
///
/// For the three basic group services this reduces to the top two bits of
/// the second byte: `00` = read, `01` = response, `10` = write (spec §6).
pub fn extract_service(apdu: &[u8]) -> Result<GroupService> {
    if apdu.len() < 2 {
        return Err(Error::format("APDU too short for service-code extraction"));
    }
    match apdu[1] & 0xC0 {
        0x00 => Ok(GroupService::Read),
        0x40 => Ok(GroupService::Response),
        0x80 => Ok(GroupService::Write),
        other => Ok(GroupService::Other(other)),
    }
}

/// Rewrites a group-write APDU in place to carry the group-response service
/// code, preserving the lower six bits (spec §4.6).
pub fn rewrite_write_to_response(apdu: &mut [u8]) -> Result<()> {
    if apdu.len() < 2 {
        return Err(Error::format("APDU too short to rewrite"));
    }
    apdu[1] = (apdu[1] & 0x3F) | 0x40;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    message_code: MessageCode,
    source: IndividualAddress,
    destination: Destination,
    priority: Priority,
    hop_count: u8,
    repeat: bool,
    apdu: Vec<u8>,
}

impl Frame {
    pub fn message_code(&self) -> MessageCode {
        self.message_code
    }

    pub fn set_message_code(&mut self, code: MessageCode) {
        self.message_code = code;
    }

    pub fn source(&self) -> IndividualAddress {
        self.source
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn hop_count(&self) -> u8 {
        self.hop_count
    }

    pub fn set_hop_count(&mut self, hop_count: u8) {
        self.hop_count = hop_count;
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub fn apdu(&self) -> &[u8] {
        &self.apdu
    }

    pub fn service(&self) -> Result<GroupService> {
        extract_service(&self.apdu)
    }

    pub fn rewrite_write_to_response(&mut self) -> Result<()> {
        rewrite_write_to_response(&mut self.apdu)
    }
}

pub struct FrameBuilder {
    message_code: MessageCode,
    source: IndividualAddress,
    destination: Option<Destination>,
    priority: Priority,
    hop_count: u8,
    repeat: bool,
    apdu: Vec<u8>,
}

impl FrameBuilder {
    pub fn new(source: IndividualAddress) -> Self {
        Self {
            message_code: MessageCode::Request,
            source,
            destination: None,
            priority: Priority::Normal,
            hop_count: 6,
            repeat: false,
            apdu: Vec::new(),
        }
    }

    pub fn message_code(mut self, code: MessageCode) -> Self {
        self.message_code = code;
        self
    }

    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn hop_count(mut self, hop_count: u8) -> Self {
        self.hop_count = hop_count;
        self
    }

    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn apdu(mut self, apdu: impl Into<Vec<u8>>) -> Self {
        self.apdu = apdu.into();
        self
    }

    pub fn build(self) -> Result<Frame> {
        let destination = self
            .destination
            .ok_or_else(|| Error::invalid_argument("frame has no destination"))?;
        Ok(Frame {
            message_code: self.message_code,
            source: self.source,
            destination,
            priority: self.priority,
            hop_count: self.hop_count,
            repeat: self.repeat,
            apdu: self.apdu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(raw: u16) -> Destination {
        Destination::Group(GroupAddress::from_raw(raw))
    }

    #[test]
    fn extracts_the_three_basic_group_services() {
        assert_eq!(extract_service(&[0x00, 0x00]).unwrap(), GroupService::Read);
        assert_eq!(extract_service(&[0x00, 0x41]).unwrap(), GroupService::Response);
        assert_eq!(extract_service(&[0x00, 0x81]).unwrap(), GroupService::Write);
    }

    #[test]
    fn rewrite_preserves_low_six_bits() {
        let mut apdu = vec![0x00, 0x81];
        rewrite_write_to_response(&mut apdu).unwrap();
        assert_eq!(apdu[1], 0x41);
    }

    #[test]
    fn builder_requires_destination() {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        assert!(FrameBuilder::new(src).apdu([0x00, 0x80]).build().is_err());
    }

    #[test]
    fn builder_builds_a_well_formed_frame() {
        let src = IndividualAddress::new(1, 1, 1).unwrap();
        let frame = FrameBuilder::new(src)
            .destination(group(1))
            .apdu([0x00, 0x80])
            .build()
            .unwrap();
        assert_eq!(frame.source(), src);
        assert_eq!(frame.destination(), group(1));
        assert_eq!(frame.service().unwrap(), GroupService::Write);
    }
}
