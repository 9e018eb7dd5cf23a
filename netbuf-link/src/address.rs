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

//! Group and individual addresses (spec §6): both are 16-bit values with
//! two alternate bit partitions used only for formatting and parsing.

use std::fmt;
use std::str::FromStr;

use netbuf_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 16-bit group address, partitioned either as `{main:5, middle:3, sub:8}`
/// (three-level, the conventional form) or `{main:5, sub:11}` (two-level).
/// Both views describe the same sixteen bits; the cache and filters only
/// ever compare/hash the raw value.
///
/// Serializes as the raw `u16` so datapoint configuration files can name
/// addresses compactly; textual `1/2/3` form goes through `Display`/`FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupAddress(u16);

impl GroupAddress {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    pub fn new_three_level(main: u8, middle: u8, sub: u8) -> Result<Self> {
        if main > 0x1F {
            return Err(Error::invalid_argument("group address main segment exceeds 5 bits"));
        }
        if middle > 0x07 {
            return Err(Error::invalid_argument("group address middle segment exceeds 3 bits"));
        }
        Ok(Self(((main as u16) << 11) | ((middle as u16) << 8) | sub as u16))
    }

    pub fn new_two_level(main: u8, sub: u16) -> Result<Self> {
        if main > 0x1F {
            return Err(Error::invalid_argument("group address main segment exceeds 5 bits"));
        }
        if sub > 0x07FF {
            return Err(Error::invalid_argument("group address sub segment exceeds 11 bits"));
        }
        Ok(Self(((main as u16) << 11) | sub))
    }

    pub fn main(&self) -> u8 {
        (self.0 >> 11) as u8
    }

    pub fn middle(&self) -> u8 {
        ((self.0 >> 8) & 0x07) as u8
    }

    pub fn sub8(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn sub11(&self) -> u16 {
        self.0 & 0x07FF
    }
}

impl fmt::Display for GroupAddress {
    /// Always renders the three-level form; parsing accepts both.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.middle(), self.sub8())
    }
}

impl FromStr for GroupAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = split_address(s)?;
        match parts.len() {
            3 => GroupAddress::new_three_level(parts[0], parts[1], parts[2]),
            2 => GroupAddress::new_two_level(parts[0], parts[1] as u16),
            n => Err(Error::format(format!("group address has {n} segments, expected 2 or 3"))),
        }
    }
}

/// A 16-bit individual address, partitioned `{area:4, line:4, device:8}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndividualAddress(u16);

impl IndividualAddress {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    pub fn new(area: u8, line: u8, device: u8) -> Result<Self> {
        if area > 0x0F {
            return Err(Error::invalid_argument("individual address area segment exceeds 4 bits"));
        }
        if line > 0x0F {
            return Err(Error::invalid_argument("individual address line segment exceeds 4 bits"));
        }
        Ok(Self(((area as u16) << 12) | ((line as u16) << 8) | device as u16))
    }

    pub fn area(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    pub fn line(&self) -> u8 {
        ((self.0 >> 8) & 0x0F) as u8
    }

    pub fn device(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = split_address(s)?;
        match parts.len() {
            3 => IndividualAddress::new(parts[0], parts[1], parts[2]),
            n => Err(Error::format(format!("individual address has {n} segments, expected 3"))),
        }
    }
}

/// Splits on `.` or `/`, whichever the string contains; mixing both is a
/// format error rather than silently picking one (spec §6).
fn split_address(s: &str) -> Result<Vec<u8>> {
    let has_dot = s.contains('.');
    let has_slash = s.contains('/');
    let sep = match (has_dot, has_slash) {
        (true, true) => return Err(Error::format("address mixes '.' and '/' separators")),
        (true, false) => '.',
        (false, true) => '/',
        (false, false) => return Err(Error::format("address has no recognized separator")),
    };
    s.split(sep)
        .map(|seg| seg.parse::<u8>().map_err(|_| Error::format(format!("invalid address segment: {seg}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_address_three_level_round_trips() {
        let a = GroupAddress::new_three_level(1, 2, 3).unwrap();
        assert_eq!(a.to_string(), "1/2/3");
        assert_eq!("1/2/3".parse::<GroupAddress>().unwrap(), a);
    }

    #[test]
    fn group_address_two_level_parses() {
        let a: GroupAddress = "1/2047".parse().unwrap();
        assert_eq!(a.main(), 1);
        assert_eq!(a.sub11(), 2047);
    }

    #[test]
    fn group_address_dot_separator_also_parses() {
        let a: GroupAddress = "1.2.3".parse().unwrap();
        assert_eq!(a, GroupAddress::new_three_level(1, 2, 3).unwrap());
    }

    #[test]
    fn mixed_separators_are_rejected() {
        assert!("1.2/3".parse::<GroupAddress>().is_err());
    }

    #[test]
    fn main_segment_out_of_range_is_rejected() {
        assert!(GroupAddress::new_three_level(32, 0, 0).is_err());
    }

    #[test]
    fn individual_address_round_trips() {
        let a = IndividualAddress::new(1, 1, 200).unwrap();
        assert_eq!(a.to_string(), "1.1.200");
        assert_eq!("1.1.200".parse::<IndividualAddress>().unwrap(), a);
    }
}
