// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Wire-level primitives for the Iris rover ground segment.
//!
//! This crate knows how individual fields, magics, and fixed headers are laid
//! out on the wire. It knows nothing about the data standards registry or the
//! packets that are built out of these pieces; see `iris-decode` for those.

pub mod codec;
pub mod data_type;
pub mod flags;
pub mod header;
pub mod magic;

pub use codec::Value;
pub use data_type::Category;
pub use data_type::FswDataType;
pub use magic::Magic;

use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// The largest packet the Watchdog will send or accept.
pub const MTU_WATCHDOG: usize = 255;

/// The largest packet Hercules will send or accept.
pub const MTU_HERCULES: usize = 1006;

/// An error encoding or decoding wire-level data.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown magic 0x{0:08X}")]
    UnknownMagic(u32),

    #[error("buffer too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("declared length {declared} exceeds the {available} bytes available")]
    LengthExceedsBuffer { declared: usize, available: usize },

    #[error("declared length {declared} exceeds the capacity of {datatype}")]
    LengthExceedsCapacity {
        datatype: FswDataType,
        declared: usize,
    },

    #[error("value {value} is out of range for {datatype}")]
    OutOfRange { datatype: FswDataType, value: String },

    #[error("{datatype} expects a {expected} value, got {got}")]
    WrongCategory {
        datatype: FswDataType,
        expected: Category,
        got: &'static str,
    },

    #[error(
        "string contains a null byte at offset {offset}; \
        use the IrisByteString type to send arbitrary bytes"
    )]
    EmbeddedNull { offset: usize },

    #[error("invalid escape sequence at offset {0}")]
    BadEscape(usize),

    #[error("the INVALID data type cannot be encoded or decoded")]
    EmptyType,

    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("fixed header framing failed")]
    Framing,
}

impl From<hubpack::Error> for Error {
    fn from(_: hubpack::Error) -> Self {
        Error::Framing
    }
}

/// Byte order used for multi-byte numeric fields.
///
/// All Iris flight data is little-endian. Strings carry their length prefix
/// big-endian regardless of this setting.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// How data moved between the rover and the ground.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pathway {
    Wired,
    Wireless,
    #[default]
    None,
}

/// The ground-side transport or ingestion point that produced some data.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    #[default]
    None,
    Yamcs,
    UdpServer,
    WifiDirect,
    Pcap,
    Generated,
    Database,
}

/// A 16-bit identifier for a command, telemetry channel, or event.
///
/// The high byte is the module ID, and the low byte is the item ID within that
/// module.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub struct Opcode(pub u16);

impl Opcode {
    pub const fn new(module_id: u8, item_id: u8) -> Self {
        Self(((module_id as u16) << 8) | item_id as u16)
    }

    pub const fn module_id(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn item_id(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn to_bytes(self, endianness: Endianness) -> [u8; 2] {
        match endianness {
            Endianness::Little => self.0.to_le_bytes(),
            Endianness::Big => self.0.to_be_bytes(),
        }
    }

    pub fn from_bytes(buf: &[u8], endianness: Endianness) -> Result<Self, Error> {
        let Some(bytes) = buf.get(..2) else {
            return Err(Error::Truncated {
                needed: 2,
                available: buf.len(),
            });
        };
        let word = [bytes[0], bytes[1]];
        Ok(Self(match endianness {
            Endianness::Little => u16::from_le_bytes(word),
            Endianness::Big => u16::from_be_bytes(word),
        }))
    }
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Compute the ones-complement of the modular sum of `data`.
///
/// This is the trailing checksum used by the Iris Common Packet header.
pub fn checksum(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
