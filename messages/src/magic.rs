// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The 4-byte magics that tag each payload inside a variable-length payload.
//!
//! Magics are append-only. A value may be deprecated, but it is never removed,
//! renumbered, or repurposed.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// A payload magic.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(test, derive(strum::EnumIter))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Magic {
    /// Placeholder for a slot with no magic. Never valid inside a VLP.
    #[default]
    Missing,
    Command,
    WatchdogCommand,
    RadioCommand,
    Telemetry,
    Event,
    File,
}

impl Magic {
    /// The number of bytes a magic occupies on the wire.
    pub const SIZE: usize = 4;

    pub const fn value(&self) -> u32 {
        match self {
            Magic::Missing => 0xBEEF_EEEE,
            Magic::Command => 0x00BA_DA55,
            Magic::WatchdogCommand => 0xC000_FFEE,
            Magic::RadioCommand => 0x10AD_09D0,
            Magic::Telemetry => 0xC000_10FF,
            Magic::Event => 0x0DEA_DBAD,
            Magic::File => 0xDABA_D000,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Magic::Missing => "Missing",
            Magic::Command => "Commands",
            Magic::WatchdogCommand => "Commands Destined for Watchdog Hardware",
            Magic::RadioCommand => "Commands Destined for Radio's internal MCU",
            Magic::Telemetry => "Telemetry",
            Magic::Event => "Events (Logs)",
            Magic::File => "Files (Images, UWB, etc.)",
        }
    }

    /// Return true if this magic should no longer be sent.
    ///
    /// Deprecated magics still encode and decode; callers are expected to warn.
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Magic::Missing)
    }

    pub fn from_value(value: u32) -> Result<Self, Error> {
        match value {
            0xBEEF_EEEE => Ok(Magic::Missing),
            0x00BA_DA55 => Ok(Magic::Command),
            0xC000_FFEE => Ok(Magic::WatchdogCommand),
            0x10AD_09D0 => Ok(Magic::RadioCommand),
            0xC000_10FF => Ok(Magic::Telemetry),
            0x0DEA_DBAD => Ok(Magic::Event),
            0xDABA_D000 => Ok(Magic::File),
            x => Err(Error::UnknownMagic(x)),
        }
    }

    /// Encode the magic as a little-endian `u32`.
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.value().to_le_bytes()
    }

    /// Decode the magic from the first four bytes of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        match buf.get(..Self::SIZE) {
            Some(&[a, b, c, d]) => Self::from_value(u32::from_le_bytes([a, b, c, d])),
            _ => Err(Error::Truncated {
                needed: Self::SIZE,
                available: buf.len(),
            }),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Magic::Missing => "MISSING",
            Magic::Command => "COMMAND",
            Magic::WatchdogCommand => "WATCHDOG_COMMAND",
            Magic::RadioCommand => "RADIO_COMMAND",
            Magic::Telemetry => "TELEMETRY",
            Magic::Event => "EVENT",
            Magic::File => "FILE",
        }
    }
}

impl core::fmt::Display for Magic {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.value())
    }
}
