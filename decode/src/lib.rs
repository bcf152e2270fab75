// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Decode and encode Iris packets and the payloads they carry.
//!
//! Everything here is synchronous and performs no I/O. Each decode path takes
//! a [`Context`], which carries the data standards used to interpret fields,
//! the logger, and the byte order of numeric fields.

pub mod classifier;
pub mod collection;
pub mod packet;
pub mod payload;
pub mod prebuilt;
pub mod standards;
pub mod utils;
pub mod vlp;

pub use classifier::classify;
pub use collection::PayloadCollection;
pub use packet::Packet;
pub use packet::PacketKind;
pub use payload::Payload;
pub use payload::PayloadKind;
pub use standards::DataStandards;

use iris_messages::Endianness;
use iris_messages::Error as MessageError;
use slog::Logger;
use std::sync::Arc;
use thiserror::Error;

/// An error decoding or encoding Iris data.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("wire format error: {0}")]
    Wire(#[from] MessageError),

    #[error("decoding failed: {reason} [{}]", utils::hex_colon(.data))]
    Decode { data: Vec<u8>, reason: String },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("data standards lookup failed: {0}")]
    Registry(String),

    #[error("prebuilt module '{0}' is not present in the data standards")]
    MissingPrebuilt(&'static str),

    #[error("incomplete implementation: {0}")]
    Implementation(String),

    #[error("invalid serialized state: {0}")]
    State(String),
}

impl Error {
    /// Construct a decoding error carrying a copy of the offending bytes.
    pub fn decode(data: &[u8], reason: impl Into<String>) -> Self {
        Error::Decode {
            data: data.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Everything a decoder needs besides the bytes themselves.
#[derive(Clone, Debug)]
pub struct Context {
    /// The registry used to resolve opcodes and field types.
    pub standards: Arc<DataStandards>,
    pub log: Logger,
    /// Byte order of numeric fields. All Iris flight data is little-endian.
    pub endianness: Endianness,
}

impl Context {
    pub fn new(standards: Arc<DataStandards>, log: Logger) -> Self {
        Self {
            standards,
            log,
            endianness: Endianness::Little,
        }
    }

    /// Build a context from the process-wide default standards.
    pub fn from_default(log: Logger) -> Result<Self, Error> {
        let standards = standards::default_standards().ok_or_else(|| {
            Error::Registry(String::from("no default data standards have been set"))
        })?;
        Ok(Self::new(standards, log))
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Return a copy of this context whose logger carries extra key-values.
    pub fn child<T>(&self, values: slog::OwnedKV<T>) -> Self
    where
        T: slog::SendSyncRefUnwindSafeKV + 'static,
    {
        Self {
            standards: Arc::clone(&self.standards),
            log: self.log.new(values),
            endianness: self.endianness,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::standards::Argument;
    use crate::standards::Command;
    use crate::standards::DataStandards;
    use crate::standards::EnumItem;
    use crate::standards::Event;
    use crate::standards::Module;
    use crate::standards::Severity;
    use crate::standards::TelemetryChannel;
    use crate::Context;
    use crate::PayloadCollection;
    use iris_messages::FswDataType;
    use iris_messages::Value;
    use std::sync::Arc;

    /// A module with one command taking a single `U16` argument.
    pub fn example_mod() -> Module {
        Module::new(
            0x03,
            "ExampleMod",
            vec![
                Command::new(
                    0x05,
                    "DoThing",
                    vec![Argument::new("n", FswDataType::U16)],
                ),
                Command::new(
                    0x06,
                    "SetMode",
                    vec![
                        Argument::new("mode", FswDataType::Enum).with_enum(vec![
                            EnumItem::new("IDLE", 0),
                            EnumItem::new("DRIVE", 7),
                        ]),
                        Argument::new("label", FswDataType::String8),
                    ],
                ),
            ],
            vec![],
            vec![Event::new(
                0x01,
                "ModeChanged",
                Severity::ActivityHi,
                "Mode is now %s after %d ms (0x%04X).",
                vec![
                    Argument::new("mode", FswDataType::Enum).with_enum(vec![
                        EnumItem::new("IDLE", 0),
                        EnumItem::new("DRIVE", 7),
                    ]),
                    Argument::new("elapsed", FswDataType::U32),
                    Argument::new("code", FswDataType::U16),
                ],
            )],
        )
        .unwrap()
    }

    /// A module with one signed telemetry channel.
    pub fn thermo() -> Module {
        Module::new(
            0x10,
            "Thermo",
            vec![],
            vec![
                TelemetryChannel::new(0x02, "Temp", FswDataType::I16),
                TelemetryChannel::new(0x03, "Label", FswDataType::VarString255),
            ],
            vec![],
        )
        .unwrap()
    }

    /// A cut-down Watchdog command module.
    pub fn watchdog_interface() -> Module {
        Module::new(
            0x00,
            crate::prebuilt::WATCHDOG_INTERFACE,
            vec![
                Command::new(
                    0x00,
                    "WatchDogInterface_ResetSpecific",
                    vec![Argument::new("reset_value", FswDataType::Enum).with_enum(vec![
                        EnumItem::new("NO_RESET", 0x00),
                        EnumItem::new("HERCULES_RESET", 0x01),
                        EnumItem::new("RADIO_POWER_ON", 0x07),
                    ])],
                ),
                Command::new(0x03, "WatchDogInterface_Stroke", vec![]),
            ],
            vec![],
            vec![],
        )
        .unwrap()
    }

    pub fn standards() -> Arc<DataStandards> {
        let mut standards = DataStandards::with_prebuilt().unwrap();
        standards
            .add_modules(vec![example_mod(), thermo(), watchdog_interface()])
            .unwrap();
        Arc::new(standards)
    }

    pub fn ctx() -> Context {
        Context::new(standards(), slog::Logger::root(slog::Discard, slog::o!()))
    }

    /// The value of the first telemetry sample labelled `Module.Channel`.
    pub fn sample(payloads: &PayloadCollection, label: &str) -> Option<Value> {
        payloads
            .telemetry()
            .find(|t| t.label() == label)
            .map(|t| t.data().clone())
    }
}
