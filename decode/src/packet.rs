// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Packets: the unit of data exchanged with the rover, the Watchdog, and the
//! radio.
//!
//! A packet owns the bytes it was decoded from and the payloads found in
//! them. Packets that do not carry a variable-length payload section (custom
//! Watchdog frames, radio chatter, debug text) synthesize payloads from their
//! contents against the prebuilt modules, so every packet can be consumed as a
//! [`PayloadCollection`].

pub mod common;
pub mod custom;
pub mod gds;
pub mod radio_ground;
pub mod reset_ack;
pub mod safety_timer;
pub mod text;

pub use common::CommonPacket;
pub use custom::CommandResponse;
pub use custom::CustomPacket;
pub use custom::CustomPayload;
pub use custom::DetailedStatus;
pub use custom::Heartbeat;
pub use custom::TvacHeartbeat;
pub use radio_ground::RadioGroundPacket;
pub use radio_ground::RadioHelloPacket;
pub use reset_ack::ResetSpecificAckPacket;
pub use safety_timer::SafetyTimerPacket;
pub use text::TextPacket;
pub use text::UnsupportedPacket;

use crate::collection::PayloadCollection;
use crate::payload::reject_unknown;
use crate::payload::State;
use crate::Context;
use crate::Error;
use iris_messages::DataSource;
use iris_messages::Endianness;
use iris_messages::Pathway;
use serde::Deserialize;
use serde::Serialize;

/// Every kind of packet the classifier can produce.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[cfg_attr(test, derive(strum::EnumIter))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub enum PacketKind {
    IrisCommon,
    IrisCommonLegacy,
    WatchdogHeartbeat,
    WatchdogHeartbeatTvac,
    WatchdogDetailedStatus,
    WatchdogCommandResponse,
    RadioGround,
    RadioHello,
    WatchdogDebug,
    WatchdogRadioDebug,
    HerculesRadioUplinkAck,
    RadioUartByte,
    RadioBgApi,
    WatchdogHello,
    RadioDownlinkFlush,
    WatchdogResetSpecificAck,
    WatchdogSafetyTimer,
    Unsupported,
}

impl PacketKind {
    /// The order in which the classifier tries each kind.
    ///
    /// More specific kinds come before the kinds whose validators would also
    /// accept them. `Unsupported` is never tried; it is the fallback.
    pub const PREFERENCE: [PacketKind; 17] = [
        PacketKind::WatchdogHeartbeat,
        PacketKind::WatchdogHeartbeatTvac,
        PacketKind::WatchdogDetailedStatus,
        PacketKind::WatchdogCommandResponse,
        PacketKind::IrisCommon,
        PacketKind::IrisCommonLegacy,
        PacketKind::RadioHello,
        PacketKind::RadioGround,
        PacketKind::WatchdogResetSpecificAck,
        PacketKind::HerculesRadioUplinkAck,
        PacketKind::RadioUartByte,
        PacketKind::RadioBgApi,
        PacketKind::WatchdogSafetyTimer,
        PacketKind::WatchdogRadioDebug,
        PacketKind::WatchdogDebug,
        PacketKind::WatchdogHello,
        PacketKind::RadioDownlinkFlush,
    ];

    /// The class name of the packet kind. Kinds that raise a `GdsPackets`
    /// event use this as the event name.
    pub const fn name(&self) -> &'static str {
        match self {
            PacketKind::IrisCommon => "IrisCommonPacket",
            PacketKind::IrisCommonLegacy => "Legacy2020IrisCommonPacket",
            PacketKind::WatchdogHeartbeat => "WatchdogHeartbeatPacket",
            PacketKind::WatchdogHeartbeatTvac => "WatchdogTvacHeartbeatPacket",
            PacketKind::WatchdogDetailedStatus => "WatchdogDetailedStatusPacket",
            PacketKind::WatchdogCommandResponse => "WatchdogCommandResponsePacket",
            PacketKind::RadioGround => "RadioGroundPacket",
            PacketKind::RadioHello => "RadioHelloPacket",
            PacketKind::WatchdogDebug => "WatchdogDebugPacket",
            PacketKind::WatchdogRadioDebug => "WatchdogRadioDebugPacket",
            PacketKind::HerculesRadioUplinkAck => "HerculesRadioUplinkAckPacket",
            PacketKind::RadioUartByte => "RadioUartBytePacket",
            PacketKind::RadioBgApi => "RadioBgApiPacket",
            PacketKind::WatchdogHello => "WatchdogHelloPacket",
            PacketKind::RadioDownlinkFlush => "RadioDownlinkFlushPacket",
            PacketKind::WatchdogResetSpecificAck => "WatchdogResetSpecificAckPacket",
            PacketKind::WatchdogSafetyTimer => "WatchdogSafetyTimerPacket",
            PacketKind::Unsupported => "UnsupportedPacket",
        }
    }

    /// Return true if `data` looks like a packet of this kind.
    ///
    /// This is a cheap structural check; decoding may still fail.
    pub fn is_valid(&self, data: &[u8]) -> bool {
        match self {
            PacketKind::IrisCommon => CommonPacket::is_valid(data, false),
            PacketKind::IrisCommonLegacy => CommonPacket::is_valid(data, true),
            PacketKind::WatchdogHeartbeat => CustomPacket::<Heartbeat>::is_valid(data),
            PacketKind::WatchdogHeartbeatTvac => CustomPacket::<TvacHeartbeat>::is_valid(data),
            PacketKind::WatchdogDetailedStatus => {
                CustomPacket::<DetailedStatus>::is_valid(data)
            }
            PacketKind::WatchdogCommandResponse => {
                CustomPacket::<CommandResponse>::is_valid(data)
            }
            PacketKind::RadioGround => RadioGroundPacket::is_valid(data),
            PacketKind::RadioHello => RadioHelloPacket::is_valid(data),
            PacketKind::WatchdogResetSpecificAck => ResetSpecificAckPacket::is_valid(data),
            PacketKind::WatchdogSafetyTimer => SafetyTimerPacket::is_valid(data),
            PacketKind::Unsupported => true,
            kind => TextPacket::is_valid(*kind, data),
        }
    }

    /// Decode `data` as a packet of this kind.
    pub fn decode(&self, ctx: &Context, data: &[u8]) -> Result<Packet, Error> {
        let packet = match self {
            PacketKind::IrisCommon => Packet::Common(CommonPacket::decode(ctx, data, false)?),
            PacketKind::IrisCommonLegacy => {
                Packet::Common(CommonPacket::decode(ctx, data, true)?)
            }
            PacketKind::WatchdogHeartbeat => {
                Packet::WatchdogHeartbeat(CustomPacket::decode(ctx, data)?)
            }
            PacketKind::WatchdogHeartbeatTvac => {
                Packet::WatchdogHeartbeatTvac(CustomPacket::decode(ctx, data)?)
            }
            PacketKind::WatchdogDetailedStatus => {
                Packet::WatchdogDetailedStatus(CustomPacket::decode(ctx, data)?)
            }
            PacketKind::WatchdogCommandResponse => {
                Packet::WatchdogCommandResponse(CustomPacket::decode(ctx, data)?)
            }
            PacketKind::RadioGround => Packet::RadioGround(RadioGroundPacket::decode(ctx, data)?),
            PacketKind::RadioHello => Packet::RadioHello(RadioHelloPacket::decode(ctx, data)?),
            PacketKind::WatchdogResetSpecificAck => {
                Packet::WatchdogResetSpecificAck(ResetSpecificAckPacket::decode(ctx, data)?)
            }
            PacketKind::WatchdogSafetyTimer => {
                Packet::WatchdogSafetyTimer(SafetyTimerPacket::decode(ctx, data)?)
            }
            PacketKind::Unsupported => Packet::Unsupported(UnsupportedPacket::decode(ctx, data)),
            kind => Packet::Text(TextPacket::decode(ctx, *kind, data)?),
        };
        Ok(packet)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PREFERENCE
            .iter()
            .chain(core::iter::once(&PacketKind::Unsupported))
            .find(|k| k.name() == name)
            .copied()
    }
}

impl core::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Operations every concrete packet type supports.
pub trait PacketCodec: Sized {
    /// The bytes the packet was decoded from.
    fn raw(&self) -> &[u8];

    fn payloads(&self) -> &PayloadCollection;

    fn payloads_mut(&mut self) -> &mut PayloadCollection;

    /// Produce the packet's wire form.
    ///
    /// Most packets are only ever received, and encode to the bytes they were
    /// decoded from.
    fn encode(&self, _ctx: &Context) -> Result<Vec<u8>, Error> {
        Ok(self.raw().to_vec())
    }

    /// Packet-level state that cannot be recovered from the raw bytes.
    fn state(&self) -> State {
        State::new()
    }

    fn set_state(&mut self, state: State) -> Result<(), Error> {
        reject_unknown(state)
    }
}

/// A decoded packet of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Common(CommonPacket),
    WatchdogHeartbeat(CustomPacket<Heartbeat>),
    WatchdogHeartbeatTvac(CustomPacket<TvacHeartbeat>),
    WatchdogDetailedStatus(CustomPacket<DetailedStatus>),
    WatchdogCommandResponse(CustomPacket<CommandResponse>),
    RadioGround(RadioGroundPacket),
    RadioHello(RadioHelloPacket),
    Text(TextPacket),
    WatchdogResetSpecificAck(ResetSpecificAckPacket),
    WatchdogSafetyTimer(SafetyTimerPacket),
    Unsupported(UnsupportedPacket),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $e:expr) => {
        match $self {
            Packet::Common($p) => $e,
            Packet::WatchdogHeartbeat($p) => $e,
            Packet::WatchdogHeartbeatTvac($p) => $e,
            Packet::WatchdogDetailedStatus($p) => $e,
            Packet::WatchdogCommandResponse($p) => $e,
            Packet::RadioGround($p) => $e,
            Packet::RadioHello($p) => $e,
            Packet::Text($p) => $e,
            Packet::WatchdogResetSpecificAck($p) => $e,
            Packet::WatchdogSafetyTimer($p) => $e,
            Packet::Unsupported($p) => $e,
        }
    };
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Common(p) if p.is_legacy() => PacketKind::IrisCommonLegacy,
            Packet::Common(_) => PacketKind::IrisCommon,
            Packet::WatchdogHeartbeat(_) => PacketKind::WatchdogHeartbeat,
            Packet::WatchdogHeartbeatTvac(_) => PacketKind::WatchdogHeartbeatTvac,
            Packet::WatchdogDetailedStatus(_) => PacketKind::WatchdogDetailedStatus,
            Packet::WatchdogCommandResponse(_) => PacketKind::WatchdogCommandResponse,
            Packet::RadioGround(_) => PacketKind::RadioGround,
            Packet::RadioHello(_) => PacketKind::RadioHello,
            Packet::Text(p) => p.kind(),
            Packet::WatchdogResetSpecificAck(_) => PacketKind::WatchdogResetSpecificAck,
            Packet::WatchdogSafetyTimer(_) => PacketKind::WatchdogSafetyTimer,
            Packet::Unsupported(_) => PacketKind::Unsupported,
        }
    }

    pub fn raw(&self) -> &[u8] {
        dispatch!(self, p => p.raw())
    }

    pub fn encode(&self, ctx: &Context) -> Result<Vec<u8>, Error> {
        dispatch!(self, p => p.encode(ctx))
    }

    pub fn payloads(&self) -> &PayloadCollection {
        dispatch!(self, p => p.payloads())
    }

    pub fn payloads_mut(&mut self) -> &mut PayloadCollection {
        dispatch!(self, p => p.payloads_mut())
    }

    pub fn state(&self) -> State {
        dispatch!(self, p => p.state())
    }

    pub fn set_state(&mut self, state: State) -> Result<(), Error> {
        dispatch!(self, p => p.set_state(state))
    }

    /// Stamp every payload with the pathway the packet arrived on.
    pub fn set_pathway(&mut self, pathway: Pathway) {
        self.payloads_mut().set_pathway(pathway);
    }

    pub fn set_source(&mut self, source: DataSource) {
        self.payloads_mut().set_source(source);
    }

    pub fn to_serialized(&self, ctx: &Context) -> SerializedPacket {
        SerializedPacket {
            kind: self.kind(),
            raw: self.raw().to_vec(),
            endianness: ctx.endianness,
            state: self.state(),
            payloads: self.payloads().state(),
        }
    }

    /// Rebuild a packet by re-decoding its raw bytes, then restoring the
    /// packet's state and its payloads.
    ///
    /// The payloads are restored from their own records, not re-derived, so
    /// pathway and timing metadata survive the trip.
    pub fn from_serialized(ctx: &Context, s: &SerializedPacket) -> Result<Self, Error> {
        let ctx = ctx.clone().with_endianness(s.endianness);
        let mut packet = s.kind.decode(&ctx, &s.raw)?;
        packet.set_state(s.state.clone())?;
        *packet.payloads_mut() = PayloadCollection::from_state(&ctx, &s.payloads)?;
        Ok(packet)
    }
}

impl core::fmt::Display for Packet {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        dispatch!(self, p => core::fmt::Display::fmt(p, f))
    }
}

/// A packet in transportable form.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SerializedPacket {
    pub kind: PacketKind,
    pub raw: Vec<u8>,
    pub endianness: Endianness,
    pub state: State,
    /// The contained payloads, as produced by [`PayloadCollection::state`].
    pub payloads: State,
}

#[cfg(test)]
mod tests {
    use super::Packet;
    use super::PacketKind;
    use super::SerializedPacket;
    use crate::classifier::classify;
    use crate::test_support;
    use iris_messages::DataSource;
    use iris_messages::Pathway;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in PacketKind::iter() {
            assert_eq!(PacketKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PacketKind::from_name("Packet"), None);
    }

    #[test]
    fn test_preference_covers_every_kind_but_unsupported() {
        for kind in PacketKind::iter() {
            let listed = PacketKind::PREFERENCE.contains(&kind);
            assert_eq!(listed, kind != PacketKind::Unsupported, "{kind}");
        }
    }

    #[test]
    fn test_serialized_round_trip_keeps_payload_metadata() {
        let ctx = test_support::ctx();
        let mut packet = classify(&ctx, &[0xFF, 0xDA, 0x30, 0x81]);
        assert_eq!(packet.kind(), PacketKind::WatchdogHeartbeat);
        packet.set_pathway(Pathway::Wireless);
        packet.set_source(DataSource::Pcap);

        let s = packet.to_serialized(&ctx);
        let json = serde_json::to_string(&s).unwrap();
        let back: SerializedPacket = serde_json::from_str(&json).unwrap();
        let rebuilt = Packet::from_serialized(&ctx, &back).unwrap();
        assert_eq!(rebuilt, packet);
        for p in rebuilt.payloads().all_payloads() {
            assert_eq!(p.metadata().pathway, Pathway::Wireless);
            assert_eq!(p.metadata().source, DataSource::Pcap);
        }
    }

    #[test]
    fn test_serialized_state_is_applied() {
        let ctx = test_support::ctx();
        let packet = classify(&ctx, b"DEBUG hello there");
        let mut s = packet.to_serialized(&ctx);
        s.state.insert(String::from("bogus"), serde_json::Value::Null);
        assert!(Packet::from_serialized(&ctx, &s).is_err());
    }
}
