// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Payloads carried inside the variable-length section of a common packet.
//!
//! Each payload owns a copy of the bytes it was decoded from (or was encoded
//! to, when built on the ground), excluding its magic. Everything that cannot
//! be recovered from those bytes, such as the pathway the payload took or when
//! it reached each hop, is carried separately and serialized as a state map.

pub mod command;
pub mod event;
pub mod file;
pub mod telemetry;

pub use command::CommandKind;
pub use command::CommandPayload;
pub use event::EventPayload;
pub use file::FileBlockPayload;
pub use file::FileMetadata;
pub use file::FileType;
pub use telemetry::TelemetryPayload;

use crate::standards::Argument;
use crate::Context;
use crate::Error;
use chrono::DateTime;
use chrono::Utc;
use iris_messages::codec;
use iris_messages::DataSource;
use iris_messages::Endianness;
use iris_messages::FswDataType;
use iris_messages::Magic;
use iris_messages::Pathway;
use iris_messages::Value;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;

/// A side-channel state record.
pub type State = Map<String, serde_json::Value>;

/// When a downlinked payload reached each hop on its way to the ground.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub struct DownlinkTimes {
    pub rover_emission: Option<DateTime<Utc>>,
    pub lander_rx: Option<DateTime<Utc>>,
    pub amcc_rx: Option<DateTime<Utc>>,
    pub pmcc_rx: Option<DateTime<Utc>>,
}

/// When an uplinked payload left or reached each hop on its way to the rover.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub struct UplinkTimes {
    pub pmcc_tx: Option<DateTime<Utc>>,
    pub amcc_rx: Option<DateTime<Utc>>,
    pub amcc_tx: Option<DateTime<Utc>>,
    pub lander_rx: Option<DateTime<Utc>>,
    pub rover_rx: Option<DateTime<Utc>>,
}

/// Acknowledgement and timing state of an uplinked payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub struct UplinkState {
    /// Mission control has acknowledged receipt.
    pub amcc_ack: bool,
    /// The rover has acknowledged receipt.
    pub rover_ack: bool,
    pub uplink_times: Option<UplinkTimes>,
}

/// Metadata shared by every payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub magic: Magic,
    pub pathway: Pathway,
    pub source: DataSource,
    pub endianness: Endianness,
}

impl Metadata {
    pub fn new(magic: Magic, endianness: Endianness) -> Self {
        Self {
            magic,
            endianness,
            ..Default::default()
        }
    }

    fn state(&self) -> State {
        let mut state = State::new();
        state.insert(String::from("magic"), to_json(&self.magic));
        state.insert(String::from("pathway"), to_json(&self.pathway));
        state.insert(String::from("source"), to_json(&self.source));
        state
    }

    fn apply_state(&mut self, state: &mut State) -> Result<(), Error> {
        self.magic = take_key(state, "magic")?;
        self.pathway = take_key(state, "pathway")?;
        self.source = take_key(state, "source")?;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    // None of the metadata types can fail to serialize.
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Remove `key` from `state` and deserialize it.
pub(crate) fn take_key<T: DeserializeOwned>(state: &mut State, key: &str) -> Result<T, Error> {
    let value = state
        .remove(key)
        .ok_or_else(|| Error::State(format!("missing key '{key}'")))?;
    serde_json::from_value(value).map_err(|e| Error::State(format!("key '{key}': {e}")))
}

/// Fail if anything is left in `state` after every known key was taken.
pub(crate) fn reject_unknown(state: State) -> Result<(), Error> {
    match state.keys().next() {
        None => Ok(()),
        Some(key) => Err(Error::State(format!("unknown key '{key}'"))),
    }
}

/// Operations every concrete payload type supports.
pub trait PayloadCodec: Sized {
    /// Decode one payload from the front of `data`, which starts just after
    /// the magic. Returns the payload and the number of bytes consumed.
    fn decode(ctx: &Context, data: &[u8]) -> Result<(Self, usize), Error>;

    /// The payload's wire form, excluding the magic.
    fn raw(&self) -> &[u8];

    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;

    fn state(&self) -> State;

    fn set_state(&mut self, state: State) -> Result<(), Error>;

    fn encode(&self) -> Vec<u8> {
        self.raw().to_vec()
    }

    fn magic(&self) -> Magic {
        self.metadata().magic
    }
}

fn uplink_state(meta: &Metadata, uplink: &UplinkState) -> State {
    let mut state = meta.state();
    state.insert(String::from("amcc_ack"), serde_json::Value::Bool(uplink.amcc_ack));
    state.insert(String::from("rover_ack"), serde_json::Value::Bool(uplink.rover_ack));
    state.insert(String::from("uplink_times"), to_json(&uplink.uplink_times));
    state
}

fn apply_uplink_state(
    meta: &mut Metadata,
    uplink: &mut UplinkState,
    mut state: State,
) -> Result<(), Error> {
    meta.apply_state(&mut state)?;
    uplink.amcc_ack = take_key(&mut state, "amcc_ack")?;
    uplink.rover_ack = take_key(&mut state, "rover_ack")?;
    uplink.uplink_times = take_key(&mut state, "uplink_times")?;
    reject_unknown(state)
}

fn downlink_state(meta: &Metadata, times: &Option<DownlinkTimes>) -> State {
    let mut state = meta.state();
    state.insert(String::from("downlink_times"), to_json(times));
    state
}

fn apply_downlink_state(
    meta: &mut Metadata,
    times: &mut Option<DownlinkTimes>,
    mut state: State,
) -> Result<(), Error> {
    meta.apply_state(&mut state)?;
    *times = take_key(&mut state, "downlink_times")?;
    reject_unknown(state)
}

/// Check that `args` names only declared arguments, each at most once.
pub(crate) fn check_args(
    owner: &str,
    decls: &[Argument],
    args: &[(String, Value)],
) -> Result<(), Error> {
    for (i, (name, _)) in args.iter().enumerate() {
        if !decls.iter().any(|a| a.name == *name) {
            return Err(Error::Encode(format!("{owner} has no argument {name}")));
        }
        if args[..i].iter().any(|(n, _)| n == name) {
            return Err(Error::Encode(format!("argument {name} given more than once")));
        }
    }
    Ok(())
}

/// Encode each declared argument in order, looking its value up by name.
pub(crate) fn encode_args(
    decls: &[Argument],
    args: &[(String, Value)],
    enum_wire: FswDataType,
    endianness: Endianness,
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    for decl in decls.iter() {
        let value = args
            .iter()
            .find(|(name, _)| *name == decl.name)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Encode(format!("missing argument {}", decl.name)))?;
        out.extend(encode_field(decl, value, enum_wire, endianness)?);
    }
    Ok(out)
}

/// Decode each declared argument in order. Returns the values and the number
/// of bytes consumed.
pub(crate) fn decode_args(
    decls: &[Argument],
    data: &[u8],
    enum_wire: FswDataType,
    endianness: Endianness,
) -> Result<(Vec<(String, Value)>, usize), Error> {
    let mut cursor = 0;
    let mut args = Vec::with_capacity(decls.len());
    for decl in decls.iter() {
        let (value, n) = decode_field(decl, &data[cursor..], enum_wire, endianness)?;
        args.push((decl.name.clone(), value));
        cursor += n;
    }
    Ok((args, cursor))
}

/// Resolve a name or number given for an enumerated field to its value.
fn enum_value_of(arg: &Argument, value: &Value) -> Result<i64, Error> {
    let found = match value {
        Value::Str(name) => arg.enum_value(name),
        v => v
            .as_integer()
            .and_then(|x| i64::try_from(x).ok())
            .filter(|x| arg.enum_item(*x).is_some()),
    };
    found.ok_or_else(|| {
        let names: Vec<&str> = arg.enum_items.iter().map(|e| e.name.as_str()).collect();
        Error::Encode(format!(
            "'{value}' is not a variant of enum argument {} (valid: {})",
            arg.name,
            names.join(", ")
        ))
    })
}

/// Encode one argument or telemetry value.
///
/// Enumerated fields accept either a variant name or its value and are written
/// as `wire`; every other field is written as its declared type.
pub(crate) fn encode_field(
    arg: &Argument,
    value: &Value,
    wire: FswDataType,
    endianness: Endianness,
) -> Result<Vec<u8>, Error> {
    if arg.is_enum() {
        let v = enum_value_of(arg, value)?;
        return Ok(codec::encode(wire, &Value::Signed(v), endianness)?);
    }
    codec::encode(arg.datatype, value, endianness).map_err(|e| {
        Error::Encode(format!("argument {}: {e}", arg.name))
    })
}

/// Decode one argument or telemetry value, translating enums to their
/// variant names.
pub(crate) fn decode_field(
    arg: &Argument,
    data: &[u8],
    wire: FswDataType,
    endianness: Endianness,
) -> Result<(Value, usize), Error> {
    let datatype = if arg.is_enum() { wire } else { arg.datatype };
    let (value, n) = codec::decode(datatype, data, endianness)
        .map_err(|e| Error::decode(data, format!("argument {}: {e}", arg.name)))?;
    if !arg.is_enum() {
        return Ok((value, n));
    }
    let name = value
        .as_integer()
        .and_then(|x| i64::try_from(x).ok())
        .and_then(|x| arg.enum_name(x))
        .ok_or_else(|| {
            Error::decode(
                &data[..n],
                format!("value {value} is not a variant of enum argument {}", arg.name),
            )
        })?;
    Ok((Value::Str(name.to_string()), n))
}

/// Render a value for display, showing both the name and number of an enum.
pub(crate) fn display_value(arg: &Argument, value: &Value) -> String {
    match value {
        Value::Str(name) if arg.is_enum() => match arg.enum_value(name) {
            Some(v) => format!("{name} ({v})"),
            None => name.clone(),
        },
        v => v.to_string(),
    }
}

/// The concrete payload types. Each has a bucket in a
/// [`PayloadCollection`](crate::PayloadCollection).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[cfg_attr(test, derive(strum::EnumIter))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
pub enum PayloadKind {
    Command,
    WatchdogCommand,
    Telemetry,
    Event,
    FileBlock,
}

impl PayloadKind {
    /// Every kind, in bucket order.
    pub const ALL: [PayloadKind; 5] = [
        PayloadKind::Command,
        PayloadKind::WatchdogCommand,
        PayloadKind::Telemetry,
        PayloadKind::Event,
        PayloadKind::FileBlock,
    ];

    pub const fn index(&self) -> usize {
        match self {
            PayloadKind::Command => 0,
            PayloadKind::WatchdogCommand => 1,
            PayloadKind::Telemetry => 2,
            PayloadKind::Event => 3,
            PayloadKind::FileBlock => 4,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            PayloadKind::Command => "CommandPayload",
            PayloadKind::WatchdogCommand => "WatchdogCommandPayload",
            PayloadKind::Telemetry => "TelemetryPayload",
            PayloadKind::Event => "EventPayload",
            PayloadKind::FileBlock => "FileBlockPayload",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl core::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A decoded payload of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Command(CommandPayload),
    Telemetry(TelemetryPayload),
    Event(EventPayload),
    FileBlock(FileBlockPayload),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $e:expr) => {
        match $self {
            Payload::Command($p) => $e,
            Payload::Telemetry($p) => $e,
            Payload::Event($p) => $e,
            Payload::FileBlock($p) => $e,
        }
    };
}

impl Payload {
    /// Decode the payload that follows `magic` at the front of `data`.
    pub fn decode(ctx: &Context, magic: Magic, data: &[u8]) -> Result<(Self, usize), Error> {
        let (mut payload, n) = match magic {
            Magic::Command | Magic::RadioCommand => {
                let (p, n) = CommandPayload::decode_as(ctx, data, CommandKind::Standard)?;
                (Payload::Command(p), n)
            }
            Magic::WatchdogCommand => {
                let (p, n) = CommandPayload::decode_as(ctx, data, CommandKind::Watchdog)?;
                (Payload::Command(p), n)
            }
            Magic::Telemetry => {
                let (p, n) = TelemetryPayload::decode(ctx, data)?;
                (Payload::Telemetry(p), n)
            }
            Magic::Event => {
                let (p, n) = EventPayload::decode(ctx, data)?;
                (Payload::Event(p), n)
            }
            Magic::File => {
                let (p, n) = FileBlockPayload::decode(ctx, data)?;
                (Payload::FileBlock(p), n)
            }
            Magic::Missing => {
                return Err(Error::decode(data, "no payload type has the MISSING magic"))
            }
        };
        payload.metadata_mut().magic = magic;
        Ok((payload, n))
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Command(p) => match p.kind() {
                CommandKind::Standard => PayloadKind::Command,
                CommandKind::Watchdog => PayloadKind::WatchdogCommand,
            },
            Payload::Telemetry(_) => PayloadKind::Telemetry,
            Payload::Event(_) => PayloadKind::Event,
            Payload::FileBlock(_) => PayloadKind::FileBlock,
        }
    }

    pub fn magic(&self) -> Magic {
        dispatch!(self, p => p.magic())
    }

    pub fn raw(&self) -> &[u8] {
        dispatch!(self, p => p.raw())
    }

    pub fn encode(&self) -> Vec<u8> {
        dispatch!(self, p => p.encode())
    }

    pub fn metadata(&self) -> &Metadata {
        dispatch!(self, p => p.metadata())
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        dispatch!(self, p => p.metadata_mut())
    }

    pub fn state(&self) -> State {
        dispatch!(self, p => p.state())
    }

    pub fn set_state(&mut self, state: State) -> Result<(), Error> {
        dispatch!(self, p => p.set_state(state))
    }

    pub fn set_pathway(&mut self, pathway: Pathway) {
        self.metadata_mut().pathway = pathway;
    }

    pub fn set_source(&mut self, source: DataSource) {
        self.metadata_mut().source = source;
    }

    /// Attach downlink times. Uplinked payloads have none and are unchanged.
    pub fn set_downlink_times(&mut self, times: DownlinkTimes) {
        match self {
            Payload::Command(_) => {}
            Payload::Telemetry(p) => p.downlink_times = Some(times),
            Payload::Event(p) => p.downlink_times = Some(times),
            Payload::FileBlock(p) => p.downlink_times = Some(times),
        }
    }

    pub fn is_uplinked(&self) -> bool {
        matches!(self, Payload::Command(_))
    }

    pub fn as_telemetry(&self) -> Option<&TelemetryPayload> {
        match self {
            Payload::Telemetry(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventPayload> {
        match self {
            Payload::Event(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&CommandPayload> {
        match self {
            Payload::Command(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_file_block(&self) -> Option<&FileBlockPayload> {
        match self {
            Payload::FileBlock(p) => Some(p),
            _ => None,
        }
    }

    pub fn to_serialized(&self) -> SerializedPayload {
        SerializedPayload {
            kind: self.kind(),
            raw: self.raw().to_vec(),
            endianness: self.metadata().endianness,
            state: self.state(),
        }
    }

    /// Rebuild a payload by re-decoding its raw bytes, then restoring its
    /// state.
    pub fn from_serialized(ctx: &Context, s: &SerializedPayload) -> Result<Self, Error> {
        let ctx = ctx.clone().with_endianness(s.endianness);
        let mut payload = match s.kind {
            PayloadKind::Command => Payload::Command(
                CommandPayload::decode_as(&ctx, &s.raw, CommandKind::Standard)?.0,
            ),
            PayloadKind::WatchdogCommand => Payload::Command(
                CommandPayload::decode_as(&ctx, &s.raw, CommandKind::Watchdog)?.0,
            ),
            PayloadKind::Telemetry => Payload::Telemetry(TelemetryPayload::decode(&ctx, &s.raw)?.0),
            PayloadKind::Event => Payload::Event(EventPayload::decode(&ctx, &s.raw)?.0),
            PayloadKind::FileBlock => {
                Payload::FileBlock(FileBlockPayload::decode(&ctx, &s.raw)?.0)
            }
        };
        payload.set_state(s.state.clone())?;
        Ok(payload)
    }
}

impl core::fmt::Display for Payload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        dispatch!(self, p => core::fmt::Display::fmt(p, f))
    }
}

impl From<CommandPayload> for Payload {
    fn from(p: CommandPayload) -> Self {
        Payload::Command(p)
    }
}

impl From<TelemetryPayload> for Payload {
    fn from(p: TelemetryPayload) -> Self {
        Payload::Telemetry(p)
    }
}

impl From<EventPayload> for Payload {
    fn from(p: EventPayload) -> Self {
        Payload::Event(p)
    }
}

impl From<FileBlockPayload> for Payload {
    fn from(p: FileBlockPayload) -> Self {
        Payload::FileBlock(p)
    }
}

/// A payload in transportable form: its bytes plus everything the bytes
/// cannot say.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SerializedPayload {
    pub kind: PayloadKind,
    pub raw: Vec<u8>,
    pub endianness: Endianness,
    pub state: State,
}

#[cfg(test)]
mod tests {
    use super::display_value;
    use super::DownlinkTimes;
    use super::Payload;
    use super::PayloadKind;
    use super::SerializedPayload;
    use super::TelemetryPayload;
    use crate::standards::Argument;
    use crate::standards::EnumItem;
    use crate::test_support;
    use crate::Error;
    use chrono::TimeZone;
    use chrono::Utc;
    use iris_messages::DataSource;
    use iris_messages::FswDataType;
    use iris_messages::Magic;
    use iris_messages::Pathway;
    use iris_messages::Value;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in PayloadKind::iter() {
            assert_eq!(PayloadKind::from_name(kind.name()), Some(kind));
            assert_eq!(PayloadKind::ALL[kind.index()], kind);
        }
        assert_eq!(PayloadKind::from_name("Payload"), None);
    }

    #[test]
    fn test_decode_missing_magic_fails() {
        let ctx = test_support::ctx();
        assert!(matches!(
            Payload::decode(&ctx, Magic::Missing, &[0x05, 0x03, 0x2A, 0x00]),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_radio_command_magic_decodes_as_command() {
        let ctx = test_support::ctx();
        let (payload, n) =
            Payload::decode(&ctx, Magic::RadioCommand, &[0x05, 0x03, 0x2A, 0x00]).unwrap();
        assert_eq!(n, 4);
        assert_eq!(payload.kind(), PayloadKind::Command);
        assert_eq!(payload.magic(), Magic::RadioCommand);
    }

    #[test]
    fn test_serialized_round_trip_keeps_state() {
        let ctx = test_support::ctx();
        let tlm = TelemetryPayload::new(&ctx, 0x10, 0x02, 1000, Value::from(-100i16)).unwrap();
        let mut payload = Payload::from(tlm);
        payload.set_pathway(Pathway::Wireless);
        payload.set_source(DataSource::Pcap);
        payload.set_downlink_times(DownlinkTimes {
            pmcc_rx: Some(Utc.with_ymd_and_hms(2024, 1, 18, 12, 0, 0).unwrap()),
            ..Default::default()
        });

        let serialized = payload.to_serialized();
        let json = serde_json::to_string(&serialized).unwrap();
        let back: SerializedPayload = serde_json::from_str(&json).unwrap();
        let rebuilt = Payload::from_serialized(&ctx, &back).unwrap();
        assert_eq!(rebuilt, payload);
        assert_eq!(rebuilt.metadata().pathway, Pathway::Wireless);
    }

    #[test]
    fn test_unknown_state_key_is_rejected() {
        let ctx = test_support::ctx();
        let tlm = TelemetryPayload::new(&ctx, 0x10, 0x02, 0, Value::from(1i16)).unwrap();
        let mut payload = Payload::from(tlm);
        let mut state = payload.state();
        state.insert(String::from("colour"), serde_json::Value::from("blue"));
        assert!(matches!(payload.set_state(state), Err(Error::State(_))));

        let mut state = payload.state();
        state.remove("pathway");
        assert!(matches!(payload.set_state(state), Err(Error::State(_))));
    }

    #[test]
    fn test_display_value_shows_enum_number() {
        let arg = Argument::new("mode", FswDataType::Enum)
            .with_enum(vec![EnumItem::new("DRIVE", 7)]);
        assert_eq!(display_value(&arg, &Value::from("DRIVE")), "DRIVE (7)");
        let plain = Argument::new("n", FswDataType::U8);
        assert_eq!(display_value(&plain, &Value::from(3u8)), "3");
    }
}
