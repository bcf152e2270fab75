// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Messages sent straight to ground by the Radio's own microcontroller.
//!
//! Every message starts with `RAD:` and a subpacket prefix, followed by a
//! series of `|`-initiated fields. Fields whose initiator ends in `h` carry
//! raw little-endian bytes; the last field of a subpacket may run to the end
//! of the message.

use super::gds::clip_escaped;
use super::PacketCodec;
use crate::collection::PayloadCollection;
use crate::payload::reject_unknown;
use crate::payload::take_key;
use crate::payload::EventPayload;
use crate::payload::Payload;
use crate::payload::State;
use crate::payload::TelemetryPayload;
use crate::prebuilt;
use crate::standards::Module;
use crate::Context;
use crate::Error;
use iris_messages::codec::escape_bytes;
use iris_messages::Value;
use slog::debug;
use slog::warn;
use std::collections::BTreeMap;

const HEADER: &[u8] = b"RAD:";
const STATE_KEY: &str = "spn";
const NO_SUBPACKET: &str = "NO_SUBPACKET_TYPE";

/// Duration of one Radio timer tick.
pub const TICK_MS: u64 = 5000;

/// What the Radio sends each time it (re)connects.
pub const HELLO_MESSAGE: &[u8] = b"Hello Earth, this is Iris on the Moon!";

type Fields<'a> = BTreeMap<&'static str, &'a [u8]>;
type Handler = fn(&Context, &Module, &Fields) -> Result<Vec<Payload>, Error>;

struct FieldDef {
    name: &'static str,
    initiator: &'static [u8],
    /// Length after the initiator. `None` runs to the end of the message.
    len: Option<usize>,
}

const fn field(name: &'static str, initiator: &'static [u8], len: usize) -> FieldDef {
    FieldDef {
        name,
        initiator,
        len: Some(len),
    }
}

const fn tail(name: &'static str, initiator: &'static [u8]) -> FieldDef {
    FieldDef {
        name,
        initiator,
        len: None,
    }
}

struct Subpacket {
    name: &'static str,
    /// Length of the whole message, header included. `None` if unbounded.
    len: Option<usize>,
    prefix: &'static [u8],
    fields: &'static [FieldDef],
    handler: Handler,
}

const COMMAND_FIELDS: [FieldDef; 2] = [field("command_id", b"|h", 1), tail("command_data", b"|h")];

static SUBPACKETS: [Subpacket; 10] = [
    Subpacket {
        name: "heartbeat",
        len: Some(42),
        prefix: b"HB",
        fields: &[
            field("Rssi", b"|R-", 3),
            field("StateAbbr", b"|", 4),
            field("UptimeTicks", b"|Th", 4),
            field("UdpRxPacketCount", b"|Rh", 4),
            field("BadHercPacketCount", b"|Bh", 4),
            field("InterlockCountingSemaphore", b"|Ih", 1),
        ],
        handler: heartbeat,
    },
    Subpacket {
        name: "echo",
        len: None,
        prefix: b"ECHO",
        fields: &[tail("echoed_text", b"|h")],
        handler: echo,
    },
    Subpacket {
        name: "cmd_ack",
        len: None,
        prefix: b"ACK",
        fields: &COMMAND_FIELDS,
        handler: command_ack,
    },
    Subpacket {
        name: "cmd_done",
        len: None,
        prefix: b"DID",
        fields: &COMMAND_FIELDS,
        handler: command_done,
    },
    Subpacket {
        name: "cmd_bad",
        len: None,
        prefix: b"BADCMD",
        fields: &COMMAND_FIELDS,
        handler: command_bad,
    },
    Subpacket {
        name: "bad_herc",
        len: Some(15),
        prefix: b"BADHERC",
        fields: &[field("issue", b"|h", 2)],
        handler: bad_hercules_packet,
    },
    Subpacket {
        name: "bad_endpoint",
        len: Some(18),
        prefix: b"BADENDP",
        fields: &[field("endpoint", b"|h", 1), field("issue", b"|h", 2)],
        handler: bad_endpoint,
    },
    Subpacket {
        name: "bad_udp",
        len: Some(23),
        prefix: b"BADUDP",
        fields: &[
            field("issue", b"|h", 1),
            field("ip", b"|h", 4),
            field("port", b"|h", 2),
        ],
        handler: bad_udp,
    },
    Subpacket {
        name: "critical_reset",
        len: Some(13),
        prefix: b"CRIT!",
        fields: &[field("issue", b"|h", 2)],
        handler: critical_reset,
    },
    Subpacket {
        name: "critical_reset_swe",
        len: Some(17),
        prefix: b"SWE!",
        fields: &[field("memory_address", b"|h", 4), field("exception_type", b"|h", 1)],
        handler: critical_reset_swe,
    },
];

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl Subpacket {
    /// Split a message into its fields, searching for each initiator after
    /// the end of the previous field. A `|` inside a fixed-length field is
    /// never mistaken for a separator.
    fn split<'a>(&self, data: &'a [u8]) -> Fields<'a> {
        let mut fields = Fields::new();
        let mut head = HEADER.len() + self.prefix.len();
        for def in self.fields.iter() {
            let Some(found) = data.get(head..).and_then(|rest| find(rest, def.initiator)) else {
                continue;
            };
            let start = head + found + def.initiator.len();
            let end = match def.len {
                Some(n) => (start + n).min(data.len()),
                None => data.len(),
            };
            if def.len.map_or(false, |n| end - start != n) {
                continue;
            }
            fields.insert(def.name, &data[start..end]);
            head = end;
        }
        fields
    }

    fn is_valid(&self, data: &[u8]) -> bool {
        let len_ok = match self.len {
            Some(n) => data.len() == n,
            None => data.len() >= HEADER.len() + self.prefix.len(),
        };
        len_ok
            && data.starts_with(HEADER)
            && data[HEADER.len()..].starts_with(self.prefix)
            && self.split(data).len() == self.fields.len()
    }
}

fn matching(data: &[u8]) -> Vec<&'static Subpacket> {
    if !data.starts_with(HEADER) {
        return Vec::new();
    }
    SUBPACKETS.iter().filter(|s| s.is_valid(data)).collect()
}

fn get<'a>(fields: &Fields<'a>, name: &str) -> Result<&'a [u8], Error> {
    fields
        .get(name)
        .copied()
        .ok_or_else(|| Error::Implementation(format!("radio field '{name}' was not split out")))
}

fn le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, b| acc << 8 | u64::from(*b))
}

/// Escape Radio text for a string argument of `module.event`.
fn radio_text(module: &Module, event: &str, arg: &str, text: &[u8]) -> Result<Value, Error> {
    let max = module
        .event(event)?
        .arg(arg)
        .map(|a| a.max_content_len())
        .ok_or_else(|| Error::Implementation(format!("{}.{event} has no '{arg}'", module.name)))?;
    let text: Vec<u8> = text.iter().copied().filter(|b| *b != 0).collect();
    Ok(Value::Str(clip_escaped(escape_bytes(&text), max)))
}

/// The name of `value` in the enumerated `arg` of `module.event`, or
/// `fallback`.
fn enum_or(module: &Module, event: &str, arg: &str, value: u64, fallback: &str) -> Value {
    let name = module
        .event(event)
        .ok()
        .and_then(|e| e.arg(arg))
        .and_then(|a| a.enum_name(value as i64))
        .unwrap_or(fallback);
    Value::from(name)
}

fn event(
    ctx: &Context,
    module: &Module,
    name: &str,
    timestamp: u32,
    args: Vec<(&str, Value)>,
) -> Result<Payload, Error> {
    let args = args.into_iter().map(|(n, v)| (String::from(n), v)).collect();
    Ok(EventPayload::new(ctx, module.id, module.event(name)?.id, timestamp, args)?.into())
}

/// Render an uptime as `HHh:MMm:SSs`.
pub fn uptime_string(uptime_ms: u64) -> String {
    let hours = uptime_ms / 3_600_000;
    let mins = uptime_ms % 3_600_000 / 60_000;
    let secs = uptime_ms % 60_000 / 1000;
    format!("{hours:02}h:{mins:02}m:{secs:02}s")
}

fn heartbeat(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    let rssi_field = get(fields, "Rssi")?;
    let rssi = std::str::from_utf8(rssi_field)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(|r| -r)
        .ok_or_else(|| Error::decode(rssi_field, "RSSI is not a decimal number"))?;

    let abbr = String::from_utf8_lossy(get(fields, "StateAbbr")?).into_owned();
    let known = module.channel("StateAbbr")?.field.enum_value(&abbr).is_some();
    let state_abbr = if known { abbr } else { String::from("CRPT") };

    let uptime_ticks = le(get(fields, "UptimeTicks")?);
    let uptime_ms = uptime_ticks * TICK_MS;
    // Past ~248 days of uptime the millisecond count no longer fits.
    let timestamp = u32::try_from(uptime_ms).unwrap_or(u32::MAX);

    let mut payloads = Vec::new();
    let mut telem = |name: &str, value: Value| -> Result<(), Error> {
        let channel = module.channel(name)?;
        payloads.push(TelemetryPayload::new(ctx, module.id, channel.id, timestamp, value)?.into());
        Ok(())
    };
    telem("Rssi", Value::Signed(rssi))?;
    telem("StateAbbr", Value::from(state_abbr.as_str()))?;
    telem("UptimeTicks", Value::Unsigned(uptime_ticks))?;
    telem("UptimeMs", Value::Unsigned(u64::from(timestamp)))?;
    telem("UdpRxPacketCount", Value::Unsigned(le(get(fields, "UdpRxPacketCount")?)))?;
    telem("BadHercPacketCount", Value::Unsigned(le(get(fields, "BadHercPacketCount")?)))?;
    telem(
        "HerculesUdpInterlockCountingSemaphore",
        Value::Unsigned(le(get(fields, "InterlockCountingSemaphore")?)),
    )?;

    payloads.push(event(
        ctx,
        module,
        "Heartbeat",
        timestamp,
        vec![
            ("state_abbr", Value::from(state_abbr)),
            ("rssi", Value::Signed(rssi)),
            ("uptime_str", Value::from(uptime_string(uptime_ms))),
        ],
    )?);
    Ok(payloads)
}

fn echo(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    let text = radio_text(module, "Echo", "echoed_text", get(fields, "echoed_text")?)?;
    Ok(vec![event(ctx, module, "Echo", 0, vec![("echoed_text", text)])?])
}

fn command_callback(
    ctx: &Context,
    module: &Module,
    fields: &Fields,
    name: &str,
) -> Result<Vec<Payload>, Error> {
    let command = enum_or(
        module,
        name,
        "command",
        le(get(fields, "command_id")?),
        "CORRUPTED",
    );
    let data = radio_text(
        module,
        name,
        "string_of_command_data",
        get(fields, "command_data")?,
    )?;
    Ok(vec![event(
        ctx,
        module,
        name,
        0,
        vec![("command", command), ("string_of_command_data", data)],
    )?])
}

fn command_ack(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    command_callback(ctx, module, fields, "GotCommand")
}

fn command_done(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    command_callback(ctx, module, fields, "DidCommand")
}

fn command_bad(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    command_callback(ctx, module, fields, "BadCommand")
}

fn issue(module: &Module, name: &str, fields: &Fields, fallback: &str) -> Result<Value, Error> {
    Ok(enum_or(module, name, "issue", le(get(fields, "issue")?), fallback))
}

fn bad_hercules_packet(
    ctx: &Context,
    module: &Module,
    fields: &Fields,
) -> Result<Vec<Payload>, Error> {
    let name = "BadHerculesPacket";
    let issue = issue(module, name, fields, "OTHER__UNEXPECTED")?;
    Ok(vec![event(ctx, module, name, 0, vec![("issue", issue)])?])
}

fn bad_endpoint(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    let name = "BadEndpointData";
    let endpoint = Value::Unsigned(le(get(fields, "endpoint")?));
    let issue = issue(module, name, fields, "OTHER__UNEXPECTED")?;
    Ok(vec![event(
        ctx,
        module,
        name,
        0,
        vec![("endpoint", endpoint), ("issue", issue)],
    )?])
}

fn bad_udp(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    let name = "BadUdp";
    let issue = issue(module, name, fields, "NOTHING__THIS_SHOULD_NOT_HAPPEN")?;
    // Little-endian, so the first octet of the address comes last.
    let ip: Vec<String> = get(fields, "ip")?
        .iter()
        .rev()
        .map(|b| format!("{b:03}"))
        .collect();
    let port = Value::Unsigned(le(get(fields, "port")?));
    Ok(vec![event(
        ctx,
        module,
        name,
        0,
        vec![
            ("issue", issue),
            ("ip", Value::from(ip.join("."))),
            ("port", port),
        ],
    )?])
}

fn critical_reset(ctx: &Context, module: &Module, fields: &Fields) -> Result<Vec<Payload>, Error> {
    let name = "CriticalReset";
    let issue = issue(module, name, fields, "OTHER__UNEXPECTED")?;
    Ok(vec![event(ctx, module, name, 0, vec![("issue", issue)])?])
}

fn critical_reset_swe(
    ctx: &Context,
    module: &Module,
    fields: &Fields,
) -> Result<Vec<Payload>, Error> {
    Ok(vec![event(
        ctx,
        module,
        "CriticalResetDueToSoftwareException",
        0,
        vec![
            ("memory_address", Value::Unsigned(le(get(fields, "memory_address")?))),
            ("exception_type", Value::Unsigned(le(get(fields, "exception_type")?))),
        ],
    )?])
}

/// A message from the Radio's microcontroller.
#[derive(Clone, Debug, PartialEq)]
pub struct RadioGroundPacket {
    subpacket: String,
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl RadioGroundPacket {
    pub fn is_valid(data: &[u8]) -> bool {
        !matching(data).is_empty()
    }

    pub fn decode(ctx: &Context, data: &[u8]) -> Result<Self, Error> {
        let matches = matching(data);
        let Some(sub) = matches.first() else {
            return Err(Error::decode(data, "no radio-ground subpacket matches"));
        };
        if matches.len() > 1 {
            let names: Vec<&str> = matches.iter().map(|s| s.name).collect();
            warn!(
                ctx.log,
                "multiple radio-ground subpackets match, using the first";
                "matches" => names.join(", ")
            );
        }
        let ctx = ctx.child(slog::o!("subpacket" => sub.name));
        let module = ctx.standards.prebuilt(prebuilt::RADIO_GROUND)?;
        let fields = sub.split(data);
        let mut payloads = PayloadCollection::new();
        for payload in (sub.handler)(&ctx, module, &fields)? {
            payloads.push(payload);
        }
        debug!(ctx.log, "decoded radio-ground packet"; "len" => data.len());
        Ok(Self {
            subpacket: sub.name.to_string(),
            payloads,
            raw: data.to_vec(),
        })
    }

    /// Which kind of message this is, such as `heartbeat` or `bad_udp`.
    pub fn subpacket(&self) -> &str {
        &self.subpacket
    }
}

impl PacketCodec for RadioGroundPacket {
    fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn payloads(&self) -> &PayloadCollection {
        &self.payloads
    }

    fn payloads_mut(&mut self) -> &mut PayloadCollection {
        &mut self.payloads
    }

    fn state(&self) -> State {
        let mut state = State::new();
        state.insert(
            String::from(STATE_KEY),
            serde_json::Value::String(self.subpacket.clone()),
        );
        state
    }

    fn set_state(&mut self, mut state: State) -> Result<(), Error> {
        self.subpacket = if state.contains_key(STATE_KEY) {
            take_key(&mut state, STATE_KEY)?
        } else {
            String::from(NO_SUBPACKET)
        };
        reject_unknown(state)
    }
}

impl core::fmt::Display for RadioGroundPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let events: Vec<_> = self.payloads.events().collect();
        write!(
            f,
            "RadioGroundPacket-{}[{}B]: \t{}T + {}E",
            self.subpacket,
            self.raw.len(),
            self.payloads.telemetry().count(),
            events.len(),
        )?;
        if let [event] = events.as_slice() {
            write!(f, " \t{event}")?;
        }
        Ok(())
    }
}

/// The greeting the Radio sends when it connects.
#[derive(Clone, Debug, PartialEq)]
pub struct RadioHelloPacket {
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl RadioHelloPacket {
    pub fn is_valid(data: &[u8]) -> bool {
        data == HELLO_MESSAGE
    }

    pub fn decode(ctx: &Context, data: &[u8]) -> Result<Self, Error> {
        if !Self::is_valid(data) {
            return Err(Error::decode(data, "not the Radio's hello message"));
        }
        let module = ctx.standards.prebuilt(prebuilt::RADIO_GROUND)?;
        let message = radio_text(module, "Connected", "message", data)?;
        let mut payloads = PayloadCollection::new();
        payloads.push(event(ctx, module, "Connected", 0, vec![("message", message)])?);
        Ok(Self {
            payloads,
            raw: data.to_vec(),
        })
    }
}

impl PacketCodec for RadioHelloPacket {
    fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn payloads(&self) -> &PayloadCollection {
        &self.payloads
    }

    fn payloads_mut(&mut self) -> &mut PayloadCollection {
        &mut self.payloads
    }
}

impl core::fmt::Display for RadioHelloPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "RadioHelloPacket: {}", String::from_utf8_lossy(&self.raw))
    }
}

#[cfg(test)]
mod tests {
    use super::uptime_string;
    use super::RadioGroundPacket;
    use super::RadioHelloPacket;
    use super::HELLO_MESSAGE;
    use crate::packet::PacketCodec;
    use crate::test_support;
    use crate::Error;
    use iris_messages::Value;

    fn heartbeat_frame() -> Vec<u8> {
        let mut data = b"RAD:HB|R-031|UDPC|Th".to_vec();
        data.extend([0x7B, 0x00, 0x00, 0x00]);
        data.extend(b"|Rh");
        data.extend([0x05, 0x00, 0x00, 0x00]);
        data.extend(b"|Bh");
        data.extend([0x00, 0x00, 0x00, 0x00]);
        data.extend(b"|Ih");
        data.push(0x02);
        data
    }

    #[test]
    fn test_heartbeat() {
        let ctx = test_support::ctx();
        let data = heartbeat_frame();
        assert_eq!(data.len(), 42);
        assert!(RadioGroundPacket::is_valid(&data));
        let packet = RadioGroundPacket::decode(&ctx, &data).unwrap();
        assert_eq!(packet.subpacket(), "heartbeat");
        let payloads = packet.payloads();
        assert_eq!(payloads.telemetry().count(), 7);
        assert_eq!(payloads.events().count(), 1);
        assert!(payloads.telemetry().all(|t| t.timestamp() == 615_000));
        assert_eq!(
            test_support::sample(payloads, "RadioGround.Rssi"),
            Some(Value::Signed(-31))
        );
        assert_eq!(
            test_support::sample(payloads, "RadioGround.StateAbbr"),
            Some(Value::from("UDPC"))
        );
        assert_eq!(
            test_support::sample(payloads, "RadioGround.UdpRxPacketCount"),
            Some(Value::Unsigned(5))
        );
        let event = payloads.events().next().unwrap();
        assert_eq!(event.arg("uptime_str"), Some(&Value::from("00h:10m:15s")));
        assert!(packet.to_string().starts_with("RadioGroundPacket-heartbeat[42B]: \t7T + 1E \t"));
    }

    #[test]
    fn test_heartbeat_with_pipe_in_binary_field() {
        let ctx = test_support::ctx();
        let mut data = heartbeat_frame();
        // A count whose first byte is '|'.
        data[27] = b'|';
        let packet = RadioGroundPacket::decode(&ctx, &data).unwrap();
        assert_eq!(
            test_support::sample(packet.payloads(), "RadioGround.UdpRxPacketCount"),
            Some(Value::Unsigned(0x7C))
        );
    }

    #[test]
    fn test_unknown_state_is_corrupt() {
        let ctx = test_support::ctx();
        let mut data = heartbeat_frame();
        data[13..17].copy_from_slice(b"ZZZZ");
        let packet = RadioGroundPacket::decode(&ctx, &data).unwrap();
        assert_eq!(
            test_support::sample(packet.payloads(), "RadioGround.StateAbbr"),
            Some(Value::from("CRPT"))
        );
    }

    #[test]
    fn test_echo_and_commands() {
        let ctx = test_support::ctx();
        let packet = RadioGroundPacket::decode(&ctx, b"RAD:ECHO|hhi\x01 there").unwrap();
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.arg("echoed_text"), Some(&Value::from("hi\\x01 there")));

        let packet = RadioGroundPacket::decode(&ctx, b"RAD:ACK|h\xDB|hstuff").unwrap();
        assert_eq!(packet.subpacket(), "cmd_ack");
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.label(), "RadioGround.GotCommand");
        assert_eq!(event.arg("command"), Some(&Value::from("WRITE_UART")));

        let packet = RadioGroundPacket::decode(&ctx, b"RAD:BADCMD|h\x42|h").unwrap();
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.arg("command"), Some(&Value::from("CORRUPTED")));
    }

    #[test]
    fn test_bad_udp() {
        let ctx = test_support::ctx();
        let data = b"RAD:BADUDP|h\x01|h\x01\x01\xA8\xC0|h\x90\x1F";
        assert_eq!(data.len(), 23);
        let packet = RadioGroundPacket::decode(&ctx, data).unwrap();
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.arg("issue"), Some(&Value::from("BAD_IP")));
        assert_eq!(event.arg("ip"), Some(&Value::from("192.168.001.001")));
        assert_eq!(event.arg("port"), Some(&Value::Unsigned(8080)));
    }

    #[test]
    fn test_unknown_issue_falls_back() {
        let ctx = test_support::ctx();
        let packet = RadioGroundPacket::decode(&ctx, b"RAD:CRIT!|h\x34\x12").unwrap();
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.arg("issue"), Some(&Value::from("OTHER__UNEXPECTED")));
    }

    #[test]
    fn test_rejects_malformed() {
        let ctx = test_support::ctx();
        assert!(!RadioGroundPacket::is_valid(b"RAD:"));
        assert!(!RadioGroundPacket::is_valid(b"RAD:NOPE|h"));
        // Right prefix, wrong length.
        assert!(!RadioGroundPacket::is_valid(b"RAD:CRIT!|h\x34"));
        assert!(matches!(
            RadioGroundPacket::decode(&ctx, b"XYZ:HB"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_state_round_trip() {
        let ctx = test_support::ctx();
        let mut packet = RadioGroundPacket::decode(&ctx, b"RAD:ECHO|hx").unwrap();
        let state = packet.state();
        assert_eq!(state["spn"], "echo");
        packet.set_state(Default::default()).unwrap();
        assert_eq!(packet.subpacket(), "NO_SUBPACKET_TYPE");
        packet.set_state(state).unwrap();
        assert_eq!(packet.subpacket(), "echo");
    }

    #[test]
    fn test_hello() {
        let ctx = test_support::ctx();
        assert!(RadioHelloPacket::is_valid(HELLO_MESSAGE));
        assert!(!RadioHelloPacket::is_valid(b"Hello Earth"));
        let packet = RadioHelloPacket::decode(&ctx, HELLO_MESSAGE).unwrap();
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.label(), "RadioGround.Connected");
        assert_eq!(event.timestamp(), 0);
    }

    #[test]
    fn test_uptime_string() {
        assert_eq!(uptime_string(7_263_023), "02h:01m:03s");
        assert_eq!(uptime_string(0), "00h:00m:00s");
    }
}
