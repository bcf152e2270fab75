// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Free-form text packets, and the fallback for bytes nothing else accepts.
//!
//! None of these carry payloads of their own. Each raises one `GdsPackets`
//! event, named after the packet kind, whose message is the packet's display
//! string.

use super::gds::packet_event;
use super::PacketCodec;
use super::PacketKind;
use super::ResetSpecificAckPacket;
use super::SafetyTimerPacket;
use crate::collection::PayloadCollection;
use crate::utils::hex_colon;
use crate::utils::hexdump;
use crate::Context;
use crate::Error;
use iris_messages::codec::escape_bytes;
use slog::debug;
use slog::warn;

const DEBUG: &[u8] = b"DEBUG";
const RADIO_DEBUG: &[u8] = b"DEBUGRADIO";
const UPLINK_ACK: &[u8] = b"DEBUGRADIO UPL: ";
const UART_BYTE: &[u8] = b"DEBUGBGB: ";
const BGAPI: &[u8] = b"DEBUGBGP:";
const HELLO: &[u8] = b"hello";
const DOWNLINK_FLUSH: &[u8] = b"DL-FL";

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Text with trailing NULs and whitespace removed.
fn trimmed(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches('\0')
        .trim_end()
        .to_string()
}

fn trim_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &data[start..end]
}

/// The byte reported in a `DEBUGBGB: ` packet, written as up to four hex
/// digits.
fn uart_byte(data: &[u8]) -> Option<u16> {
    let body = data.get(UART_BYTE.len()..)?;
    let digits = &body[..body.len().min(4)];
    let text = std::str::from_utf8(digits).ok()?.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(text, 16).ok()
}

/// A text packet from the Watchdog, the Radio, or Hercules.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPacket {
    kind: PacketKind,
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl TextPacket {
    /// Return true if `data` is a text packet of `kind`. Kinds that are not
    /// text packets never match.
    ///
    /// The generic debug kinds reject anything a more specific kind accepts.
    pub fn is_valid(kind: PacketKind, data: &[u8]) -> bool {
        match kind {
            PacketKind::WatchdogDebug => {
                starts_with_ignore_case(data, DEBUG)
                    && !starts_with_ignore_case(data, RADIO_DEBUG)
                    && !data.starts_with(UART_BYTE)
                    && !data.starts_with(BGAPI)
                    && !ResetSpecificAckPacket::is_valid(data)
                    && !SafetyTimerPacket::is_valid(data)
            }
            PacketKind::WatchdogRadioDebug => {
                starts_with_ignore_case(data, RADIO_DEBUG)
                    && !starts_with_ignore_case(data, UPLINK_ACK)
            }
            PacketKind::HerculesRadioUplinkAck => starts_with_ignore_case(data, UPLINK_ACK),
            PacketKind::RadioUartByte => data.starts_with(UART_BYTE),
            PacketKind::RadioBgApi => data.starts_with(BGAPI),
            PacketKind::WatchdogHello => starts_with_ignore_case(data, HELLO),
            PacketKind::RadioDownlinkFlush => data.starts_with(DOWNLINK_FLUSH),
            _ => false,
        }
    }

    pub fn decode(ctx: &Context, kind: PacketKind, data: &[u8]) -> Result<Self, Error> {
        if !Self::is_valid(kind, data) {
            return Err(Error::decode(data, format!("not a {kind}")));
        }
        let mut packet = Self {
            kind,
            payloads: PayloadCollection::new(),
            raw: data.to_vec(),
        };
        if kind == PacketKind::RadioUartByte && uart_byte(data).is_none() {
            warn!(
                ctx.log,
                "failed to decode radio UART byte";
                "data" => escape_bytes(data)
            );
        }
        let message = packet.to_string();
        packet.payloads.push(packet_event(ctx, kind, message.as_bytes())?);
        Ok(packet)
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }
}

impl PacketCodec for TextPacket {
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

impl core::fmt::Display for TextPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let data = &self.raw;
        let after = |n: usize| data.get(n..).unwrap_or(&[]);
        match self.kind {
            PacketKind::WatchdogRadioDebug => write!(
                f,
                "[{}B]: {}",
                after(RADIO_DEBUG.len()).len(),
                trimmed(after(DEBUG.len()))
            ),
            PacketKind::HerculesRadioUplinkAck => write!(
                f,
                "HERC-RADIO-UPL-ACK: {}",
                hex_colon(trim_whitespace(after(UPLINK_ACK.len())))
            ),
            PacketKind::RadioUartByte => match uart_byte(data) {
                Some(b) => write!(f, "Radio-UART Byte: 0x{b:02X}."),
                None => write!(
                    f,
                    "Radio-UART Byte: !! BYTE DECODING FAILED !! {}.",
                    escape_bytes(data)
                ),
            },
            PacketKind::RadioBgApi => {
                let body = after(BGAPI.len());
                write!(f, " BGAPI[{}B]  {}", body.len(), hex_colon(body))
            }
            PacketKind::WatchdogHello => {
                write!(f, "WatchdogHelloPacket[{}B]: {}", data.len(), escape_bytes(data))
            }
            PacketKind::RadioDownlinkFlush => write!(
                f,
                "RadioDownlinkFlushPacket[{}B]: {}",
                data.len(),
                escape_bytes(data)
            ),
            _ => write!(
                f,
                "[{}B]: {}",
                after(DEBUG.len()).len(),
                trimmed(after(DEBUG.len()))
            ),
        }
    }
}

/// Bytes no other packet kind accepts, kept whole for later inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsupportedPacket {
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl UnsupportedPacket {
    /// Wrap `data`. This never fails; if the announcing event cannot be built
    /// the packet simply carries no payloads.
    pub fn decode(ctx: &Context, data: &[u8]) -> Self {
        let mut packet = Self {
            payloads: PayloadCollection::new(),
            raw: data.to_vec(),
        };
        let message = packet.to_string();
        match packet_event(ctx, PacketKind::Unsupported, message.as_bytes()) {
            Ok(event) => packet.payloads.push(event),
            Err(e) => debug!(ctx.log, "no event for unsupported packet"; "err" => %e),
        }
        packet
    }
}

impl PacketCodec for UnsupportedPacket {
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

impl core::fmt::Display for UnsupportedPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "UnsupportedPacket[{}B]:\n{}", self.raw.len(), hexdump(&self.raw))
    }
}

#[cfg(test)]
mod tests {
    use super::uart_byte;
    use super::TextPacket;
    use super::UnsupportedPacket;
    use crate::packet::PacketCodec;
    use crate::packet::PacketKind;
    use crate::prebuilt;
    use crate::test_support;
    use crate::Error;
    use iris_messages::Value;

    fn message(packet: &impl PacketCodec) -> Value {
        let event = packet.payloads().events().next().unwrap();
        event.arg(prebuilt::GDS_MESSAGE_ARG).unwrap().clone()
    }

    #[test]
    fn test_debug_kinds_do_not_overlap() {
        let cases: [(&[u8], PacketKind); 7] = [
            (b"DEBUG hi", PacketKind::WatchdogDebug),
            (b"debug lower", PacketKind::WatchdogDebug),
            (b"DEBUGRADIO stuff", PacketKind::WatchdogRadioDebug),
            (b"DEBUGRADIO UPL: \x01\x02", PacketKind::HerculesRadioUplinkAck),
            (b"DEBUGBGB: 0A", PacketKind::RadioUartByte),
            (b"DEBUGBGP:\x20\x00", PacketKind::RadioBgApi),
            (b"Hello from the watchdog", PacketKind::WatchdogHello),
        ];
        let kinds = [
            PacketKind::WatchdogDebug,
            PacketKind::WatchdogRadioDebug,
            PacketKind::HerculesRadioUplinkAck,
            PacketKind::RadioUartByte,
            PacketKind::RadioBgApi,
            PacketKind::WatchdogHello,
            PacketKind::RadioDownlinkFlush,
        ];
        for (data, expected) in cases {
            let accepted: Vec<_> = kinds
                .iter()
                .copied()
                .filter(|k| TextPacket::is_valid(*k, data))
                .collect();
            assert_eq!(accepted, vec![expected], "{:?}", String::from_utf8_lossy(data));
        }
        assert!(!TextPacket::is_valid(PacketKind::WatchdogDebug, b"DEBUGRESET: 1 2 3 4 5"));
        assert!(!TextPacket::is_valid(PacketKind::WatchdogDebug, b"DEBUG [ST] ON:1"));
        assert!(!TextPacket::is_valid(PacketKind::IrisCommon, b"DEBUG"));
    }

    #[test]
    fn test_watchdog_debug() {
        let ctx = test_support::ctx();
        let packet =
            TextPacket::decode(&ctx, PacketKind::WatchdogDebug, b"DEBUG hello \0\0").unwrap();
        assert_eq!(packet.to_string(), "[9B]:  hello");
        assert_eq!(message(&packet), Value::from("[9B]:  hello"));
        let event = packet.payloads().events().next().unwrap();
        assert_eq!(event.label(), "GdsPackets.WatchdogDebugPacket");
    }

    #[test]
    fn test_radio_debug_counts_after_prefix() {
        let ctx = test_support::ctx();
        let packet =
            TextPacket::decode(&ctx, PacketKind::WatchdogRadioDebug, b"DEBUGRADIO ok").unwrap();
        assert_eq!(packet.to_string(), "[3B]: RADIO ok");
    }

    #[test]
    fn test_uplink_ack() {
        let ctx = test_support::ctx();
        let packet = TextPacket::decode(
            &ctx,
            PacketKind::HerculesRadioUplinkAck,
            b"DEBUGRADIO UPL: \xAA\xBB ",
        )
        .unwrap();
        assert_eq!(packet.to_string(), "HERC-RADIO-UPL-ACK: 0xAA:BB");
    }

    #[test]
    fn test_uart_byte() {
        assert_eq!(uart_byte(b"DEBUGBGB: 0A"), Some(0x0A));
        assert_eq!(uart_byte(b"DEBUGBGB: 0x7f"), Some(0x7F));
        assert_eq!(uart_byte(b"DEBUGBGB: zz"), None);
        let ctx = test_support::ctx();
        let packet = TextPacket::decode(&ctx, PacketKind::RadioUartByte, b"DEBUGBGB: 0A").unwrap();
        assert_eq!(packet.to_string(), "Radio-UART Byte: 0x0A.");
        let packet = TextPacket::decode(&ctx, PacketKind::RadioUartByte, b"DEBUGBGB: zz").unwrap();
        assert_eq!(
            packet.to_string(),
            "Radio-UART Byte: !! BYTE DECODING FAILED !! DEBUGBGB: zz."
        );
    }

    #[test]
    fn test_bgapi_and_hello() {
        let ctx = test_support::ctx();
        let packet =
            TextPacket::decode(&ctx, PacketKind::RadioBgApi, b"DEBUGBGP:\x20\x00").unwrap();
        assert_eq!(packet.to_string(), " BGAPI[2B]  0x20:00");
        let packet = TextPacket::decode(&ctx, PacketKind::WatchdogHello, b"HELLO\x01").unwrap();
        assert_eq!(packet.to_string(), "WatchdogHelloPacket[6B]: HELLO\\x01");
        // The event shows the escape as written.
        assert_eq!(message(&packet), Value::from("WatchdogHelloPacket[6B]: HELLO\\\\x01"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let ctx = test_support::ctx();
        assert!(matches!(
            TextPacket::decode(&ctx, PacketKind::RadioBgApi, b"DEBUG"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_unsupported() {
        let ctx = test_support::ctx();
        let packet = UnsupportedPacket::decode(&ctx, &[0x00]);
        assert_eq!(packet.raw(), &[0x00]);
        assert!(packet.to_string().starts_with("UnsupportedPacket[1B]:\n"));
        assert_eq!(packet.payloads().events().count(), 1);
        assert_eq!(
            packet.payloads().events().next().unwrap().label(),
            "GdsPackets.UnsupportedPacket"
        );
    }
}
