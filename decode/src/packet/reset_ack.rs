// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The Watchdog's text acknowledgement of a `ResetSpecific` command.
//!
//! The body is five space-separated fields:
//! `<reset id> <ignored> <status> <ignored> <conditions in hex>`.

use super::gds::packet_event;
use super::PacketCodec;
use super::PacketKind;
use crate::collection::PayloadCollection;
use crate::prebuilt;
use crate::Context;
use crate::Error;
use iris_messages::flags::ResetConditions;

const PREFIX: &[u8] = b"DEBUGRESET:";
const RESET_COMMAND: &str = "WatchDogInterface_ResetSpecific";

/// An acknowledged reset, with the names of its reset and result resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ResetSpecificAckPacket {
    reset_id: i64,
    status: i64,
    conditions: ResetConditions,
    reset_name: String,
    result_name: String,
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

fn reset_name(ctx: &Context, reset_id: i64) -> String {
    if reset_id == 0 {
        return String::from("NONE");
    }
    ctx.standards
        .module_by_name(prebuilt::WATCHDOG_INTERFACE)
        .and_then(|m| m.command(RESET_COMMAND))
        .ok()
        .and_then(|c| c.args.first())
        .and_then(|a| a.enum_name(reset_id))
        .map(String::from)
        .unwrap_or_else(|| format!("NOT-FOUND ({reset_id})"))
}

fn result_name(ctx: &Context, status: i64) -> String {
    if status == 0 {
        return String::from("NO_ERROR");
    }
    ctx.standards
        .prebuilt(prebuilt::WATCHDOG_COMMAND_RESPONSE)
        .and_then(|m| m.channel("ErrorFlag"))
        .ok()
        .and_then(|c| c.field.enum_name(status))
        .map(String::from)
        .unwrap_or_else(|| format!("NOT-FOUND ({status})"))
}

impl ResetSpecificAckPacket {
    pub fn is_valid(data: &[u8]) -> bool {
        data.starts_with(PREFIX)
    }

    pub fn decode(ctx: &Context, data: &[u8]) -> Result<Self, Error> {
        if !Self::is_valid(data) {
            return Err(Error::decode(data, "missing DEBUGRESET: prefix"));
        }
        let body = String::from_utf8_lossy(&data[PREFIX.len()..]);
        let fields: Vec<&str> = body.trim().split(' ').collect();
        let bad_format =
            || Error::decode(data, "reset acknowledgement is not formatted as expected");
        let [reset_id, _, status, _, conditions] = fields.as_slice() else {
            return Err(bad_format());
        };
        let reset_id: i64 = reset_id.parse().map_err(|_| bad_format())?;
        let status: i64 = status.parse().map_err(|_| bad_format())?;
        let conditions = parse_hex(conditions).ok_or_else(bad_format)?;
        let conditions = ResetConditions::from_bits_truncate((conditions & 0xF) as u8);

        let mut packet = Self {
            reset_id,
            status,
            conditions,
            reset_name: reset_name(ctx, reset_id),
            result_name: result_name(ctx, status),
            payloads: PayloadCollection::new(),
            raw: data.to_vec(),
        };
        let message = packet.to_string();
        packet.payloads.push(packet_event(
            ctx,
            PacketKind::WatchdogResetSpecificAck,
            message.as_bytes(),
        )?);
        Ok(packet)
    }

    pub fn reset_id(&self) -> i64 {
        self.reset_id
    }

    pub fn status(&self) -> i64 {
        self.status
    }

    pub fn conditions(&self) -> ResetConditions {
        self.conditions
    }
}

impl PacketCodec for ResetSpecificAckPacket {
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

impl core::fmt::Display for ResetSpecificAckPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let c = self.conditions;
        write!(
            f,
            concat!(
                "{} : {} -> {}, allowing\t (PowerOn: {},\t Rs422Off: {},",
                "\t Deploy: {},\t Undeploy: {})."
            ),
            String::from_utf8_lossy(&self.raw).trim(),
            self.reset_name,
            self.result_name,
            c.bit(ResetConditions::ALLOW_POWER_ON),
            c.bit(ResetConditions::ALLOW_DISABLE_RS422),
            c.bit(ResetConditions::ALLOW_DEPLOY),
            c.bit(ResetConditions::ALLOW_UNDEPLOY),
        )
    }
}
