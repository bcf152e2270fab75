// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! A single telemetry sample.

use super::apply_downlink_state;
use super::decode_field;
use super::downlink_state;
use super::encode_field;
use super::DownlinkTimes;
use super::Metadata;
use super::PayloadCodec;
use super::State;
use crate::standards::TelemetryChannel;
use crate::Context;
use crate::Error;
use iris_messages::header::DownlinkedHeader;
use iris_messages::header::FixedHeader;
use iris_messages::Endianness;
use iris_messages::Magic;
use iris_messages::Opcode;
use iris_messages::Value;
use slog::trace;

/// One value of one telemetry channel, stamped with the rover's clock.
#[derive(Clone, Debug)]
pub struct TelemetryPayload {
    module_id: u8,
    channel_id: u8,
    /// Milliseconds since the rover booted.
    timestamp: u32,
    data: Value,
    label: String,
    raw: Vec<u8>,
    meta: Metadata,
    pub downlink_times: Option<DownlinkTimes>,
}

/// Write the opcode and timestamp prefix in the requested byte order.
pub(crate) fn downlinked_prefix(opcode: Opcode, timestamp: u32, endianness: Endianness) -> Vec<u8> {
    let mut out = opcode.to_bytes(endianness).to_vec();
    out.extend_from_slice(&match endianness {
        Endianness::Little => timestamp.to_le_bytes(),
        Endianness::Big => timestamp.to_be_bytes(),
    });
    out
}

/// Read the opcode and timestamp prefix of a downlinked payload.
pub(crate) fn read_downlinked_prefix(
    data: &[u8],
    endianness: Endianness,
) -> Result<DownlinkedHeader, Error> {
    let header = match endianness {
        Endianness::Little => DownlinkedHeader::read(data).map(|(h, _)| h),
        Endianness::Big => Opcode::from_bytes(data, endianness).and_then(|opcode| {
            let ts = data.get(2..6).ok_or(iris_messages::Error::Truncated {
                needed: 6,
                available: data.len(),
            })?;
            Ok(DownlinkedHeader {
                opcode,
                timestamp: u32::from_be_bytes([ts[0], ts[1], ts[2], ts[3]]),
            })
        }),
    };
    header.map_err(|e| Error::decode(data, e.to_string()))
}

impl TelemetryPayload {
    /// Build a telemetry sample, encoding it immediately.
    ///
    /// Enumerated channels accept a variant name or its value.
    pub fn new(
        ctx: &Context,
        module_id: u8,
        channel_id: u8,
        timestamp: u32,
        data: Value,
    ) -> Result<Self, Error> {
        let opcode = Opcode::new(module_id, channel_id);
        let (_, channel) = ctx
            .standards
            .global_telemetry_lookup(opcode)
            .map_err(|e| Error::Encode(e.to_string()))?;
        let mut raw = downlinked_prefix(opcode, timestamp, ctx.endianness);
        raw.extend(encode_field(
            &channel.field,
            &data,
            channel.datatype(),
            ctx.endianness,
        )?);
        let (payload, _) = Self::decode(ctx, &raw)?;
        Ok(payload)
    }

    /// Look up a channel by module and channel name, then build a sample.
    pub fn by_name(
        ctx: &Context,
        module: &str,
        channel: &str,
        timestamp: u32,
        data: Value,
    ) -> Result<Self, Error> {
        let m = ctx.standards.module_by_name(module)?;
        let c = m.channel(channel)?;
        Self::new(ctx, m.id, c.id, timestamp, data)
    }

    pub fn module_id(&self) -> u8 {
        self.module_id
    }

    pub fn channel_id(&self) -> u8 {
        self.channel_id
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::new(self.module_id, self.channel_id)
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// The sample's value. Enumerated channels hold the variant name.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// `Module.Channel`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn channel<'a>(&self, ctx: &'a Context) -> Result<&'a TelemetryChannel, Error> {
        Ok(ctx.standards.global_telemetry_lookup(self.opcode())?.1)
    }
}

impl PayloadCodec for TelemetryPayload {
    fn decode(ctx: &Context, data: &[u8]) -> Result<(Self, usize), Error> {
        let header = read_downlinked_prefix(data, ctx.endianness)?;
        let (module, channel) = ctx
            .standards
            .global_telemetry_lookup(header.opcode)
            .map_err(|e| Error::decode(&data[..2], e.to_string()))?;
        let (value, n) = decode_field(
            &channel.field,
            &data[6..],
            channel.datatype(),
            ctx.endianness,
        )?;
        let consumed = 6 + n;
        trace!(
            ctx.log,
            "decoded telemetry";
            "channel" => &channel.field.name,
            "module" => &module.name
        );
        let payload = Self {
            module_id: module.id,
            channel_id: channel.id,
            timestamp: header.timestamp,
            data: value,
            label: format!("{}.{}", module.name, channel.field.name),
            raw: data[..consumed].to_vec(),
            meta: Metadata::new(Magic::Telemetry, ctx.endianness),
            downlink_times: None,
        };
        Ok((payload, consumed))
    }

    fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn state(&self) -> State {
        downlink_state(&self.meta, &self.downlink_times)
    }

    fn set_state(&mut self, state: State) -> Result<(), Error> {
        apply_downlink_state(&mut self.meta, &mut self.downlink_times, state)
    }
}

impl PartialEq for TelemetryPayload {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.meta.magic == other.meta.magic
            && self.meta.pathway == other.meta.pathway
            && self.meta.source == other.meta.source
            && self.downlink_times == other.downlink_times
    }
}

impl core::fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let (module, channel) = self.label.split_once('.').unwrap_or((&self.label, ""));
        write!(f, "{module}{{{channel}}}@{} = {}", self.timestamp, self.data)
    }
}
