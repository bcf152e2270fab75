// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Fixed-layout frames sent by the Watchdog outside of any common packet.
//!
//! Each frame is a start flag followed by a packed body. The body is unpacked
//! into a [`CustomPayload`], and every telemetry channel of the matching
//! prebuilt module is then read off that record to produce ordinary telemetry
//! payloads.

mod command_response;
mod detailed_status;
mod heartbeat;
mod tvac;

pub use command_response::CommandResponse;
pub use detailed_status::DetailedStatus;
pub use heartbeat::Heartbeat;
pub use tvac::TvacHeartbeat;

use super::PacketCodec;
use super::PacketKind;
use crate::collection::PayloadCollection;
use crate::payload::Payload;
use crate::payload::TelemetryPayload;
use crate::standards::Argument;
use crate::standards::Module;
use crate::Context;
use crate::Error;
use iris_messages::Value;
use slog::trace;
use slog::warn;

/// The decoded body of a custom Watchdog frame.
pub trait CustomPayload:
    Clone + core::fmt::Debug + core::fmt::Display + PartialEq + Sized
{
    const KIND: PacketKind;
    const START_FLAG: u8;
    /// Length of the whole frame, start flag included.
    const LENGTH: usize;
    /// The prebuilt module whose channels this record fills.
    const MODULE: &'static str;

    /// Unpack the body that follows the start flag.
    fn unpack(ctx: &Context, body: &[u8]) -> Result<Self, Error>;

    /// The value of the named telemetry channel, if this record provides it.
    fn channel(&self, name: &str) -> Option<Value>;

    /// Payloads emitted alongside the telemetry.
    fn extra_payloads(&self, _ctx: &Context) -> Result<Vec<Payload>, Error> {
        Ok(Vec::new())
    }
}

/// A custom Watchdog frame and the telemetry derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomPacket<P> {
    custom: P,
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl<P: CustomPayload> CustomPacket<P> {
    pub fn is_valid(data: &[u8]) -> bool {
        data.len() == P::LENGTH && data[0] == P::START_FLAG
    }

    pub fn decode(ctx: &Context, data: &[u8]) -> Result<Self, Error> {
        match data.first() {
            Some(flag) if *flag == P::START_FLAG => {}
            _ => {
                return Err(Error::decode(
                    data,
                    format!("{} must start with 0x{:02X}", P::KIND, P::START_FLAG),
                ))
            }
        }
        if data.len() != P::LENGTH {
            return Err(Error::decode(
                data,
                format!("{} must be {} bytes, found {}", P::KIND, P::LENGTH, data.len()),
            ));
        }
        let ctx = ctx.child(slog::o!("packet" => P::KIND.name()));
        let custom = P::unpack(&ctx, &data[1..])?;
        let module = ctx.standards.prebuilt(P::MODULE)?;

        let mut payloads = PayloadCollection::new();
        for channel in module.telemetry.iter() {
            let name = channel.field.name.as_str();
            let value = custom.channel(name).ok_or_else(|| {
                Error::Implementation(format!(
                    "{} does not provide channel {}.{name}",
                    P::KIND,
                    module.name
                ))
            })?;
            let value = match value {
                Value::Bool(b) => Value::Unsigned(u64::from(b)),
                v => v,
            };
            if channel.field.is_enum() && !is_variant(&channel.field, &value) {
                warn!(
                    ctx.log,
                    "dropping sample that is not a variant of its enum";
                    "channel" => name,
                    "value" => %value
                );
                continue;
            }
            payloads.push(TelemetryPayload::new(&ctx, module.id, channel.id, 0, value)?);
        }
        for payload in custom.extra_payloads(&ctx)? {
            payloads.push(payload);
        }
        trace!(
            ctx.log,
            "decoded custom packet";
            "payloads" => payloads.all_payloads_count()
        );
        Ok(Self {
            custom,
            payloads,
            raw: data.to_vec(),
        })
    }

    /// The unpacked frame body.
    pub fn custom(&self) -> &P {
        &self.custom
    }
}

fn is_variant(arg: &Argument, value: &Value) -> bool {
    match value {
        Value::Str(name) => arg.enum_value(name).is_some(),
        v => v
            .as_integer()
            .and_then(|x| i64::try_from(x).ok())
            .and_then(|x| arg.enum_item(x))
            .is_some(),
    }
}

/// The name of `value` in the enumerated channel `channel` of `module`.
pub(crate) fn enum_label(module: &Module, channel: &str, value: i64) -> String {
    module
        .channel(channel)
        .ok()
        .and_then(|c| c.field.enum_name(value))
        .map(String::from)
        .unwrap_or_else(|| format!("UNKNOWN ({value})"))
}

impl<P: CustomPayload> PacketCodec for CustomPacket<P> {
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

impl<P: CustomPayload> core::fmt::Display for CustomPacket<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.custom, f)
    }
}

#[cfg(test)]
mod tests {
    use super::enum_label;
    use super::CustomPacket;
    use super::Heartbeat;
    use super::TvacHeartbeat;
    use crate::packet::PacketCodec;
    use crate::prebuilt;
    use crate::test_support;
    use crate::Error;

    #[test]
    fn test_flag_and_length_checks() {
        let ctx = test_support::ctx();
        assert!(CustomPacket::<Heartbeat>::is_valid(&[0xFF, 0, 0, 0]));
        assert!(!CustomPacket::<Heartbeat>::is_valid(&[0xFE, 0, 0, 0]));
        assert!(!CustomPacket::<Heartbeat>::is_valid(&[0xFF, 0, 0]));
        assert!(!CustomPacket::<TvacHeartbeat>::is_valid(&[0xFF, 0, 0, 0]));
        assert!(matches!(
            CustomPacket::<Heartbeat>::decode(&ctx, &[0xFE, 0, 0, 0]),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(
            CustomPacket::<Heartbeat>::decode(&ctx, &[0xFF, 0, 0]),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(
            CustomPacket::<Heartbeat>::decode(&ctx, &[]),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_every_channel_is_emitted() {
        let ctx = test_support::ctx();
        let packet = CustomPacket::<Heartbeat>::decode(&ctx, &[0xFF, 0xDA, 0x30, 0x81]).unwrap();
        let module = ctx.standards.prebuilt(prebuilt::WATCHDOG_HEARTBEAT).unwrap();
        assert_eq!(packet.payloads().all_payloads_count(), module.telemetry.len());
        assert!(packet.payloads().telemetry().all(|t| t.module_id() == module.id));
        assert_eq!(packet.raw(), &[0xFF, 0xDA, 0x30, 0x81]);
        assert_eq!(
            packet.encode(&ctx).unwrap(),
            vec![0xFF, 0xDA, 0x30, 0x81]
        );
    }

    #[test]
    fn test_enum_label_fallback() {
        let ctx = test_support::ctx();
        let module = ctx.standards.prebuilt(prebuilt::WATCHDOG_HEARTBEAT_TVAC).unwrap();
        assert_eq!(enum_label(module, "WatchdogMode", 16), "MISSION");
        assert_eq!(enum_label(module, "WatchdogMode", 99), "UNKNOWN (99)");
        assert_eq!(enum_label(module, "NoSuchChannel", 0), "UNKNOWN (0)");
    }
}
