// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The Iris Common Packet: a small header followed by a run of payloads.

use super::PacketCodec;
use crate::collection::PayloadClass;
use crate::collection::PayloadCollection;
use crate::payload::reject_unknown;
use crate::payload::take_key;
use crate::payload::State;
use crate::utils::hexdump;
use crate::vlp;
use crate::Context;
use crate::Error;
use iris_messages::checksum;
use iris_messages::header::CommonPacketHeader;
use iris_messages::header::FixedHeader;
use iris_messages::header::LegacyCommonPacketHeader;
use iris_messages::Magic;
use serde::Serialize;
use slog::debug;
use slog::warn;

const STATE_KEY: &str = "cph";

/// The header of either flavor of common packet.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Header {
    Current(CommonPacketHeader),
    /// The 2020 flight software's header, with a 2-byte checksum.
    Legacy(LegacyCommonPacketHeader),
}

impl Header {
    const fn size(legacy: bool) -> usize {
        if legacy {
            5
        } else {
            4
        }
    }

    fn read(data: &[u8], legacy: bool) -> Result<(Self, &[u8]), Error> {
        let read = if legacy {
            LegacyCommonPacketHeader::read(data).map(|(h, rest)| (Header::Legacy(h), rest))
        } else {
            CommonPacketHeader::read(data).map(|(h, rest)| (Header::Current(h), rest))
        };
        read.map_err(|e| Error::decode(data, format!("common packet header: {e}")))
    }

    fn seq_num(&self) -> u8 {
        match self {
            Header::Current(h) => h.seq_num,
            Header::Legacy(h) => h.seq_num,
        }
    }

    fn vlp_len(&self) -> u16 {
        match self {
            Header::Current(h) => h.vlp_len,
            Header::Legacy(h) => h.vlp_len,
        }
    }

    fn checksum(&self) -> u16 {
        match self {
            Header::Current(h) => u16::from(h.checksum),
            Header::Legacy(h) => h.checksum,
        }
    }

    fn to_bytes(self) -> Result<Vec<u8>, Error> {
        let bytes = match self {
            Header::Current(h) => h.to_bytes(),
            Header::Legacy(h) => h.to_bytes(),
        };
        Ok(bytes?)
    }

    fn to_json(self) -> serde_json::Value {
        fn json<T: Serialize>(h: &T) -> serde_json::Value {
            serde_json::to_value(h).unwrap_or(serde_json::Value::Null)
        }
        match self {
            Header::Current(h) => json(&h),
            Header::Legacy(h) => json(&h),
        }
    }
}

/// A common packet, current or legacy.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonPacket {
    header: Header,
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl CommonPacket {
    /// Build a packet around `payloads`, encoding it immediately.
    pub fn new(ctx: &Context, seq_num: u8, payloads: PayloadCollection) -> Result<Self, Error> {
        let header = Header::Current(CommonPacketHeader {
            seq_num,
            ..Default::default()
        });
        Self::build(ctx, header, payloads)
    }

    /// Build a packet in the 2020 flight software's format.
    pub fn new_legacy(
        ctx: &Context,
        seq_num: u8,
        payloads: PayloadCollection,
    ) -> Result<Self, Error> {
        let header = Header::Legacy(LegacyCommonPacketHeader {
            seq_num,
            ..Default::default()
        });
        Self::build(ctx, header, payloads)
    }

    fn build(ctx: &Context, header: Header, payloads: PayloadCollection) -> Result<Self, Error> {
        let raw = encode_parts(ctx, header, &payloads)?;
        let legacy = matches!(header, Header::Legacy(_));
        let mut packet = Self::decode(ctx, &raw, legacy)?;
        // Keep the caller's payloads, which may carry metadata the bytes
        // cannot.
        packet.payloads = payloads;
        Ok(packet)
    }

    /// Return true if `data` starts with a plausible header followed by a
    /// known magic.
    pub fn is_valid(data: &[u8], legacy: bool) -> bool {
        let start = Header::size(legacy);
        if data.len() < start + Magic::SIZE + 1 {
            return false;
        }
        matches!(Magic::from_bytes(&data[start..]), Ok(m) if m != Magic::Missing)
    }

    /// Decode a whole common packet.
    ///
    /// A payload section that cannot be parsed does not fail the packet; it is
    /// logged and the packet keeps no payloads.
    pub fn decode(ctx: &Context, data: &[u8], legacy: bool) -> Result<Self, Error> {
        let (header, body) = Header::read(data, legacy)?;
        if usize::from(header.vlp_len()) != body.len() {
            return Err(Error::decode(
                data,
                format!(
                    "header declares a {}-byte payload section but {} bytes follow it",
                    header.vlp_len(),
                    body.len()
                ),
            ));
        }
        if !legacy && checksum(data) != 0 {
            debug!(
                ctx.log,
                "common packet checksum does not match";
                "seq_num" => header.seq_num(),
                "checksum" => header.checksum()
            );
        }

        let payloads = match vlp::parse(ctx, body) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    ctx.log,
                    "failed to parse common packet payloads, keeping none";
                    "seq_num" => header.seq_num(),
                    "error" => %e,
                    "hexdump" => hexdump(data)
                );
                PayloadCollection::new()
            }
        };
        Ok(Self {
            header,
            payloads,
            raw: data.to_vec(),
        })
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.header, Header::Legacy(_))
    }

    pub fn seq_num(&self) -> u8 {
        self.header.seq_num()
    }

    /// The payload section length declared in the received header.
    pub fn vlp_len(&self) -> u16 {
        self.header.vlp_len()
    }

    /// The checksum in the received header.
    pub fn checksum(&self) -> u16 {
        self.header.checksum()
    }
}

/// Write a header carrying `seq_num` and the payload section, then fill in
/// the checksum.
fn encode_parts(
    ctx: &Context,
    header: Header,
    payloads: &PayloadCollection,
) -> Result<Vec<u8>, Error> {
    let body = vlp::build(ctx, payloads);
    let vlp_len = u16::try_from(body.len()).map_err(|_| {
        Error::Encode(format!("payload section of {} bytes is too long", body.len()))
    })?;
    let zeroed = match header {
        Header::Current(h) => Header::Current(CommonPacketHeader {
            seq_num: h.seq_num,
            vlp_len,
            checksum: 0,
        }),
        Header::Legacy(h) => Header::Legacy(LegacyCommonPacketHeader {
            seq_num: h.seq_num,
            vlp_len,
            checksum: 0,
        }),
    };
    let mut out = zeroed.to_bytes()?;
    out.extend(body);
    // The legacy checksum's upper byte was never populated.
    out[3] = checksum(&out);
    Ok(out)
}

impl PacketCodec for CommonPacket {
    fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn payloads(&self) -> &PayloadCollection {
        &self.payloads
    }

    fn payloads_mut(&mut self) -> &mut PayloadCollection {
        &mut self.payloads
    }

    /// Re-encode the packet from its current payloads.
    fn encode(&self, ctx: &Context) -> Result<Vec<u8>, Error> {
        encode_parts(ctx, self.header, &self.payloads)
    }

    fn state(&self) -> State {
        let mut state = State::new();
        state.insert(String::from(STATE_KEY), self.header.to_json());
        state
    }

    fn set_state(&mut self, mut state: State) -> Result<(), Error> {
        self.header = match self.header {
            Header::Current(_) => Header::Current(take_key(&mut state, STATE_KEY)?),
            Header::Legacy(_) => Header::Legacy(take_key(&mut state, STATE_KEY)?),
        };
        reject_unknown(state)
    }
}

impl core::fmt::Display for CommonPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.is_legacy() {
            write!(f, "LEGACY2020 ")?;
        }
        write!(
            f,
            "ICP[#{}::{}]: {}T - {}E - {}B - {}C",
            self.seq_num(),
            self.vlp_len(),
            self.payloads.num_payloads(PayloadClass::Telemetry),
            self.payloads.num_payloads(PayloadClass::Event),
            self.payloads.num_payloads(PayloadClass::FileBlock),
            self.payloads.num_payloads(PayloadClass::Command),
        )
    }
}
