// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The variable-length payload section of a common packet: a run of
//! magic-prefixed payloads.

use crate::collection::PayloadCollection;
use crate::payload::Payload;
use crate::Context;
use crate::Error;
use iris_messages::Magic;
use slog::trace;
use slog::warn;

/// Write a magic, warning if it is deprecated.
pub fn encode_magic(ctx: &Context, magic: Magic) -> [u8; Magic::SIZE] {
    if magic.is_deprecated() {
        warn!(ctx.log, "encoding a deprecated magic"; "magic" => %magic);
    }
    magic.to_bytes()
}

/// Read a magic from the front of `data`, warning if it is deprecated.
pub fn decode_magic(ctx: &Context, data: &[u8]) -> Result<Magic, Error> {
    let magic = Magic::from_bytes(data).map_err(|e| {
        Error::decode(&data[..data.len().min(Magic::SIZE)], e.to_string())
    })?;
    if magic.is_deprecated() {
        warn!(ctx.log, "decoded a deprecated magic"; "magic" => %magic);
    }
    Ok(magic)
}

/// Parse every payload in `data`.
///
/// Trailing bytes too short to hold a magic are ignored.
pub fn parse(ctx: &Context, data: &[u8]) -> Result<PayloadCollection, Error> {
    let mut payloads = PayloadCollection::new();
    let mut cursor = 0;
    while data.len() - cursor >= Magic::SIZE {
        let magic = decode_magic(ctx, &data[cursor..])?;
        if magic == Magic::Missing {
            return Err(Error::decode(
                &data[cursor..],
                "missing-magic slot in VLP",
            ));
        }
        cursor += Magic::SIZE;

        let (payload, n) = Payload::decode(ctx, magic, &data[cursor..])?;
        if n == 0 {
            return Err(Error::decode(
                &data[cursor..],
                format!("{magic} payload consumed no bytes; likely wrong magic"),
            ));
        }
        trace!(ctx.log, "extracted payload"; "magic" => %magic, "len" => n);
        cursor += n;
        payloads.push(payload);
    }
    Ok(payloads)
}

/// Write every payload, magic first, in bucket order.
pub fn build(ctx: &Context, payloads: &PayloadCollection) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads.all_payloads() {
        out.extend_from_slice(&encode_magic(ctx, payload.magic()));
        out.extend(payload.encode());
    }
    out
}
