// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Events raised on the ground just because a packet of some kind arrived.

use crate::packet::PacketKind;
use crate::payload::EventPayload;
use crate::prebuilt;
use crate::utils::format_hex_runs;
use crate::utils::strip_ansi;
use crate::Context;
use crate::Error;
use iris_messages::codec::escape_bytes;
use iris_messages::Value;

/// Turn arbitrary packet text into an event message of at most `max_len`
/// characters.
///
/// Terminal escapes and NULs are dropped, line breaks and tabs become spaces,
/// and runs of other unprintable bytes are shown as `0xAA:BB`. The result is
/// an escaped string, as string fields expect.
pub fn render_message(text: &[u8], max_len: usize) -> String {
    let cleaned: Vec<u8> = strip_ansi(text)
        .into_iter()
        .filter(|b| *b != 0)
        .map(|b| match b {
            b'\t' | b'\r' | b'\n' => b' ',
            b => b,
        })
        .collect();
    clip_escaped(format_hex_runs(&escape_bytes(&cleaned)), max_len)
}

/// Shorten an escaped string to at most `max_len` characters without cutting
/// through an escape sequence.
pub(crate) fn clip_escaped(text: String, max_len: usize) -> String {
    if text.len() <= max_len {
        return text;
    }
    let bytes = text.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        let step = match (bytes[end], bytes.get(end + 1).copied()) {
            (b'\\', Some(b'x')) => 4,
            (b'\\', _) => 2,
            _ => 1,
        };
        if end + step > max_len {
            break;
        }
        end += step;
    }
    // Escaped strings are ASCII, so `end` is a char boundary.
    text[..end].to_string()
}

/// Build the `GdsPackets` event announcing a packet of `kind`, carrying
/// `message`.
pub fn packet_event(
    ctx: &Context,
    kind: PacketKind,
    message: &[u8],
) -> Result<EventPayload, Error> {
    let module = ctx.standards.prebuilt(prebuilt::GDS_PACKETS)?;
    let event = module.event(kind.name())?;
    let arg = event.arg(prebuilt::GDS_MESSAGE_ARG).ok_or_else(|| {
        Error::Implementation(format!(
            "{}.{} has no '{}' argument",
            module.name,
            event.name,
            prebuilt::GDS_MESSAGE_ARG
        ))
    })?;
    let message = render_message(message, arg.max_content_len());
    EventPayload::new(
        ctx,
        module.id,
        event.id,
        0,
        vec![(String::from(prebuilt::GDS_MESSAGE_ARG), Value::Str(message))],
    )
}
