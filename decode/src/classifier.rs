// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Pick the packet kind for a run of bytes and decode it.
//!
//! Classification never fails. Bytes that no kind accepts, or that the chosen
//! kind then fails to decode, become an [`UnsupportedPacket`].

use crate::packet::Packet;
use crate::packet::PacketKind;
use crate::packet::UnsupportedPacket;
use crate::Context;
use slog::debug;
use slog::error;
use slog::warn;

/// Every kind whose validator accepts `data`, most preferred first.
pub fn candidates(data: &[u8]) -> Vec<PacketKind> {
    PacketKind::PREFERENCE
        .iter()
        .copied()
        .filter(|kind| kind.is_valid(data))
        .collect()
}

/// Classify and decode `data`.
pub fn classify(ctx: &Context, data: &[u8]) -> Packet {
    let matches = candidates(data);
    let Some(kind) = matches.first().copied() else {
        debug!(ctx.log, "no packet kind matched"; "len" => data.len());
        return Packet::Unsupported(UnsupportedPacket::decode(ctx, data));
    };
    if matches.len() > 1 {
        let names: Vec<_> = matches.iter().map(PacketKind::name).collect();
        warn!(
            ctx.log,
            "multiple packet kinds matched, using the first";
            "kinds" => names.join(", "),
            "chosen" => %kind
        );
    }

    let ctx = ctx.child(slog::o!("kind" => kind.name()));
    match kind.decode(&ctx, data) {
        Ok(packet) => packet,
        Err(e) => {
            error!(ctx.log, "failed to decode packet"; "err" => %e);
            Packet::Unsupported(UnsupportedPacket::decode(&ctx, data))
        }
    }
}
