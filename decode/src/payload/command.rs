// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Commands sent from the ground to the rover.

use super::apply_uplink_state;
use super::check_args;
use super::decode_args;
use super::display_value;
use super::encode_args;
use super::uplink_state;
use super::Metadata;
use super::PayloadCodec;
use super::State;
use super::UplinkState;
use crate::standards::Command;
use crate::Context;
use crate::Error;
use iris_messages::FswDataType;
use iris_messages::Magic;
use iris_messages::Opcode;
use iris_messages::Value;
use slog::trace;

/// Which flavor of command encoding a payload uses.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CommandKind {
    /// Enum arguments are 32 bits wide.
    #[default]
    Standard,
    /// Commands handled by the watchdog, whose enum arguments are one byte.
    Watchdog,
}

impl CommandKind {
    const fn enum_wire_type(&self) -> FswDataType {
        match self {
            CommandKind::Standard => FswDataType::Enum,
            CommandKind::Watchdog => FswDataType::U8,
        }
    }

    const fn default_magic(&self) -> Magic {
        match self {
            CommandKind::Standard => Magic::Command,
            CommandKind::Watchdog => Magic::WatchdogCommand,
        }
    }
}

/// A command payload.
///
/// Enum arguments are held by variant name.
#[derive(Clone, Debug)]
pub struct CommandPayload {
    module_id: u8,
    command_id: u8,
    args: Vec<(String, Value)>,
    kind: CommandKind,
    label: String,
    raw: Vec<u8>,
    meta: Metadata,
    pub uplink: UplinkState,
}

impl CommandPayload {
    /// Build a command from its arguments, encoding it immediately.
    ///
    /// Every declared argument must be given exactly once, and nothing else.
    /// Enum arguments may be given by variant name or by value.
    pub fn new(
        ctx: &Context,
        kind: CommandKind,
        module_id: u8,
        command_id: u8,
        args: Vec<(String, Value)>,
    ) -> Result<Self, Error> {
        let opcode = Opcode::new(module_id, command_id);
        let (_, command) = ctx
            .standards
            .global_command_lookup(opcode)
            .map_err(|e| Error::Encode(e.to_string()))?;
        check_args(&command.name, &command.args, &args)?;

        let mut raw = opcode.to_bytes(ctx.endianness).to_vec();
        raw.extend(encode_args(
            &command.args,
            &args,
            kind.enum_wire_type(),
            ctx.endianness,
        )?);

        // Re-decode so enum arguments are held by name no matter how they
        // were given.
        Self::decode_as(ctx, &raw, kind).map(|(payload, _)| payload)
    }

    /// Look up a command by module and command name, then build it.
    pub fn by_name(
        ctx: &Context,
        kind: CommandKind,
        module: &str,
        command: &str,
        args: Vec<(String, Value)>,
    ) -> Result<Self, Error> {
        let m = ctx.standards.module_by_name(module)?;
        let c = m.command(command)?;
        Self::new(ctx, kind, m.id, c.id, args)
    }

    /// Decode a command whose enum arguments use the width `kind` dictates.
    pub fn decode_as(
        ctx: &Context,
        data: &[u8],
        kind: CommandKind,
    ) -> Result<(Self, usize), Error> {
        let opcode = Opcode::from_bytes(data, ctx.endianness)
            .map_err(|e| Error::decode(data, e.to_string()))?;
        let (module, command) = ctx
            .standards
            .global_command_lookup(opcode)
            .map_err(|e| Error::decode(&data[..2], e.to_string()))?;

        let (args, n) = decode_args(
            &command.args,
            &data[2..],
            kind.enum_wire_type(),
            ctx.endianness,
        )?;
        let cursor = 2 + n;
        trace!(ctx.log, "decoded command"; "opcode" => %opcode, "len" => cursor);

        let payload = Self {
            module_id: module.id,
            command_id: command.id,
            label: format!("{}_{}", module.name, command.name),
            args,
            kind,
            raw: data[..cursor].to_vec(),
            meta: Metadata::new(kind.default_magic(), ctx.endianness),
            uplink: UplinkState::default(),
        };
        Ok((payload, cursor))
    }

    pub fn module_id(&self) -> u8 {
        self.module_id
    }

    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::new(self.module_id, self.command_id)
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn args(&self) -> &[(String, Value)] {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Resolve this command's definition in `ctx`'s standards.
    pub fn command<'a>(&self, ctx: &'a Context) -> Result<&'a Command, Error> {
        Ok(ctx.standards.global_command_lookup(self.opcode())?.1)
    }
}

impl PayloadCodec for CommandPayload {
    fn decode(ctx: &Context, data: &[u8]) -> Result<(Self, usize), Error> {
        Self::decode_as(ctx, data, CommandKind::Standard)
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
        uplink_state(&self.meta, &self.uplink)
    }

    fn set_state(&mut self, state: State) -> Result<(), Error> {
        apply_uplink_state(&mut self.meta, &mut self.uplink, state)
    }
}

impl PartialEq for CommandPayload {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.kind == other.kind
            && self.meta.magic == other.meta.magic
            && self.meta.pathway == other.meta.pathway
            && self.meta.source == other.meta.source
            && self.uplink == other.uplink
    }
}

impl core::fmt::Display for CommandPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        write!(f, "{}[{}]", self.label, args.join(", "))
    }
}

impl CommandPayload {
    /// Describe the arguments, showing enum values alongside their names.
    pub fn describe(&self, ctx: &Context) -> Result<String, Error> {
        let command = self.command(ctx)?;
        let args: Vec<String> = command
            .args
            .iter()
            .zip(self.args.iter())
            .map(|(decl, (name, value))| format!("{name}: {}", display_value(decl, value)))
            .collect();
        Ok(format!("{}[{}]", self.label, args.join(", ")))
    }
}
