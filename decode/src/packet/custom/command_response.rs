// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The Watchdog's reply to a command addressed to it.

use super::enum_label;
use super::CustomPayload;
use crate::packet::gds::packet_event;
use crate::packet::PacketKind;
use crate::payload::Payload;
use crate::prebuilt;
use crate::Context;
use crate::Error;
use iris_messages::Opcode;
use iris_messages::Value;

/// Name used when the responding command is not in the standards.
const UNKNOWN_COMMAND: &str = "UNKNOWN";

#[derive(Clone, Debug, PartialEq)]
pub struct CommandResponse {
    pub command_id: u8,
    pub error_flag: u8,
    command_name: String,
    error_flag_name: String,
    error_flag_comment: String,
}

impl CommandResponse {
    /// The name of the command being answered, as the current standards
    /// define it.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn error_flag_name(&self) -> &str {
        &self.error_flag_name
    }

    /// A one-line summary including the meaning of the error flag.
    pub fn describe(&self) -> String {
        format!(
            "> Command #{} ({}) responded with {}[{:#x}]: '{}'.",
            self.command_id,
            self.command_name,
            self.error_flag_name,
            self.error_flag,
            self.error_flag_comment
        )
    }
}

impl CustomPayload for CommandResponse {
    const KIND: PacketKind = PacketKind::WatchdogCommandResponse;
    const START_FLAG: u8 = 0x0A;
    const LENGTH: usize = 3;
    const MODULE: &'static str = prebuilt::WATCHDOG_COMMAND_RESPONSE;

    fn unpack(ctx: &Context, body: &[u8]) -> Result<Self, Error> {
        let [command_id, error_flag] = body else {
            return Err(Error::decode(body, "command response body must be 2 bytes"));
        };
        let (command_id, error_flag) = (*command_id, *error_flag);
        let module = ctx.standards.prebuilt(Self::MODULE)?;

        let command_name = ctx
            .standards
            .module_by_name(prebuilt::WATCHDOG_INTERFACE)
            .and_then(|wd| {
                ctx.standards
                    .global_command_lookup(Opcode::new(wd.id, command_id))
            })
            .map(|(_, command)| command.name.clone())
            .unwrap_or_else(|_| String::from(UNKNOWN_COMMAND));
        let error_flag_comment = module
            .channel("ErrorFlag")
            .ok()
            .and_then(|c| c.field.enum_item(i64::from(error_flag)))
            .and_then(|item| item.comment.clone())
            .unwrap_or_default();

        Ok(Self {
            command_id,
            error_flag,
            command_name,
            error_flag_name: enum_label(module, "ErrorFlag", i64::from(error_flag)),
            error_flag_comment,
        })
    }

    fn channel(&self, name: &str) -> Option<Value> {
        match name {
            "CommandId" => Some(Value::from(self.command_id)),
            "ErrorFlag" => Some(Value::from(self.error_flag)),
            _ => None,
        }
    }

    fn extra_payloads(&self, ctx: &Context) -> Result<Vec<Payload>, Error> {
        let event = packet_event(ctx, Self::KIND, self.describe().as_bytes())?;
        Ok(vec![event.into()])
    }
}

impl core::fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "> Command[#{}: {}] -> {}[{:#x}]",
            self.command_id, self.command_name, self.error_flag_name, self.error_flag
        )
    }
}
