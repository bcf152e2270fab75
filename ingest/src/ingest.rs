// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Turn raw buffers into packets, and typed text into commands.

use crate::Config;
use crate::Error;
use iris_decode::classify;
use iris_decode::packet::CommonPacket;
use iris_decode::payload::CommandKind;
use iris_decode::payload::CommandPayload;
use iris_decode::standards::Argument;
use iris_decode::Context;
use iris_decode::DataStandards;
use iris_decode::Packet;
use iris_decode::PayloadCollection;
use iris_messages::Category;
use iris_messages::Value;
use slog::debug;
use slog::warn;
use slog::Logger;
use std::sync::Arc;

/// Classifies buffers against one set of data standards and stamps the
/// resulting payloads with the configured pathway and source.
#[derive(Clone, Debug)]
pub struct Ingestor {
    config: Config,
    ctx: Context,
}

impl Ingestor {
    /// Create an ingestor.
    ///
    /// Fails if prebuilt validation is enabled and `standards` is missing any
    /// prebuilt module.
    pub fn new(config: Config, standards: Arc<DataStandards>, log: Logger) -> Result<Self, Error> {
        if config.validate_prebuilt {
            standards.validate_prebuilt()?;
        }
        let ctx = Context::new(standards, log).with_endianness(config.endianness);
        Ok(Self { config, ctx })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Classify and decode one buffer.
    ///
    /// Anything the decoder cannot make sense of comes back as an unsupported
    /// packet; only oversized buffers are an error.
    pub fn ingest(&self, data: &[u8]) -> Result<Packet, Error> {
        let max = self.config.max_packet_size;
        if data.len() > max {
            warn!(
                self.ctx.log,
                "dropping oversized packet";
                "len" => data.len(),
                "max" => max
            );
            return Err(Error::TooLarge {
                len: data.len(),
                max,
            });
        }
        let mut packet = classify(&self.ctx, data);
        packet.set_pathway(self.config.pathway);
        packet.set_source(self.config.source);
        debug!(
            self.ctx.log,
            "ingested packet";
            "kind" => %packet.kind(),
            "payloads" => packet.payloads().len()
        );
        Ok(packet)
    }

    /// Build a command from `name=value` style text arguments.
    ///
    /// Each value is parsed according to the declared type of the argument it
    /// names.
    pub fn build_command(
        &self,
        kind: CommandKind,
        module: &str,
        command: &str,
        args: &[(String, String)],
    ) -> Result<CommandPayload, Error> {
        let c = self.ctx.standards.module_by_name(module)?.command(command)?;
        let values = args
            .iter()
            .map(|(name, text)| {
                let arg = c.args.iter().find(|a| a.name == *name).ok_or_else(|| {
                    Error::Argument(format!("{command} has no argument '{name}'"))
                })?;
                Ok((name.clone(), parse_argument(arg, text)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(CommandPayload::by_name(&self.ctx, kind, module, command, values)?)
    }

    /// Wrap a single command in a common packet.
    pub fn command_packet(
        &self,
        seq_num: u8,
        command: CommandPayload,
    ) -> Result<CommonPacket, Error> {
        let mut payloads = PayloadCollection::new();
        payloads.push(command);
        Ok(CommonPacket::new(&self.ctx, seq_num, payloads)?)
    }
}

/// Split `name=value` into its two halves.
pub fn split_assignment(text: &str) -> Result<(String, String), Error> {
    match text.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(Error::Argument(format!(
            "expected NAME=VALUE, found '{text}'"
        ))),
    }
}

/// Parse the text form of a value for `arg`.
///
/// Integers may be written in decimal or with a `0x` prefix. Enum arguments
/// take either a variant name or a number. Byte strings are written as hex.
pub fn parse_argument(arg: &Argument, text: &str) -> Result<Value, Error> {
    let datatype = arg.datatype;
    let bad = || {
        Error::Argument(format!(
            "'{text}' is not a valid {} for {}",
            datatype.name(),
            arg.name
        ))
    };
    match datatype.category() {
        Category::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(bad()),
        },
        Category::Number if datatype.is_float() => {
            text.parse::<f64>().map(Value::Float).map_err(|_| bad())
        }
        Category::Number => parse_integer(text, datatype.is_signed()).ok_or_else(bad),
        Category::Enum => Ok(parse_integer(text, false).unwrap_or_else(|| Value::from(text))),
        Category::String | Category::VarString => Ok(Value::from(text)),
        Category::IrisByteString => crate::parse_hex(text).map(Value::Bytes),
        Category::Empty => Err(Error::Argument(format!(
            "argument {} has no wire type",
            arg.name
        ))),
    }
}

fn parse_integer(text: &str, signed: bool) -> Option<Value> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };
    let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => body.parse::<u64>().ok()?,
    };
    if negative {
        i64::try_from(-i128::from(magnitude)).ok().map(Value::Signed)
    } else if signed {
        i64::try_from(magnitude).ok().map(Value::Signed)
    } else {
        Some(Value::Unsigned(magnitude))
    }
}
