// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Events emitted by the rover, and rendering of their format strings.

use super::apply_downlink_state;
use super::check_args;
use super::decode_args;
use super::display_value;
use super::downlink_state;
use super::encode_args;
use super::telemetry::downlinked_prefix;
use super::telemetry::read_downlinked_prefix;
use super::DownlinkTimes;
use super::Metadata;
use super::PayloadCodec;
use super::State;
use crate::standards::Event;
use crate::standards::Severity;
use crate::Context;
use crate::Error;
use iris_messages::FswDataType;
use iris_messages::Magic;
use iris_messages::Opcode;
use iris_messages::Value;
use slog::trace;

/// One event, with its arguments and the rendered message.
#[derive(Clone, Debug)]
pub struct EventPayload {
    module_id: u8,
    event_id: u8,
    timestamp: u32,
    args: Vec<(String, Value)>,
    label: String,
    severity: Severity,
    rendered: String,
    raw: Vec<u8>,
    meta: Metadata,
    pub downlink_times: Option<DownlinkTimes>,
}

impl EventPayload {
    /// Build an event, encoding it immediately.
    pub fn new(
        ctx: &Context,
        module_id: u8,
        event_id: u8,
        timestamp: u32,
        args: Vec<(String, Value)>,
    ) -> Result<Self, Error> {
        let opcode = Opcode::new(module_id, event_id);
        let (_, event) = ctx
            .standards
            .global_event_lookup(opcode)
            .map_err(|e| Error::Encode(e.to_string()))?;
        check_args(&event.name, &event.args, &args)?;
        let mut raw = downlinked_prefix(opcode, timestamp, ctx.endianness);
        raw.extend(encode_args(
            &event.args,
            &args,
            FswDataType::Enum,
            ctx.endianness,
        )?);
        Self::decode(ctx, &raw).map(|(payload, _)| payload)
    }

    /// Look up an event by module and event name, then build it.
    pub fn by_name(
        ctx: &Context,
        module: &str,
        event: &str,
        timestamp: u32,
        args: Vec<(String, Value)>,
    ) -> Result<Self, Error> {
        let m = ctx.standards.module_by_name(module)?;
        let e = m.event(event)?;
        Self::new(ctx, m.id, e.id, timestamp, args)
    }

    pub fn module_id(&self) -> u8 {
        self.module_id
    }

    pub fn event_id(&self) -> u8 {
        self.event_id
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::new(self.module_id, self.event_id)
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn args(&self) -> &[(String, Value)] {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// `Module.Event`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The event's format string with its arguments substituted.
    pub fn formatted_string(&self) -> &str {
        &self.rendered
    }

    pub fn event<'a>(&self, ctx: &'a Context) -> Result<&'a Event, Error> {
        Ok(ctx.standards.global_event_lookup(self.opcode())?.1)
    }
}

impl PayloadCodec for EventPayload {
    fn decode(ctx: &Context, data: &[u8]) -> Result<(Self, usize), Error> {
        let header = read_downlinked_prefix(data, ctx.endianness)?;
        let (module, event) = ctx
            .standards
            .global_event_lookup(header.opcode)
            .map_err(|e| Error::decode(&data[..2], e.to_string()))?;
        let (args, n) = decode_args(&event.args, &data[6..], FswDataType::Enum, ctx.endianness)?;
        let consumed = 6 + n;

        let rendered_args: Vec<FormatArg> = event
            .args
            .iter()
            .zip(args.iter())
            .map(|(decl, (_, value))| {
                if decl.is_enum() {
                    FormatArg::Text(display_value(decl, value))
                } else {
                    FormatArg::from(value)
                }
            })
            .collect();
        let rendered = render_format(&event.format_string, &rendered_args);
        trace!(ctx.log, "decoded event"; "event" => &event.name, "len" => consumed);

        let payload = Self {
            module_id: module.id,
            event_id: event.id,
            timestamp: header.timestamp,
            args,
            label: format!("{}.{}", module.name, event.name),
            severity: event.severity,
            rendered,
            raw: data[..consumed].to_vec(),
            meta: Metadata::new(Magic::Event, ctx.endianness),
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

impl PartialEq for EventPayload {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.meta.magic == other.meta.magic
            && self.meta.pathway == other.meta.pathway
            && self.meta.source == other.meta.source
            && self.downlink_times == other.downlink_times
    }
}

impl core::fmt::Display for EventPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "[{}] {}@{}: {}",
            self.severity, self.label, self.timestamp, self.rendered
        )
    }
}

/// One argument to [`render_format`].
#[derive(Clone, Debug, PartialEq)]
pub enum FormatArg {
    Int(i128),
    Float(f64),
    Text(String),
}

impl From<&Value> for FormatArg {
    fn from(value: &Value) -> Self {
        match value {
            Value::Unsigned(x) => FormatArg::Int(i128::from(*x)),
            Value::Signed(x) => FormatArg::Int(i128::from(*x)),
            Value::Float(x) => FormatArg::Float(*x),
            v => FormatArg::Text(v.to_string()),
        }
    }
}

// Widths and precisions are clamped to this.
const MAX_FIELD_WIDTH: usize = 255;

#[derive(Default)]
struct Directive {
    left: bool,
    zero: bool,
    plus: bool,
    width: usize,
    precision: Option<usize>,
}

impl Directive {
    fn pad(&self, s: String) -> String {
        if s.len() >= self.width {
            return s;
        }
        let fill = self.width - s.len();
        if self.left {
            format!("{s}{}", " ".repeat(fill))
        } else if self.zero {
            match s.strip_prefix('-') {
                Some(digits) => format!("-{}{digits}", "0".repeat(fill)),
                None => format!("{}{s}", "0".repeat(fill)),
            }
        } else {
            format!("{}{s}", " ".repeat(fill))
        }
    }

    fn signed(&self, s: String, negative: bool) -> String {
        if self.plus && !negative {
            format!("+{s}")
        } else {
            s
        }
    }
}

/// Substitute `args` into a printf-style format string.
///
/// Supports the `d i u x X o c s f F e g` conversions with flags, width, and
/// precision. Length modifiers are accepted and ignored. A conversion whose
/// argument has the wrong kind falls back to the argument's plain text, and a
/// conversion with no argument left is copied through unchanged.
pub fn render_format(format: &str, args: &[FormatArg]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut conv = Directive::default();
        while let Some((_, flag)) = chars.peek().copied() {
            match flag {
                '-' => conv.left = true,
                '0' => conv.zero = true,
                '+' => conv.plus = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        while let Some((_, d)) = chars.peek().copied() {
            let Some(d) = d.to_digit(10) else { break };
            conv.width = conv
                .width
                .saturating_mul(10)
                .saturating_add(d as usize)
                .min(MAX_FIELD_WIDTH);
            chars.next();
        }
        if let Some((_, '.')) = chars.peek() {
            chars.next();
            let mut precision: usize = 0;
            while let Some((_, d)) = chars.peek().copied() {
                let Some(d) = d.to_digit(10) else { break };
                precision = usize::min(
                    precision.saturating_mul(10).saturating_add(d as usize),
                    MAX_FIELD_WIDTH,
                );
                chars.next();
            }
            conv.precision = Some(precision);
        }
        while let Some((_, 'h' | 'l' | 'L' | 'q' | 'j' | 'z' | 't')) = chars.peek() {
            chars.next();
        }

        let Some((end, conversion)) = chars.next() else {
            out.push_str(&format[start..]);
            break;
        };
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            out.push_str(&format[start..end + conversion.len_utf8()]);
            continue;
        };
        out.push_str(&render_one(&conv, conversion, arg));
    }
    out
}

fn render_one(conv: &Directive, conversion: char, arg: &FormatArg) -> String {
    let text = match (conversion, arg) {
        ('d' | 'i' | 'u', FormatArg::Int(x)) => conv.signed(x.to_string(), *x < 0),
        ('x', FormatArg::Int(x)) if *x < 0 => format!("-{:x}", x.unsigned_abs()),
        ('x', FormatArg::Int(x)) => format!("{x:x}"),
        ('X', FormatArg::Int(x)) if *x < 0 => format!("-{:X}", x.unsigned_abs()),
        ('X', FormatArg::Int(x)) => format!("{x:X}"),
        ('o', FormatArg::Int(x)) => format!("{x:o}"),
        ('c', FormatArg::Int(x)) => u32::try_from(*x)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| x.to_string()),
        ('f' | 'F', FormatArg::Float(x)) => {
            conv.signed(format!("{:.*}", conv.precision.unwrap_or(6), x), *x < 0.0)
        }
        ('f' | 'F', FormatArg::Int(x)) => {
            conv.signed(format!("{:.*}", conv.precision.unwrap_or(6), *x as f64), *x < 0)
        }
        ('e', FormatArg::Float(x)) => format!("{:.*e}", conv.precision.unwrap_or(6), x),
        ('g', FormatArg::Float(x)) => x.to_string(),
        ('s', FormatArg::Text(s)) => match conv.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.clone(),
        },
        (_, FormatArg::Int(x)) => x.to_string(),
        (_, FormatArg::Float(x)) => x.to_string(),
        (_, FormatArg::Text(s)) => s.clone(),
    };
    conv.pad(text)
}

#[cfg(test)]
mod tests {
    use super::MAX_FIELD_WIDTH;
    use super::render_format;
    use super::EventPayload;
    use super::FormatArg;
    use crate::payload::PayloadCodec;
    use crate::standards::Severity;
    use crate::test_support;
    use crate::Error;
    use iris_messages::Magic;
    use iris_messages::Value;

    fn mode_changed(mode: Value) -> Result<EventPayload, Error> {
        let ctx = test_support::ctx();
        EventPayload::by_name(
            &ctx,
            "ExampleMod",
            "ModeChanged",
            1000,
            vec![
                (String::from("mode"), mode),
                (String::from("elapsed"), Value::from(1500u32)),
                (String::from("code"), Value::from(0xBEEFu16)),
            ],
        )
    }

    #[test]
    fn test_event_renders_enum_name_and_value() {
        let event = mode_changed(Value::from("DRIVE")).unwrap();
        assert_eq!(
            event.formatted_string(),
            "Mode is now DRIVE (7) after 1500 ms (0xBEEF)."
        );
        assert_eq!(event.severity(), Severity::ActivityHi);
        assert_eq!(event.magic(), Magic::Event);
        assert_eq!(
            event.to_string(),
            concat!(
                "[ACTIVITY_HI] ExampleMod.ModeChanged@1000: ",
                "Mode is now DRIVE (7) after 1500 ms (0xBEEF)."
            )
        );
        assert_eq!(event.arg("mode"), Some(&Value::from("DRIVE")));
    }

    #[test]
    fn test_event_wire_form() {
        let event = mode_changed(Value::from(0u32)).unwrap();
        assert_eq!(
            event.encode(),
            vec![
                0x01, 0x03, 0xE8, 0x03, 0x00, 0x00, // opcode, timestamp
                0x00, 0x00, 0x00, 0x00, // mode
                0xDC, 0x05, 0x00, 0x00, // elapsed
                0xEF, 0xBE, // code
            ]
        );
        let ctx = test_support::ctx();
        let (back, n) = EventPayload::decode(&ctx, &event.encode()).unwrap();
        assert_eq!(n, 16);
        assert_eq!(back, event);
        assert_eq!(back.arg("mode"), Some(&Value::from("IDLE")));
    }

    #[test]
    fn test_event_rejects_bad_enum() {
        assert!(matches!(
            mode_changed(Value::from("SLEEP")),
            Err(Error::Encode(_))
        ));
    }

    #[test]
    fn test_render_format_conversions() {
        let args = [
            FormatArg::Int(-5),
            FormatArg::Float(3.14159),
            FormatArg::Text(String::from("hi")),
            FormatArg::Int(255),
        ];
        assert_eq!(
            render_format("%03d|%.2f|%-4s|%x %%", &args),
            "-05|3.14|hi  |ff %"
        );
        assert_eq!(render_format("%lu and %s", &args[..1]), "-5 and %s");
        assert_eq!(render_format("%d", &[FormatArg::Text(String::from("x"))]), "x");
        assert_eq!(render_format("trailing %", &[]), "trailing %");
    }

    #[test]
    fn test_render_format_clamps_width() {
        let rendered = render_format("%99999999999999999999d", &[FormatArg::Int(7)]);
        assert_eq!(rendered.len(), MAX_FIELD_WIDTH);
        assert!(rendered.ends_with(" 7"));

        let rendered = render_format("%.99999999999999999999f", &[FormatArg::Float(1.5)]);
        assert_eq!(rendered.len(), MAX_FIELD_WIDTH + 2);
        assert!(rendered.starts_with("1.5000"));
    }
}
