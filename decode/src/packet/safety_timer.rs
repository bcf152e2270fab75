// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Safety timer messages from the Watchdog.
//!
//! The Watchdog reports times in centiseconds, written in hex as `0xHEX cs`
//! or `0xHEX*N cs`. Those are rewritten in sensible units. Status reports,
//! which start with `[ST]`, are summarised on one line.

use super::gds::packet_event;
use super::PacketCodec;
use super::PacketKind;
use crate::collection::PayloadCollection;
use crate::utils::hex_colon;
use crate::Context;
use crate::Error;

const DEBUG: &[u8] = b"DEBUG";
const STATUS_REPORT: &[u8] = b"[ST]";

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| w.eq_ignore_ascii_case(needle))
        .map(|(i, _)| i)
        .collect()
}

/// Whether `data` names the safety timer: `SAFETY TIMER`, `SAFETYTIMER`, or
/// `[ST]`, in any case, with any one character between the two words.
fn mentions_safety_timer(data: &[u8]) -> bool {
    if !find_ignore_case(data, STATUS_REPORT).is_empty() {
        return true;
    }
    find_ignore_case(data, b"SAFETY").into_iter().any(|i| {
        let rest = &data[i + 6..];
        let timer = |s: &[u8]| s.len() >= 5 && s[..5].eq_ignore_ascii_case(b"TIMER");
        timer(rest) || (rest.first().map_or(false, |c| *c != b'\n') && timer(&rest[1..]))
    })
}

/// Render a time in centiseconds as minutes and seconds, seconds, or
/// milliseconds, depending on its size.
pub fn humanize_cs(cs: i64) -> String {
    if cs.div_euclid(6000) != 0 {
        format!("{}m{}s", cs.div_euclid(6000), cs.rem_euclid(6000) / 100)
    } else if cs.div_euclid(100) != 0 {
        format!("{:.3}s", cs as f64 / 100.0)
    } else {
        format!("{}ms", cs * 10)
    }
}

/// A cursor over ASCII text, for the small fixed grammars used here.
struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a [u8], pos: usize) -> Self {
        Self { s, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skip at most one whitespace character.
    fn skip_one_ws(&mut self) {
        if self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn tag(&mut self, t: &[u8]) -> Option<()> {
        if self.s[self.pos..].starts_with(t) {
            self.pos += t.len();
            Some(())
        } else {
            None
        }
    }

    fn run(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let s = self.s;
        let start = self.pos;
        while self.peek().map_or(false, &pred) {
            self.pos += 1;
        }
        &s[start..self.pos]
    }

    fn digits(&mut self, radix: u32) -> Option<(i64, &'a [u8])> {
        let text = self.run(|c| char::from(c).is_digit(radix));
        let value = std::str::from_utf8(text).ok()?;
        Some((i64::from_str_radix(value, radix).ok()?, text))
    }

    /// Hex digits, optionally preceded by `0x`.
    fn hex(&mut self) -> Option<i64> {
        let prefixed = self.s[self.pos..].len() > 2
            && self.s[self.pos] == b'0'
            && matches!(self.s[self.pos + 1], b'x' | b'X')
            && self.s[self.pos + 2].is_ascii_hexdigit();
        if prefixed {
            self.pos += 2;
        }
        self.digits(16).map(|(v, _)| v)
    }
}

/// Try to read `0xHEX cs` or `0xHEX*N cs` at `pos`, returning the time in
/// centiseconds and the end of the match.
fn hex_cs_at(data: &[u8], pos: usize) -> Option<(i64, usize)> {
    let mut c = Cursor::new(data, pos);
    c.tag(b"0x").or_else(|| c.tag(b"0X"))?;
    let (value, _) = c.digits(16)?;
    let after_hex = c.pos;

    // With a multiplier.
    c.skip_one_ws();
    if c.tag(b"*").is_some() {
        c.skip_one_ws();
        if let Some((coeff, _)) = c.digits(10) {
            c.skip_one_ws();
            if c.tag(b"cs").is_some() {
                return Some((value.checked_mul(coeff)?, c.pos));
            }
        }
    }

    // Without: exactly one whitespace character before the unit.
    let mut c = Cursor::new(data, after_hex);
    if !c.peek()?.is_ascii_whitespace() {
        return None;
    }
    c.pos += 1;
    c.tag(b"cs")?;
    Some((value, c.pos))
}

/// Rewrite every hex centisecond time in `data` in human units.
pub fn humanize_hex_times(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'0' {
            if let Some((cs, end)) = hex_cs_at(data, i) {
                out.extend(humanize_cs(cs).as_bytes());
                i = end;
                continue;
            }
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

/// The fields of an `[ST]` status report:
/// `[ST] ON:<hex> @: <timer> / <cutoff> <count> / <trigger> WF:<hex>:<hex>`.
#[derive(Debug, PartialEq)]
struct StatusReport {
    on: i64,
    timer_cs: i64,
    cutoff_cs: i64,
    count: i64,
    trigger: i64,
    watchdog_flags: u32,
}

impl StatusReport {
    fn parse_at(data: &[u8], pos: usize) -> Option<Self> {
        let mut c = Cursor::new(data, pos);
        c.tag(STATUS_REPORT)?;
        c.skip_ws();
        c.tag(b"ON")?;
        c.run(|b| b == b':');
        let on = c.hex()?;
        c.skip_ws();
        c.tag(b"@:")?;
        c.skip_ws();
        let timer_cs = c.hex()?;
        c.skip_ws();
        c.tag(b"/")?;
        c.skip_ws();
        let cutoff_cs = c.hex()?;
        c.skip_ws();
        let (count, _) = c.digits(10)?;
        c.skip_ws();
        c.tag(b"/")?;
        c.skip_ws();
        let (trigger, _) = c.digits(10)?;
        c.skip_ws();
        c.tag(b"WF:")?;
        let hi = u16::try_from(c.hex()?).ok()?;
        c.tag(b":")?;
        let (lo, _) = c.digits(16)?;
        let lo = u16::try_from(lo).ok()?;
        Some(Self {
            on,
            timer_cs,
            cutoff_cs,
            count,
            trigger,
            watchdog_flags: u32::from(hi) << 16 | u32::from(lo),
        })
    }

    fn find(data: &[u8]) -> Option<Self> {
        (0..data.len())
            .filter(|i| data[*i..].starts_with(STATUS_REPORT))
            .find_map(|i| Self::parse_at(data, i))
    }
}

impl core::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let on = match self.on {
            0xFF => "ON",
            0x00 => "OFF",
            _ => "BAD",
        };
        // Time across every expiration so far, and until the reboot.
        let timer_real = self
            .cutoff_cs
            .saturating_mul(self.count)
            .saturating_add(self.timer_cs);
        let cutoff_real = self.cutoff_cs.saturating_mul(self.trigger);
        let left = humanize_cs(cutoff_real.saturating_sub(timer_real)).to_uppercase();
        write!(
            f,
            concat!(
                "[ST] SAFETY TIMER: {on} \t {} / {} \t @ {}/{} \t -> \t {} / {} \t ",
                "{left} LEFT \t WF: {}"
            ),
            humanize_cs(self.timer_cs),
            humanize_cs(self.cutoff_cs),
            self.count,
            self.trigger,
            humanize_cs(timer_real),
            humanize_cs(cutoff_real),
            hex_colon(&self.watchdog_flags.to_be_bytes()),
            on = on,
            left = left,
        )
    }
}

/// A message about the Watchdog's safety timer.
#[derive(Clone, Debug, PartialEq)]
pub struct SafetyTimerPacket {
    payloads: PayloadCollection,
    raw: Vec<u8>,
}

impl SafetyTimerPacket {
    pub fn is_valid(data: &[u8]) -> bool {
        data.len() >= DEBUG.len()
            && data[..DEBUG.len()].eq_ignore_ascii_case(DEBUG)
            && mentions_safety_timer(data)
    }

    pub fn decode(ctx: &Context, data: &[u8]) -> Result<Self, Error> {
        if !Self::is_valid(data) {
            return Err(Error::decode(data, "not a safety timer message"));
        }
        let mut packet = Self {
            payloads: PayloadCollection::new(),
            raw: data.to_vec(),
        };
        let message = packet.to_string();
        packet.payloads.push(packet_event(
            ctx,
            PacketKind::WatchdogSafetyTimer,
            message.as_bytes(),
        )?);
        Ok(packet)
    }

    /// Whether this is an `[ST]` status report.
    pub fn is_status_report(&self) -> bool {
        find(&self.raw, STATUS_REPORT).is_some()
    }
}

impl PacketCodec for SafetyTimerPacket {
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

impl core::fmt::Display for SafetyTimerPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let body = self.raw.get(DEBUG.len()..).unwrap_or(&[]);
        // A report that does not parse is shown like any other message.
        let text = match StatusReport::find(body) {
            Some(report) => report.to_string().into_bytes(),
            None => humanize_hex_times(body),
        };
        let text = String::from_utf8_lossy(&text);
        write!(f, "{}", text.trim_end_matches('\0').trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::humanize_cs;
    use super::humanize_hex_times;
    use super::SafetyTimerPacket;
    use super::StatusReport;
    use crate::packet::PacketCodec;
    use crate::test_support;

    #[test]
    fn test_is_valid() {
        assert!(SafetyTimerPacket::is_valid(b"DEBUG Safety Timer kicked"));
        assert!(SafetyTimerPacket::is_valid(b"debug safety_timer"));
        assert!(SafetyTimerPacket::is_valid(b"DEBUGSAFETYTIMER"));
        assert!(SafetyTimerPacket::is_valid(b"DEBUG [st] x"));
        assert!(!SafetyTimerPacket::is_valid(b"DEBUG safety\ntimer"));
        assert!(!SafetyTimerPacket::is_valid(b"DEBUG nothing here"));
        assert!(!SafetyTimerPacket::is_valid(b"INFO [ST]"));
    }

    #[test]
    fn test_humanize_cs() {
        assert_eq!(humanize_cs(7000), "1m10s");
        assert_eq!(humanize_cs(6000), "1m0s");
        assert_eq!(humanize_cs(250), "2.500s");
        assert_eq!(humanize_cs(5), "50ms");
        assert_eq!(humanize_cs(0), "0ms");
        assert_eq!(humanize_cs(-50), "-1m59s");
    }

    #[test]
    fn test_humanize_hex_times() {
        assert_eq!(
            humanize_hex_times(b"reset, 0x1F4 cs left, next 0xA*10 cs, 0xA * 3 cs"),
            b"reset, 5.000s left, next 1.000s, 300ms".to_vec()
        );
        // Not times: no unit, or no separator before it.
        assert_eq!(humanize_hex_times(b"0x10 s 0x10cs"), b"0x10 s 0x10cs".to_vec());
    }

    #[test]
    fn test_status_report() {
        let data = b"DEBUG [ST] ON:FF @: 0x3E8 / 0x1770 2 / 5 WF:0x0012:ABCD\0";
        let report = StatusReport::find(data).unwrap();
        assert_eq!(report.timer_cs, 1000);
        assert_eq!(report.cutoff_cs, 6000);
        assert_eq!(report.watchdog_flags, 0x0012_ABCD);

        let ctx = test_support::ctx();
        let packet = SafetyTimerPacket::decode(&ctx, data).unwrap();
        assert!(packet.is_status_report());
        assert_eq!(
            packet.to_string(),
            "[ST] SAFETY TIMER: ON \t 10.000s / 1m0s \t @ 2/5 \t -> \t 2m10s / 5m0s \
             \t 2M50S LEFT \t WF: 0x00:12:AB:CD"
        );
        assert_eq!(packet.payloads().events().count(), 1);
    }

    #[test]
    fn test_plain_message() {
        let ctx = test_support::ctx();
        let packet =
            SafetyTimerPacket::decode(&ctx, b"DEBUG Safety timer at 0x64 cs \r\n").unwrap();
        assert!(!packet.is_status_report());
        assert_eq!(packet.to_string(), " Safety timer at 1.000s");
    }

    #[test]
    fn test_malformed_report_is_shown_as_text() {
        let ctx = test_support::ctx();
        let packet = SafetyTimerPacket::decode(&ctx, b"DEBUG [ST] ON: garbled").unwrap();
        assert_eq!(packet.to_string(), " [ST] ON: garbled");
    }
}
