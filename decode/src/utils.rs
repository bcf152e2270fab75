// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Utilities to make unpacking rover data less terrible.

use crate::Error;

/// A helper macro to generate an enum for a byte-sized code on the wire.
///
/// Flight software often reserves a byte for a small set of known codes while
/// leaving the remaining values undefined. This macro generates an enum with
/// one variant per known code and catch-all variants that keep the raw value,
/// so decoding never loses information.
///
/// It also generates `From<u8>`, `From<$name> for u8`, and `Display`.
///
/// # Example
/// ```ignore
/// iris_decode::wire_enum! {
///     name = Foo,
///     description = "A code representing foo",
///     variants = {
///         0x01, First, "FIRST",
///         0x02, Second, "SECOND",
///     },
///     other_variants = { Other: _ },
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        name = $name:ident,
        description = $docstring:literal,
        variants = { $( $bits:literal, $variant:ident, $display:literal $(,)? ),+ },
        other_variants = { $( $other_variant:ident : $other_pattern:pat $(,)? ),* }
        $(,)?
    ) => {
        #[doc = $docstring]
        #[derive(
            Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd,
            serde::Deserialize, serde::Serialize,
        )]
        #[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                #[serde(rename = $display)]
                $variant
            ),+,
            $($other_variant(u8)),+
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match self {
                    $( $variant => write!(f, "{}", $display), )+
                    $( $other_variant(x) => {
                        write!(f, "{} ({x:02x})", stringify!($other_variant))
                    } )+
                }
            }
        }

        impl ::core::convert::From<u8> for $name {
            fn from(x: u8) -> Self {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match x {
                    $( $bits => $variant, )+
                    $( $other_pattern => $other_variant(x), )+
                }
            }
        }

        impl ::core::convert::From<$name> for u8 {
            fn from(x: $name) -> u8 {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match x {
                    $( $variant => $bits, )+
                    $( $other_variant(x) => x, )+
                }
            }
        }
    };
}

/// Read little-endian bit fields from a byte buffer, least-significant bit
/// first.
///
/// Bit `i` of the buffer is bit `i % 8` of byte `i / 8`, so the whole buffer
/// behaves like one large little-endian integer.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Take the next `n` bits, up to 64, as an unsigned integer.
    pub fn take(&mut self, n: usize) -> Result<u64, Error> {
        if n > 64 {
            return Err(Error::Implementation(format!(
                "cannot read a {n}-bit field into 64 bits"
            )));
        }
        if n > self.remaining() {
            return Err(Error::decode(
                self.data,
                format!(
                    "bit field of {n} bits at bit {} overruns the {}-bit buffer",
                    self.pos,
                    self.data.len() * 8
                ),
            ));
        }
        let mut value = 0u64;
        for k in 0..n {
            let i = self.pos + k;
            let bit = (self.data[i / 8] >> (i % 8)) & 1;
            value |= u64::from(bit) << k;
        }
        self.pos += n;
        Ok(value)
    }
}

/// Reverse the order of the low `n_bytes` bytes of `value`.
pub fn flip_endianness(value: u64, n_bytes: usize) -> u64 {
    let bytes = value.to_le_bytes();
    let n = n_bytes.min(8);
    let mut out = [0u8; 8];
    for i in 0..n {
        out[i] = bytes[n - 1 - i];
    }
    u64::from_le_bytes(out)
}

/// Convert a `span` value, which occupies `num_bits` on the wire, back into
/// the range `min..=max` it was scaled from.
///
/// `span` is clamped to `span_min..=span_max` first. When `span_max` is
/// `None` the full range of the field is used. `max` may be less than `min`
/// for inverted scales.
pub fn despan(
    span: u64,
    num_bits: u32,
    min: f64,
    max: f64,
    span_min: u64,
    span_max: Option<u64>,
) -> f64 {
    let span_ub = (1u64 << num_bits) - 1;
    let span_max = span_max.unwrap_or(span_ub);
    let span = span.clamp(span_min, span_max.max(span_min));
    if span_max == span_min {
        return min;
    }
    let frac = (span - span_min) as f64 / (span_max - span_min) as f64;
    frac * (max - min) + min
}

/// Piecewise linear interpolation of `x` over the increasing sample points
/// `xp`, with values `fp`.
///
/// Inputs beyond either end plateau at the first or last value.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    for i in 1..n {
        if x <= xp[i] {
            let (x0, x1) = (xp[i - 1], xp[i]);
            let (y0, y1) = (fp[i - 1], fp[i]);
            if x1 == x0 {
                return y1;
            }
            return y0 + (x - x0) * (y1 - y0) / (x1 - x0);
        }
    }
    fp[n - 1]
}

/// Interpolate over a table whose sample points decrease, as thermistor
/// curves do.
pub fn interp_descending(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let xr: Vec<f64> = xp.iter().rev().copied().collect();
    let fr: Vec<f64> = fp.iter().rev().copied().collect();
    interp(x, &xr, &fr)
}

/// Render bytes as `0xAA:BB:CC`.
pub fn hex_colon(data: &[u8]) -> String {
    let body: Vec<String> = data.iter().map(|b| format!("{b:02X}")).collect();
    format!("0x{}", body.join(":"))
}

/// A multi-line hex dump with offsets and a printable-ASCII column.
pub fn hexdump(data: &[u8]) -> String {
    let mut lines = Vec::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (0x20..=0x7E).contains(&b) {
                    char::from(b)
                } else {
                    '.'
                }
            })
            .collect();
        lines.push(format!("{:04X}  {:<47}  {ascii}", i * 16, hex.join(" ")));
    }
    lines.join("\n")
}

/// Remove ANSI escape sequences (`ESC [ ... final`) from `data`.
pub fn strip_ansi(data: &[u8]) -> Vec<u8> {
    const ESC: u8 = 0x1B;
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] != ESC {
            out.push(data[i]);
            i += 1;
            continue;
        }
        i += 1;
        if data.get(i) == Some(&b'[') {
            i += 1;
            // Parameter and intermediate bytes run until a final byte.
            while i < data.len() && !(0x40..=0x7E).contains(&data[i]) {
                i += 1;
            }
            i += 1;
        }
    }
    out
}

fn hex_escape_at(s: &[u8], i: usize) -> Option<u8> {
    if s.get(i) != Some(&b'\\') || !matches!(s.get(i + 1), Some(b'x') | Some(b'X')) {
        return None;
    }
    let digits = s.get(i + 2..i + 4)?;
    let digits = core::str::from_utf8(digits).ok()?;
    u8::from_str_radix(digits, 16).ok()
}

/// Rewrite each run of `\xHH` escapes in an escaped string as `0xHH:HH`.
///
/// Escaped backslashes (`\\`) are passed through untouched.
pub fn format_hex_runs(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut start = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'\\') {
            i += 2;
            continue;
        }
        if hex_escape_at(bytes, i).is_none() {
            i += 1;
            continue;
        }
        out.push_str(&s[start..i]);
        let mut run = Vec::new();
        while let Some(b) = hex_escape_at(bytes, i) {
            run.push(b);
            i += 4;
        }
        out.push_str(&hex_colon(&run));
        start = i;
    }
    out.push_str(&s[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::despan;
    use super::flip_endianness;
    use super::format_hex_runs;
    use super::hex_colon;
    use super::hexdump;
    use super::interp;
    use super::interp_descending;
    use super::strip_ansi;
    use super::BitReader;

    crate::wire_enum! {
        name = Flavor,
        description = "A test code",
        variants = {
            0x01, Sweet, "SWEET",
            0x02, Sour, "SOUR",
        },
        other_variants = { Other: _ },
    }

    #[test]
    fn test_wire_enum() {
        assert_eq!(Flavor::from(0x02), Flavor::Sour);
        assert_eq!(Flavor::from(0x07), Flavor::Other(0x07));
        assert_eq!(u8::from(Flavor::Other(0x07)), 0x07);
        assert_eq!(u8::from(Flavor::Sweet), 0x01);
        assert_eq!(Flavor::Sweet.to_string(), "SWEET");
        assert_eq!(Flavor::Other(0x0a).to_string(), "Other (0a)");
    }

    #[test]
    fn test_bit_reader_lsb_first() {
        let mut r = BitReader::new(&[0x5A, 0x30, 0x81]);
        assert_eq!(r.take(7).unwrap(), 90);
        assert_eq!(r.take(1).unwrap(), 0);
        assert_eq!(r.take(7).unwrap(), 48);
        assert_eq!(r.take(1).unwrap(), 0);
        assert_eq!(r.take(8).unwrap(), 129);
        assert_eq!(r.remaining(), 0);
        assert!(r.take(1).is_err());
    }

    #[test]
    fn test_bit_reader_crosses_bytes() {
        let mut r = BitReader::new(&[0xF0, 0x0F]);
        assert_eq!(r.take(4).unwrap(), 0x0);
        assert_eq!(r.take(8).unwrap(), 0xFF);
        assert_eq!(r.position(), 12);
    }

    #[test]
    fn test_flip_endianness() {
        assert_eq!(flip_endianness(0x1234, 2), 0x3412);
        assert_eq!(flip_endianness(0x00AB_CDEF, 3), 0x00EF_CDAB);
        assert_eq!(flip_endianness(0xFF, 1), 0xFF);
    }

    #[test]
    fn test_despan() {
        assert_eq!(despan(0, 7, 0.0, 600.0, 0, Some(120)), 0.0);
        assert_eq!(despan(120, 7, 0.0, 600.0, 0, Some(120)), 600.0);
        // Values past the cap plateau.
        assert_eq!(despan(127, 7, 0.0, 600.0, 0, Some(120)), 600.0);
        assert_eq!(despan(60, 7, 0.0, 600.0, 0, Some(120)), 300.0);
        assert_eq!(despan(255, 8, 0.0, 1.0, 0, None), 1.0);
    }

    #[test]
    fn test_interp() {
        let xp = [0.0, 10.0, 20.0];
        let fp = [0.0, 100.0, 300.0];
        assert_eq!(interp(-5.0, &xp, &fp), 0.0);
        assert_eq!(interp(5.0, &xp, &fp), 50.0);
        assert_eq!(interp(15.0, &xp, &fp), 200.0);
        assert_eq!(interp(25.0, &xp, &fp), 300.0);
        assert_eq!(interp_descending(15.0, &[20.0, 10.0, 0.0], &[0.0, 1.0, 2.0]), 0.5);
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(hex_colon(&[0xDE, 0xAD]), "0xDE:AD");
        assert_eq!(hex_colon(&[]), "0x");
        let dump = hexdump(b"AB\x00");
        assert_eq!(dump, format!("0000  {:<47}  AB.", "41 42 00"));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi(b"\x1b[1m\x1b[30mhi\x1b[0m"), b"hi".to_vec());
        assert_eq!(strip_ansi(b"plain"), b"plain".to_vec());
    }

    #[test]
    fn test_format_hex_runs() {
        assert_eq!(format_hex_runs(r"ab\x01\x02cd"), "ab0x01:02cd");
        assert_eq!(format_hex_runs(r"\xFF"), "0xFF");
        assert_eq!(format_hex_runs(r"a\\x41"), r"a\\x41");
        assert_eq!(format_hex_runs("none"), "none");
    }
}
