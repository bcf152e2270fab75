// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Encode and decode a single typed field.
//!
//! Numbers use the requested byte order. Strings and byte-strings are always
//! framed by a big-endian `u16` length, which is how the flight software packs
//! them.
//!
//! ASCII strings are held in memory with non-printable bytes written as `\xHH`
//! escapes (and a literal backslash as `\\`), so that `r"\xBE\xEF"` encodes to
//! the two bytes `0xBE 0xEF`.

use crate::Category;
use crate::Endianness;
use crate::Error;
use crate::FswDataType;
use serde::Deserialize;
use serde::Serialize;

/// The in-memory value of a single field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Unsigned(_) => "unsigned integer",
            Value::Signed(_) => "signed integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the value as an `i128` if it is an integer.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Unsigned(x) => Some(i128::from(*x)),
            Value::Signed(x) => Some(i128::from(*x)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(|x| u64::try_from(x).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Unsigned(x) => Some(*x as f64),
            Value::Signed(x) => Some(*x as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

macro_rules! value_from_int {
    ($variant:ident, $wide:ty, $($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::$variant(<$wide>::from(x))
                }
            }
        )+
    };
}

value_from_int!(Unsigned, u64, u8, u16, u32, u64);
value_from_int!(Signed, i64, i8, i16, i32, i64);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::Str(x.to_string())
    }
}

impl From<String> for Value {
    fn from(x: String) -> Self {
        Value::Str(x)
    }
}

impl From<Vec<u8>> for Value {
    fn from(x: Vec<u8>) -> Self {
        Value::Bytes(x)
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Unsigned(x) => write!(f, "{x}"),
            Value::Signed(x) => write!(f, "{x}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bytes(b) => {
                write!(f, "0x")?;
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

/// Render bytes as a string, escaping anything that is not printable ASCII.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        match b {
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(char::from(b)),
            _ => out.push_str(&format!("\\x{b:02X}")),
        }
    }
    out
}

/// Convert an escaped string back into the bytes it represents.
///
/// This is the inverse of [`escape_bytes`]. Characters outside ASCII are
/// emitted as their UTF-8 encoding. A backslash that does not start `\\` or
/// `\xHH` is rejected with the offset where it appears.
pub fn unescape_str(s: &str) -> Result<Vec<u8>, Error> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b'x') | Some(b'X') => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .and_then(|h| core::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or(Error::BadEscape(i))?;
                out.push(hex);
                i += 4;
            }
            _ => return Err(Error::BadEscape(i)),
        }
    }
    Ok(out)
}

fn wrong_category(datatype: FswDataType, value: &Value) -> Error {
    Error::WrongCategory {
        datatype,
        expected: datatype.category(),
        got: value.kind(),
    }
}

fn out_of_range(datatype: FswDataType, value: &Value) -> Error {
    Error::OutOfRange {
        datatype,
        value: value.to_string(),
    }
}

macro_rules! to_bytes {
    ($x:expr, $endianness:expr) => {
        match $endianness {
            Endianness::Little => $x.to_le_bytes().to_vec(),
            Endianness::Big => $x.to_be_bytes().to_vec(),
        }
    };
}

fn encode_integer(
    datatype: FswDataType,
    value: &Value,
    endianness: Endianness,
) -> Result<Vec<u8>, Error> {
    let x = value
        .as_integer()
        .ok_or_else(|| wrong_category(datatype, value))?;
    let range = || out_of_range(datatype, value);
    let bytes = match datatype {
        FswDataType::I8 => to_bytes!(i8::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::I16 => to_bytes!(i16::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::I32 => to_bytes!(i32::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::I64 => to_bytes!(i64::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::U8 => to_bytes!(u8::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::U16 => to_bytes!(u16::try_from(x).map_err(|_| range())?, endianness),
        FswDataType::U32 | FswDataType::Enum => {
            to_bytes!(u32::try_from(x).map_err(|_| range())?, endianness)
        }
        FswDataType::U64 => to_bytes!(u64::try_from(x).map_err(|_| range())?, endianness),
        _ => return Err(wrong_category(datatype, value)),
    };
    Ok(bytes)
}

fn encode_float(
    datatype: FswDataType,
    value: &Value,
    endianness: Endianness,
) -> Result<Vec<u8>, Error> {
    let x = value.as_f64().ok_or_else(|| wrong_category(datatype, value))?;
    match datatype {
        FswDataType::F32 => {
            let narrow = x as f32;
            if x.is_finite() && !narrow.is_finite() {
                return Err(out_of_range(datatype, value));
            }
            Ok(to_bytes!(narrow, endianness))
        }
        _ => Ok(to_bytes!(x, endianness)),
    }
}

fn frame_string(datatype: FswDataType, content: &[u8]) -> Result<Vec<u8>, Error> {
    if content.len() + 2 > datatype.num_octets() {
        return Err(Error::LengthExceedsCapacity {
            datatype,
            declared: content.len(),
        });
    }
    // Bounded by the largest capacity above, which fits in a u16.
    let len = u16::try_from(content.len()).map_err(|_| Error::LengthExceedsCapacity {
        datatype,
        declared: content.len(),
    })?;
    let mut out = Vec::with_capacity(content.len() + 2);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(content);
    Ok(out)
}

/// Encode `value` as a field of type `datatype`.
///
/// Enum fields take their numeric value here; translating variant names is up
/// to the caller, which owns the variant list.
pub fn encode(
    datatype: FswDataType,
    value: &Value,
    endianness: Endianness,
) -> Result<Vec<u8>, Error> {
    match datatype.category() {
        Category::Empty => Err(Error::EmptyType),
        Category::Boolean => match value {
            Value::Bool(true) => Ok(vec![0xFF]),
            Value::Bool(false) => Ok(vec![0x00]),
            _ => Err(wrong_category(datatype, value)),
        },
        Category::Number if datatype.is_float() => encode_float(datatype, value, endianness),
        Category::Number | Category::Enum => encode_integer(datatype, value, endianness),
        Category::String | Category::VarString => {
            let Value::Str(s) = value else {
                return Err(wrong_category(datatype, value));
            };
            let content = unescape_str(s)?;
            if let Some(offset) = content
                .iter()
                .take(content.len().saturating_sub(1))
                .position(|b| *b == 0)
            {
                return Err(Error::EmbeddedNull { offset });
            }
            frame_string(datatype, &content)
        }
        Category::IrisByteString => match value {
            Value::Bytes(b) => frame_string(datatype, b),
            Value::Str(s) => frame_string(datatype, s.as_bytes()),
            _ => Err(wrong_category(datatype, value)),
        },
    }
}

fn take(buf: &[u8], n: usize) -> Result<&[u8], Error> {
    buf.get(..n).ok_or(Error::Truncated {
        needed: n,
        available: buf.len(),
    })
}

macro_rules! from_bytes {
    ($t:ty, $buf:expr, $endianness:expr) => {{
        let mut word = [0u8; core::mem::size_of::<$t>()];
        word.copy_from_slice(take($buf, core::mem::size_of::<$t>())?);
        match $endianness {
            Endianness::Little => <$t>::from_le_bytes(word),
            Endianness::Big => <$t>::from_be_bytes(word),
        }
    }};
}

/// Read the length prefix of a string field and return the total number of
/// bytes it occupies, including the prefix.
pub fn string_field_len(datatype: FswDataType, buf: &[u8]) -> Result<usize, Error> {
    let prefix = take(buf, 2)?;
    let declared = usize::from(u16::from_be_bytes([prefix[0], prefix[1]]));
    if declared > datatype.num_octets() {
        return Err(Error::LengthExceedsCapacity { datatype, declared });
    }
    if declared > buf.len() - 2 {
        return Err(Error::LengthExceedsBuffer {
            declared,
            available: buf.len() - 2,
        });
    }
    Ok(declared + 2)
}

/// Decode one field of type `datatype` from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(
    datatype: FswDataType,
    buf: &[u8],
    endianness: Endianness,
) -> Result<(Value, usize), Error> {
    let n = datatype.num_octets();
    let value = match datatype {
        FswDataType::Invalid => return Err(Error::EmptyType),
        FswDataType::Bool => Value::Bool(take(buf, 1)?[0] != 0),
        FswDataType::I8 => Value::from(from_bytes!(i8, buf, endianness)),
        FswDataType::I16 => Value::from(from_bytes!(i16, buf, endianness)),
        FswDataType::I32 => Value::from(from_bytes!(i32, buf, endianness)),
        FswDataType::I64 => Value::from(from_bytes!(i64, buf, endianness)),
        FswDataType::U8 => Value::from(from_bytes!(u8, buf, endianness)),
        FswDataType::U16 => Value::from(from_bytes!(u16, buf, endianness)),
        FswDataType::U32 | FswDataType::Enum => Value::from(from_bytes!(u32, buf, endianness)),
        FswDataType::U64 => Value::from(from_bytes!(u64, buf, endianness)),
        FswDataType::F32 => Value::from(from_bytes!(f32, buf, endianness)),
        FswDataType::F64 => Value::from(from_bytes!(f64, buf, endianness)),
        _ => {
            let total = string_field_len(datatype, buf)?;
            let content = &buf[2..total];
            let value = if datatype.category() == Category::IrisByteString {
                Value::Bytes(content.to_vec())
            } else {
                Value::Str(escape_bytes(content))
            };
            return Ok((value, total));
        }
    };
    Ok((value, n))
}

#[cfg(test)]
mod tests {
    use super::decode;
    use super::encode;
    use super::escape_bytes;
    use super::unescape_str;
    use super::Value;
    use crate::Endianness;
    use crate::Error;
    use crate::FswDataType;

    const LE: Endianness = Endianness::Little;

    #[test]
    fn test_numbers_are_little_endian() {
        assert_eq!(
            encode(FswDataType::U16, &Value::from(42u16), LE).unwrap(),
            vec![0x2A, 0x00]
        );
        assert_eq!(
            encode(FswDataType::I16, &Value::from(-100i16), LE).unwrap(),
            vec![0x9C, 0xFF]
        );
        assert_eq!(
            encode(FswDataType::U32, &Value::from(1000u32), Endianness::Big).unwrap(),
            vec![0x00, 0x00, 0x03, 0xE8]
        );
    }

    #[test]
    fn test_number_range_checks() {
        assert!(matches!(
            encode(FswDataType::U8, &Value::from(256u16), LE),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(FswDataType::U32, &Value::from(-1i8), LE),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(FswDataType::I8, &Value::from(-129i16), LE),
            Err(Error::OutOfRange { .. })
        ));
        assert!(encode(FswDataType::I8, &Value::from(-128i16), LE).is_ok());
        assert!(matches!(
            encode(FswDataType::U8, &Value::from(1.0f64), LE),
            Err(Error::WrongCategory { .. })
        ));
        assert!(matches!(
            encode(FswDataType::F32, &Value::from(1e300f64), LE),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_number_decode() {
        let (v, n) = decode(FswDataType::I16, &[0x9C, 0xFF, 0x00], LE).unwrap();
        assert_eq!(v, Value::Signed(-100));
        assert_eq!(n, 2);
        let (v, n) = decode(FswDataType::F64, &1.5f64.to_le_bytes(), LE).unwrap();
        assert_eq!(v, Value::Float(1.5));
        assert_eq!(n, 8);
        assert!(matches!(
            decode(FswDataType::U32, &[0, 0, 0], LE),
            Err(Error::Truncated {
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_bool() {
        assert_eq!(
            encode(FswDataType::Bool, &Value::Bool(true), LE).unwrap(),
            vec![0xFF]
        );
        assert_eq!(
            encode(FswDataType::Bool, &Value::Bool(false), LE).unwrap(),
            vec![0x00]
        );
        assert_eq!(
            decode(FswDataType::Bool, &[0x01], LE).unwrap().0,
            Value::Bool(true)
        );
        assert_eq!(
            decode(FswDataType::Bool, &[0x00], LE).unwrap().0,
            Value::Bool(false)
        );
        assert!(encode(FswDataType::Bool, &Value::from(1u8), LE).is_err());
    }

    #[test]
    fn test_string_capacity_boundary() {
        // STRING5 has room for 5 content bytes once the prefix is counted.
        let ok = encode(FswDataType::String5, &Value::from("abcde"), LE).unwrap();
        assert_eq!(ok, b"\x00\x05abcde".to_vec());
        assert!(matches!(
            encode(FswDataType::String5, &Value::from("abcdef"), LE),
            Err(Error::LengthExceedsCapacity { .. })
        ));
    }

    #[test]
    fn test_string_nulls() {
        let with_null = Value::from("ab\\x00cd");
        assert!(matches!(
            encode(FswDataType::String10, &with_null, LE),
            Err(Error::EmbeddedNull { offset: 2 })
        ));
        let trailing = Value::from("abcd\\x00");
        assert_eq!(
            encode(FswDataType::String10, &trailing, LE).unwrap(),
            b"\x00\x05abcd\x00".to_vec()
        );
        let blob = Value::Bytes(b"ab\x00cd".to_vec());
        assert_eq!(
            encode(FswDataType::IrisByteString134, &blob, LE).unwrap(),
            b"\x00\x05ab\x00cd".to_vec()
        );
    }

    #[test]
    fn test_null_error_mentions_byte_string() {
        let err = encode(FswDataType::String10, &Value::from("a\\x00b"), LE).unwrap_err();
        assert!(err.to_string().contains("IrisByteString"));
    }

    #[test]
    fn test_escape_convention() {
        let encoded = encode(FswDataType::VarString255, &Value::from(r"\xBE\xEF"), LE).unwrap();
        assert_eq!(encoded, vec![0x00, 0x02, 0xBE, 0xEF]);
        let (v, n) = decode(FswDataType::VarString255, &encoded, LE).unwrap();
        assert_eq!(v, Value::from(r"\xBE\xEF"));
        assert_eq!(n, 4);
    }

    #[test]
    fn test_escape_round_trip_backslash() {
        let raw = b"a\\b\x01";
        let s = escape_bytes(raw);
        assert_eq!(s, "a\\\\b\\x01");
        assert_eq!(unescape_str(&s).unwrap(), raw.to_vec());
        assert!(matches!(unescape_str("\\xZZ"), Err(Error::BadEscape(0))));
        assert!(matches!(unescape_str(r"a\q"), Err(Error::BadEscape(1))));
        assert!(matches!(unescape_str("a\\"), Err(Error::BadEscape(1))));
        assert!(matches!(
            encode(FswDataType::VarString255, &Value::from(r"a\q"), LE),
            Err(Error::BadEscape(1))
        ));
    }

    #[test]
    fn test_string_decode_bounds() {
        // Declared length larger than the buffer.
        assert!(matches!(
            decode(FswDataType::VarString255, &[0x00, 0x05, b'a'], LE),
            Err(Error::LengthExceedsBuffer {
                declared: 5,
                available: 1
            })
        ));
        // Declared length larger than the type allows.
        let mut buf = vec![0x00, 0x08];
        buf.extend_from_slice(&[b'a'; 8]);
        assert!(matches!(
            decode(FswDataType::String5, &buf, LE),
            Err(Error::LengthExceedsCapacity { .. })
        ));
        assert!(decode(FswDataType::String5, &[0x00], LE).is_err());
    }

    #[test]
    fn test_blob_decode_keeps_bytes() {
        let (v, n) =
            decode(FswDataType::IrisByteString134, b"\x00\x03\x00\x01\x02tail", LE).unwrap();
        assert_eq!(v, Value::Bytes(vec![0, 1, 2]));
        assert_eq!(n, 5);
    }

    #[test]
    fn test_empty_type_fails() {
        assert_eq!(
            encode(FswDataType::Invalid, &Value::from(0u8), LE),
            Err(Error::EmptyType)
        );
        assert_eq!(decode(FswDataType::Invalid, &[0], LE), Err(Error::EmptyType));
    }

    #[test]
    fn test_field_round_trips() {
        let cases = [
            (FswDataType::U64, Value::from(u64::MAX)),
            (FswDataType::I64, Value::from(i64::MIN)),
            (FswDataType::I32, Value::from(-7i32)),
            (FswDataType::F32, Value::Float(0.5)),
            (FswDataType::Enum, Value::from(3u32)),
            (FswDataType::String24, Value::from("Hello, Moon!")),
        ];
        for (t, v) in cases {
            let bytes = encode(t, &v, LE).unwrap();
            let (decoded, n) = decode(t, &bytes, LE).unwrap();
            assert_eq!(decoded, v, "{t}");
            assert_eq!(n, bytes.len());
        }
    }
}
