// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Ground-side ingestion of Iris packets.
//!
//! This crate wraps the decoder in the pieces an application needs around it:
//! configuration, a root logger, and an [`Ingestor`] that classifies incoming
//! buffers and stamps them with where they came from.

pub mod config;
pub mod ingest;

pub use config::Config;
pub use config::ConfigBuilder;
pub use ingest::Ingestor;

use slog::Drain;
use slog::Level;
use slog::Logger;
use std::path::Path;
use thiserror::Error;

/// An error ingesting packets or building commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("decoder error: {0}")]
    Decode(#[from] iris_decode::Error),

    #[error("packet of {len} bytes exceeds the maximum of {max}")]
    TooLarge { len: usize, max: usize },

    #[error("invalid hex input: {0}")]
    Hex(String),

    #[error("invalid command argument: {0}")]
    Argument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a logger writing to the terminal at or above `level`.
pub fn build_logger(level: Level) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, slog::o!())
}

/// Parse a buffer written as hex.
///
/// Whitespace, `:` separators and a leading `0x` are ignored, so both
/// `FF DA 30 81` and `0xFF:DA:30:81` are accepted.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, Error> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(Error::Hex(format!("odd number of digits in '{text}'")));
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            core::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::Hex(format!("'{}' is not a hex byte", pair.escape_ascii())))
        })
        .collect()
}

/// Read one hex buffer per line of a file.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_hex_file(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>, Error> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_hex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_hex;
    use super::read_hex_file;
    use super::Error;
    use std::io::Write;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("FF DA 30 81").unwrap(), vec![0xFF, 0xDA, 0x30, 0x81]);
        assert_eq!(parse_hex("0xff:da:30:81").unwrap(), vec![0xFF, 0xDA, 0x30, 0x81]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(matches!(parse_hex("ABC"), Err(Error::Hex(_))));
        assert!(matches!(parse_hex("zz"), Err(Error::Hex(_))));
    }

    #[test]
    fn test_read_hex_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# heartbeat").unwrap();
        writeln!(file, "FF DA 30 81").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  00  ").unwrap();
        let buffers = read_hex_file(file.path()).unwrap();
        assert_eq!(buffers, vec![vec![0xFF, 0xDA, 0x30, 0x81], vec![0x00]]);
    }

    #[test]
    fn test_read_hex_file_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FF DA").unwrap();
        writeln!(file, "nope").unwrap();
        assert!(matches!(read_hex_file(file.path()), Err(Error::Hex(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.hex");
        assert!(matches!(read_hex_file(path), Err(Error::Io(_))));
    }
}
