// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Configuration of an [`crate::Ingestor`].

use crate::Error;
use iris_messages::DataSource;
use iris_messages::Endianness;
use iris_messages::Pathway;
use iris_messages::MTU_HERCULES;
use slog::Level;

/// Return the default byte order of numeric fields.
pub const fn default_endianness() -> Endianness {
    Endianness::Little
}

/// Return the default pathway stamped on ingested payloads.
pub const fn default_pathway() -> Pathway {
    Pathway::None
}

pub const fn default_source() -> DataSource {
    DataSource::None
}

/// Return the default largest packet accepted, which is the Hercules MTU.
pub const fn default_max_packet_size() -> usize {
    MTU_HERCULES
}

pub const fn default_log_level() -> Level {
    Level::Info
}

/// Configuration for an [`crate::Ingestor`].
///
/// The [`ConfigBuilder`] fills in defaults suitable for decoding flight data
/// received over the Hercules link.
#[derive(Clone, Debug)]
pub struct Config {
    /// Byte order of numeric fields.
    pub endianness: Endianness,

    /// The pathway every ingested payload is stamped with.
    pub pathway: Pathway,

    /// The source every ingested payload is stamped with.
    pub source: DataSource,

    /// Buffers longer than this are rejected without being decoded.
    ///
    /// Use [`iris_messages::MTU_WATCHDOG`] when data arrives over the
    /// Watchdog's wired link.
    pub max_packet_size: usize,

    /// The level at and above which log records are kept.
    pub log_level: Level,

    /// Check that the data standards contain every prebuilt module before
    /// ingesting anything.
    pub validate_prebuilt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endianness: default_endianness(),
            pathway: default_pathway(),
            source: default_source(),
            max_packet_size: default_max_packet_size(),
            log_level: default_log_level(),
            validate_prebuilt: true,
        }
    }
}

/// A builder interface for generating ingest configuration.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    endianness: Option<Endianness>,
    pathway: Option<Pathway>,
    source: Option<DataSource>,
    max_packet_size: Option<usize>,
    log_level: Option<Level>,
    validate_prebuilt: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = Some(endianness);
        self
    }

    /// Set the pathway ingested payloads arrived on.
    pub fn pathway(mut self, pathway: Pathway) -> Self {
        self.pathway = Some(pathway);
        self
    }

    /// Set where ingested payloads came from.
    pub fn source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the largest buffer that will be decoded.
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = Some(size);
        self
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set whether the prebuilt modules are checked when an ingestor is
    /// created.
    pub fn validate_prebuilt(mut self, validate: bool) -> Self {
        self.validate_prebuilt = Some(validate);
        self
    }

    /// Build a `Config` from `self`.
    pub fn build(self) -> Result<Config, Error> {
        let max_packet_size = self
            .max_packet_size
            .unwrap_or_else(default_max_packet_size);
        if max_packet_size == 0 {
            return Err(Error::Config(String::from(
                "maximum packet size must be nonzero",
            )));
        }
        Ok(Config {
            endianness: self.endianness.unwrap_or_else(default_endianness),
            pathway: self.pathway.unwrap_or_else(default_pathway),
            source: self.source.unwrap_or_else(default_source),
            max_packet_size,
            log_level: self.log_level.unwrap_or_else(default_log_level),
            validate_prebuilt: self.validate_prebuilt.unwrap_or(true),
        })
    }
}
