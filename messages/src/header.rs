// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Fixed-size headers that precede variable data on the wire.
//!
//! These are all packed little-endian with no padding, which is exactly how
//! `hubpack` lays out plain structs of integers.

use crate::Error;
use crate::Opcode;
use hubpack::SerializedSize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

/// A header with a fixed wire size.
pub trait FixedHeader: Sized + Serialize + DeserializeOwned + SerializedSize {
    /// Read the header from the front of `buf`, returning the remainder.
    fn read(buf: &[u8]) -> Result<(Self, &[u8]), Error> {
        if buf.len() < Self::MAX_SIZE {
            return Err(Error::Truncated {
                needed: Self::MAX_SIZE,
                available: buf.len(),
            });
        }
        hubpack::deserialize(buf).map_err(Error::from)
    }

    /// Write the header into a new buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; Self::MAX_SIZE];
        let n = hubpack::serialize(&mut buf, self)?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// The header of an Iris Common Packet.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
pub struct CommonPacketHeader {
    pub seq_num: u8,
    pub vlp_len: u16,
    pub checksum: u8,
}

impl FixedHeader for CommonPacketHeader {}

/// The header of the 2020 flight software's common packet, with a 2-byte
/// checksum that was never reliably populated.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
pub struct LegacyCommonPacketHeader {
    pub seq_num: u8,
    pub vlp_len: u16,
    pub checksum: u16,
}

impl FixedHeader for LegacyCommonPacketHeader {}

/// The header preceding each block of a downlinked file.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
pub struct FileBlockHeader {
    /// Identifier shared by every block of the same file.
    pub hashed_id: u16,
    pub total_blocks: u8,
    /// Block 0 carries file metadata; data blocks are numbered from 1.
    pub block_number: u8,
    pub length: u16,
}

impl FixedHeader for FileBlockHeader {}

/// The contents of block 0 of a downlinked file.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
pub struct FileMetadataHeader {
    pub callback_id: u16,
    pub timestamp: u32,
    pub file_type: u8,
}

impl FixedHeader for FileMetadataHeader {}

/// The prefix shared by every downlinked telemetry and event payload.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, SerializedSize,
)]
pub struct DownlinkedHeader {
    pub opcode: Opcode,
    /// Milliseconds since the rover booted.
    pub timestamp: u32,
}

impl FixedHeader for DownlinkedHeader {}

#[cfg(test)]
mod tests {
    use super::CommonPacketHeader;
    use super::DownlinkedHeader;
    use super::FileBlockHeader;
    use super::FileMetadataHeader;
    use super::FixedHeader;
    use super::LegacyCommonPacketHeader;
    use crate::Error;
    use crate::Opcode;
    use hubpack::SerializedSize;

    #[test]
    fn test_header_sizes() {
        assert_eq!(CommonPacketHeader::MAX_SIZE, 4);
        assert_eq!(LegacyCommonPacketHeader::MAX_SIZE, 5);
        assert_eq!(FileBlockHeader::MAX_SIZE, 6);
        assert_eq!(FileMetadataHeader::MAX_SIZE, 7);
        assert_eq!(DownlinkedHeader::MAX_SIZE, 6);
    }

    #[test]
    fn test_downlinked_header_layout() {
        let hdr = DownlinkedHeader {
            opcode: Opcode::new(0x10, 0x02),
            timestamp: 1000,
        };
        assert_eq!(
            hdr.to_bytes().unwrap(),
            vec![0x02, 0x10, 0xE8, 0x03, 0x00, 0x00]
        );
    }

    #[test]
    fn test_common_header_layout() {
        let hdr = CommonPacketHeader {
            seq_num: 7,
            vlp_len: 10,
            checksum: 0xAB,
        };
        assert_eq!(hdr.to_bytes().unwrap(), vec![0x07, 0x0A, 0x00, 0xAB]);
        let (decoded, rest) = CommonPacketHeader::read(&[0x07, 0x0A, 0x00, 0xAB, 0xFF]).unwrap();
        assert_eq!(decoded, hdr);
        assert_eq!(rest, &[0xFF]);
    }

    #[test]
    fn test_legacy_header_layout() {
        let hdr = LegacyCommonPacketHeader {
            seq_num: 1,
            vlp_len: 0x0102,
            checksum: 0x00CD,
        };
        assert_eq!(hdr.to_bytes().unwrap(), vec![0x01, 0x02, 0x01, 0xCD, 0x00]);
    }

    #[test]
    fn test_short_header() {
        assert_eq!(
            FileBlockHeader::read(&[0; 5]),
            Err(Error::Truncated {
                needed: 6,
                available: 5
            })
        );
    }
}
