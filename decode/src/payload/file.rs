// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Blocks of files downlinked from the rover.

use super::apply_downlink_state;
use super::downlink_state;
use super::DownlinkTimes;
use super::Metadata;
use super::PayloadCodec;
use super::State;
use crate::utils::hex_colon;
use crate::Context;
use crate::Error;
use iris_messages::header::FileBlockHeader;
use iris_messages::header::FileMetadataHeader;
use iris_messages::header::FixedHeader;
use iris_messages::Magic;
use slog::trace;
use slog::warn;

crate::wire_enum! {
    name = FileType,
    description = "The kind of file a block belongs to.",
    variants = {
        0x01, Image, "IMAGE",
        0x0F, Uwb, "UWB",
    },
    other_variants = { Other: _ },
}

/// The contents of block 0 of a file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FileMetadata {
    /// Callback id of the command that requested the file.
    pub callback_id: u16,
    /// When the file was generated, in milliseconds since rover boot.
    pub timestamp: u32,
    pub file_type: FileType,
}

impl FileMetadata {
    fn from_header(header: FileMetadataHeader) -> Self {
        // TODO: report `FileType::from(header.file_type)` once the flight
        // software fills in the file-type byte. Every file is an image today.
        Self {
            callback_id: header.callback_id,
            timestamp: header.timestamp,
            file_type: FileType::Image,
        }
    }
}

/// One block of a downlinked file.
#[derive(Clone, Debug)]
pub struct FileBlockPayload {
    header: FileBlockHeader,
    data: Vec<u8>,
    file_metadata: Option<FileMetadata>,
    possibly_corrupted: bool,
    raw: Vec<u8>,
    meta: Metadata,
    pub downlink_times: Option<DownlinkTimes>,
}

impl FileBlockPayload {
    /// Build a block around `data`, encoding it immediately.
    pub fn new(
        ctx: &Context,
        hashed_id: u16,
        total_blocks: u8,
        block_number: u8,
        data: Vec<u8>,
    ) -> Result<Self, Error> {
        let length = u16::try_from(data.len()).map_err(|_| {
            Error::Encode(format!("file block of {} bytes is too long", data.len()))
        })?;
        let header = FileBlockHeader {
            hashed_id,
            total_blocks,
            block_number,
            length,
        };
        let mut raw = header.to_bytes()?;
        raw.extend_from_slice(&data);
        Self::decode(ctx, &raw).map(|(payload, _)| payload)
    }

    /// Identifies which blocks belong to the same file while it is being
    /// sent. Not unique over the whole mission.
    pub fn hashed_id(&self) -> u16 {
        self.header.hashed_id
    }

    pub fn total_blocks(&self) -> u8 {
        self.header.total_blocks
    }

    /// Block 0 carries metadata; data blocks are numbered from 1.
    pub fn block_number(&self) -> u8 {
        self.header.block_number
    }

    /// The length declared in the block header.
    pub fn length(&self) -> u16 {
        self.header.length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_metadata(&self) -> Option<&FileMetadata> {
        self.file_metadata.as_ref()
    }

    pub fn possibly_corrupted(&self) -> bool {
        self.possibly_corrupted
    }
}

impl PayloadCodec for FileBlockPayload {
    fn decode(ctx: &Context, data: &[u8]) -> Result<(Self, usize), Error> {
        let (header, rest) =
            FileBlockHeader::read(data).map_err(|e| Error::decode(data, e.to_string()))?;
        let header_len = data.len() - rest.len();
        let mut possibly_corrupted = false;

        let declared = usize::from(header.length);
        let block = if declared > rest.len() {
            warn!(
                ctx.log,
                "file block is shorter than its declared length";
                "declared" => declared,
                "available" => rest.len(),
                "hashed_id" => header.hashed_id
            );
            possibly_corrupted = true;
            rest
        } else {
            &rest[..declared]
        };

        if header.block_number > header.total_blocks {
            warn!(
                ctx.log,
                "file block number exceeds the total number of blocks";
                "block_number" => header.block_number,
                "total_blocks" => header.total_blocks,
                "hashed_id" => header.hashed_id
            );
            possibly_corrupted = true;
        }

        let file_metadata = if header.block_number == 0 {
            match FileMetadataHeader::read(block) {
                Ok((m, _)) => Some(FileMetadata::from_header(m)),
                Err(e) => {
                    warn!(
                        ctx.log,
                        "file metadata block could not be decoded";
                        "reason" => %e,
                        "hashed_id" => header.hashed_id
                    );
                    possibly_corrupted = true;
                    None
                }
            }
        } else {
            None
        };

        let consumed = header_len + block.len();
        trace!(
            ctx.log,
            "decoded file block";
            "hashed_id" => header.hashed_id,
            "block_number" => header.block_number,
            "len" => consumed
        );
        let payload = Self {
            header,
            data: block.to_vec(),
            file_metadata,
            possibly_corrupted,
            raw: data[..consumed].to_vec(),
            meta: Metadata::new(Magic::File, ctx.endianness),
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

impl PartialEq for FileBlockPayload {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.meta.magic == other.meta.magic
            && self.meta.pathway == other.meta.pathway
            && self.meta.source == other.meta.source
            && self.downlink_times == other.downlink_times
    }
}

impl core::fmt::Display for FileBlockPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "File[{}]#{}/{}",
            hex_colon(&self.header.hashed_id.to_le_bytes()),
            self.header.block_number,
            self.header.total_blocks
        )?;
        if let Some(m) = &self.file_metadata {
            write!(
                f,
                ": {} #{} @ {}",
                m.file_type, m.callback_id, m.timestamp
            )?;
        } else {
            write!(f, ": {}B", self.data.len())?;
        }
        if self.possibly_corrupted {
            write!(f, " (possibly corrupted)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FileBlockPayload;
    use super::FileType;
    use crate::payload::PayloadCodec;
    use crate::test_support;
    use crate::Error;

    #[test]
    fn test_data_block() {
        let ctx = test_support::ctx();
        let block = FileBlockPayload::new(&ctx, 0xBEEF, 3, 2, vec![1, 2, 3]).unwrap();
        assert_eq!(
            block.encode(),
            vec![0xEF, 0xBE, 0x03, 0x02, 0x03, 0x00, 1, 2, 3]
        );
        assert!(!block.possibly_corrupted());
        assert!(block.file_metadata().is_none());
        assert_eq!(block.to_string(), "File[0xEF:BE]#2/3: 3B");
    }

    #[test]
    fn test_metadata_block_is_always_an_image() {
        let ctx = test_support::ctx();
        let meta = vec![0x05, 0x00, 0x10, 0x27, 0x00, 0x00, 0x0F];
        let block = FileBlockPayload::new(&ctx, 0x0001, 4, 0, meta).unwrap();
        let m = block.file_metadata().unwrap();
        assert_eq!(m.callback_id, 5);
        assert_eq!(m.timestamp, 10_000);
        assert_eq!(m.file_type, FileType::Image);
        assert_eq!(FileType::from(0x0F), FileType::Uwb);
    }

    #[test]
    fn test_length_beyond_buffer_is_corrupted() {
        let ctx = test_support::ctx();
        let data = [0x01, 0x00, 0x02, 0x01, 0x10, 0x00, 0xAA, 0xBB];
        let (block, n) = FileBlockPayload::decode(&ctx, &data).unwrap();
        assert!(block.possibly_corrupted());
        assert_eq!(n, data.len());
        assert_eq!(block.data(), &[0xAA, 0xBB]);
        assert_eq!(block.length(), 16);
    }

    #[test]
    fn test_block_number_beyond_total_is_corrupted() {
        let ctx = test_support::ctx();
        let block = FileBlockPayload::new(&ctx, 0x0001, 2, 3, vec![0]).unwrap();
        assert!(block.possibly_corrupted());
    }

    #[test]
    fn test_short_header_fails() {
        let ctx = test_support::ctx();
        assert!(matches!(
            FileBlockPayload::decode(&ctx, &[0x01, 0x00, 0x02]),
            Err(Error::Decode { .. })
        ));
    }
}
