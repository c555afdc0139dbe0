// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `tape` module defines the framing structures of the cassette byte stream.
//!
//! A tape file is a header block followed by a data block, each introduced by its own leader
//! and sync pulse. Every block opens with a six-byte block header and carries sectors of up
//! to 256 payload bytes, each wrapped in a two-byte sector header and a three-byte trailer.

/// First magic byte of a tape block header.
pub const BLOCK_MAGIC1: u8 = 0x00;
/// Second magic byte of a tape block header.
pub const BLOCK_MAGIC2: u8 = 0x6A;
/// Block type of a header block. Its single sector names the file.
pub const BLOCK_TYPE_HEADER: u8 = 0xFF;
/// Block type of a data block.
pub const BLOCK_TYPE_DATA: u8 = 0x00;
/// File type of a buffered data file.
pub const FILE_TYPE_BUFFERED: u8 = 0x01;
/// File type of an unbuffered, contiguous program file.
pub const FILE_TYPE_UNBUFFERED: u8 = 0x11;

/// The six-byte header opening every tape block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeBlockHeader {
    pub magic1: u8,
    pub magic2: u8,
    /// [`BLOCK_TYPE_HEADER`] or [`BLOCK_TYPE_DATA`].
    pub block_type: u8,
    /// [`FILE_TYPE_BUFFERED`] or [`FILE_TYPE_UNBUFFERED`].
    pub file_type: u8,
    /// Zero when the file is not protected.
    pub protect: u8,
    /// Number of sectors in the block.
    pub nsect: u8,
}

impl TapeBlockHeader {
    pub const LEN: usize = 6;

    pub fn parse(buf: &[u8; Self::LEN]) -> TapeBlockHeader {
        TapeBlockHeader {
            magic1: buf[0],
            magic2: buf[1],
            block_type: buf[2],
            file_type: buf[3],
            protect: buf[4],
            nsect: buf[5],
        }
    }

    /// Whether both magic bytes carry their expected values.
    pub fn has_valid_magic(&self) -> bool {
        self.magic1 == BLOCK_MAGIC1 && self.magic2 == BLOCK_MAGIC2
    }
}

/// The two-byte header opening every sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeSectorHeader {
    /// Sector number; data sectors count from 1, the header sector is 0.
    pub sectno: u8,
    /// Payload size in bytes, where 0 stands for 256.
    pub size: u8,
}

impl TapeSectorHeader {
    pub const LEN: usize = 2;

    pub fn parse(buf: &[u8; Self::LEN]) -> TapeSectorHeader {
        TapeSectorHeader { sectno: buf[0], size: buf[1] }
    }

    /// Payload length in bytes with the zero-means-256 rule applied.
    pub fn payload_len(&self) -> usize {
        if self.size == 0 {
            256
        } else {
            usize::from(self.size)
        }
    }
}

/// The three-byte trailer closing every sector. The CRC is recorded but not verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeSectorTrailer {
    /// Zero on the last sector of the file.
    pub eof: u8,
    pub crc: u16,
}

impl TapeSectorTrailer {
    pub const LEN: usize = 3;

    pub fn parse(buf: &[u8; Self::LEN]) -> TapeSectorTrailer {
        TapeSectorTrailer { eof: buf[0], crc: u16::from_le_bytes([buf[1], buf[2]]) }
    }
}
