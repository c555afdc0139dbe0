// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `cas` module defines the CAS container header pair and its serialized form.
//!
//! A CAS file opens with a 128-byte CP/M-style archive header followed by a 16-byte
//! program-file header; the program body starts at offset 144. All multi-byte fields are
//! little endian.

use log::debug;

use crate::errors::{decode_error, Result};

/// Length of the CP/M-style archive header.
pub const CPM_HEADER_LEN: usize = 128;
/// Length of the program-file header following the CP/M header.
pub const PRG_HEADER_LEN: usize = 16;
/// Combined length of the two container headers.
pub const CAS_HEADER_LEN: usize = CPM_HEADER_LEN + PRG_HEADER_LEN;

/// Magic byte opening the CP/M header.
pub const CPM_MAGIC: u8 = 0x11;
/// Magic byte opening the program-file header.
pub const PRG_MAGIC: u8 = 0x00;
/// Program-file type of a data file.
pub const PRG_TYPE_DATA: u8 = 0x00;
/// Program-file type of a tokenized BASIC program.
pub const PRG_TYPE_PROGRAM: u8 = 0x01;
/// Autorun flag value marking a self-starting program.
pub const PRG_AUTORUN: u8 = 0xFF;

/// Parsed contents of the 144-byte CAS container header pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CasHeader {
    /// Number of complete 128-byte blocks in the container, headers included.
    pub blocknum: u16,
    /// Number of bytes in the final, partial block.
    pub lastblock: u16,
    /// Number of bytes in the program body.
    pub prgsize: u16,
    /// File type, either [`PRG_TYPE_DATA`] or [`PRG_TYPE_PROGRAM`].
    pub file_type: u8,
    /// 0xFF if the program starts automatically after loading, 0x00 otherwise.
    pub autorun: u8,
    /// Version byte recorded by the saving machine.
    pub version: u8,
}

impl CasHeader {
    /// Build a header describing a tokenized program body of `prgsize` bytes.
    pub fn for_program(prgsize: u16, autorun: bool) -> CasHeader {
        let total = u32::from(prgsize) + CAS_HEADER_LEN as u32;

        CasHeader {
            blocknum: (total / 128) as u16,
            lastblock: (total % 128) as u16,
            prgsize,
            file_type: PRG_TYPE_PROGRAM,
            autorun: if autorun { PRG_AUTORUN } else { 0x00 },
            version: 0,
        }
    }

    /// Parse and validate the header pair at the start of `buf`.
    pub fn read(buf: &[u8]) -> Result<CasHeader> {
        if buf.len() < CAS_HEADER_LEN {
            return decode_error("cas: header truncated");
        }
        if buf[0] != CPM_MAGIC || buf[CPM_HEADER_LEN] != PRG_MAGIC {
            return decode_error("cas: bad header magic");
        }

        let file_type = buf[CPM_HEADER_LEN + 1];
        if file_type != PRG_TYPE_DATA && file_type != PRG_TYPE_PROGRAM {
            return decode_error("cas: bad file type");
        }

        let header = CasHeader {
            blocknum: u16::from_le_bytes([buf[2], buf[3]]),
            lastblock: u16::from_le_bytes([buf[4], buf[5]]),
            prgsize: u16::from_le_bytes([buf[CPM_HEADER_LEN + 2], buf[CPM_HEADER_LEN + 3]]),
            file_type,
            autorun: buf[CPM_HEADER_LEN + 4],
            version: buf[CPM_HEADER_LEN + 15],
        };

        debug!(
            "cas header: blocks={}*128+{}={}, prgsize={}, type={}, autorun={:#04x}",
            header.blocknum,
            header.lastblock,
            u32::from(header.blocknum) * 128 + u32::from(header.lastblock),
            header.prgsize,
            header.file_type,
            header.autorun
        );

        Ok(header)
    }

    /// Serialize the header pair into its 144-byte wire form. Unused fields are zero.
    pub fn to_bytes(&self) -> [u8; CAS_HEADER_LEN] {
        let mut buf = [0u8; CAS_HEADER_LEN];

        buf[0] = CPM_MAGIC;
        buf[2..4].copy_from_slice(&self.blocknum.to_le_bytes());
        buf[4..6].copy_from_slice(&self.lastblock.to_le_bytes());

        buf[CPM_HEADER_LEN] = PRG_MAGIC;
        buf[CPM_HEADER_LEN + 1] = self.file_type;
        buf[CPM_HEADER_LEN + 2..CPM_HEADER_LEN + 4].copy_from_slice(&self.prgsize.to_le_bytes());
        buf[CPM_HEADER_LEN + 4] = self.autorun;
        buf[CPM_HEADER_LEN + 15] = self.version;
        buf
    }

    /// Check the advisory equation relating the block counts to the program size.
    pub fn is_consistent(&self) -> bool {
        u32::from(self.blocknum) * 128 + u32::from(self.lastblock)
            == u32::from(self.prgsize) + CAS_HEADER_LEN as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn round_trips_through_the_wire_form() {
        let header = CasHeader::for_program(1000, true);
        let parsed = CasHeader::read(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn computes_block_counts_for_a_program() {
        let header = CasHeader::for_program(11, false);
        assert_eq!(header.blocknum, 1);
        assert_eq!(header.lastblock, 27);
        assert_eq!(header.file_type, PRG_TYPE_PROGRAM);
        assert_eq!(header.autorun, 0x00);
        assert!(header.is_consistent());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = CasHeader::for_program(0, false).to_bytes();
        buf[0] = 0x12;
        assert!(matches!(CasHeader::read(&buf), Err(Error::DecodeError(_))));
    }

    #[test]
    fn rejects_bad_file_type() {
        let mut buf = CasHeader::for_program(0, false).to_bytes();
        buf[CPM_HEADER_LEN + 1] = 0x02;
        assert!(matches!(CasHeader::read(&buf), Err(Error::DecodeError(_))));
    }

    #[test]
    fn rejects_a_truncated_header() {
        let buf = [0u8; CAS_HEADER_LEN - 1];
        assert!(matches!(CasHeader::read(&buf), Err(Error::DecodeError(_))));
    }
}
