// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `framer` module reassembles tape blocks from the byte stream and writes CAS files.

use std::fs;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;

use log::{info, trace, warn};

use tvctape_core::cas::{CPM_HEADER_LEN, CPM_MAGIC};
use tvctape_core::errors::{decode_error, reset_error, Error, Result};
use tvctape_core::tape::{
    TapeBlockHeader, TapeSectorHeader, TapeSectorTrailer, BLOCK_TYPE_DATA, BLOCK_TYPE_HEADER,
};

use crate::byte::ByteReader;

/// Sink receiving the reconstructed CAS files.
///
/// At most one file is open at any time. A file is either committed whole or discarded;
/// an aborted file must leave no trace behind.
pub trait CasSink {
    /// Open a new output named after the tape file, discarding any output still open.
    fn start(&mut self, name: &[u8]) -> Result<()>;
    /// Append bytes to the open output.
    fn write(&mut self, data: &[u8]) -> Result<()>;
    /// Finalize and close the open output.
    fn commit(&mut self) -> Result<()>;
    /// Discard the open output, if any.
    fn abort(&mut self) -> Result<()>;
}

/// Replace anything outside the portable filename alphabet with an underscore.
pub fn sanitize_name(name: &[u8]) -> String {
    name.iter()
        .map(|&b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'@' => b as char,
            _ => '_',
        })
        .collect()
}

struct OpenCas {
    path: PathBuf,
    file: File,
    written: u64,
}

/// A [`CasSink`] writing one `.cas` file per tape file into a directory.
pub struct DirCasSink {
    dir: PathBuf,
    current: Option<OpenCas>,
}

impl DirCasSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirCasSink { dir: dir.into(), current: None }
    }
}

impl CasSink for DirCasSink {
    fn start(&mut self, name: &[u8]) -> Result<()> {
        self.abort()?;

        let path = self.dir.join(format!("{}.cas", sanitize_name(name)));
        let mut file = File::create(&path)?;

        // The block counts are unknown until the last sector arrives; write a header
        // carrying the magic only and patch the counts on commit.
        let mut header = [0u8; CPM_HEADER_LEN];
        header[0] = CPM_MAGIC;
        file.write_all(&header)?;

        info!("writing {}", path.display());
        self.current = Some(OpenCas { path, file, written: CPM_HEADER_LEN as u64 });
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.current {
            Some(ref mut cas) => {
                cas.file.write_all(data)?;
                cas.written += data.len() as u64;
                Ok(())
            }
            None => decode_error("tape: no open cas output"),
        }
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(mut cas) = self.current.take() {
            let mut header = [0u8; CPM_HEADER_LEN];
            header[0] = CPM_MAGIC;
            header[2..4].copy_from_slice(&((cas.written / 128) as u16).to_le_bytes());
            header[4..6].copy_from_slice(&((cas.written % 128) as u16).to_le_bytes());

            cas.file.seek(SeekFrom::Start(0))?;
            cas.file.write_all(&header)?;
            cas.file.flush()?;
            info!("finished {} ({} bytes)", cas.path.display(), cas.written);
        }
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        if let Some(cas) = self.current.take() {
            drop(cas.file);
            if let Err(err) = fs::remove_file(&cas.path) {
                warn!("could not remove partial output {}: {}", cas.path.display(), err);
            } else {
                info!("discarded partial output {}", cas.path.display());
            }
        }
        Ok(())
    }
}

/// Driver reconstructing tape files from the byte stream.
///
/// The framer waits for a header block, opens a CAS output named after it, then copies the
/// sectors of the following data block into the output. Every recoverable failure, from a
/// bad magic byte to an unclassifiable pulse deep in the chain, aborts the open output and
/// returns the framer to the header wait.
pub struct BlockFramer<R: io::Read, S: CasSink> {
    bytes: ByteReader<R>,
    sink: S,
}

impl<R: io::Read, S: CasSink> BlockFramer<R, S> {
    pub fn new(bytes: ByteReader<R>, sink: S) -> Self {
        BlockFramer { bytes, sink }
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decode tape files until the input is exhausted.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.next_file() {
                Ok(()) => (),
                Err(Error::EndOfFile) => {
                    self.sink.abort()?;
                    return Ok(());
                }
                Err(Error::ResetRequired) | Err(Error::DecodeError(_)) => {
                    self.sink.abort()?;
                }
                Err(err) => {
                    self.sink.abort()?;
                    return Err(err);
                }
            }
        }
    }

    /// Decode at most one tape file: a header block and the data block following it.
    fn next_file(&mut self) -> Result<()> {
        self.bytes.reset();

        let (header, pos) = self.read_block_header()?;
        if !header.has_valid_magic() {
            warn!("{:06x}: wrong block found, ignoring", pos);
            return Ok(());
        }
        if header.block_type != BLOCK_TYPE_HEADER {
            warn!("{:06x}: wrong block type {:#04x}, ignoring", pos, header.block_type);
            return Ok(());
        }
        self.read_header_sector()?;

        loop {
            self.bytes.reset();

            let (block, pos) = self.read_block_header()?;
            if !block.has_valid_magic() {
                warn!("{:06x}: wrong block found, aborting", pos);
                self.sink.abort()?;
                return Ok(());
            }
            match block.block_type {
                BLOCK_TYPE_DATA => {
                    self.read_data_sectors(block.nsect)?;
                    self.sink.commit()?;
                    return Ok(());
                }
                BLOCK_TYPE_HEADER => {
                    warn!("{:06x}: new header block while waiting for data", pos);
                    self.sink.abort()?;
                    self.read_header_sector()?;
                }
                other => {
                    warn!("{:06x}: wrong block type {:#04x}, aborting", pos, other);
                    self.sink.abort()?;
                    return Ok(());
                }
            }
        }
    }

    /// Read the single sector of a header block and open the CAS output it names.
    ///
    /// The sector body is the file name, length-prefixed, followed by the 16-byte
    /// program-file header. Everything after the name goes to the output verbatim.
    fn read_header_sector(&mut self) -> Result<()> {
        let mut buf = [0u8; TapeSectorHeader::LEN];
        let pos = self.read_exact(&mut buf)?;
        let sect = TapeSectorHeader::parse(&buf);

        let mut body = vec![0u8; sect.payload_len()];
        self.read_exact(&mut body)?;

        let name_len = usize::from(body[0]);
        if 1 + name_len > body.len() {
            warn!("{:06x}: file name overruns the header sector", pos);
            return reset_error();
        }
        let name = &body[1..1 + name_len];
        info!("tape file \"{}\"", String::from_utf8_lossy(name));

        self.sink.start(name)?;
        self.sink.write(&body[1 + name_len..])?;

        self.read_sector_trailer()?;
        Ok(())
    }

    /// Read the numbered sectors of a data block into the open output.
    fn read_data_sectors(&mut self, nsect: u8) -> Result<()> {
        for expected in 1..=nsect {
            let mut buf = [0u8; TapeSectorHeader::LEN];
            let pos = self.read_exact(&mut buf)?;
            let sect = TapeSectorHeader::parse(&buf);

            if sect.sectno != expected {
                warn!("{:06x}: bad sector number {} (expected {})", pos, sect.sectno, expected);
                return reset_error();
            }
            trace!("{:06x}: sector {} of {}", pos, expected, nsect);

            let mut body = vec![0u8; sect.payload_len()];
            self.read_exact(&mut body)?;
            self.sink.write(&body)?;

            self.read_sector_trailer()?;
        }
        Ok(())
    }

    fn read_sector_trailer(&mut self) -> Result<TapeSectorTrailer> {
        let mut buf = [0u8; TapeSectorTrailer::LEN];
        self.read_exact(&mut buf)?;
        Ok(TapeSectorTrailer::parse(&buf))
    }

    fn read_block_header(&mut self) -> Result<(TapeBlockHeader, u64)> {
        let mut buf = [0u8; TapeBlockHeader::LEN];
        let pos = self.read_exact(&mut buf)?;
        Ok((TapeBlockHeader::parse(&buf), pos))
    }

    /// Fill `buf` from the byte reader, returning the tape position of the first byte.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<u64> {
        let mut pos = 0;
        for (i, slot) in buf.iter_mut().enumerate() {
            let byte = self.bytes.read()?;
            if i == 0 {
                pos = byte.pos;
            }
            *slot = byte.val;
        }
        trace!("{:06x} {:02x?}", pos, buf);
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::BitReader;
    use crate::pulse::PulseReader;
    use crate::seq::SeqReader;
    use crate::synth::Tape;
    use std::io::Cursor;

    /// Sink recording committed files in memory.
    #[derive(Default)]
    struct MemSink {
        files: Vec<(String, Vec<u8>)>,
        current: Option<(String, Vec<u8>)>,
        aborted: usize,
    }

    impl CasSink for MemSink {
        fn start(&mut self, name: &[u8]) -> Result<()> {
            self.abort()?;
            self.current = Some((String::from_utf8_lossy(name).into_owned(), Vec::new()));
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            match self.current {
                Some((_, ref mut content)) => {
                    content.extend_from_slice(data);
                    Ok(())
                }
                None => decode_error("tape: no open cas output"),
            }
        }

        fn commit(&mut self) -> Result<()> {
            if let Some(file) = self.current.take() {
                self.files.push(file);
            }
            Ok(())
        }

        fn abort(&mut self) -> Result<()> {
            if self.current.take().is_some() {
                self.aborted += 1;
            }
            Ok(())
        }
    }

    fn header_block(name: &[u8], prg_header: &[u8; 16]) -> Vec<u8> {
        let mut block = vec![0x00, 0x6A, 0xFF, 0x11, 0x00, 0x01];
        block.push(0x00); // sectno
        block.push((1 + name.len() + prg_header.len()) as u8);
        block.push(name.len() as u8);
        block.extend_from_slice(name);
        block.extend_from_slice(prg_header);
        block.extend_from_slice(&[0xFF, 0x00, 0x00]);
        block
    }

    fn data_block(sectors: &[&[u8]]) -> Vec<u8> {
        let mut block = vec![0x00, 0x6A, 0x00, 0x11, 0x00, sectors.len() as u8];
        for (i, sector) in sectors.iter().enumerate() {
            block.push((i + 1) as u8);
            block.push(sector.len() as u8); // 256 would be 0
            block.extend_from_slice(sector);
            block.extend_from_slice(&[0x00, 0x00, 0x00]);
        }
        block
    }

    fn framer_over(tape: Tape) -> BlockFramer<Cursor<Vec<u8>>, MemSink> {
        let bytes = ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(
            tape.into_source(),
        ))));
        BlockFramer::new(bytes, MemSink::default())
    }

    #[test]
    fn decodes_one_tape_file() {
        let prg_header = *b"\x00\x01\x08\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        let payload: Vec<u8> = (0u8..8).collect();

        let mut tape = Tape::new();
        tape.block(&header_block(b"HELLO", &prg_header));
        tape.block(&data_block(&[&payload]));
        tape.silence(1500);

        let mut framer = framer_over(tape);
        framer.run().unwrap();

        let sink = framer.sink();
        assert_eq!(sink.files.len(), 1);
        assert_eq!(sink.files[0].0, "HELLO");

        let mut expected = prg_header.to_vec();
        expected.extend_from_slice(&payload);
        assert_eq!(sink.files[0].1, expected);
    }

    #[test]
    fn decodes_two_files_from_one_recording() {
        let prg_header = [0u8; 16];

        let mut tape = Tape::new();
        tape.block(&header_block(b"ONE", &prg_header));
        tape.block(&data_block(&[b"first"]));
        tape.block(&header_block(b"TWO", &prg_header));
        tape.block(&data_block(&[b"second"]));
        tape.silence(1500);

        let mut framer = framer_over(tape);
        framer.run().unwrap();

        let names: Vec<&str> = framer.sink().files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["ONE", "TWO"]);
    }

    #[test]
    fn bad_sector_number_aborts_the_file() {
        let prg_header = [0u8; 16];

        let mut block = vec![0x00, 0x6A, 0x00, 0x11, 0x00, 0x01];
        block.push(0x07); // wrong sector number
        block.push(0x04);
        block.extend_from_slice(b"data");
        block.extend_from_slice(&[0x00, 0x00, 0x00]);

        let mut tape = Tape::new();
        tape.block(&header_block(b"BROKEN", &prg_header));
        tape.block(&block);
        tape.silence(1500);

        let mut framer = framer_over(tape);
        framer.run().unwrap();

        assert!(framer.sink().files.is_empty());
        assert_eq!(framer.sink().aborted, 1);
    }

    #[test]
    fn a_second_header_block_replaces_the_first() {
        let prg_header = [0u8; 16];

        let mut tape = Tape::new();
        tape.block(&header_block(b"FIRST", &prg_header));
        tape.block(&header_block(b"SECOND", &prg_header));
        tape.block(&data_block(&[b"payload"]));
        tape.silence(1500);

        let mut framer = framer_over(tape);
        framer.run().unwrap();

        let sink = framer.sink();
        assert_eq!(sink.files.len(), 1);
        assert_eq!(sink.files[0].0, "SECOND");
        assert_eq!(sink.aborted, 1);
    }

    #[test]
    fn garbage_blocks_are_skipped() {
        let prg_header = [0u8; 16];

        let mut tape = Tape::new();
        tape.block(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00]);
        tape.block(&header_block(b"GOOD", &prg_header));
        tape.block(&data_block(&[b"ok"]));
        tape.silence(1500);

        let mut framer = framer_over(tape);
        framer.run().unwrap();

        assert_eq!(framer.sink().files.len(), 1);
        assert_eq!(framer.sink().files[0].0, "GOOD");
    }

    #[test]
    fn sanitizes_hostile_names() {
        assert_eq!(sanitize_name(b"A:B*C"), "A_B_C");
        assert_eq!(sanitize_name(b"Prog-1@home"), "Prog-1@home");
        assert_eq!(sanitize_name(b"../up"), "___up");
    }
}
