// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements forward-only access to raw sample streams.

use std::io;

use crate::errors::Result;

/// Number of preamble bytes skipped before the first audio sample.
///
/// Inputs are assumed to be canonical 44-byte-header WAVE files carrying 8-bit unsigned PCM;
/// the preamble itself is treated as opaque.
pub const WAV_PREAMBLE_LEN: usize = 44;

/// A single 8-bit unsigned audio sample together with its byte offset in the input.
///
/// The midpoint value, 0x80, is silence; values below it are negative excursions, values above
/// it positive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Absolute byte offset of the sample in the input file.
    pub pos: u64,
    /// The raw sample value.
    pub val: u8,
}

/// Lookahead slot of a `SampleSource`.
enum Slot {
    NotYet,
    Have(Sample),
    Done,
}

/// A single-pass reader of 8-bit unsigned PCM samples with one sample of lookahead.
///
/// The preamble is skipped when the source is created, so the first sample reported sits at
/// offset `WAV_PREAMBLE_LEN`. Offsets are absolute byte offsets in the input file and appear
/// in every diagnostic of the demodulation chain above this reader.
pub struct SampleSource<R: io::Read> {
    inner: R,
    pos: u64,
    slot: Slot,
}

impl<R: io::Read> SampleSource<R> {
    /// Instantiate a `SampleSource` from the given reader, skip the preamble, and prime the
    /// lookahead slot with the first sample.
    pub fn try_new(mut inner: R) -> Result<Self> {
        let mut preamble = [0u8; WAV_PREAMBLE_LEN];
        inner.read_exact(&mut preamble)?;

        let mut source = SampleSource { inner, pos: WAV_PREAMBLE_LEN as u64, slot: Slot::NotYet };
        source.advance()?;
        Ok(source)
    }

    /// Returns the current sample, or `None` once the input is exhausted.
    pub fn peek(&self) -> Option<Sample> {
        match self.slot {
            Slot::Have(sample) => Some(sample),
            _ => None,
        }
    }

    /// Refill the lookahead slot with the next sample.
    pub fn advance(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];

        match self.inner.read_exact(&mut buf) {
            Ok(()) => {
                self.slot = Slot::Have(Sample { pos: self.pos, val: buf[0] });
                self.pos += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => self.slot = Slot::Done,
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}
