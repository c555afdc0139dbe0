// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `seq` module groups consecutive samples of equal sign into run-length sequences.

use std::io;

use tvctape_core::errors::{end_of_stream_error, Result};
use tvctape_core::io::SampleSource;

/// Sign class of a sample relative to the 0x80 midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Neg,
    Zero,
    Pos,
}

impl Sign {
    /// Classify a raw sample value.
    pub fn of(val: u8) -> Sign {
        if val < 0x80 {
            Sign::Neg
        } else if val > 0x80 {
            Sign::Pos
        } else {
            Sign::Zero
        }
    }

    /// One-character form used by the diagnostic dumps.
    pub fn symbol(&self) -> char {
        match *self {
            Sign::Neg => '-',
            Sign::Zero => '0',
            Sign::Pos => '+',
        }
    }
}

/// A maximal run of consecutive samples sharing one sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    /// Byte offset of the first sample of the run.
    pub pos: u64,
    /// Length of the run in samples.
    pub len: u32,
    pub sign: Sign,
}

/// Reader producing run-length sequences from a sample stream.
pub struct SeqReader<R: io::Read> {
    src: SampleSource<R>,
}

impl<R: io::Read> SeqReader<R> {
    pub fn new(src: SampleSource<R>) -> Self {
        SeqReader { src }
    }

    /// Read the next sequence.
    ///
    /// Runs are maximal: the produced sequence ends right before the first sample of a
    /// different sign. Consecutive sequences therefore never share a sign.
    pub fn read(&mut self) -> Result<Sequence> {
        let first = match self.src.peek() {
            Some(sample) => sample,
            None => return end_of_stream_error(),
        };

        let sign = Sign::of(first.val);
        let mut len = 1;
        self.src.advance()?;

        while let Some(sample) = self.src.peek() {
            if Sign::of(sample.val) != sign {
                break;
            }
            len += 1;
            self.src.advance()?;
        }

        Ok(Sequence { pos: first.pos, len, sign })
    }
}
