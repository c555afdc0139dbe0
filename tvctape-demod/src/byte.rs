// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `byte` module packs eight bits into a byte, least significant bit first.

use std::io;

use log::warn;

use tvctape_core::errors::Result;

use crate::bit::BitReader;

/// A byte assembled from eight consecutive bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeByte {
    /// Byte offset of the pulse carrying the first bit.
    pub pos: u64,
    /// Combined length of the eight bit pulses in samples.
    pub len: u32,
    /// The assembled value.
    pub val: u8,
}

/// Reader assembling bits into bytes.
pub struct ByteReader<R: io::Read> {
    bits: BitReader<R>,
}

impl<R: io::Read> ByteReader<R> {
    pub fn new(bits: BitReader<R>) -> Self {
        ByteReader { bits }
    }

    /// Reset the reader chain below, forcing a new silence/leader/sync search.
    pub fn reset(&mut self) {
        self.bits.reset();
    }

    /// Read the next byte. A byte interrupted before its eighth bit is dropped with a
    /// diagnostic and the underlying failure is reported instead.
    pub fn read(&mut self) -> Result<TapeByte> {
        let mut byte = TapeByte { pos: 0, len: 0, val: 0 };

        for i in 0..8 {
            let bit = match self.bits.read() {
                Ok(bit) => bit,
                Err(err) => {
                    if i > 0 {
                        warn!("dropping a partial byte of {} bits", i);
                    }
                    return Err(err);
                }
            };

            if i == 0 {
                byte.pos = bit.pos;
            }
            byte.len += bit.len;
            byte.val = (byte.val >> 1) | (bit.val << 7);
        }

        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::PulseReader;
    use crate::seq::SeqReader;
    use crate::synth::Tape;
    use tvctape_core::errors::Error;
    use tvctape_core::io::WAV_PREAMBLE_LEN;

    #[test]
    fn assembles_ascii_a_from_the_reference_stream() {
        // 2000 samples of silence, 10000 leader pulses of length 21, one sync pulse of
        // length 33, then the bit pulses of 0x41.
        let mut tape = Tape::new();
        tape.silence(2000).leader(10000).sync().byte(0x41).silence(1500);

        let mut bytes =
            ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(tape.into_source()))));

        let byte = bytes.read().unwrap();
        assert_eq!(byte.val, 0x41);
        // Two one-bits of length 17 and six zero-bits of length 25.
        assert_eq!(byte.len, 2 * 17 + 6 * 25);
        assert_eq!(byte.pos, WAV_PREAMBLE_LEN as u64 + 2000 + 10000 * 21 + 33);

        assert!(matches!(bytes.read(), Err(Error::ResetRequired)));
    }

    #[test]
    fn packs_least_significant_bit_first() {
        let mut tape = Tape::new();
        tape.silence(2000).leader(210).sync().bytes(&[0x01, 0x80, 0x5A]).silence(1500);

        let mut bytes =
            ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(tape.into_source()))));

        assert_eq!(bytes.read().unwrap().val, 0x01);
        assert_eq!(bytes.read().unwrap().val, 0x80);
        assert_eq!(bytes.read().unwrap().val, 0x5A);
    }

    #[test]
    fn drops_a_partial_byte() {
        let mut tape = Tape::new();
        tape.silence(2000).leader(210).sync().pulse(17).pulse(25).pulse(17).silence(1500);

        let mut bytes =
            ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(tape.into_source()))));

        assert!(matches!(bytes.read(), Err(Error::ResetRequired)));
    }
}
