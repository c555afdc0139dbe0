// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The TvcTape tape signal demodulator.
//!
//! Decoding is a chain of forward-only readers, each one driven by the layer above it:
//!
//! ```text
//! samples -> sequences -> pulses -> bits -> bytes -> tape blocks
//! ```
//!
//! * [`seq::SeqReader`] groups consecutive samples of equal sign into run-length sequences.
//! * [`pulse::PulseReader`] pairs two opposite-sign sequences into a pulse, demanding a
//!   stretch of silence before the first pulse of every burst.
//! * [`bit::BitReader`] measures the leader of the recording, derives the four pulse
//!   classification intervals from it, detects the sync pulse, and classifies the data
//!   pulses into bits.
//! * [`byte::ByteReader`] packs eight bits into a byte, least significant bit first.
//! * [`framer::BlockFramer`] validates the tape block structure and hands the reconstructed
//!   files to a [`framer::CasSink`].
//!
//! Every reader can be `reset()` back to its initial state, which ripples down the chain and
//! forces the next read to re-synchronise on silence, leader and sync pulse. The framer does
//! this at every block boundary and after every recoverable decoding failure.

pub mod bit;
pub mod byte;
pub mod framer;
pub mod pulse;
pub mod seq;
