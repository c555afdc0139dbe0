// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `bit` module classifies pulses into data bits.
//!
//! Recordings run at slightly different speeds, so there are no absolute pulse widths to
//! classify against. Instead the reader measures the average length of the leader pulses that
//! open every block and derives the four classification intervals from it. The nominal pulse
//! widths on tape are 388us for a one bit, 470us for a leader pulse, 552us for a zero bit and
//! 736us for the sync pulse.

use std::io;

use log::{debug, warn};

use tvctape_core::errors::{reset_error, Result};

use crate::pulse::PulseReader;

/// Number of consecutive pulses averaged, and then verified, per measurement attempt.
const LEADER_BATCH: u32 = 100;
/// Number of measurement attempts before the leader search is abandoned.
const MAX_MEASURE_ATTEMPTS: u32 = 20;
/// Relative tolerance applied around every interval centre.
const TOLERANCE: f64 = 0.05;

/// Nominal one-bit pulse width relative to a leader pulse.
const F_BIT1: f64 = 388.0 / 470.0;
/// Nominal zero-bit pulse width relative to a leader pulse.
const F_BIT0: f64 = 552.0 / 470.0;
/// Nominal sync pulse width relative to a leader pulse.
const F_SYNC: f64 = 736.0 / 470.0;
/// Upper tolerance of the sync interval; sync pulses are allowed to run long.
const SYNC_STRETCH: f64 = 1.35;

/// A single classified data bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bit {
    /// Byte offset of the pulse the bit was classified from.
    pub pos: u64,
    /// Length of that pulse in samples.
    pub len: u32,
    /// The bit value, 0 or 1.
    pub val: u8,
}

/// A closed range of pulse lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min: u32,
    pub max: u32,
}

impl Interval {
    pub fn contains(&self, len: u32) -> bool {
        len >= self.min && len <= self.max
    }
}

/// The four pulse classification intervals, in ascending order of centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub bit1: Interval,
    pub lead: Interval,
    pub bit0: Interval,
    pub sync: Interval,
}

impl Intervals {
    /// Derive the classification intervals from the measured average leader pulse length.
    ///
    /// The intervals are pairwise disjoint: where two adjacent ±5% windows collide, [`split`]
    /// places the boundary between them.
    pub fn derive(avg: f64) -> Intervals {
        let bit1_min = (avg * F_BIT1 * (1.0 - TOLERANCE)).floor() as u32;
        let (bit1_max, lead_min) = split(avg, F_BIT1 * (1.0 + TOLERANCE), 1.0 - TOLERANCE);
        let (lead_max, bit0_min) = split(avg, 1.0 + TOLERANCE, F_BIT0 * (1.0 - TOLERANCE));
        let (bit0_max, sync_min) =
            split(avg, F_BIT0 * (1.0 + TOLERANCE), F_SYNC * (1.0 - TOLERANCE));
        let sync_max = (avg * F_SYNC * SYNC_STRETCH).ceil() as u32;

        Intervals {
            bit1: Interval { min: bit1_min, max: bit1_max },
            lead: Interval { min: lead_min, max: lead_max },
            bit0: Interval { min: bit0_min, max: bit0_max },
            sync: Interval { min: sync_min, max: sync_max },
        }
    }
}

/// Place the boundary between two adjacent tolerance windows.
///
/// `fact_hi` scales `base` to the top of the lower window, `fact_lo` to the bottom of the
/// upper window. Returns the integer top of the lower interval and bottom of the upper one.
/// When the rounded windows would touch or overlap, the boundary goes to whichever side
/// loses less of its window.
fn split(base: f64, fact_hi: f64, fact_lo: f64) -> (u32, u32) {
    let v1 = base * fact_hi;
    let v2 = base * fact_lo;

    let (fv1, cv1) = (v1.floor(), v1.ceil());
    let (fv2, cv2) = (v2.floor(), v2.ceil());
    let e1 = cv1 - v1;
    let e2 = v1 - fv2;

    let (hi, lo) = if cv1 < fv2 {
        (cv1, fv2)
    } else if cv1 == cv2 {
        (fv1, cv2)
    } else if e1 > e2 + 0.5 {
        (fv1, fv2)
    } else if e2 > e1 + 0.5 {
        (cv1, cv2)
    } else {
        (fv1, cv2)
    };

    (hi as u32, lo as u32)
}

enum State {
    Seek,
    Data(Intervals),
    Done,
}

/// Reader classifying pulses into bits.
///
/// After a reset the reader searches for a stable leader, derives fresh classification
/// intervals, consumes the rest of the leader, and demands a sync pulse before producing
/// bits again. Anything unclassifiable parks the reader until the next reset.
pub struct BitReader<R: io::Read> {
    pulses: PulseReader<R>,
    state: State,
}

impl<R: io::Read> BitReader<R> {
    pub fn new(pulses: PulseReader<R>) -> Self {
        BitReader { pulses, state: State::Seek }
    }

    /// Return the reader to the leader-seeking state and reset the pulse reader under it.
    pub fn reset(&mut self) {
        self.state = State::Seek;
        self.pulses.reset();
    }

    /// Measure the average leader pulse length.
    ///
    /// Each attempt averages `LEADER_BATCH` consecutive pulses and accepts the result once
    /// the following `LEADER_BATCH` pulses all fall within the tolerance around it.
    fn measure_leader(&mut self) -> Result<f64> {
        for _ in 0..MAX_MEASURE_ATTEMPTS {
            let mut sum = 0u64;
            for _ in 0..LEADER_BATCH {
                sum += u64::from(self.pulses.read()?.len);
            }
            let avg = sum as f64 / f64::from(LEADER_BATCH);

            let lo = (avg * (1.0 - TOLERANCE)).floor() as u32;
            let hi = (avg * (1.0 + TOLERANCE)).ceil() as u32;

            let mut stable = true;
            for _ in 0..LEADER_BATCH {
                let pulse = self.pulses.read()?;
                if pulse.len < lo || pulse.len > hi {
                    stable = false;
                    break;
                }
            }
            if stable {
                debug!("leader found, average pulse length {:.2}", avg);
                return Ok(avg);
            }
        }

        warn!("no stable leader found");
        self.state = State::Done;
        reset_error()
    }

    /// Read the next data bit.
    pub fn read(&mut self) -> Result<Bit> {
        loop {
            match self.state {
                State::Done => return reset_error(),
                State::Seek => {
                    let avg = self.measure_leader()?;
                    let intervals = Intervals::derive(avg);
                    debug!("classification intervals: {:?}", intervals);

                    let mut pulse = self.pulses.read()?;
                    while intervals.lead.contains(pulse.len) {
                        pulse = self.pulses.read()?;
                    }
                    if !intervals.sync.contains(pulse.len) {
                        warn!("{:06x}: sync missed (pulse length {})", pulse.pos, pulse.len);
                        self.state = State::Done;
                        return reset_error();
                    }
                    debug!("{:06x}: sync found, length {}", pulse.pos, pulse.len);
                    self.state = State::Data(intervals);
                }
                State::Data(intervals) => {
                    let pulse = self.pulses.read()?;
                    return if intervals.bit0.contains(pulse.len) {
                        Ok(Bit { pos: pulse.pos, len: pulse.len, val: 0 })
                    } else if intervals.bit1.contains(pulse.len) {
                        Ok(Bit { pos: pulse.pos, len: pulse.len, val: 1 })
                    } else {
                        warn!("{:06x}: unclassifiable pulse of length {}", pulse.pos, pulse.len);
                        self.state = State::Done;
                        reset_error()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::SeqReader;
    use crate::synth::Tape;
    use tvctape_core::errors::Error;

    #[test]
    fn derives_the_nominal_intervals() {
        let intervals = Intervals::derive(21.0);
        assert_eq!(intervals.bit1, Interval { min: 16, max: 18 });
        assert_eq!(intervals.lead, Interval { min: 19, max: 22 });
        assert_eq!(intervals.bit0, Interval { min: 23, max: 26 });
        assert_eq!(intervals.sync, Interval { min: 31, max: 45 });
    }

    #[test]
    fn intervals_stay_disjoint_and_ordered() {
        for avg in 15..=30 {
            let iv = Intervals::derive(avg as f64);
            assert!(iv.bit1.min <= iv.bit1.max, "bit1 empty at avg={}", avg);
            assert!(iv.bit1.max < iv.lead.min, "bit1/lead overlap at avg={}", avg);
            assert!(iv.lead.min <= iv.lead.max, "lead empty at avg={}", avg);
            assert!(iv.lead.max < iv.bit0.min, "lead/bit0 overlap at avg={}", avg);
            assert!(iv.bit0.min <= iv.bit0.max, "bit0 empty at avg={}", avg);
            assert!(iv.bit0.max < iv.sync.min, "bit0/sync overlap at avg={}", avg);
            assert!(iv.sync.min <= iv.sync.max, "sync empty at avg={}", avg);
        }
    }

    #[test]
    fn measures_the_leader_and_classifies_bits() {
        let mut tape = Tape::new();
        tape.silence(2000).leader(210).sync();
        for len in [17, 25, 25, 17] {
            tape.pulse(len);
        }
        tape.silence(1500);

        let mut bits = BitReader::new(PulseReader::new(SeqReader::new(tape.into_source())));
        assert_eq!(bits.read().unwrap().val, 1);
        assert_eq!(bits.read().unwrap().val, 0);
        assert_eq!(bits.read().unwrap().val, 0);
        assert_eq!(bits.read().unwrap().val, 1);
        assert!(matches!(bits.read(), Err(Error::ResetRequired)));
    }

    #[test]
    fn a_bit_length_equals_its_pulse_length() {
        let mut tape = Tape::new();
        tape.silence(2000).leader(210).sync().pulse(25).silence(1500);

        let mut bits = BitReader::new(PulseReader::new(SeqReader::new(tape.into_source())));
        let bit = bits.read().unwrap();
        assert_eq!(bit.len, 25);
        assert_eq!(bit.val, 0);
    }

    #[test]
    fn missing_sync_parks_the_reader() {
        let mut tape = Tape::new();
        // A leader that ends in a bit-0 pulse without any sync pulse.
        tape.silence(2000).leader(210).pulse(25).silence(1500);

        let mut bits = BitReader::new(PulseReader::new(SeqReader::new(tape.into_source())));
        assert!(matches!(bits.read(), Err(Error::ResetRequired)));
        assert!(matches!(bits.read(), Err(Error::ResetRequired)));
    }

    #[test]
    fn unclassifiable_pulse_after_sync_parks_the_reader() {
        let mut tape = Tape::new();
        tape.silence(2000).leader(210).sync().pulse(29).silence(1500);

        let mut bits = BitReader::new(PulseReader::new(SeqReader::new(tape.into_source())));
        assert!(matches!(bits.read(), Err(Error::ResetRequired)));
    }

    #[test]
    fn gives_up_without_a_stable_leader() {
        let mut tape = Tape::new();
        tape.silence(2000);
        // Alternating short and long pulses never verify against their own average.
        for _ in 0..3000 {
            tape.pulse(17).pulse(33);
        }
        tape.silence(1500);

        let mut bits = BitReader::new(PulseReader::new(SeqReader::new(tape.into_source())));
        assert!(matches!(bits.read(), Err(Error::ResetRequired)));
    }
}
