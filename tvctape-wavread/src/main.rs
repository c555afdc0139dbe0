// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::exit;

use clap::{Arg, Command};
use log::error;

use tvctape_core::errors::{Error, Result};
use tvctape_core::io::SampleSource;
use tvctape_demod::bit::BitReader;
use tvctape_demod::byte::ByteReader;
use tvctape_demod::framer::{BlockFramer, DirCasSink};
use tvctape_demod::pulse::PulseReader;
use tvctape_demod::seq::SeqReader;

/// What to do with the input: dump one stage of the chain, or run the full decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Samples,
    Sequences,
    Pulses,
    Bits,
    Bytes,
    Decode,
}

fn build_command() -> Command<'static> {
    // The short mode switches -i, -h and -b come from the original tool, so the automatic
    // help flag has to go; --help is wired up by hand below.
    Command::new("wavread")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Decode a TVC cassette recording into CAS files")
        .disable_help_flag(true)
        .arg(Arg::new("help").long("help").help("Print help information"))
        .arg(Arg::new("wavread").long("wavread").help("Dump raw samples"))
        .arg(
            Arg::new("seqread")
                .long("seqread")
                .short('h')
                .help("Dump run-length sequences"),
        )
        .arg(Arg::new("pulseread").long("pulseread").short('i').help("Dump pulses"))
        .arg(Arg::new("bitread").long("bitread").help("Dump classified bits"))
        .arg(Arg::new("byteread").long("byteread").short('b').help("Dump assembled bytes"))
        .arg(Arg::new("debug").short('d').help("Enable debug diagnostics"))
        .arg(Arg::new("INPUT").help("The input WAV file path").index(1))
}

fn main() {
    let matches = match build_command().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            exit(8);
        }
    };

    if matches.is_present("help") {
        let _ = build_command().print_help();
        exit(0);
    }

    init_logging(matches.is_present("debug"));

    let mode = if matches.is_present("wavread") {
        Mode::Samples
    } else if matches.is_present("seqread") {
        Mode::Sequences
    } else if matches.is_present("pulseread") {
        Mode::Pulses
    } else if matches.is_present("bitread") {
        Mode::Bits
    } else if matches.is_present("byteread") {
        Mode::Bytes
    } else {
        Mode::Decode
    };

    let path = match matches.value_of("INPUT") {
        Some(path) => Path::new(path),
        None => {
            let _ = build_command().print_help();
            exit(8);
        }
    };
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            error!("error opening '{}': {}", path.display(), err);
            exit(32);
        }
    };

    let source = match SampleSource::try_new(BufReader::new(file)) {
        Ok(source) => source,
        Err(_) => {
            error!("'{}' is shorter than a WAV preamble", path.display());
            exit(32);
        }
    };

    let result = match mode {
        Mode::Samples => dump_samples(source),
        Mode::Sequences => dump_sequences(SeqReader::new(source)),
        Mode::Pulses => dump_pulses(PulseReader::new(SeqReader::new(source))),
        Mode::Bits => dump_bits(BitReader::new(PulseReader::new(SeqReader::new(source)))),
        Mode::Bytes => {
            dump_bytes(ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(source)))))
        }
        Mode::Decode => decode(ByteReader::new(BitReader::new(PulseReader::new(SeqReader::new(
            source,
        ))))),
    };

    if let Err(err) = result {
        error!("{}", err);
        exit(32);
    }
}

/// Run the full pipeline, writing one CAS file per tape file into the current directory.
fn decode<R: Read>(bytes: ByteReader<R>) -> Result<()> {
    BlockFramer::new(bytes, DirCasSink::new(".")).run()
}

fn dump_samples<R: Read>(mut source: SampleSource<R>) -> Result<()> {
    while let Some(sample) = source.peek() {
        println!("{:06x} {:02x}", sample.pos, sample.val);
        source.advance()?;
    }
    Ok(())
}

fn dump_sequences<R: Read>(mut seqs: SeqReader<R>) -> Result<()> {
    let mut n = 0u64;
    loop {
        match seqs.read() {
            Ok(seq) => {
                n += 1;
                println!(
                    "{:05} {:06x}-{:06x} {} {:2}",
                    n,
                    seq.pos,
                    seq.pos + u64::from(seq.len) - 1,
                    seq.sign.symbol(),
                    seq.len
                );
            }
            Err(Error::EndOfFile) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn dump_pulses<R: Read>(mut pulses: PulseReader<R>) -> Result<()> {
    let mut n = 0u64;
    loop {
        match pulses.read() {
            Ok(pulse) => {
                n += 1;
                println!(
                    "{:05} {:06x}-{:06x} {}+{}={}",
                    n,
                    pulse.pos,
                    pulse.pos + u64::from(pulse.len) - 1,
                    pulse.len1,
                    pulse.len2,
                    pulse.len
                );
            }
            Err(Error::ResetRequired) => {
                println!("-----");
                pulses.reset();
            }
            Err(Error::EndOfFile) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn dump_bits<R: Read>(mut bits: BitReader<R>) -> Result<()> {
    let mut n = 0u64;
    loop {
        match bits.read() {
            Ok(bit) => {
                n += 1;
                println!("{:05} {:06x} {} {:2}", n, bit.pos, bit.val, bit.len);
            }
            Err(Error::ResetRequired) => {
                println!("-----");
                bits.reset();
            }
            Err(Error::EndOfFile) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn dump_bytes<R: Read>(mut bytes: ByteReader<R>) -> Result<()> {
    let mut n = 0u64;
    loop {
        match bytes.read() {
            Ok(byte) => {
                n += 1;
                println!("{:05}   {:02x}", n, byte.val);
            }
            Err(Error::ResetRequired) => {
                println!("-----");
                bytes.reset();
            }
            Err(Error::EndOfFile) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn init_logging(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if debug { log::LevelFilter::Debug } else { log::LevelFilter::Info });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
