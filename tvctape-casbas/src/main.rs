// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Arg, Command, ErrorKind};
use log::error;

use tvctape_basic::{bas_to_cas, cas_to_bas};
use tvctape_core::errors::{decode_error, Error, LimitErrorKind, Result};

/// Conversion direction, selected by the input file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    CasToBas,
    BasToCas,
}

fn main() {
    let matches = match Command::new("casbas")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert between CAS tape containers and BAS program text")
        .arg(Arg::new("debug").short('d').help("Enable debug diagnostics"))
        .arg(Arg::new("overwrite").short('o').help("Permit overwriting an existing output file"))
        .arg(
            Arg::new("INPUT")
                .help("The input file path (*.cas or *.bas)")
                .required(true)
                .index(1),
        )
        .arg(Arg::new("OUTPUT").help("The output file path").index(2))
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(err)
            if err.kind() == ErrorKind::DisplayHelp || err.kind() == ErrorKind::DisplayVersion =>
        {
            let _ = err.print();
            exit(0);
        }
        Err(err) => {
            let _ = err.print();
            exit(4);
        }
    };

    init_logging(matches.is_present("debug"));

    let input = Path::new(matches.value_of("INPUT").unwrap());
    let explicit_output = matches.value_of("OUTPUT").map(PathBuf::from);
    // Naming an explicit output implies permission to overwrite it.
    let overwrite = matches.is_present("overwrite") || explicit_output.is_some();

    let direction = match direction_of(input) {
        Some(direction) => direction,
        None => {
            error!("input file '{}' should be *.cas or *.bas", input.display());
            exit(16);
        }
    };

    let output = explicit_output.unwrap_or_else(|| derive_output(input, direction));

    if !overwrite && output.exists() {
        error!("output file '{}' already exists", output.display());
        exit(35);
    }

    if let Err(err) = convert(input, &output, direction) {
        error!("{}", err);
        exit(exit_code(&err));
    }
}

fn convert(input: &Path, output: &Path, direction: Direction) -> Result<()> {
    let data = fs::read(input)?;

    match direction {
        Direction::CasToBas => {
            let text = cas_to_bas(&data)?;
            fs::write(output, text)?;
        }
        Direction::BasToCas => {
            let text = match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => return decode_error("bas: input is not valid text"),
            };
            let cas = bas_to_cas(&text)?;
            fs::write(output, cas)?;
        }
    }
    Ok(())
}

fn direction_of(path: &Path) -> Option<Direction> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("cas") {
        Some(Direction::CasToBas)
    } else if ext.eq_ignore_ascii_case("bas") {
        Some(Direction::BasToCas)
    } else {
        None
    }
}

/// Derive the output path by swapping the extension, keeping an all-caps spelling.
fn derive_output(input: &Path, direction: Direction) -> PathBuf {
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("");
    let upper = ext.chars().all(|c| c.is_ascii_uppercase());

    let new_ext = match (direction, upper) {
        (Direction::CasToBas, true) => "BAS",
        (Direction::CasToBas, false) => "bas",
        (Direction::BasToCas, true) => "CAS",
        (Direction::BasToCas, false) => "cas",
    };
    input.with_extension(new_ext)
}

/// Map core errors to the historical exit codes of the tool.
fn exit_code(err: &Error) -> i32 {
    match *err {
        Error::IoError(_) | Error::DecodeError(_) | Error::EndOfFile | Error::ResetRequired => 32,
        Error::SyntaxError { .. } => 38,
        Error::LimitError { kind: LimitErrorKind::SourceLine, .. } => 35,
        Error::LimitError { .. } => 40,
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
