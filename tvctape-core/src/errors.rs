// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

/// `LimitErrorKind` is a list of the format limits a BASIC text may exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitErrorKind {
    /// A source text line is longer than the maximum line length, or contains a NUL.
    SourceLine,
    /// A tokenized line does not fit into a single line frame.
    TokenizedLine,
    /// The tokenized program does not fit into the program-size field of the container.
    ProgramSize,
}

impl LimitErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            LimitErrorKind::SourceLine => "source line is too long",
            LimitErrorKind::TokenizedLine => "tokenized line is too long",
            LimitErrorKind::ProgramSize => "tokenized program is too large",
        }
    }
}

/// `Error` provides an enumeration of all possible errors reported by TvcTape.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading or writing a stream.
    IoError(io::Error),
    /// The stream contained malformed data and could not be decoded.
    DecodeError(&'static str),
    /// A reader lost synchronization and must be reset before continuing.
    ResetRequired,
    /// The end of the stream was reached.
    EndOfFile,
    /// A BASIC text line could not be parsed.
    SyntaxError {
        /// One-based number of the offending text line.
        line: u32,
        /// Why the line was rejected.
        reason: &'static str,
    },
    /// A limit imposed by the container format was exceeded.
    LimitError {
        /// One-based number of the offending text line.
        line: u32,
        /// The limit that was exceeded.
        kind: LimitErrorKind,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => write!(f, "io error: {}", err),
            Error::DecodeError(msg) => write!(f, "malformed stream: {}", msg),
            Error::ResetRequired => write!(f, "reader needs to be reset"),
            Error::EndOfFile => write!(f, "unexpected end of stream"),
            Error::SyntaxError { line, reason } => {
                write!(f, "syntax error in line #{}: {}", line, reason)
            }
            Error::LimitError { line, kind } => {
                write!(f, "{} (line #{})", kind.as_str(), line)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfFile,
            _ => Error::IoError(err),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DecodeError(desc))
}

/// Convenience function to create a reset required error.
pub fn reset_error<T>() -> Result<T> {
    Err(Error::ResetRequired)
}

/// Convenience function to create an end-of-stream error.
pub fn end_of_stream_error<T>() -> Result<T> {
    Err(Error::EndOfFile)
}

/// Convenience function to create a syntax error.
pub fn syntax_error<T>(line: u32, reason: &'static str) -> Result<T> {
    Err(Error::SyntaxError { line, reason })
}

/// Convenience function to create a limit error.
pub fn limit_error<T>(line: u32, kind: LimitErrorKind) -> Result<T> {
    Err(Error::LimitError { line, kind })
}
