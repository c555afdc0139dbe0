// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `token` module holds the BASIC token table.
//!
//! The table maps every byte value to a printable string in two flavours. The *source*
//! column carries the keyword strings of the token range 0x90..=0xFE and is used wherever
//! tokenization is active; the *raw* column spells ambiguous bytes as `\thh`/`\xhh` escapes
//! and is used inside string literals, `DATA` statements and comments. Both columns are
//! generated from one declarative keyword list and the escape rules, never maintained by
//! hand.

use bitflags::bitflags;
use lazy_static::lazy_static;

/// First byte value of the tokenizable range.
pub const TOKEN_START: u8 = 0x90;
/// Last byte value of the tokenizable range; 0xFF terminates a line and is not a token.
pub const TOKEN_END: u8 = 0xFE;
/// The `DATA` token. Keyword tokenization stops until the next statement separator.
pub const TOKEN_DATA: u8 = 0xFB;
/// The `REM` token. The rest of the line is a comment.
pub const TOKEN_REM: u8 = 0xFC;
/// The statement separator token.
pub const TOKEN_COLON: u8 = 0xFD;
/// The `!` comment token.
pub const TOKEN_COMMENT: u8 = 0xFE;
/// Line terminator byte.
pub const LINE_END: u8 = 0xFF;
/// Program terminator byte.
pub const PRG_END: u8 = 0x00;
/// Memory address of the first program byte on the machine.
pub const PROG_BASE: usize = 6639;

/// The nine national uppercase letters stored as bytes 0x00..=0x08.
pub const NATIONAL_UPPER: [char; 9] = ['Á', 'É', 'Í', 'Ó', 'Ö', 'Õ', 'Ú', 'Ü', 'Û'];
/// The nine national lowercase letters stored as bytes 0x10..=0x18.
pub const NATIONAL_LOWER: [char; 9] = ['á', 'é', 'í', 'ó', 'ö', 'õ', 'ú', 'ü', 'û'];

/// Keyword strings of the tokens 0x90..=0xFE, in token order.
///
/// The first rows are fragments of the machine's error messages; they contain lowercase
/// letters and therefore never match case-folded input, which is exactly how the machine
/// behaved. `TOKEN#xx` names stand in for codes with no known keyword.
const KEYWORDS: [&str; 111] = [
    "Cannot ", "No ", "Bad ", "rgument",
    " missing", ")", "(", "&",
    "+", "<", "=", "<=",
    ">", "<>", ">=", "^",
    ";", "/", "-", "=<",
    ",", "><", "=>", "#",
    "*", "TOKEN#A9", "TOKEN#AA", "POLIGON",
    "RECTANGLE", "ELLIPSE", "BORDER", "USING",
    "AT", "ATN", "XOR", "VOLUME",
    "TO", "THEN", "TAB", "STYLE",
    "STEP", "RATE", "PROMPT", "PITCH",
    "PAPER", "PALETTE", "PAINT", "OR",
    "ORD", "OFF", "NOT", "MODE",
    "INK", "INKEY$", "DURATION", "DELAY",
    "CHARACTER", "AND", "TOKEN#CA", "TOKEN#CB",
    "EXCEPTION", "RENUMBER", "FKEY", "AUTO",
    "LPRINT", "EXT", "VERIFY", "TRACE",
    "STOP", "SOUND", "SET", "SAVE",
    "RUN", "RETURN", "RESTORE", "READ",
    "RANDOMIZE", "PRINT", "POKE", "PLOT",
    "OUT", "OUTPUT", "OPEN", "ON",
    "OK", "NEXT", "NEW", "LOMEM",
    "LOAD", "LLIST", "LIST", "LET",
    "INPUT", "IF", "GRAPHICS", "GOTO",
    "GOSUB", "GET", "FOR", "END",
    "ELSE", "DIM", "DELETE", "DEF",
    "CONTINUE", "CLS", "CLOSE", "DATA",
    "REM", ":", "!",
];

bitflags! {
    /// Lexical context of a position within a program line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineContext: u8 {
        /// Inside a string literal.
        const STRING = 0x01;
        /// Inside a `DATA` statement.
        const DATA = 0x02;
        /// Inside a comment running to the end of the line.
        const COMMENT = 0x04;
    }
}

/// Case-fold a byte the way the machine's lexer does: ASCII lowercase to uppercase, and the
/// national lowercase band down to its uppercase band.
pub fn fold(byte: u8) -> u8 {
    match byte {
        b'a'..=b'z' => byte - 0x20,
        0x90..=0x9A => byte - 0x10,
        _ => byte,
    }
}

/// The 256-entry byte-to-text mapping in its two flavours.
pub struct TokenTable {
    source: Vec<String>,
    raw: Vec<String>,
}

lazy_static! {
    static ref TABLE: TokenTable = TokenTable::build();
}

impl TokenTable {
    /// Get the process-wide table.
    pub fn get() -> &'static TokenTable {
        &TABLE
    }

    fn build() -> TokenTable {
        let mut source = Vec::with_capacity(256);
        let mut raw = Vec::with_capacity(256);

        for byte in 0..=0xFFu8 {
            let src = match byte {
                0x00..=0x08 => NATIONAL_UPPER[usize::from(byte)].to_string(),
                0x09..=0x0F | 0x19..=0x1F => format!("\\t{:02x}", byte + 0x80),
                0x10..=0x18 => NATIONAL_LOWER[usize::from(byte - 0x10)].to_string(),
                0x5C => "\\\\".to_string(),
                0x20..=0x7E => char::from(byte).to_string(),
                0x7F => "\\t7f".to_string(),
                0x80..=0x8F => format!("\\x{:02x}", byte),
                0x90..=0xFE => KEYWORDS[usize::from(byte - TOKEN_START)].to_string(),
                0xFF => "\\xff".to_string(),
            };

            // Bytes 0x90..0x9F and 0xE0.. are unreachable through \t (the escape remaps or
            // rejects them), so the raw column spells them with \x.
            let raw_form = match byte {
                0x90..=0x9F | 0xE0..=0xFF => format!("\\x{:02x}", byte),
                0xA0..=0xDF => format!("\\t{:02x}", byte),
                _ => src.clone(),
            };

            source.push(src);
            raw.push(raw_form);
        }

        TokenTable { source, raw }
    }

    /// Text form of a byte while tokenization is active.
    pub fn source(&self, byte: u8) -> &str {
        &self.source[usize::from(byte)]
    }

    /// Text form of a byte inside a string literal, `DATA` statement or comment.
    pub fn raw(&self, byte: u8) -> &str {
        &self.raw[usize::from(byte)]
    }

    /// Match a keyword at the start of `text`, which must already be escape-translated.
    ///
    /// The scan runs from the highest token code downwards, so where one keyword prefixes
    /// another the longer form wins. Keyword bytes are compared against case-folded input.
    pub fn match_keyword(&self, text: &[u8]) -> Option<(u8, usize)> {
        for code in (TOKEN_START..=TOKEN_END).rev() {
            let keyword = self.source[usize::from(code)].as_bytes();
            if text.len() >= keyword.len() && keyword.iter().zip(text).all(|(&k, &c)| k == fold(c))
            {
                return Some((code, keyword.len()));
            }
        }
        None
    }
}
