// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `detokenize` module expands a CAS container back into BASIC source text.

use tvctape_core::cas::{CasHeader, CAS_HEADER_LEN};
use tvctape_core::errors::{decode_error, Result};

use crate::token::{
    LineContext, TokenTable, LINE_END, PRG_END, PROG_BASE, TOKEN_COLON, TOKEN_COMMENT,
    TOKEN_DATA, TOKEN_REM,
};

/// Number of trailing bytes spelled per `BYTES` line.
const BYTES_PER_LINE: usize = 10;

/// Convert a CAS container into BASIC source text.
pub fn cas_to_bas(data: &[u8]) -> Result<String> {
    let header = CasHeader::read(data)?;

    let body_len = usize::from(header.prgsize);
    if data.len() < CAS_HEADER_LEN + body_len {
        return decode_error("cas: program body truncated");
    }
    let body = &data[CAS_HEADER_LEN..CAS_HEADER_LEN + body_len];

    let table = TokenTable::get();
    let mut out = String::new();

    if header.autorun != 0 {
        out.push_str("AUTORUN\n");
    }

    let mut pos = 0;
    while body.len() - pos >= 3 && body[pos] != PRG_END {
        let len = usize::from(body[pos]);
        if len < 3 {
            return decode_error("cas: broken program line");
        }
        if len > body.len() - pos {
            return decode_error("cas: program line overruns the body");
        }

        let number = u16::from_le_bytes([body[pos + 1], body[pos + 2]]);
        let mut payload = &body[pos + 3..pos + len];
        if let Some((&LINE_END, rest)) = payload.split_last() {
            payload = rest;
        }

        out.push_str(&format!("{:4} ", number));
        render_payload(payload, table, &mut out);
        out.push('\n');

        pos += len;
    }

    if pos < body.len() && body[pos] == PRG_END {
        pos += 1;
    }

    for (index, byte) in body[pos..].iter().enumerate() {
        if index % BYTES_PER_LINE == 0 {
            if index > 0 {
                out.push_str("'\n");
            }
            out.push_str(&format!("{:04x}: BYTES '", pos + index + PROG_BASE));
        }
        out.push_str(&format!("\\x{:02x}", byte));
    }
    if pos < body.len() {
        out.push_str("'\n");
    }

    Ok(out)
}

/// Expand one line payload, tracking the same lexical context as the tokenizer.
///
/// The column for a byte is chosen before the byte updates the context, so a token such as
/// `DATA` prints as its keyword while the bytes after it print through the raw column.
fn render_payload(payload: &[u8], table: &TokenTable, out: &mut String) {
    let mut ctx = LineContext::empty();

    for &byte in payload {
        if ctx.is_empty() {
            out.push_str(table.source(byte));
        } else {
            out.push_str(table.raw(byte));
        }

        if byte == b'"' {
            ctx.toggle(LineContext::STRING);
        } else if !ctx.contains(LineContext::STRING) {
            match byte {
                TOKEN_DATA => ctx.insert(LineContext::DATA),
                TOKEN_COLON => ctx.remove(LineContext::DATA),
                TOKEN_COMMENT | TOKEN_REM => ctx.insert(LineContext::COMMENT),
                _ => (),
            }
        }
    }
}
