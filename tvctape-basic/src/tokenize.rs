// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `tokenize` module converts BASIC source text into a CAS container.
//!
//! Each numbered line is escape-translated, tokenized with context awareness, and framed
//! with a length/line-number prefix. Two directives are recognised on lines without a line
//! number: `AUTORUN` sets the autorun flag of the container, `BYTES '…'` appends raw bytes
//! after the program terminator.

use log::debug;

use tvctape_core::cas::{CasHeader, CAS_HEADER_LEN};
use tvctape_core::errors::{limit_error, syntax_error, LimitErrorKind, Result};

use crate::token::{
    fold, LineContext, TokenTable, LINE_END, NATIONAL_LOWER, NATIONAL_UPPER, PRG_END,
    TOKEN_COLON, TOKEN_COMMENT, TOKEN_DATA, TOKEN_REM,
};

/// Maximum length of a source text line.
pub const MAX_SOURCE_LINE: usize = 1024;
/// Maximum length of a tokenized line, terminator byte included.
pub const MAX_TOKENIZED_LINE: usize = 252;

/// Convert BASIC source text into a complete CAS container.
pub fn bas_to_cas(text: &str) -> Result<Vec<u8>> {
    let table = TokenTable::get();

    let mut body: Vec<u8> = Vec::new();
    let mut autorun = false;
    let mut terminated = false;

    for (index, raw_line) in text.lines().enumerate() {
        let lineno = index as u32 + 1;

        if raw_line.len() > MAX_SOURCE_LINE || raw_line.contains('\0') {
            return limit_error(lineno, LimitErrorKind::SourceLine);
        }

        let line = strip_label(raw_line.trim_start_matches(' '));
        if line.is_empty() {
            continue;
        }

        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            process_directive(line, lineno, &mut body, &mut autorun, &mut terminated)?;
            continue;
        }

        if terminated {
            return syntax_error(lineno, "numbered line after a BYTES directive");
        }

        let (number, rest) = parse_line_number(line, lineno)?;
        let translated = translate(rest.trim_start_matches(' '), lineno)?;
        let tokens = tokenize_line(&translated, table);

        if tokens.len() > MAX_TOKENIZED_LINE {
            return limit_error(lineno, LimitErrorKind::TokenizedLine);
        }

        body.push((3 + tokens.len()) as u8);
        body.extend_from_slice(&number.to_le_bytes());
        body.extend_from_slice(&tokens);
    }

    if !terminated {
        body.push(PRG_END);
    }

    if body.len() > usize::from(u16::MAX) {
        return limit_error(0, LimitErrorKind::ProgramSize);
    }

    let header = CasHeader::for_program(body.len() as u16, autorun);
    debug!("tokenized program: {} bytes, autorun={}", body.len(), autorun);

    let mut cas = Vec::with_capacity(CAS_HEADER_LEN + body.len());
    cas.extend_from_slice(&header.to_bytes());
    cas.extend_from_slice(&body);
    Ok(cas)
}

/// Handle an `AUTORUN` or `BYTES` directive line.
fn process_directive(
    line: &str,
    lineno: u32,
    body: &mut Vec<u8>,
    autorun: &mut bool,
    terminated: &mut bool,
) -> Result<()> {
    let (word, rest) = split_word(line);

    if word.eq_ignore_ascii_case("AUTORUN") {
        *autorun = true;
        return Ok(());
    }
    if !word.eq_ignore_ascii_case("BYTES") {
        return syntax_error(lineno, "expected a line number, AUTORUN or BYTES");
    }

    let (quoted, _) = split_word(rest);
    let quoted = match quoted.strip_prefix('\'') {
        Some(inner) => inner.strip_suffix('\'').unwrap_or(inner),
        None => quoted,
    };
    if quoted.is_empty() {
        return Ok(());
    }

    let bytes = translate(quoted, lineno)?;
    if !*terminated {
        body.push(PRG_END);
        *terminated = true;
    }
    body.extend_from_slice(&bytes);
    Ok(())
}

/// Split off the first whitespace-delimited word, consuming the whitespace around it.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let end = text.find(|c: char| c.is_ascii_whitespace()).unwrap_or(text.len());
    let rest = text[end..].trim_start_matches(|c: char| c.is_ascii_whitespace());
    (&text[..end], rest)
}

/// Strip a leading `hhhh:` address label, if present.
fn strip_label(line: &str) -> &str {
    let (word, rest) = split_word(line);
    if word.len() == 5
        && word.is_ascii()
        && word.ends_with(':')
        && word[..4].chars().all(|c| c.is_ascii_hexdigit())
    {
        rest
    } else {
        line
    }
}

/// Parse the decimal line number opening a program line.
fn parse_line_number(line: &str, lineno: u32) -> Result<(u16, &str)> {
    let end = line.find(|c: char| !c.is_ascii_digit()).unwrap_or(line.len());

    let mut number: u32 = 0;
    for digit in line[..end].bytes() {
        number = number * 10 + u32::from(digit - b'0');
        if number > u32::from(u16::MAX) {
            return syntax_error(lineno, "line number out of range");
        }
    }
    Ok((number as u16, &line[end..]))
}

/// Translate national letters and backslash escapes into raw program bytes.
///
/// `\thh` accepts values in [0x20, 0xE0) only and remaps [0x80, 0xA0) into the national
/// letter band at [0x00, 0x20); `\xhh` passes any byte through untouched.
pub(crate) fn translate(text: &str, lineno: u32) -> Result<Vec<u8>> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(chars.len());

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if let Some(k) = NATIONAL_UPPER.iter().position(|&u| u == c) {
            out.push(k as u8);
            i += 1;
        } else if let Some(k) = NATIONAL_LOWER.iter().position(|&l| l == c) {
            out.push(0x10 + k as u8);
            i += 1;
        } else if c == '\\' {
            let next = chars.get(i + 1).copied();
            if next == Some('\\') {
                out.push(b'\\');
                i += 2;
                continue;
            }
            let kind = match next {
                Some('t') => 't',
                Some('x') => 'x',
                _ => return syntax_error(lineno, "bad escape"),
            };

            let hi = chars.get(i + 2).and_then(|c| c.to_digit(16));
            let lo = chars.get(i + 3).and_then(|c| c.to_digit(16));
            let mut value = match (hi, lo) {
                (Some(hi), Some(lo)) => hi * 16 + lo,
                _ => return syntax_error(lineno, "bad hex digit in escape"),
            };

            if kind == 't' {
                if value < 0x20 || value >= 0xE0 {
                    return syntax_error(lineno, "escape value out of range");
                }
                if (0x80..0xA0).contains(&value) {
                    value -= 0x80;
                }
            }
            out.push(value as u8);
            i += 4;
        } else if c.is_ascii() {
            out.push(c as u8);
            i += 1;
        } else {
            return syntax_error(lineno, "character not representable on the machine");
        }
    }

    Ok(out)
}

/// Tokenize one translated program line and append the line terminator.
///
/// Keyword replacement runs only outside string, `DATA` and comment context. Inside a
/// `DATA` statement a `:` becomes the statement separator token and re-enables keyword
/// replacement; a `!` becomes the comment token and disables it through the line end.
pub(crate) fn tokenize_line(line: &[u8], table: &TokenTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len() + 1);
    let mut ctx = LineContext::empty();

    let mut i = 0;
    while i < line.len() {
        if ctx.is_empty() {
            if let Some((token, len)) = table.match_keyword(&line[i..]) {
                match token {
                    TOKEN_REM | TOKEN_COMMENT => ctx.insert(LineContext::COMMENT),
                    TOKEN_DATA => ctx.insert(LineContext::DATA),
                    _ => (),
                }
                out.push(token);
                i += len;
            } else {
                let c = line[i];
                i += 1;
                if c == b'"' {
                    ctx.toggle(LineContext::STRING);
                }
                out.push(fold(c));
            }
        } else {
            let mut c = line[i];
            i += 1;
            if c == b'"' {
                ctx.toggle(LineContext::STRING);
            } else if ctx == LineContext::DATA {
                if c == b':' {
                    c = TOKEN_COLON;
                    ctx.remove(LineContext::DATA);
                } else if c == b'!' {
                    c = TOKEN_COMMENT;
                    ctx.insert(LineContext::COMMENT);
                }
            }
            out.push(c);
        }
    }

    out.push(LINE_END);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvctape_core::cas::CasHeader;
    use tvctape_core::errors::Error;

    fn body_of(cas: &[u8]) -> &[u8] {
        &cas[CAS_HEADER_LEN..]
    }

    #[test]
    fn frames_a_simple_print_line() {
        let cas = bas_to_cas("10 PRINT \"HI\"\n").unwrap();
        assert_eq!(
            body_of(&cas),
            [0x0A, 0x0A, 0x00, 0xDD, 0x20, 0x22, 0x48, 0x49, 0x22, 0xFF, 0x00]
        );

        let header = CasHeader::read(&cas).unwrap();
        assert_eq!(header.prgsize, 11);
        assert_eq!(header.file_type, 0x01);
        assert_eq!(header.autorun, 0x00);
        assert!(header.is_consistent());
    }

    #[test]
    fn autorun_sets_the_header_flag() {
        let cas = bas_to_cas("AUTORUN\n20 END\n").unwrap();
        assert_eq!(body_of(&cas), [0x05, 0x14, 0x00, 0xF3, 0xFF, 0x00]);

        let header = CasHeader::read(&cas).unwrap();
        assert_eq!(header.autorun, 0xFF);
        assert_eq!(header.prgsize, 6);
    }

    #[test]
    fn autorun_matches_case_insensitively() {
        let cas = bas_to_cas("AutoRun\n").unwrap();
        assert_eq!(CasHeader::read(&cas).unwrap().autorun, 0xFF);
    }

    #[test]
    fn data_suppresses_keywords_until_the_separator() {
        let cas = bas_to_cas("30 DATA 1,2:PRINT 3\n").unwrap();
        assert_eq!(
            body_of(&cas),
            [0x0D, 0x1E, 0x00, 0xFB, 0x20, 0x31, 0x2C, 0x32, 0xFD, 0xDD, 0x20, 0x33, 0xFF, 0x00]
        );
    }

    #[test]
    fn bang_inside_data_starts_a_comment() {
        let cas = bas_to_cas("10 DATA 5!note\n").unwrap();
        assert_eq!(
            body_of(&cas),
            [0x0C, 0x0A, 0x00, 0xFB, 0x20, 0x35, 0xFE, 0x6E, 0x6F, 0x74, 0x65, 0xFF, 0x00]
        );
    }

    #[test]
    fn a_colon_inside_a_data_string_stays_raw() {
        let cas = bas_to_cas("10 DATA \"a:b\",2\n").unwrap();
        assert_eq!(
            body_of(&cas),
            [
                0x0D, 0x0A, 0x00, 0xFB, 0x20, 0x22, 0x61, 0x3A, 0x62, 0x22, 0x2C, 0x32, 0xFF,
                0x00
            ]
        );
    }

    #[test]
    fn keyword_adjacent_to_a_string_tokenizes() {
        let cas = bas_to_cas("10 INPUT\"X\"\n").unwrap();
        assert_eq!(body_of(&cas), [0x08, 0x0A, 0x00, 0xEC, 0x22, 0x58, 0x22, 0xFF, 0x00]);
    }

    #[test]
    fn rem_passes_bytes_through_verbatim() {
        let cas = bas_to_cas("50 REM\\xb4x\n").unwrap();
        assert_eq!(body_of(&cas), [0x07, 0x32, 0x00, 0xFC, 0xB4, 0x78, 0xFF, 0x00]);
    }

    #[test]
    fn strips_an_address_label() {
        let labelled = bas_to_cas("AAAA: 10 LET X=1\n").unwrap();
        let plain = bas_to_cas("10 LET X=1\n").unwrap();
        assert_eq!(labelled, plain);
    }

    #[test]
    fn lowercase_keywords_fold_to_tokens() {
        let cas = bas_to_cas("10 print \"x\"\n").unwrap();
        assert_eq!(body_of(&cas)[3], 0xDD);
    }

    #[test]
    fn accepts_the_highest_line_number() {
        let cas = bas_to_cas("65535 END\n").unwrap();
        assert_eq!(body_of(&cas), [0x05, 0xFF, 0xFF, 0xF3, 0xFF, 0x00]);
    }

    #[test]
    fn rejects_a_line_number_overflow() {
        assert!(matches!(
            bas_to_cas("65536 END\n"),
            Err(Error::SyntaxError { line: 1, .. })
        ));
    }

    #[test]
    fn accepts_a_tokenized_line_of_exactly_252_bytes() {
        let line = format!("1 {}\n", "A".repeat(MAX_TOKENIZED_LINE - 1));
        let cas = bas_to_cas(&line).unwrap();
        assert_eq!(body_of(&cas)[0], 0xFF);
    }

    #[test]
    fn rejects_a_tokenized_line_over_252_bytes() {
        let line = format!("1 {}\n", "A".repeat(MAX_TOKENIZED_LINE));
        assert!(matches!(
            bas_to_cas(&line),
            Err(Error::LimitError { kind: LimitErrorKind::TokenizedLine, .. })
        ));
    }

    #[test]
    fn rejects_an_overlong_source_line() {
        let line = format!("1 REM {}\n", "x".repeat(MAX_SOURCE_LINE));
        assert!(matches!(
            bas_to_cas(&line),
            Err(Error::LimitError { kind: LimitErrorKind::SourceLine, .. })
        ));
    }

    #[test]
    fn translates_national_letters() {
        let cas = bas_to_cas("10 REM Éé\n").unwrap();
        assert_eq!(body_of(&cas), [0x08, 0x0A, 0x00, 0xFC, 0x20, 0x01, 0x11, 0xFF, 0x00]);
    }

    #[test]
    fn translates_escapes() {
        assert_eq!(translate("\\\\", 1).unwrap(), [0x5C]);
        assert_eq!(translate("\\x41", 1).unwrap(), [0x41]);
        assert_eq!(translate("\\t20", 1).unwrap(), [0x20]);
        // [0x80, 0xA0) remaps into the national letter band.
        assert_eq!(translate("\\t8a", 1).unwrap(), [0x0A]);
        assert_eq!(translate("\\t9f", 1).unwrap(), [0x1F]);
    }

    #[test]
    fn rejects_out_of_range_tab_escapes() {
        assert!(translate("\\t1f", 1).is_err());
        assert!(translate("\\te0", 1).is_err());
        assert!(translate("\\tzz", 1).is_err());
        assert!(translate("\\q", 1).is_err());
    }

    #[test]
    fn bytes_directive_appends_after_the_terminator() {
        let cas = bas_to_cas("10 END\nBYTES '\\x01\\x02'\n").unwrap();
        assert_eq!(body_of(&cas), [0x05, 0x0A, 0x00, 0xF3, 0xFF, 0x00, 0x01, 0x02]);
        assert_eq!(CasHeader::read(&cas).unwrap().prgsize, 8);
    }

    #[test]
    fn an_empty_bytes_directive_is_a_no_op() {
        let cas = bas_to_cas("BYTES ''\n10 END\n").unwrap();
        assert_eq!(body_of(&cas), [0x05, 0x0A, 0x00, 0xF3, 0xFF, 0x00]);
    }

    #[test]
    fn rejects_a_numbered_line_after_bytes() {
        assert!(matches!(
            bas_to_cas("BYTES '\\x01'\n20 END\n"),
            Err(Error::SyntaxError { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_an_unknown_directive() {
        assert!(matches!(
            bas_to_cas("RUNME\n"),
            Err(Error::SyntaxError { line: 1, .. })
        ));
    }

    #[test]
    fn an_empty_program_is_a_lone_terminator() {
        let cas = bas_to_cas("").unwrap();
        assert_eq!(body_of(&cas), [0x00]);
        assert_eq!(CasHeader::read(&cas).unwrap().prgsize, 1);
    }
}
