//! Byte-escapes and multiline indentation stripping.
//!
//! `<|0xNN|>` stands for the single byte `0xNN` inside any kind of string. There
//! is no other escape mechanism. A literal `<|0x` is written by escaping its
//! leading `<`, i.e. `<|0x3C|>|0x`.

use bstr::{BString, ByteSlice};

use crate::ast::Position;
use crate::error::{Result, XonError};

const ESCAPE_OPEN: &[u8] = b"<|0x";
const ESCAPE_LEN: usize = 8;
const TAB_WIDTH: usize = 4;

/// Resolve byte-escapes in `raw`. Error positions are relative to the start of `raw`.
///
/// ```
/// let bytes = xon::unescape("<|0x0D|><|0x0A|>").unwrap();
/// assert_eq!(bytes, b"\r\n".as_slice());
/// ```
pub fn unescape(raw: &str) -> Result<BString> {
    unescape_at(raw, Position::START)
}

pub(crate) fn unescape_at(raw: &str, origin: Position) -> Result<BString> {
    let bytes = raw.as_bytes();
    if bytes.find(ESCAPE_OPEN).is_none() {
        return Ok(BString::from(raw));
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut rest = 0;
    while let Some(idx) = bytes[rest..].find(ESCAPE_OPEN) {
        let at = rest + idx;
        out.extend_from_slice(&bytes[rest..at]);
        match decode_escape(&bytes[at..]) {
            Some(byte) => {
                out.push(byte);
                rest = at + ESCAPE_LEN;
            }
            None => {
                return Err(XonError::lex(
                    "Malformed byte escape",
                    origin.advance(&bytes[..at]),
                    119,
                )
                .with_hint("Byte escapes take the form <|0xNN|>; write a literal '<|0x' as <|0x3C|>|0x"));
            }
        }
    }
    out.extend_from_slice(&bytes[rest..]);
    Ok(BString::from(out))
}

/// Report the offset of the first malformed escape without building the result.
pub(crate) fn check_escapes(raw: &str, origin: Position) -> Result<()> {
    let bytes = raw.as_bytes();
    let mut rest = 0;
    while let Some(idx) = bytes[rest..].find(ESCAPE_OPEN) {
        let at = rest + idx;
        if decode_escape(&bytes[at..]).is_none() {
            return unescape_at(raw, origin).map(|_| ());
        }
        rest = at + ESCAPE_LEN;
    }
    Ok(())
}

fn decode_escape(seq: &[u8]) -> Option<u8> {
    if seq.len() < ESCAPE_LEN || &seq[6..8] != b"|>" {
        return None;
    }
    let hi = (seq[4] as char).to_digit(16)?;
    let lo = (seq[5] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Render bytes as text that can sit between double quotes and unescape back to
/// the same bytes.
///
/// Control bytes other than tab, `"` and invalid UTF-8 become `<|0xNN|>` with
/// uppercase hex digits.
pub fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        let valid = chunk.valid();
        for (i, c) in valid.char_indices() {
            if c == '<' && valid[i..].as_bytes().starts_with(ESCAPE_OPEN) {
                push_escape(&mut out, b'<');
            } else if c == '"' || (c.is_control() && c != '\t') {
                let mut buf = [0u8; 4];
                for &b in c.encode_utf8(&mut buf).as_bytes() {
                    push_escape(&mut out, b);
                }
            } else {
                out.push(c);
            }
        }
        for &b in chunk.invalid() {
            push_escape(&mut out, b);
        }
    }
    out
}

fn push_escape(out: &mut String, byte: u8) {
    out.push_str(&format!("<|0x{:02X}|>", byte));
}

/// Apply multiline-string rules to the text between the backtick runs.
///
/// Whitespace plus one newline after the opening run and one newline plus
/// whitespace before the closing run are dropped. The indentation of the first
/// non-blank line is the baseline and is removed from every non-blank line;
/// blank lines come out empty.
pub fn strip_indentation(content: &str) -> Result<String> {
    strip_indentation_at(content, Position::START)
}

pub(crate) fn strip_indentation_at(content: &str, origin: Position) -> Result<String> {
    let after_ws = content.trim_start_matches([' ', '\t']);
    let lead = content.len() - after_ws.len();
    let start = if after_ws.starts_with('\n') { lead + 1 } else { lead };

    let body = &content[start..];
    let body = body.trim_end_matches([' ', '\t']);
    let body = body.strip_suffix('\n').unwrap_or(body);

    let base = body
        .split('\n')
        .find(|line| !is_blank(line))
        .map(indent_width)
        .unwrap_or(0);

    let mut out = String::with_capacity(body.len());
    let mut offset = start;
    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !is_blank(line) {
            if indent_width(line) < base {
                return Err(XonError::lex(
                    "Indentation below baseline",
                    origin.advance(&content.as_bytes()[..offset]),
                    115,
                )
                .with_hint(format!(
                    "The first line of this string is indented {} columns; later lines need at least as much",
                    base
                )));
            }
            strip_width(&mut out, line, base);
        }
        offset += line.len() + 1;
    }
    Ok(out)
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn strip_width(out: &mut String, line: &str, base: usize) {
    let mut width = 0;
    let mut idx = 0;
    for (i, c) in line.char_indices() {
        if width >= base {
            idx = i;
            break;
        }
        width += if c == '\t' { TAB_WIDTH } else { 1 };
        idx = i + c.len_utf8();
    }
    // a tab that straddles the baseline leaves its excess as spaces
    for _ in base..width {
        out.push(' ');
    }
    out.push_str(&line[idx..]);
}
