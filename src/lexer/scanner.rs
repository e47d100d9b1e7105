use std::borrow::Cow;

use super::*;
use crate::error::XonError;

/// Validate raw input and normalize line endings.
///
/// The input must be UTF-8. `\r\n` becomes `\n`; a bare `\r` and every control
/// character other than tab and newline is rejected. Positions reported later
/// refer to the normalized text.
pub fn normalize(input: &[u8]) -> Result<Cow<'_, str>> {
    let text = std::str::from_utf8(input).map_err(|e| {
        let valid = e.valid_up_to();
        XonError::lex("Invalid UTF-8", Position::START.advance(&input[..valid]), 100)
            .with_hint("Use the <|0xNN|> byte escape for bytes that are not UTF-8")
    })?;

    let mut pos = Position::START;
    let mut has_crlf = false;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\r' if matches!(chars.peek(), Some((_, '\n'))) => {
                has_crlf = true;
                // the '\r' disappears from the normalized text
                continue;
            }
            '\r' => {
                return Err(XonError::lex("Bare carriage return", pos, 101)
                    .with_hint("Write a carriage return as <|0x0D|>"));
            }
            '\t' | '\n' => {}
            c if c.is_control() => {
                return Err(XonError::lex(
                    format!("Control character U+{:04X} is not allowed", c as u32),
                    pos,
                    102,
                )
                .with_hint(format!("Write it as a byte escape, e.g. <|0x{:02X}|>", c as u32 & 0xFF)));
            }
            _ => {}
        }
        pos = pos.advance(&input[i..i + c.len_utf8()]);
    }

    if has_crlf {
        Ok(Cow::Owned(text.replace("\r\n", "\n")))
    } else {
        Ok(Cow::Borrowed(text))
    }
}

/// Look `n` bytes ahead without consuming.
pub(super) fn peek_at(lexer: &Lexer, n: usize) -> Option<u8> {
    lexer.src.get(lexer.pos.offset + n).copied()
}

pub(super) fn peek(lexer: &Lexer) -> Option<u8> {
    peek_at(lexer, 0)
}

/// Advance one byte and update line/column tracking.
pub(super) fn bump(lexer: &mut Lexer) -> Option<u8> {
    let curr = peek(lexer)?;
    let offset = lexer.pos.offset;
    lexer.pos = lexer.pos.advance(&lexer.src[offset..offset + 1]);
    Some(curr)
}

/// Advance to an absolute byte offset.
pub(super) fn bump_to(lexer: &mut Lexer, offset: usize) {
    let from = lexer.pos.offset;
    if offset > from {
        lexer.pos = lexer.pos.advance(&lexer.src[from..offset]);
    }
}

pub(super) fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Skip spaces and tabs. Newlines are tokens.
pub(super) fn skip_whitespace(lexer: &mut Lexer) {
    while peek(lexer).is_some_and(is_space) {
        bump(lexer);
    }
}

/// Count of spaces and tabs starting at the current position.
pub(super) fn whitespace_run(lexer: &Lexer) -> usize {
    lexer.src[lexer.pos.offset..]
        .iter()
        .take_while(|b| is_space(**b))
        .count()
}

/// Whether the byte before the current position is whitespace, a newline, or the
/// start of input.
pub(super) fn preceded_by_space(lexer: &Lexer) -> bool {
    match lexer.pos.offset.checked_sub(1) {
        None => true,
        Some(prev) => matches!(lexer.src[prev], b' ' | b'\t' | b'\n'),
    }
}

/// The source text between two byte offsets. Both must fall on character
/// boundaries.
pub(super) fn slice<'a>(lexer: &Lexer<'a>, from: usize, to: usize) -> Result<&'a str> {
    let src: &'a [u8] = lexer.src;
    std::str::from_utf8(&src[from..to]).map_err(|_| {
        XonError::lex("Token boundary splits a UTF-8 sequence", lexer.pos, 120)
    })
}
