use super::*;
use super::scanner::{
    bump, bump_to, is_space, peek, peek_at, preceded_by_space, skip_whitespace, slice,
    whitespace_run,
};
use crate::error::XonError;
use crate::unescape::{check_escapes, strip_indentation_at, unescape_at};

pub(super) fn next_token(lexer: &mut Lexer) -> Result<Lexeme> {
    skip_whitespace(lexer);

    let position = lexer.pos;
    let spaced = preceded_by_space(lexer);

    let token = match peek(lexer) {
        None => Token::Eof,
        Some(b'\n') => tokenize_symbol(lexer, Token::Newline),
        Some(b'/') if peek_at(lexer, 1) == Some(b'/') && spaced => tokenize_comment(lexer)?,
        Some(b'=') => tokenize_equals(lexer, spaced)?,
        Some(b'{') => tokenize_lbrace(lexer, spaced)?,
        Some(b'}') => tokenize_symbol(lexer, Token::RBrace),
        Some(b'[') => {
            lexer.list_depth += 1;
            tokenize_symbol(lexer, Token::LBracket)
        }
        Some(b']') => {
            lexer.list_depth = lexer.list_depth.saturating_sub(1);
            tokenize_symbol(lexer, Token::RBracket)
        }
        Some(b',') => tokenize_comma(lexer, spaced)?,
        Some(b'"') => tokenize_quoted(lexer)?,
        Some(b'`') => tokenize_multiline(lexer)?,
        Some(_) => tokenize_unquoted(lexer)?,
    };

    Ok(Lexeme { token, position })
}

fn tokenize_symbol(lexer: &mut Lexer, token: Token) -> Token {
    bump(lexer);
    token
}

fn tokenize_comment(lexer: &mut Lexer) -> Result<Token> {
    bump(lexer);
    bump(lexer);
    let start = lexer.pos.offset;
    while peek(lexer).is_some_and(|b| b != b'\n') {
        bump(lexer);
    }
    Ok(Token::Comment(slice(lexer, start, lexer.pos.offset)?.to_string()))
}

fn tokenize_equals(lexer: &mut Lexer, spaced: bool) -> Result<Token> {
    let position = lexer.pos;
    if !spaced {
        return Err(XonError::structural("'=' must be preceded by whitespace", position, 105)
            .with_hint("Write pairs as `key = value`"));
    }
    bump(lexer);
    if !peek(lexer).is_some_and(is_space) {
        return Err(XonError::structural("'=' must be followed by whitespace", position, 106)
            .with_hint("Write pairs as `key = value`"));
    }
    Ok(Token::Equals)
}

fn tokenize_lbrace(lexer: &mut Lexer, spaced: bool) -> Result<Token> {
    let position = lexer.pos;
    if !spaced {
        return Err(XonError::structural("'{' must be preceded by whitespace", position, 107)
            .with_hint("Write blocks as `name {`"));
    }
    bump(lexer);
    if peek(lexer) == Some(b'}') {
        return Ok(Token::LBrace);
    }
    let ws = whitespace_run(lexer);
    let ok = match peek_at(lexer, ws) {
        None | Some(b'\n') => true,
        Some(b'/') => ws > 0 && peek_at(lexer, ws + 1) == Some(b'/'),
        _ => false,
    };
    if !ok {
        return Err(XonError::structural("'{' must be followed by a newline", position, 108)
            .with_hint("Start block contents on the next line, or write `{}` for an empty block"));
    }
    Ok(Token::LBrace)
}

fn tokenize_comma(lexer: &mut Lexer, spaced: bool) -> Result<Token> {
    let position = lexer.pos;
    if lexer.list_depth == 0 {
        return Err(XonError::structural("Unexpected ','", position, 109)
            .with_hint("Strings containing ', ' outside a list must be quoted"));
    }
    if spaced {
        return Err(XonError::structural(
            "',' must not be preceded by whitespace or a newline",
            position,
            110,
        ));
    }
    bump(lexer);
    // a ',' directly before ']' is left for the parser to report as trailing
    match peek(lexer) {
        None | Some(b'\n') | Some(b' ') | Some(b'\t') | Some(b']') => Ok(Token::Comma),
        Some(_) => Err(XonError::structural(
            "',' must be followed by whitespace or a newline",
            position,
            111,
        )
        .with_hint("Quote list elements that contain ','")),
    }
}

fn tokenize_quoted(lexer: &mut Lexer) -> Result<Token> {
    let open = lexer.pos;
    bump(lexer);
    let content_pos = lexer.pos;
    loop {
        match peek(lexer) {
            Some(b'"') => break,
            None | Some(b'\n') => {
                return Err(XonError::lex("Unterminated quoted string", open, 112)
                    .with_hint("Quoted strings end on the same line; use backticks for multiline text"));
            }
            Some(_) => {
                bump(lexer);
            }
        }
    }
    let raw = slice(lexer, content_pos.offset, lexer.pos.offset)?;
    bump(lexer);
    let value = unescape_at(raw, content_pos)?;
    expect_string_end(lexer)?;
    Ok(Token::String { raw: raw.to_string(), kind: StringKind::Quoted, value })
}

fn tokenize_multiline(lexer: &mut Lexer) -> Result<Token> {
    let open = lexer.pos;
    let run = backtick_run(lexer.src, open.offset);
    bump_to(lexer, open.offset + run);

    if run % 2 == 0 {
        expect_string_end(lexer)?;
        return Ok(Token::String {
            raw: String::new(),
            kind: StringKind::Multiline,
            value: BString::from(""),
        });
    }

    let content_pos = lexer.pos;
    let close = find_closing_run(lexer.src, content_pos.offset, run).ok_or_else(|| {
        XonError::lex("Unterminated multiline string", open, 114)
            .with_hint(format!("Close the string with a run of exactly {} backtick(s)", run))
    })?;
    let raw = slice(lexer, content_pos.offset, close)?;
    check_escapes(raw, content_pos)?;
    let stripped = strip_indentation_at(raw, content_pos)?;
    let value = unescape_at(&stripped, content_pos)?;

    bump_to(lexer, close + run);
    expect_string_end(lexer)?;
    Ok(Token::String { raw: raw.to_string(), kind: StringKind::Multiline, value })
}

fn backtick_run(src: &[u8], from: usize) -> usize {
    src[from..].iter().take_while(|b| **b == b'`').count()
}

fn find_closing_run(src: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < src.len() {
        if src[i] == b'`' {
            let run = backtick_run(src, i);
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

/// After a quoted or multiline string only whitespace, a newline, or (inside a
/// list) `,` / `]` may follow. `=` and `{` are let through so their own
/// whitespace rule reports the problem.
fn expect_string_end(lexer: &Lexer) -> Result<()> {
    match peek(lexer) {
        None | Some(b'\n') | Some(b' ') | Some(b'\t') | Some(b'=') | Some(b'{') => Ok(()),
        Some(b',') | Some(b']') if lexer.list_depth > 0 => Ok(()),
        Some(other) => Err(XonError::lex(
            format!("Unexpected character '{}' after string", other as char),
            lexer.pos,
            113,
        )
        .with_hint("Separate strings from what follows with whitespace")),
    }
}

/// Whether the bytes at `at` begin a structural element that ends an unquoted
/// string when preceded by whitespace.
fn starts_meta(lexer: &Lexer, at: usize) -> bool {
    match peek_at(lexer, at) {
        None | Some(b'\n') => true,
        Some(b'=') | Some(b'{') | Some(b'}') | Some(b'[') | Some(b']') => true,
        Some(b'/') => peek_at(lexer, at + 1) == Some(b'/'),
        Some(b',') => lexer.list_depth > 0,
        _ => false,
    }
}

fn tokenize_unquoted(lexer: &mut Lexer) -> Result<Token> {
    let start = lexer.pos;
    let in_list = lexer.list_depth > 0;

    loop {
        match peek(lexer) {
            None | Some(b'\n') => break,
            Some(b' ') | Some(b'\t') => {
                let ws = whitespace_run(lexer);
                if starts_meta(lexer, ws) {
                    break;
                }
                let to = lexer.pos.offset + ws;
                bump_to(lexer, to);
            }
            Some(b']') | Some(b',') if in_list => break,
            Some(_) => {
                bump(lexer);
            }
        }
    }

    let raw = slice(lexer, start.offset, lexer.pos.offset)?;
    if raw.starts_with("//") {
        return Err(quote_required(raw, "start with '//'", start, 116));
    }
    if raw.ends_with(',') {
        return Err(quote_required(raw, "end with ','", start, 117));
    }
    if raw.ends_with(']') {
        return Err(quote_required(raw, "end with ']'", start, 118));
    }

    let value = unescape_at(raw, start)?;
    Ok(Token::String { raw: raw.to_string(), kind: StringKind::Unquoted, value })
}

fn quote_required(raw: &str, why: &str, position: Position, code: u32) -> XonError {
    XonError::lex(format!("Strings that {} must be quoted", why), position, code)
        .with_hint(format!("Write \"{}\" instead", raw))
}
