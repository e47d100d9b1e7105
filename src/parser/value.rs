use super::document::string_leaf;
use super::*;
use crate::ast::{List, Str, StringKind, Value};

pub(super) fn parse_value(parser: &mut Parser) -> Result<Value> {
    match parser.peek() {
        Token::String { .. } => parse_string_value(parser),
        Token::LBracket => parse_list(parser),
        Token::Newline | Token::Eof => Err(XonError::structural(
            "Missing value after '='",
            parser.position(),
            213,
        )
        .with_hint("Write an empty string as \"\"")),
        other => Err(XonError::structural(
            format!("Expected a value, got {}", other.describe()),
            parser.position(),
            214,
        )),
    }
}

fn parse_string_value(parser: &mut Parser) -> Result<Value> {
    let at = parser.position();
    let leaf = string_leaf(parser.bump()?)
        .ok_or_else(|| XonError::structural("Expected a string", at, 214))?;
    Ok(Value::Str(leaf))
}

/// What sits between the previous list element and the next token.
#[derive(Clone, Copy, PartialEq)]
enum Separator {
    /// Nothing yet: just after `[`.
    Open,
    /// Directly after an element.
    None,
    /// A `,` on the same line as what follows it.
    Comma(Position),
    /// At least one newline, with or without a `,` before it.
    Line,
}

/// An unquoted element with raw internal whitespace reads differently depending
/// on whether `,` or whitespace splits it, so it may not share a line with a
/// comma-separated neighbour.
fn is_ambiguous(value: &Value, raw: Option<&str>) -> bool {
    match (value, raw) {
        (Value::Str(Str { kind: StringKind::Unquoted, .. }), Some(raw)) => {
            raw.contains([' ', '\t'])
        }
        _ => false,
    }
}

fn parse_list(parser: &mut Parser) -> Result<Value> {
    let open = parser.bump()?.position;
    let mut items = Vec::new();
    let mut sep = Separator::Open;
    let mut prev_ambiguous = false;
    // the last ',' not yet followed by an element
    let mut pending_comma = None;

    loop {
        match parser.peek() {
            Token::RBracket => {
                if let Some(comma) = pending_comma {
                    return Err(XonError::structural("Trailing ',' in list", comma, 222)
                        .with_hint("Remove the ',' after the last element"));
                }
                parser.bump()?;
                return Ok(Value::List(List { items, position: open }));
            }
            Token::Newline => {
                parser.bump()?;
                if sep != Separator::Open {
                    sep = Separator::Line;
                }
            }
            Token::Comma => {
                let at = parser.position();
                match sep {
                    Separator::Open => {
                        return Err(XonError::structural("Leading ',' in list", at, 215));
                    }
                    Separator::None => {
                        sep = Separator::Comma(at);
                        pending_comma = Some(at);
                    }
                    Separator::Comma(_) | Separator::Line => {
                        return Err(XonError::structural("Consecutive separators in list", at, 216));
                    }
                }
                parser.bump()?;
            }
            Token::String { .. } | Token::LBracket => {
                let at = parser.position();
                let raw = match parser.peek() {
                    Token::String { raw, .. } => Some(raw.clone()),
                    _ => None,
                };
                let value = parse_value(parser)?;
                let ambiguous = is_ambiguous(&value, raw.as_deref());

                match sep {
                    Separator::None => {
                        return Err(XonError::structural(
                            "List elements on one line must be separated by ','",
                            at,
                            217,
                        )
                        .with_hint("Quote strings that contain whitespace"));
                    }
                    Separator::Comma(comma) if prev_ambiguous || ambiguous => {
                        return Err(XonError::structural(
                            "Ambiguous ',' next to an unquoted string containing whitespace",
                            comma,
                            218,
                        )
                        .with_hint("Quote the element or put each element on its own line"));
                    }
                    _ => {}
                }

                items.push(value);
                prev_ambiguous = ambiguous;
                pending_comma = None;
                sep = Separator::None;
            }
            Token::Eof => {
                return Err(XonError::structural("Unclosed list", open, 219)
                    .with_hint("Add a matching ']'"));
            }
            other => {
                return Err(XonError::structural(
                    format!("Unexpected {} in list", other.describe()),
                    parser.position(),
                    220,
                ));
            }
        }
    }
}
