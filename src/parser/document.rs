use bstr::BString;
use indexmap::IndexMap;
use indexmap::map::Entry;

use super::*;
use crate::ast::{Block, Node, Pair, Str, StringKind};

/// What a key is bound to within one block.
#[derive(Clone, Copy, PartialEq)]
enum Binding {
    Pair,
    Block,
}

/// Ordered key set for one block's direct children. Dropped at block end.
#[derive(Default)]
struct KeySet {
    keys: IndexMap<BString, (Position, Binding)>,
}

impl KeySet {
    /// Pairs must be unique and may not share a key with a block. Repeated
    /// blocks of the same name are allowed.
    fn register(&mut self, key: &Str, binding: Binding) -> Result<()> {
        match self.keys.entry(key.value.clone()) {
            Entry::Vacant(slot) => {
                slot.insert((key.position, binding));
                Ok(())
            }
            Entry::Occupied(slot) => {
                let (first, existing) = *slot.get();
                if existing == Binding::Block && binding == Binding::Block {
                    return Ok(());
                }
                Err(duplicate(key, first))
            }
        }
    }
}

pub(crate) fn duplicate(key: &Str, first: Position) -> XonError {
    XonError::DuplicateKey {
        key: key.display(),
        position: key.position,
        first,
        hint: Some("Each key may appear only once per block".into()),
        code: Some(221),
    }
}

pub(super) fn parse_document(parser: &mut Parser) -> Result<Vec<Node>> {
    let nodes = parse_entries(parser, None, false)?;
    parser.expect(Token::Eof, 205)?;
    Ok(nodes)
}

/// Parse entries until the `}` closing the block opened at `open`, or until end
/// of input for the top level. The closing brace is left for the caller.
fn parse_entries(parser: &mut Parser, open: Option<Position>, in_version: bool) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut keys = KeySet::default();

    loop {
        match parser.peek() {
            Token::Newline => {
                parser.bump()?;
                continue;
            }
            Token::Eof => match open {
                Some(at) => {
                    return Err(XonError::structural("Unclosed block", at, 203)
                        .with_hint("Add a matching '}'"));
                }
                None => return Ok(nodes),
            },
            Token::RBrace => match open {
                Some(_) => return Ok(nodes),
                None => {
                    return Err(XonError::structural("Unmatched '}'", parser.position(), 202));
                }
            },
            Token::LBrace => {
                return Err(XonError::structural("Unnamed block", parser.position(), 201)
                    .with_hint("Blocks need a name: `name {`"));
            }
            Token::LBracket => {
                if in_version {
                    return Err(XonError::structural(
                        "Versioned blocks cannot be nested",
                        parser.position(),
                        207,
                    ));
                }
                nodes.push(Node::Block(parse_version_block(parser)?));
            }
            Token::String { .. } => {
                let node = parse_keyed(parser, in_version)?;
                let binding = match node {
                    Node::Pair(_) => Binding::Pair,
                    Node::Block(_) => Binding::Block,
                };
                keys.register(node.key(), binding)?;
                nodes.push(node);
            }
            Token::Equals => {
                return Err(XonError::structural("Missing key before '='", parser.position(), 204));
            }
            other => {
                return Err(XonError::structural(
                    format!("Unexpected {}", other.describe()),
                    parser.position(),
                    205,
                ));
            }
        }
        expect_line_end(parser)?;
    }
}

fn expect_line_end(parser: &mut Parser) -> Result<()> {
    match parser.peek() {
        Token::Newline | Token::Eof => Ok(()),
        other => Err(XonError::structural(
            format!("Expected a newline, got {}", other.describe()),
            parser.position(),
            206,
        )
        .with_hint("Each pair and block ends its line")),
    }
}

pub(super) fn string_leaf(lexeme: Lexeme) -> Option<Str> {
    match lexeme.token {
        Token::String { kind, value, .. } => Some(Str { value, kind, position: lexeme.position }),
        _ => None,
    }
}

fn parse_keyed(parser: &mut Parser, in_version: bool) -> Result<Node> {
    let lexeme = parser.bump()?;
    let raw = match &lexeme.token {
        Token::String { raw, .. } => raw.clone(),
        _ => String::new(),
    };
    let key = string_leaf(lexeme)
        .ok_or_else(|| XonError::structural("Expected a key", parser.position(), 205))?;

    match parser.peek() {
        Token::Equals => {
            parser.bump()?;
            let value = value::parse_value(parser)?;
            Ok(Node::Pair(Pair { key, value }))
        }
        Token::LBrace => {
            parser.bump()?;
            let children = parse_entries(parser, Some(key.position), in_version)?;
            parser.expect(Token::RBrace, 203)?;
            Ok(Node::Block(Block { name: key, version: None, children }))
        }
        _ => {
            let err = XonError::structural(
                format!("Expected '=' or '{{' after '{}'", key.display()),
                key.position,
                208,
            );
            if key.kind == StringKind::Unquoted && raw.contains('=') {
                Err(err.with_hint("'=' needs whitespace on both sides: `key = value`"))
            } else {
                Err(err)
            }
        }
    }
}

/// `[vN] { ... }`
fn parse_version_block(parser: &mut Parser) -> Result<Block> {
    let open = parser.bump()?.position;
    let marker = parser.bump()?;
    let name = string_leaf(marker)
        .filter(|s| s.kind == StringKind::Unquoted)
        .filter(|s| s.position.offset == open.offset + 1)
        .ok_or_else(|| bad_marker(open))?;

    let digits = name
        .to_str()
        .and_then(|s| s.strip_prefix('v'))
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| bad_marker(open))?;
    let version = digits
        .parse::<u64>()
        .ok()
        .filter(|v| *v <= i64::MAX as u64)
        .ok_or_else(|| {
            XonError::structural(format!("Version {} is out of range", digits), name.position, 210)
                .with_hint(format!("Versions range from 0 to {}", i64::MAX))
        })?;

    // `]` must follow the digits directly
    let marker_end = name.position.offset + 1 + digits.len();
    if *parser.peek() == Token::RBracket && parser.position().offset != marker_end {
        return Err(bad_marker(open));
    }
    parser.expect(Token::RBracket, 211)?;
    parser.expect(Token::LBrace, 212)?;
    let children = parse_entries(parser, Some(open), true)?;
    parser.expect(Token::RBrace, 203)?;

    let name = Str { position: open, ..name };
    Ok(Block { name, version: Some(version), children })
}

fn bad_marker(at: Position) -> XonError {
    XonError::structural("Expected a version marker", at, 209)
        .with_hint("Versioned blocks are written `[vN] {` with a non-negative integer N")
}
