// Author: Dustin Pilgrim
// License: MIT

use bstr::BString;

use crate::ast::{Position, StringKind};
use crate::error::Result;

mod scanner;
mod tokenizer;

pub use scanner::normalize;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- literals ---
    /// `raw` is the source text of the string body; `value` has escapes resolved
    /// and, for multiline strings, indentation stripped.
    String {
        raw: String,
        kind: StringKind,
        value: BString,
    },

    // --- structure ---
    Equals,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,

    // --- layout ---
    Comment(String),
    Newline,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::String { raw, .. } => format!("string '{}'", raw),
            Token::Equals => "'='".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Comma => "','".into(),
            Token::Comment(_) => "comment".into(),
            Token::Newline => "newline".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

/// A token together with the position of its first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub position: Position,
}

/// Pull lexer over normalized source text (see [`normalize`]).
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: Position,
    /// Open `[` count; commas and `]` only delimit strings inside lists.
    list_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            src: source.as_bytes(),
            pos: Position::START,
            list_depth: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn line(&self) -> usize {
        self.pos.line
    }

    pub fn column(&self) -> usize {
        self.pos.column
    }

    pub fn next_token(&mut self) -> Result<Lexeme> {
        tokenizer::next_token(self)
    }
}

/// Scan a whole input into a materialized token sequence ending with `Eof`.
pub fn scan(input: &[u8]) -> Result<Vec<Lexeme>> {
    let source = normalize(input)?;
    let mut lexer = Lexer::new(&source);
    let mut tokens = Vec::new();
    loop {
        let lexeme = lexer.next_token()?;
        let done = lexeme.token == Token::Eof;
        tokens.push(lexeme);
        if done {
            return Ok(tokens);
        }
    }
}
