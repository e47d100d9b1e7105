use crate::ast::{Comment, Document, Position};
use crate::error::{Result, XonError};
use crate::lexer::{Lexeme, Lexer, Token};

mod document;
mod value;

/// Recursive-descent parser with one token of lookahead.
///
/// Comments never reach the grammar rules: `bump` moves them aside into
/// [`Document::comments`].
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peek: Lexeme,
    comments: Vec<Comment>,
}

impl<'a> Parser<'a> {
    /// `input` must already be normalized (see [`crate::lexer::normalize`]).
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let mut comments = Vec::new();
        let peek = next_significant(&mut lexer, &mut comments)?;
        Ok(Self { lexer, peek, comments })
    }

    pub(crate) fn bump(&mut self) -> Result<Lexeme> {
        let next = if self.peek.token == Token::Eof {
            self.peek.clone()
        } else {
            next_significant(&mut self.lexer, &mut self.comments)?
        };
        Ok(std::mem::replace(&mut self.peek, next))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.peek.token
    }

    pub(crate) fn position(&self) -> Position {
        self.peek.position
    }

    pub(crate) fn expect(&mut self, expected: Token, code: u32) -> Result<Lexeme> {
        if *self.peek() != expected {
            return Err(XonError::structural(
                format!("Expected {}, got {}", expected.describe(), self.peek().describe()),
                self.position(),
                code,
            ));
        }
        self.bump()
    }

    pub fn parse_document(mut self) -> Result<Document> {
        let nodes = document::parse_document(&mut self)?;
        Ok(Document { nodes, comments: self.comments })
    }
}

fn next_significant(lexer: &mut Lexer, comments: &mut Vec<Comment>) -> Result<Lexeme> {
    loop {
        let lexeme = lexer.next_token()?;
        match lexeme.token {
            Token::Comment(text) => comments.push(Comment { text, position: lexeme.position }),
            _ => return Ok(lexeme),
        }
    }
}

#[cfg(test)]
mod tests;
