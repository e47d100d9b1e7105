pub mod ast;
pub mod error;
pub mod export;
pub mod lexer;
pub mod parser;
pub mod unescape;
pub mod merge;
pub mod decode;
pub mod temporal;
pub mod config;

use serde::de::DeserializeOwned;

pub use ast::{Block, Comment, Document, List, Node, Pair, Position, Str, StringKind, Value};
pub use config::XonConfig;
pub use decode::{DecodeOptions, from_document};
pub use error::{ErrorKind, Result, XonError};
pub use merge::{VersionSelector, merge};
pub use temporal::{Datetime, Duration};
pub use unescape::{escape, unescape};

/// Scan and parse `input` into a document. Versioned blocks are kept as they are.
pub fn parse(input: &[u8]) -> Result<Document> {
    let source = lexer::normalize(input)?;
    parser::Parser::new(&source)?.parse_document()
}

/// Decode `input` into `T`, ignoring versioned blocks. Unknown keys are allowed.
pub fn decode<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    let document = merge(&parse(input)?, VersionSelector::Unversioned)?;
    from_document(&document, DecodeOptions::loose())
}

/// Decode `input` into `T` with every `[vN]` block up to `version` merged in.
/// Unknown keys are rejected.
pub fn decode_version<T: DeserializeOwned>(input: &[u8], version: u64) -> Result<T> {
    let document = merge(&parse(input)?, VersionSelector::UpTo(version))?;
    from_document(&document, DecodeOptions::strict())
}
