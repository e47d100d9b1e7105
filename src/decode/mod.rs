//! Projecting a [`Document`] onto a caller-supplied serde schema.
//!
//! Every leaf is a string in the document; a leaf becomes a typed value only
//! when the schema asks for one, using the grammars in [`conversion`].

use serde::Deserialize;

use crate::ast::Document;
use crate::error::Result;

pub mod conversion;
pub(crate) mod de;

pub use de::BlockDeserializer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject keys that the target struct does not declare.
    pub strict: bool,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        DecodeOptions { strict: true }
    }

    pub fn loose() -> Self {
        DecodeOptions { strict: false }
    }
}

/// Decode a document into `T`.
///
/// Versioned blocks still present in `document` are skipped; run
/// [`crate::merge::merge`] first to fold them in.
pub fn from_document<'de, T>(document: &'de Document, options: DecodeOptions) -> Result<T>
where
    T: Deserialize<'de>,
{
    T::deserialize(BlockDeserializer::document(document, options))
}
