use std::fmt::Display;

use thiserror::Error;

use crate::ast::Position;

pub type Result<T> = std::result::Result<T, XonError>;

/// The category an error belongs to, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Structural,
    DuplicateKey,
    VersionConflict,
    UnknownKey,
    TypeCoercion,
    MissingField,
    Custom,
    File,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Lex => "LexError",
            ErrorKind::Structural => "StructuralError",
            ErrorKind::DuplicateKey => "DuplicateKeyError",
            ErrorKind::VersionConflict => "VersionConflictError",
            ErrorKind::UnknownKey => "UnknownKeyError",
            ErrorKind::TypeCoercion => "TypeCoercionError",
            ErrorKind::MissingField => "MissingRequiredFieldError",
            ErrorKind::Custom => "CustomError",
            ErrorKind::File => "FileError",
        }
    }
}

/// The main error type for XON scanning, parsing and decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XonError {
    #[error("[XON] Lex Error at {position}: {message}{}", suffix(.hint, .code))]
    Lex {
        message: String,
        position: Position,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Syntax Error at {position}: {message}{}", suffix(.hint, .code))]
    Structural {
        message: String,
        position: Position,
        hint: Option<String>,
        code: Option<u32>,
    },
    /// Raised at the second occurrence of a key.
    #[error("[XON] Duplicate key '{key}' at {position} (first defined at {first}){}", suffix(.hint, .code))]
    DuplicateKey {
        key: String,
        position: Position,
        first: Position,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Version conflict at {position}: [v{second}] used after [v{first}]{}", suffix(.hint, .code))]
    VersionConflict {
        first: u64,
        second: u64,
        position: Position,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Unknown key '{key}'{}{}", at(.position), suffix(.hint, .code))]
    UnknownKey {
        key: String,
        position: Option<Position>,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Type Error{}: cannot decode {literal} as {target}{}{}", at(.position), for_key(.key), suffix(.hint, .code))]
    TypeCoercion {
        key: Option<String>,
        literal: String,
        target: String,
        position: Option<Position>,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Missing required field '{field}'{}{}", at(.position), suffix(.hint, .code))]
    MissingField {
        field: String,
        position: Option<Position>,
        hint: Option<String>,
        code: Option<u32>,
    },
    #[error("[XON] Decode Error{}: {message}{}{}", at(.position), for_key(.key), suffix(&None, .code))]
    Custom {
        message: String,
        key: Option<String>,
        position: Option<Position>,
        code: Option<u32>,
    },
    #[error("[XON] File Error '{path}': {message}{}", suffix(.hint, .code))]
    File {
        message: String,
        path: String,
        hint: Option<String>,
        code: Option<u32>,
    },
}

fn suffix(hint: &Option<String>, code: &Option<u32>) -> String {
    let mut out = String::new();
    if let Some(h) = hint {
        out.push_str(" Hint: ");
        out.push_str(h);
    }
    if let Some(c) = code {
        out.push_str(&format!(" Code: {}", c));
    }
    out
}

fn at(position: &Option<Position>) -> String {
    position.map_or(String::new(), |p| format!(" at {}", p))
}

fn for_key(key: &Option<String>) -> String {
    key.as_ref().map_or(String::new(), |k| format!(" (key '{}')", k))
}

impl XonError {
    pub(crate) fn lex(message: impl Into<String>, position: Position, code: u32) -> Self {
        XonError::Lex { message: message.into(), position, hint: None, code: Some(code) }
    }

    pub(crate) fn structural(message: impl Into<String>, position: Position, code: u32) -> Self {
        XonError::Structural { message: message.into(), position, hint: None, code: Some(code) }
    }

    pub(crate) fn coercion(literal: impl Display, target: impl Into<String>) -> Self {
        XonError::TypeCoercion {
            key: None,
            literal: format!("\"{}\"", literal),
            target: target.into(),
            position: None,
            hint: None,
            code: Some(401),
        }
    }

    /// Attach a hint, replacing any previous one.
    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            XonError::Lex { hint, .. }
            | XonError::Structural { hint, .. }
            | XonError::DuplicateKey { hint, .. }
            | XonError::VersionConflict { hint, .. }
            | XonError::UnknownKey { hint, .. }
            | XonError::TypeCoercion { hint, .. }
            | XonError::MissingField { hint, .. }
            | XonError::File { hint, .. } => *hint = text,
            XonError::Custom { .. } => {}
        }
        self
    }

    /// Fill in the key and position of a decode error if it does not carry them yet.
    pub(crate) fn with_context(mut self, at_key: Option<&str>, at_position: Position) -> Self {
        match &mut self {
            XonError::TypeCoercion { key, position, .. } | XonError::Custom { key, position, .. } => {
                if key.is_none() {
                    *key = at_key.map(String::from);
                }
                if position.is_none() {
                    *position = Some(at_position);
                }
            }
            XonError::UnknownKey { position, .. } | XonError::MissingField { position, .. } => {
                if position.is_none() {
                    *position = Some(at_position);
                }
            }
            _ => {}
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            XonError::Lex { .. } => ErrorKind::Lex,
            XonError::Structural { .. } => ErrorKind::Structural,
            XonError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            XonError::VersionConflict { .. } => ErrorKind::VersionConflict,
            XonError::UnknownKey { .. } => ErrorKind::UnknownKey,
            XonError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            XonError::MissingField { .. } => ErrorKind::MissingField,
            XonError::Custom { .. } => ErrorKind::Custom,
            XonError::File { .. } => ErrorKind::File,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            XonError::Lex { position, .. }
            | XonError::Structural { position, .. }
            | XonError::DuplicateKey { position, .. }
            | XonError::VersionConflict { position, .. } => Some(*position),
            XonError::UnknownKey { position, .. }
            | XonError::TypeCoercion { position, .. }
            | XonError::MissingField { position, .. }
            | XonError::Custom { position, .. } => *position,
            XonError::File { .. } => None,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            XonError::Lex { code, .. }
            | XonError::Structural { code, .. }
            | XonError::DuplicateKey { code, .. }
            | XonError::VersionConflict { code, .. }
            | XonError::UnknownKey { code, .. }
            | XonError::TypeCoercion { code, .. }
            | XonError::MissingField { code, .. }
            | XonError::Custom { code, .. }
            | XonError::File { code, .. } => *code,
        }
    }
}

impl serde::de::Error for XonError {
    fn custom<T: Display>(msg: T) -> Self {
        XonError::Custom { message: msg.to_string(), key: None, position: None, code: Some(400) }
    }

    fn invalid_type(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        XonError::TypeCoercion {
            key: None,
            literal: unexp.to_string(),
            target: exp.to_string(),
            position: None,
            hint: None,
            code: Some(402),
        }
    }

    fn invalid_value(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        XonError::TypeCoercion {
            key: None,
            literal: unexp.to_string(),
            target: exp.to_string(),
            position: None,
            hint: None,
            code: Some(403),
        }
    }

    fn missing_field(field: &'static str) -> Self {
        XonError::MissingField {
            field: field.to_string(),
            position: None,
            hint: Some("Required fields must be present in the block".into()),
            code: Some(404),
        }
    }

    fn unknown_field(field: &str, expected: &'static [&'static str]) -> Self {
        XonError::UnknownKey {
            key: field.to_string(),
            position: None,
            hint: Some(format!("Expected one of: {}", expected.join(", "))),
            code: Some(405),
        }
    }
}
