use std::fmt;

use bstr::{BString, ByteSlice};

/// A location in the normalized source: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { offset: 0, line: 1, column: 1 };

    /// The position reached after reading `bytes` starting from `self`.
    pub fn advance(self, bytes: &[u8]) -> Position {
        let mut pos = self;
        for &b in bytes {
            pos.offset += 1;
            if b == b'\n' {
                pos.line += 1;
                pos.column = 1;
            } else if b & 0xC0 != 0x80 {
                pos.column += 1;
            }
        }
        pos
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Unquoted,
    Quoted,
    Multiline,
}

/// A string leaf after unescaping. The bytes are not guaranteed to be UTF-8
/// when the source used byte-escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    pub value: BString,
    pub kind: StringKind,
    pub position: Position,
}

impl Str {
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_slice()
    }

    pub fn to_str(&self) -> Option<&str> {
        self.value.to_str().ok()
    }

    /// The unquoted literal `nil`, which optional targets read as absent.
    pub fn is_nil(&self) -> bool {
        self.kind == StringKind::Unquoted && self.value == "nil"
    }

    /// Lossy rendering used in error messages.
    pub fn display(&self) -> String {
        self.value.to_str_lossy().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(Str),
    List(List),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub items: Vec<Value>,
    pub position: Position,
}

impl Value {
    pub fn position(&self) -> Position {
        match self {
            Value::Str(s) => s.position,
            Value::List(list) => list.position,
        }
    }

    pub fn as_str(&self) -> Option<&Str> {
        match self {
            Value::Str(s) => Some(s),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(&list.items),
            Value::Str(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: Str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: Str,
    /// `Some(n)` for a `[vN]` sub-block.
    pub version: Option<u64>,
    pub children: Vec<Node>,
}

impl Block {
    pub fn position(&self) -> Position {
        self.name.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Pair(Pair),
    Block(Block),
}

impl Node {
    /// The key a node is addressed by within its parent block.
    pub fn key(&self) -> &Str {
        match self {
            Node::Pair(pair) => &pair.key,
            Node::Block(block) => &block.name,
        }
    }

    pub fn position(&self) -> Position {
        self.key().position
    }
}

/// A `//` comment. The text excludes the leading slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub position: Position,
}

/// The implicit top-level block of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub comments: Vec<Comment>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First direct pair with the given key.
    pub fn pair(&self, key: &str) -> Option<&Pair> {
        self.nodes.iter().find_map(|node| match node {
            Node::Pair(pair) if pair.key.value == key => Some(pair),
            _ => None,
        })
    }

    /// Direct blocks with the given name, in source order.
    pub fn blocks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.nodes.iter().filter_map(move |node| match node {
            Node::Block(block) if block.name.value == name => Some(block),
            _ => None,
        })
    }
}
