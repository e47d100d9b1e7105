use serde::de::DeserializeOwned;

use super::*;
use crate::ast::{Block, Node, Position, Value};
use crate::decode::de::{from_blocks, from_value};

/// What a dotted path points at.
enum Target<'a> {
    Root(&'a Document),
    Value(&'a Value),
    Blocks(Vec<&'a Block>),
}

impl XonConfig {
    /// Get a typed value using dot notation. The empty path is the whole file.
    ///
    /// # Examples
    /// ```
    /// # use xon::XonConfig;
    /// let config = XonConfig::from_str("server {\n  host = localhost\n  port = 8080\n}\n")?;
    /// let host: String = config.get("server.host")?;
    /// let port: u16 = config.get("server.port")?;
    /// assert_eq!((host.as_str(), port), ("localhost", 8080));
    /// # Ok::<(), xon::XonError>(())
    /// ```
    ///
    /// # Errors
    /// Returns an error if the path does not exist or the value can't be decoded as `T`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (target, position) = self.resolve(path)?;
        let options = DecodeOptions::loose();
        let decoded = match target {
            Target::Root(document) => from_document(document, options),
            Target::Value(value) => from_value(value, options),
            Target::Blocks(blocks) => from_blocks(blocks, options),
        };
        decoded.map_err(|e| e.with_context(Some(path), position))
    }

    /// Like [`XonConfig::get`], but an absent key or an unquoted `nil` is `None`.
    pub fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get::<Option<T>>(path) {
            Err(XonError::MissingField { code: Some(304), .. }) => Ok(None),
            other => other,
        }
    }

    /// Get a value, falling back to `default` when it is absent or doesn't decode.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    pub fn has(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Distinct keys directly inside the block at `path`, in source order.
    pub fn keys(&self, path: &str) -> Result<Vec<String>> {
        let (target, position) = self.resolve(path)?;
        let children: &[Node] = match target {
            Target::Root(document) => &document.nodes,
            Target::Blocks(blocks) if blocks.len() == 1 => {
                let block: &Block = blocks[0];
                &block.children
            }
            _ => {
                return Err(XonError::Custom {
                    message: "Path does not name a single block".into(),
                    key: Some(path.to_string()),
                    position: Some(position),
                    code: Some(306),
                });
            }
        };

        let mut keys: Vec<String> = Vec::new();
        for node in children {
            let key = node.key().display();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn resolve(&self, path: &str) -> Result<(Target<'_>, Position)> {
        let path = path.trim();
        if path.is_empty() {
            return Ok((Target::Root(&self.unversioned), Position::START));
        }

        let mut children: &[Node] = &self.unversioned.nodes;
        let mut position = Position::START;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let matches: Vec<&Node> = children.iter().filter(|n| n.key().value == segment).collect();
            let last = segments.peek().is_none();

            match matches.as_slice() {
                [] => return Err(missing(path, segment, position)),
                [Node::Pair(pair)] if last => return Ok((Target::Value(&pair.value), pair.value.position())),
                [Node::Pair(pair)] => {
                    return Err(XonError::Custom {
                        message: format!("'{}' is a value, not a block", segment),
                        key: Some(path.to_string()),
                        position: Some(pair.key.position),
                        code: Some(305),
                    });
                }
                found => {
                    let blocks: Vec<&Block> = found
                        .iter()
                        .filter_map(|n| match *n {
                            Node::Block(block) => Some(block),
                            Node::Pair(_) => None,
                        })
                        .collect();
                    let Some(first) = blocks.first().copied() else {
                        return Err(missing(path, segment, position));
                    };
                    position = first.position();
                    if last {
                        return Ok((Target::Blocks(blocks), position));
                    }
                    if blocks.len() > 1 {
                        return Err(XonError::Custom {
                            message: format!("'{}' names {} blocks", segment, blocks.len()),
                            key: Some(path.to_string()),
                            position: Some(position),
                            code: Some(305),
                        });
                    }
                    children = &first.children;
                }
            }
        }

        Ok((Target::Root(&self.unversioned), position))
    }
}

fn missing(path: &str, segment: &str, position: Position) -> XonError {
    XonError::MissingField {
        field: path.to_string(),
        position: Some(position),
        hint: Some(format!("No key '{}' at this level", segment)),
        code: Some(304),
    }
}
