// Author: Dustin Pilgrim
// License: MIT

use std::path::Path;

use serde_json::json;

use crate::ast::{Document, Node, Str, Value};
use crate::config::XonConfig;
use crate::error::{Result, XonError};

/// Export a XON document to JSON.
///
/// The document is not interpreted; the output mirrors the tree as parsed:
/// - Pairs → `{"key": k, "value": v}`
/// - Strings → JSON strings, or `{"bytes": [..]}` when they are not UTF-8
/// - Lists → arrays
/// - Blocks → `{"block": name, "children": [..]}`, plus `"version"` for `[vN]` blocks
///
/// Entries stay in an array so source order and repeated blocks survive.
///
/// # Examples
/// ```
/// let doc = xon::parse(b"server {\n  port = 8080\n}\n")?;
/// let json = xon::export::export_document(&doc)?;
/// assert!(json.contains("\"block\": \"server\""));
/// # Ok::<(), xon::XonError>(())
/// ```
pub fn export_document(doc: &Document) -> Result<String> {
    serde_json::to_string_pretty(&document_to_json(doc)).map_err(|e| XonError::Custom {
        message: format!("Failed to serialize JSON: {}", e),
        key: None,
        position: None,
        code: Some(500),
    })
}

pub fn document_to_json(doc: &Document) -> serde_json::Value {
    serde_json::Value::Array(doc.nodes.iter().map(node_to_json).collect())
}

pub fn node_to_json(node: &Node) -> serde_json::Value {
    match node {
        Node::Pair(pair) => json!({
            "key": str_to_json(&pair.key),
            "value": value_to_json(&pair.value),
        }),
        Node::Block(block) => {
            let mut out = json!({
                "block": str_to_json(&block.name),
                "children": block.children.iter().map(node_to_json).collect::<Vec<_>>(),
            });
            if let Some(version) = block.version {
                out["version"] = json!(version);
            }
            out
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Str(s) => str_to_json(s),
        Value::List(list) => json!(list.items.iter().map(value_to_json).collect::<Vec<_>>()),
    }
}

fn str_to_json(s: &Str) -> serde_json::Value {
    match s.to_str() {
        Some(text) => json!(text),
        None => json!({ "bytes": s.as_bytes() }),
    }
}

/// Read a XON file and export it to JSON in one call.
///
/// # Errors
/// Returns an error if the file can't be read or contains invalid XON.
pub fn export_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let config = XonConfig::from_file(path)?;
    export_document(config.document())
}
