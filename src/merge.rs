//! Folding `[vN]` sub-blocks into their parents.
//!
//! A file may use a single version number throughout. Under a version-aware
//! selector every `[vN]` block with `N` at or below the requested version has its
//! children spliced into the parent at the block's place; the rest are dropped.
//! The input document is never modified.

use bstr::BString;
use indexmap::IndexMap;

use crate::ast::{Block, Document, Node, Position};
use crate::error::{Result, XonError};

/// Which versioned blocks take part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// Drop every versioned block. No version checks are made.
    Unversioned,
    /// Merge blocks whose version is at most the given one.
    UpTo(u64),
    /// Merge every versioned block.
    All,
}

impl VersionSelector {
    fn includes(self, version: u64) -> bool {
        match self {
            VersionSelector::Unversioned => false,
            VersionSelector::UpTo(max) => version <= max,
            VersionSelector::All => true,
        }
    }
}

/// Produce a new document with versioned blocks resolved under `selector`.
pub fn merge(document: &Document, selector: VersionSelector) -> Result<Document> {
    if selector != VersionSelector::Unversioned {
        check_single_version(&document.nodes, &mut None)?;
    }
    Ok(Document {
        nodes: merge_children(&document.nodes, selector)?,
        comments: document.comments.clone(),
    })
}

/// Distinct version numbers used anywhere in the document, ascending.
pub fn versions(document: &Document) -> Vec<u64> {
    let mut found = Vec::new();
    collect_versions(&document.nodes, &mut found);
    found.sort_unstable();
    found.dedup();
    found
}

fn collect_versions(nodes: &[Node], found: &mut Vec<u64>) {
    for node in nodes {
        if let Node::Block(block) = node {
            found.extend(block.version);
            collect_versions(&block.children, found);
        }
    }
}

fn check_single_version(nodes: &[Node], seen: &mut Option<(u64, Position)>) -> Result<()> {
    for node in nodes {
        let Node::Block(block) = node else { continue };
        if let Some(version) = block.version {
            match *seen {
                None => *seen = Some((version, block.position())),
                Some((first, at)) if first != version => {
                    return Err(XonError::VersionConflict {
                        first,
                        second: version,
                        position: block.position(),
                        hint: Some(format!(
                            "A file may use only one version number; [v{}] was first used at {}",
                            first, at
                        )),
                        code: Some(501),
                    });
                }
                Some(_) => {}
            }
        }
        check_single_version(&block.children, seen)?;
    }
    Ok(())
}

/// A merged child and the versioned block it was spliced from, if any.
struct Merged<'a> {
    node: Node,
    origin: Option<&'a Block>,
}

fn merge_children(children: &[Node], selector: VersionSelector) -> Result<Vec<Node>> {
    let mut merged = Vec::with_capacity(children.len());
    let mut spliced = false;

    for node in children {
        match node {
            Node::Block(block) => match block.version {
                Some(version) => {
                    if selector.includes(version) {
                        spliced = true;
                        for child in merge_children(&block.children, selector)? {
                            merged.push(Merged { node: child, origin: Some(block) });
                        }
                    }
                }
                None => merged.push(Merged {
                    node: Node::Block(Block {
                        name: block.name.clone(),
                        version: None,
                        children: merge_children(&block.children, selector)?,
                    }),
                    origin: None,
                }),
            },
            Node::Pair(_) => merged.push(Merged { node: node.clone(), origin: None }),
        }
    }

    if spliced {
        check_collisions(&merged)?;
    }
    Ok(merged.into_iter().map(|m| m.node).collect())
}

/// Same key rules as the parser: unique pairs, no pair sharing a key with a
/// block. A collision is reported at the node that came from a versioned block.
fn check_collisions(merged: &[Merged]) -> Result<()> {
    let mut keys: IndexMap<&BString, &Merged> = IndexMap::new();
    for entry in merged {
        let key = &entry.node.key().value;
        let Some(existing) = keys.get(key).copied() else {
            keys.insert(key, entry);
            continue;
        };

        let both_blocks = matches!(entry.node, Node::Block(_)) && matches!(existing.node, Node::Block(_));
        if both_blocks {
            continue;
        }

        let (late, early) = if entry.origin.is_some() { (entry, existing) } else { (existing, entry) };
        let key = late.node.key();
        let mut err = XonError::DuplicateKey {
            key: key.display(),
            position: key.position,
            first: early.node.position(),
            hint: None,
            code: Some(502),
        };
        if let Some(block) = late.origin {
            err = err.with_hint(format!(
                "Key comes from the [v{}] block at {}",
                block.version.unwrap_or_default(),
                block.position()
            ));
        }
        return Err(err);
    }
    Ok(())
}
