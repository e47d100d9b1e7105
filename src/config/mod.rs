// Author: Dustin Pilgrim
// License: MIT

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::ast::{Comment, Document};
use crate::decode::{DecodeOptions, from_document};
use crate::error::{Result, XonError};
use crate::merge::{self, VersionSelector};

mod access;

/// A parsed XON file together with its source text.
///
/// Path-based access (`get`, `has`, `keys`, ...) works on the unversioned view of
/// the document, where every `[vN]` block is left out. Use
/// [`XonConfig::decode_version`] to decode with versioned blocks folded in.
#[derive(Debug, Clone)]
pub struct XonConfig {
    document: Document,
    unversioned: Document,
    raw_content: String,
    path: Option<PathBuf>,
}

impl XonConfig {
    /// Load and parse a config file. A leading `~/` is expanded to the home directory.
    ///
    /// # Example
    /// ```no_run
    /// let config = xon::XonConfig::from_file("~/.config/app/app.xon")?;
    /// # Ok::<(), xon::XonError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_home(path.as_ref())?;
        let bytes = fs::read(&path).map_err(|e| XonError::File {
            message: format!("Failed to read file: {}", e),
            path: path.display().to_string(),
            hint: Some("Check that the file exists and is readable".into()),
            code: Some(301),
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read config file");

        let mut config = Self::from_bytes(&bytes)?;
        config.path = Some(path);
        Ok(config)
    }

    /// Load a config file with fallback support.
    ///
    /// Tries the primary path first and only reads the fallback when the primary
    /// cannot be read. Parse errors in the primary are returned as they are.
    pub fn from_file_with_fallback<P: AsRef<Path>>(primary: P, fallback: P) -> Result<Self> {
        match Self::from_file(&primary) {
            Ok(config) => Ok(config),
            Err(XonError::File { message: first, .. }) => {
                warn!(
                    primary = %primary.as_ref().display(),
                    fallback = %fallback.as_ref().display(),
                    reason = %first,
                    "primary config unreadable, using fallback"
                );
                Self::from_file(&fallback).map_err(|e| match e {
                    XonError::File { message, .. } => XonError::File {
                        message: format!(
                            "Failed to load config from primary path '{}' or fallback path '{}': {}",
                            primary.as_ref().display(),
                            fallback.as_ref().display(),
                            message
                        ),
                        path: format!(
                            "{} (fallback: {})",
                            primary.as_ref().display(),
                            fallback.as_ref().display()
                        ),
                        hint: Some("Check that at least one of the config files exists".into()),
                        code: Some(302),
                    },
                    other => other,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Parse a config from text (no file I/O).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Self::from_bytes(content.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let source = crate::lexer::normalize(bytes)?;
        let document = crate::parser::Parser::new(&source)?.parse_document()?;
        let unversioned = merge::merge(&document, VersionSelector::Unversioned)?;
        debug!(
            nodes = document.nodes.len(),
            comments = document.comments.len(),
            versions = ?merge::versions(&document),
            "parsed config"
        );

        Ok(Self {
            document,
            unversioned,
            raw_content: source.into_owned(),
            path: None,
        })
    }

    /// The document as parsed, versioned blocks included.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn comments(&self) -> &[Comment] {
        &self.document.comments
    }

    /// The normalized source text.
    pub fn raw(&self) -> &str {
        &self.raw_content
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn versions(&self) -> Vec<u64> {
        merge::versions(&self.document)
    }

    /// Decode the whole file into `T`, ignoring versioned blocks and unknown keys.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        from_document(&self.unversioned, DecodeOptions::loose())
    }

    /// Decode with every `[vN]` block up to `version` merged, rejecting unknown keys.
    pub fn decode_version<T: DeserializeOwned>(&self, version: u64) -> Result<T> {
        debug!(version, "decoding versioned config");
        let merged = merge::merge(&self.document, VersionSelector::UpTo(version))?;
        from_document(&merged, DecodeOptions::strict())
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> Result<PathBuf> {
    let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().ok_or_else(|| XonError::File {
        message: "Could not determine home directory for ~ expansion".into(),
        path: path.display().to_string(),
        hint: Some("Set HOME or use an absolute path".into()),
        code: Some(300),
    })?;
    Ok(home.join(rest))
}

#[cfg(test)]
mod tests;
