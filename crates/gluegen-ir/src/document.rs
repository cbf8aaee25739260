//! JSON interchange document.
//!
//! The document decouples scanning from generation: `gluegen scan` writes
//! it, `gluegen generate` reads it back. A format tag and version guard
//! against feeding unrelated or incompatible JSON to the emitter.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, Result};
use crate::library::Library;

/// Format tag written into every document.
pub const FORMAT: &str = "gluegen-ir";

/// Current document version.
pub const VERSION: u32 = 1;

/// Versioned wrapper around a [`Library`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrDocument {
    pub format: String,
    pub version: u32,
    pub library: Library,
}

impl IrDocument {
    pub fn new(library: Library) -> Self {
        Self {
            format: FORMAT.to_string(),
            version: VERSION,
            library,
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse and validate a document.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: IrDocument = serde_json::from_str(text)?;
        if doc.format != FORMAT {
            return Err(IrError::UnknownFormat { found: doc.format });
        }
        if doc.version != VERSION {
            return Err(IrError::UnsupportedVersion {
                found: doc.version,
                expected: VERSION,
            });
        }
        Ok(doc)
    }

    pub fn into_library(self) -> Library {
        self.library
    }
}
