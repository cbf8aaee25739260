//! IR error types.

/// Errors that can occur while reading or writing IR documents.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// The document is not a gluegen IR document.
    #[error("not a gluegen IR document: format '{found}'")]
    UnknownFormat { found: String },

    /// The document was written by an incompatible format version.
    #[error("unsupported IR version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for IR operations.
pub type Result<T> = std::result::Result<T, IrError>;
