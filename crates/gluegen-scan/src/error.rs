//! Scanner error types.

/// Errors that can occur while scanning headers.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Malformed structured doc comment.
    #[error("invalid doc comment: {detail}")]
    InvalidDocComment { detail: String },

    /// Declaration the scanner cannot take apart.
    #[error("invalid declaration: {detail}")]
    InvalidDeclaration { detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;
