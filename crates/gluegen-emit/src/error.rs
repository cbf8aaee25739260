//! Emitter error types.
//!
//! Only problems that would make the generated sources incoherent are
//! errors; per-symbol trouble is reported as a diagnostic instead.

/// Errors that abort emission before any output is produced.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// An override names a symbol the library does not contain.
    #[error("override references unknown symbol `{symbol}`")]
    UnresolvedOverride { symbol: String },

    /// An override entry has an unusable shape.
    #[error("invalid override for `{symbol}`: {detail}")]
    InvalidOverride { symbol: String, detail: String },

    /// Verbatim text does not define the function the method table points at.
    #[error("override for `{symbol}` does not define `{function}`")]
    MissingOverrideDefinition { symbol: String, function: String },

    /// A requested module is not part of the library.
    #[error("unknown module `{module}`")]
    UnknownModule { module: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for emitter operations.
pub type Result<T> = std::result::Result<T, EmitError>;
