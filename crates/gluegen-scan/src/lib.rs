//! Annotated C header scanner for the gluegen binding generator.
//!
//! Turns header text into a [`gluegen_ir::Library`]: comments are stripped,
//! declarations are pattern-scanned, and structured doc comments supply the
//! parameter modifiers, accessor classification and container returns the C
//! declarations cannot express.
//!
//! ## Modules
//!
//! - [`strip`] — comment stripping and whitespace normalization
//! - [`doc`] — structured doc-comment parser
//! - [`signature`] — typedef, enum, callback and prototype scanner
//! - [`assemble`] — IR assembly with per-symbol diagnostics
//! - [`error`] — scanner error types

pub mod assemble;
pub mod doc;
pub mod error;
pub mod signature;
pub mod strip;

pub use assemble::{resolve_owner, Assembler, Assembly, HeaderSource};
pub use doc::{Classification, DocComment, DocParam, DocReturn, SymbolKind};
pub use error::{Result, ScanError};
pub use signature::{RawFunction, RawParam, ScannedHeader};

/// Scan and assemble a set of headers in one call.
pub fn scan_library(name: &str, prefix: &str, headers: &[HeaderSource]) -> Assembly {
    Assembler::new(name, prefix).assemble(headers)
}
