//! Interface definition model for the gluegen binding generator.
//!
//! The IR is the durable contract between the header scanner and the glue
//! emitter: a library made of modules, each holding wrapper types (with
//! constructor, destructor and methods), enums and callback typedefs.
//!
//! ## Modules
//!
//! - [`library`] — IR data model (library, module, type, method, parameter, enum)
//! - [`naming`] — name derivation shared by the scanner and the emitter
//! - [`document`] — JSON interchange document with format versioning
//! - [`diagnostic`] — per-symbol diagnostics collected by both stages
//! - [`error`] — IR error types

pub mod diagnostic;
pub mod document;
pub mod error;
pub mod library;
pub mod naming;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use document::IrDocument;
pub use error::{IrError, Result};
pub use library::{
    Callback, Dependencies, Enum, Library, Method, MethodRole, Modifier, ModifierSet, Module,
    Parameter, ReturnDescriptor, WrapperType,
};
