//! Host-runtime glue emitter for the gluegen binding generator.
//!
//! Turns an assembled [`gluegen_ir::Library`] into one declaration file and
//! one implementation file per module, targeting the CPython extension API.
//! Marshaling decisions build a small C syntax tree; a separate printer
//! renders it.
//!
//! ## Modules
//!
//! - [`registry`] — wrapper type, enum and callback lookup tables
//! - [`mapping`] — priority-ordered native type to marshaling strategy rules
//! - [`overrides`] — hand-written replacement, suppression and extra fields
//! - [`validate`] — override checks run before rendering
//! - [`lifecycle`] — allocation, deallocation and cycle-collector glue
//! - [`plan`] — argument parsing plan for one native call
//! - [`callback`] — trampolines calling host callables from native code
//! - [`glue`] — per-type glue, method and property tables, type objects
//! - [`header`] — `<module>module.h` rendering
//! - [`module`] — `<module>module.c` rendering and module init
//! - [`emitter`] — emission driver
//! - [`ast`] / [`printer`] — C syntax tree and its pretty-printer
//! - [`error`] — emitter error types

pub mod ast;
pub mod callback;
pub mod emitter;
pub mod error;
pub mod glue;
pub mod header;
pub mod lifecycle;
pub mod mapping;
pub mod module;
pub mod overrides;
pub mod plan;
pub mod printer;
pub mod registry;
pub mod validate;

pub use emitter::{EmitOptions, EmitOutput, Emitter, OutputFile};
pub use error::{EmitError, Result};
pub use mapping::{ContainerRule, MappingConfig, OpaqueRule, PrimitiveRule};
pub use overrides::{Override, OverrideRegistry};
