//! Emission driver.

use std::collections::BTreeMap;

use gluegen_ir::{Diagnostic, Library};
use serde::{Deserialize, Serialize};

use crate::error::{EmitError, Result};
use crate::glue::{emit_type, GlueContext};
use crate::header::module_header;
use crate::lifecycle::Lifecycle;
use crate::mapping::{MappingConfig, TypeMapper};
use crate::module::{module_dependencies, module_source, ModuleParts};
use crate::overrides::OverrideRegistry;
use crate::printer::print_file;
use crate::registry::{CallbackRegistry, EnumRegistry, ModuleNames, TypeRegistry};
use crate::validate::validate_overrides;

/// Knobs that shape emission but are not part of the IR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EmitOptions {
    /// Modules kept in the registries but not emitted.
    pub skip_modules: Vec<String>,
    /// Extra local dependencies per module.
    pub module_deps: BTreeMap<String, Vec<String>>,
    pub mapping: MappingConfig,
}

/// One rendered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

/// Rendered files plus the diagnostics collected on the way.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    pub files: Vec<OutputFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Glue emitter over one assembled library.
///
/// Construction builds every registry, validates the overrides and runs the
/// cyclic-participant pre-pass; rendering never fails after that.
#[derive(Debug)]
pub struct Emitter {
    library: Library,
    overrides: OverrideRegistry,
    options: EmitOptions,
    types: TypeRegistry,
    enums: EnumRegistry,
    callbacks: CallbackRegistry,
    lifecycle: Lifecycle,
}

impl Emitter {
    pub fn new(library: Library, overrides: OverrideRegistry, options: EmitOptions) -> Result<Self> {
        for skipped in &options.skip_modules {
            if library.module(skipped).is_none() {
                return Err(EmitError::UnknownModule {
                    module: skipped.clone(),
                });
            }
        }
        let types = TypeRegistry::build(&library, &options.skip_modules);
        let enums = EnumRegistry::build(&library);
        let callbacks = CallbackRegistry::build(&library);
        validate_overrides(&library, &types, &overrides)?;
        let lifecycle = Lifecycle::analyze(&library, &types, &overrides);
        Ok(Self {
            library,
            overrides,
            options,
            types,
            enums,
            callbacks,
            lifecycle,
        })
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Whether the module produces output files.
    pub fn is_emitted(&self, module: &str) -> bool {
        !self.options.skip_modules.iter().any(|m| m == module)
    }

    /// Render the declaration and implementation files of one module.
    pub fn emit_module(&self, module_name: &str) -> Result<EmitOutput> {
        let module = self
            .library
            .module(module_name)
            .ok_or_else(|| EmitError::UnknownModule {
                module: module_name.to_string(),
            })?;
        let mut output = EmitOutput::default();
        if !self.is_emitted(module_name) {
            tracing::debug!(module = module_name, "skipped");
            return Ok(output);
        }

        let mapper = TypeMapper::new(&self.types, &self.enums, &self.callbacks, &self.options.mapping);
        let ctx = GlueContext {
            mapper: &mapper,
            overrides: &self.overrides,
            lifecycle: &self.lifecycle,
        };
        let names = ModuleNames::new(&self.library.name, &module.name);
        let dependencies = module_dependencies(module, &self.types, &self.options.module_deps);

        let mut glue = Vec::with_capacity(module.types.len());
        for ty in &module.types {
            let mut type_glue = emit_type(ctx, &names, ty);
            output.diagnostics.append(&mut type_glue.diagnostics);
            glue.push(type_glue);
        }

        let header = module_header(&self.library, module, &names, &self.types, &self.lifecycle);
        let source = module_source(ModuleParts {
            library: &self.library,
            module,
            names: &names,
            types: &self.types,
            mapping: &self.options.mapping,
            dependencies: &dependencies,
            glue,
        });
        output.files.push(OutputFile {
            name: names.header.clone(),
            contents: print_file(&header),
        });
        output.files.push(OutputFile {
            name: names.source.clone(),
            contents: print_file(&source),
        });
        tracing::debug!(module = module_name, deps = ?dependencies, "rendered");
        Ok(output)
    }

    /// Render every emitted module, in library order.
    pub fn emit_all(&self) -> Result<EmitOutput> {
        let mut all = EmitOutput::default();
        for module in &self.library.modules {
            let mut output = self.emit_module(&module.name)?;
            all.files.append(&mut output.files);
            all.diagnostics.append(&mut output.diagnostics);
        }
        Ok(all)
    }
}
