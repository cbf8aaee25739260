//! `gluegen scan` — headers to an IR document.

use std::path::Path;

use anyhow::{bail, Context, Result};
use gluegen_ir::naming::default_prefix;
use gluegen_ir::IrDocument;
use gluegen_scan::{Assembler, Assembly, HeaderSource};

use crate::manifest::GluegenManifest;

/// Scan `headers` (or the manifest's) and write the IR document to `output`,
/// or to stdout when no output is given.
pub fn run(
    project_dir: &Path,
    manifest: Option<&GluegenManifest>,
    headers: &[String],
    library: Option<&str>,
    prefix: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let assembly = assemble(project_dir, manifest, headers, library, prefix)?;
    let errors = super::report(&assembly.diagnostics);

    let json = IrDocument::new(assembly.library.clone())
        .to_json()
        .context("serializing IR document")?;
    let summary = summary(&assembly, errors);
    match output {
        Some(output) => {
            let path = project_dir.join(output);
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("{summary} → {}", path.display());
        }
        None => {
            print!("{json}");
            eprintln!("{summary}");
        }
    }
    Ok(())
}

/// Read and assemble headers. Command-line values win over the manifest.
pub(crate) fn assemble(
    project_dir: &Path,
    manifest: Option<&GluegenManifest>,
    headers: &[String],
    library: Option<&str>,
    prefix: Option<&str>,
) -> Result<Assembly> {
    let name = match (library, manifest) {
        (Some(name), _) => name.to_string(),
        (None, Some(m)) => m.library.name.clone(),
        (None, None) => bail!("no library name given (pass --library or add a gluegen.toml)"),
    };
    let prefix = match (prefix, manifest) {
        (Some(prefix), _) => prefix.to_string(),
        (None, Some(m)) => m.prefix(),
        (None, None) => default_prefix(&name),
    };
    let headers: &[String] = match (headers.is_empty(), manifest) {
        (false, _) => headers,
        (true, Some(m)) => &m.library.headers,
        (true, None) => &[],
    };
    if headers.is_empty() {
        bail!("no headers to scan");
    }

    let mut sources = Vec::with_capacity(headers.len());
    for header in headers {
        let path = project_dir.join(header);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        sources.push(HeaderSource::new(header.as_str(), text));
    }
    tracing::debug!(library = %name, %prefix, headers = sources.len(), "scanning");

    let dependencies = manifest
        .map(GluegenManifest::dependencies)
        .unwrap_or_default();
    Ok(Assembler::new(name, prefix)
        .with_dependencies(dependencies)
        .assemble(&sources))
}

fn summary(assembly: &Assembly, errors: usize) -> String {
    let lib = &assembly.library;
    let types = lib.types().count();
    let methods: usize = lib.types().map(|(_, t)| t.all_methods().count()).sum();
    let warnings = assembly.diagnostics.len() - errors;
    format!(
        "Scanned '{}': {} modules, {types} types, {methods} functions ({errors} errors, {warnings} other diagnostics)",
        lib.name,
        lib.modules.len()
    )
}
