//! `gluegen generate` — IR document to glue sources.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use gluegen_emit::{EmitOutput, Emitter, OverrideRegistry};
use gluegen_ir::{IrDocument, Library};

use crate::manifest::GluegenManifest;

/// Load an IR document and write one `.h`/`.c` pair per emitted module.
pub fn run(
    work_dir: &Path,
    project_dir: &Path,
    manifest: Option<&GluegenManifest>,
    ir_path: &str,
    overrides: Option<&str>,
    output_dir: Option<&str>,
) -> Result<()> {
    let path = project_dir.join(ir_path);
    if !path.is_file() {
        bail!("IR document not found: {}", path.display());
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let library = IrDocument::from_json(&text)
        .with_context(|| format!("loading {}", path.display()))?
        .into_library();

    let output = render(project_dir, manifest, library, overrides)?;
    let dir = resolve_output_dir(work_dir, project_dir, manifest, output_dir);
    super::write_files(&dir, &output.files)?;
    println!("Generated {} files → {}", output.files.len(), dir.display());
    Ok(())
}

/// Render every module in memory. Fails before anything is written when
/// an override is dangling or malformed.
pub(crate) fn render(
    project_dir: &Path,
    manifest: Option<&GluegenManifest>,
    library: Library,
    overrides: Option<&str>,
) -> Result<EmitOutput> {
    let overrides_path = overrides
        .map(str::to_string)
        .or_else(|| manifest.and_then(|m| m.generate.overrides.clone()));
    let registry = match overrides_path {
        Some(file) => {
            let path = project_dir.join(file);
            OverrideRegistry::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => OverrideRegistry::new(),
    };
    let options = manifest
        .map(GluegenManifest::emit_options)
        .unwrap_or_default();

    let emitter = Emitter::new(library, registry, options).context("preparing emission")?;
    let output = emitter.emit_all()?;
    super::report(&output.diagnostics);
    Ok(output)
}

/// `--output-dir` (relative to the working directory), then the manifest's
/// `output-dir` (relative to the manifest), then the working directory.
pub(crate) fn resolve_output_dir(
    work_dir: &Path,
    project_dir: &Path,
    manifest: Option<&GluegenManifest>,
    flag: Option<&str>,
) -> PathBuf {
    if let Some(dir) = flag {
        return work_dir.join(dir);
    }
    match manifest.and_then(|m| m.generate.output_dir.as_deref()) {
        Some(dir) => project_dir.join(dir),
        None => work_dir.to_path_buf(),
    }
}
