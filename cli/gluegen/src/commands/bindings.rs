//! `gluegen bindings` — manifest-driven scan and generate in one step.

use std::path::Path;

use anyhow::Result;

use crate::manifest::GluegenManifest;

pub fn run(
    work_dir: &Path,
    project_dir: &Path,
    manifest: &GluegenManifest,
    overrides: Option<&str>,
    output_dir: Option<&str>,
) -> Result<()> {
    let assembly = super::scan::assemble(project_dir, Some(manifest), &[], None, None)?;
    let errors = super::report(&assembly.diagnostics);
    if errors > 0 {
        eprintln!("{errors} symbols dropped while scanning");
    }

    let output = super::generate::render(project_dir, Some(manifest), assembly.library, overrides)?;
    let dir = super::generate::resolve_output_dir(work_dir, project_dir, Some(manifest), output_dir);
    super::write_files(&dir, &output.files)?;
    println!(
        "Generated bindings for '{}' ({} files) → {}",
        manifest.library.name,
        output.files.len(),
        dir.display()
    );
    Ok(())
}
