//! `gluegen init` — manifest scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{GluegenManifest, MANIFEST_FILE};

/// Write a starting `gluegen.toml` into `project_dir`.
pub fn run(project_dir: &Path, name: &str, headers: &[String]) -> Result<()> {
    let path = project_dir.join(MANIFEST_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::write(&path, GluegenManifest::template(name, headers))
        .with_context(|| format!("writing {}", path.display()))?;

    println!("Created {MANIFEST_FILE} for '{name}'");
    if headers.is_empty() {
        println!("  add header paths to [library] headers before running `gluegen bindings`");
    }
    Ok(())
}
