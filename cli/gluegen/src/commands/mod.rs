//! CLI command implementations.

pub mod bindings;
pub mod generate;
pub mod init;
pub mod scan;

use std::path::Path;

use anyhow::{Context, Result};
use gluegen_emit::OutputFile;
use gluegen_ir::{Diagnostic, Severity};

/// Print warnings and errors to stderr. Informational diagnostics only go to
/// the log. Returns the number of errors.
pub(crate) fn report(diagnostics: &[Diagnostic]) -> usize {
    let mut errors = 0;
    for d in diagnostics {
        match d.severity {
            Severity::Error => {
                errors += 1;
                eprintln!("{d}");
            }
            Severity::Warning => eprintln!("{d}"),
            Severity::Info => tracing::info!(symbol = %d.symbol, kind = %d.kind, "{}", d.message),
        }
    }
    errors
}

/// Write rendered files into `dir`, creating it if needed. Nothing is
/// rendered here: callers pass files that are already complete.
pub(crate) fn write_files(dir: &Path, files: &[OutputFile]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for file in files {
        let path = dir.join(&file.name);
        std::fs::write(&path, &file.contents)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
