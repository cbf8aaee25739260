//! gluegen CLI — CPython extension glue from annotated C headers.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Once;

use clap::{Parser, Subcommand};

use manifest::GluegenManifest;

#[derive(Parser)]
#[command(
    name = "gluegen",
    version,
    about = "Generate CPython extension glue from annotated C headers"
)]
struct Cli {
    /// Log emitter decisions (same as RUST_LOG=gluegen=debug)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starting gluegen.toml in the current directory
    Init {
        /// Native library name
        name: String,
        /// Header files to scan
        headers: Vec<String>,
    },
    /// Scan headers into an IR document
    Scan {
        /// Header files (default: [library] headers from gluegen.toml)
        headers: Vec<String>,
        /// Native library name
        #[arg(long)]
        library: Option<String>,
        /// Host name prefix (default: first letter of the library name)
        #[arg(long)]
        prefix: Option<String>,
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<String>,
    },
    /// Generate glue sources from an IR document
    Generate {
        /// IR document written by `gluegen scan`
        ir: String,
        /// Override file
        #[arg(long)]
        overrides: Option<String>,
        /// Output directory
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Scan and generate using gluegen.toml
    Bindings {
        /// Override file
        #[arg(long)]
        overrides: Option<String>,
        /// Output directory
        #[arg(long)]
        output_dir: Option<String>,
    },
}

static TRACING_INIT: Once = Once::new();

/// Install a fmt subscriber when `RUST_LOG` is set or `--verbose` is given.
fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = if verbose {
            EnvFilter::new("gluegen=debug")
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .init();
    });
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name, headers } => commands::init::run(&cwd, &name, &headers),

        Commands::Scan {
            headers,
            library,
            prefix,
            output,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            // Explicit headers are relative to where the user typed them.
            let project_dir = if headers.is_empty() {
                project_dir.unwrap_or(cwd)
            } else {
                cwd
            };
            commands::scan::run(
                &project_dir,
                manifest.as_ref(),
                &headers,
                library.as_deref(),
                prefix.as_deref(),
                output.as_deref(),
            )
        }

        Commands::Generate {
            ir,
            overrides,
            output_dir,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or_else(|| cwd.clone());
            commands::generate::run(
                &cwd,
                &project_dir,
                manifest.as_ref(),
                &ir,
                overrides.as_deref(),
                output_dir.as_deref(),
            )
        }

        Commands::Bindings {
            overrides,
            output_dir,
        } => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::bindings::run(
                &cwd,
                &project_dir,
                &manifest,
                overrides.as_deref(),
                output_dir.as_deref(),
            )
        }
    }
}

/// Load manifest, returning error if not found.
fn load_manifest_required(cwd: &Path) -> anyhow::Result<(GluegenManifest, PathBuf)> {
    match GluegenManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => anyhow::bail!("no gluegen.toml found (run `gluegen init` first)"),
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<GluegenManifest>, Option<PathBuf>)> {
    match GluegenManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
