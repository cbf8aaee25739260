//! `gluegen.toml` manifest parsing and project configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gluegen_emit::{EmitOptions, MappingConfig};
use gluegen_ir::naming::default_prefix;
use gluegen_ir::Dependencies;
use serde::{Deserialize, Serialize};

/// File name searched for by [`GluegenManifest::find_and_load`].
pub const MANIFEST_FILE: &str = "gluegen.toml";

/// The top-level manifest of a binding project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GluegenManifest {
    /// Native library being bound (required).
    pub library: LibraryConfig,
    /// Extra includes for the generated files.
    #[serde(default)]
    pub dependencies: DependenciesConfig,
    /// Emission settings.
    #[serde(default)]
    pub generate: GenerateConfig,
    /// Type-mapper extensions.
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// `[library]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    /// Host name prefix stripped from wrapper type names.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Header files, relative to the manifest.
    #[serde(default)]
    pub headers: Vec<String>,
}

/// `[dependencies]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Included from every generated declaration file.
    #[serde(default)]
    pub public: Vec<String>,
    /// Included from generated implementation files only.
    #[serde(default)]
    pub private: Vec<String>,
}

/// `[generate]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenerateConfig {
    /// Override file, relative to the manifest.
    #[serde(default)]
    pub overrides: Option<String>,
    /// Output directory, relative to the manifest.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Modules scanned into the IR but not emitted.
    #[serde(default)]
    pub skip_modules: Vec<String>,
    /// Extra local dependencies per module.
    #[serde(default)]
    pub module_deps: BTreeMap<String, Vec<String>>,
}

impl GluegenManifest {
    /// Search upward from `start_dir` for a `gluegen.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: GluegenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing gluegen.toml")
    }

    /// Configured prefix, or the first character of the library name
    /// upper-cased.
    pub fn prefix(&self) -> String {
        self.library
            .prefix
            .clone()
            .unwrap_or_else(|| default_prefix(&self.library.name))
    }

    pub fn dependencies(&self) -> Dependencies {
        Dependencies {
            public: self.dependencies.public.clone(),
            private: self.dependencies.private.clone(),
        }
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            skip_modules: self.generate.skip_modules.clone(),
            module_deps: self.generate.module_deps.clone(),
            mapping: self.mapping.clone(),
        }
    }

    /// Generate a starting manifest for a library.
    pub fn template(name: &str, headers: &[String]) -> String {
        let headers = headers
            .iter()
            .map(|h| format!("\"{h}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"[library]
name = "{name}"
headers = [{headers}]

[generate]
output-dir = "python"
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_minimal_manifest() {
        let m = GluegenManifest::from_str(
            r#"
[library]
name = "taningia"
"#,
        )
        .unwrap();
        assert_eq!(m.library.name, "taningia");
        assert_eq!(m.prefix(), "T");
        assert!(m.library.headers.is_empty());
        assert!(m.generate.overrides.is_none());
        assert_eq!(m.emit_options(), EmitOptions::default());
    }

    #[test]
    fn parse_full_manifest() {
        let m = GluegenManifest::from_str(
            r#"
[library]
name = "taningia"
prefix = "Ta"
headers = ["include/taningia/log.h", "include/taningia/xmpp.h"]

[dependencies]
public = ["iksemel.h"]
private = ["string.h"]

[generate]
overrides = "overrides.toml"
output-dir = "python/src"
skip-modules = ["log"]

[generate.module-deps]
xmpp = ["log"]

[mapping]
time-types = ["time_t", "ta_time_t"]

[[mapping.opaque]]
ctype = "iks *"
object = "PyIks"
check = "PyIks_Check"
unwrap = "PyIks_AsIks"
wrap = "PyIks_FromIks"
include = "iksemel_py.h"
"#,
        )
        .unwrap();
        assert_eq!(m.prefix(), "Ta");
        assert_eq!(m.library.headers.len(), 2);
        let deps = m.dependencies();
        assert_eq!(deps.public, vec!["iksemel.h"]);
        assert_eq!(deps.private, vec!["string.h"]);
        assert_eq!(m.generate.output_dir.as_deref(), Some("python/src"));

        let options = m.emit_options();
        assert_eq!(options.skip_modules, vec!["log"]);
        assert_eq!(options.module_deps["xmpp"], vec!["log"]);
        assert_eq!(options.mapping.time_types, vec!["time_t", "ta_time_t"]);
        assert_eq!(options.mapping.opaque[0].include.as_deref(), Some("iksemel_py.h"));
    }

    #[test]
    fn missing_library_section_is_an_error() {
        assert!(GluegenManifest::from_str("[generate]\noutput-dir = \"out\"\n").is_err());
    }

    #[test]
    fn template_round_trips() {
        let text = GluegenManifest::template("foo", &["include/foo/bar.h".to_string()]);
        let m = GluegenManifest::from_str(&text).unwrap();
        assert_eq!(m.library.name, "foo");
        assert_eq!(m.library.headers, vec!["include/foo/bar.h"]);
        assert_eq!(m.generate.output_dir.as_deref(), Some("python"));
    }

    #[test]
    fn find_walks_up_from_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "[library]\nname = \"foo\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let (m, found) = GluegenManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(m.library.name, "foo");
        assert_eq!(found, dir.path());
    }
}
