//! Hand-written overrides of generated glue.
//!
//! Override files are TOML:
//!
//! ```toml
//! [[override]]
//! symbol = "ta_xmpp_client_send"
//! verbatim = """
//! static PyObject *
//! PyXmppClientObject_send (PyXmppClientObject *self, PyObject *args)
//! { ... }
//! """
//!
//! [[override]]
//! symbol = "ta_xmpp_client_t"
//! fields = ["handler", "data"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EmitError, Result};

/// What an override does to its symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    /// Replace the generated glue with this text.
    Verbatim(String),
    /// Generate nothing and leave the symbol out of method tables.
    Suppressed,
    /// Host references the wrapper struct carries besides its native handle.
    ExtraFields(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(default, rename = "override")]
    overrides: Vec<OverrideEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideEntry {
    symbol: String,
    #[serde(default)]
    verbatim: Option<String>,
    #[serde(default)]
    suppress: Option<bool>,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

impl OverrideEntry {
    fn into_override(self) -> Result<(String, Override)> {
        let invalid = |detail: &str| EmitError::InvalidOverride {
            symbol: self.symbol.clone(),
            detail: detail.to_string(),
        };
        let value = match (&self.verbatim, self.suppress, &self.fields) {
            (Some(text), None, None) => Override::Verbatim(text.clone()),
            (None, Some(true), None) => Override::Suppressed,
            (None, Some(false), None) => {
                return Err(invalid("`suppress` must be true when present"))
            }
            (None, None, Some(fields)) => Override::ExtraFields(fields.clone()),
            (None, None, None) => {
                return Err(invalid("expected one of `verbatim`, `suppress` or `fields`"))
            }
            _ => {
                return Err(invalid(
                    "only one of `verbatim`, `suppress` or `fields` may be given",
                ))
            }
        };
        Ok((self.symbol, value))
    }
}

/// Overrides keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    entries: BTreeMap<String, Override>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an override file.
    pub fn parse(input: &str) -> Result<Self> {
        let file: OverrideFile = toml::from_str(input)?;
        let mut registry = Self::new();
        for entry in file.overrides {
            let (symbol, value) = entry.into_override()?;
            registry.insert(symbol, value)?;
        }
        Ok(registry)
    }

    /// Load and parse an override file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Add one override; a symbol may only be overridden once.
    pub fn insert(&mut self, symbol: impl Into<String>, value: Override) -> Result<()> {
        let symbol = symbol.into();
        if let Override::ExtraFields(fields) = &value {
            validate_fields(&symbol, fields)?;
        }
        if self.entries.contains_key(&symbol) {
            return Err(EmitError::InvalidOverride {
                symbol,
                detail: "symbol is overridden more than once".to_string(),
            });
        }
        self.entries.insert(symbol, value);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&Override> {
        self.entries.get(symbol)
    }

    pub fn is_suppressed(&self, symbol: &str) -> bool {
        matches!(self.get(symbol), Some(Override::Suppressed))
    }

    pub fn verbatim(&self, symbol: &str) -> Option<&str> {
        match self.get(symbol) {
            Some(Override::Verbatim(text)) => Some(text),
            _ => None,
        }
    }

    /// Extra fields of a wrapper, looked up by native name or host struct.
    pub fn extra_fields(&self, cname: &str, object: &str) -> &[String] {
        for key in [cname, object] {
            if let Some(Override::ExtraFields(fields)) = self.get(key) {
                return fields;
            }
        }
        &[]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Override)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_fields(symbol: &str, fields: &[String]) -> Result<()> {
    let invalid = |detail: String| EmitError::InvalidOverride {
        symbol: symbol.to_string(),
        detail,
    };
    if fields.is_empty() {
        return Err(invalid("`fields` must not be empty".to_string()));
    }
    for (i, field) in fields.iter().enumerate() {
        let is_ident = field
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_ident {
            return Err(invalid(format!("`{field}` is not a C identifier")));
        }
        if field == "inner" {
            return Err(invalid("`inner` is reserved for the native handle".to_string()));
        }
        if fields[..i].contains(field) {
            return Err(invalid(format!("field `{field}` is listed twice")));
        }
    }
    Ok(())
}
