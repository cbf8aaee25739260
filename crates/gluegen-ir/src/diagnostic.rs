//! Per-symbol diagnostics.
//!
//! Problems confined to one declaration never abort a run; they are recorded
//! here and reported after scanning or emission finishes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// What went wrong with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Malformed classification marker in a doc comment.
    DocParseError,
    /// Scanned function without a doc comment.
    UndocumentedSymbol,
    /// Function whose name matches no wrapper type of its module.
    UnassociatedSymbol,
    /// Function whose name matches several wrapper types.
    DuplicateAssociation,
    /// Wrapper type declared twice.
    DuplicateType,
    /// Initializer function, never exposed.
    InitializerSkipped,
    /// Doc-declared owner disagrees with the name-resolved owner.
    OwnerMismatch,
    /// `len` parameter not directly after a buffer parameter.
    InvalidParameterLayout,
    /// Second constructor or destructor for the same type.
    DuplicateRole,
    MissingConstructor,
    MissingDestructor,
    /// Symbol cannot be bound without hand-written glue.
    RequiresOverride,
    /// Type fell through to the generic object mapping.
    UnmappedType,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::DocParseError => "doc-parse-error",
            DiagnosticKind::UndocumentedSymbol => "undocumented-symbol",
            DiagnosticKind::UnassociatedSymbol => "unassociated-symbol",
            DiagnosticKind::DuplicateAssociation => "duplicate-association",
            DiagnosticKind::DuplicateType => "duplicate-type",
            DiagnosticKind::InitializerSkipped => "initializer-skipped",
            DiagnosticKind::OwnerMismatch => "owner-mismatch",
            DiagnosticKind::InvalidParameterLayout => "invalid-parameter-layout",
            DiagnosticKind::DuplicateRole => "duplicate-role",
            DiagnosticKind::MissingConstructor => "missing-constructor",
            DiagnosticKind::MissingDestructor => "missing-destructor",
            DiagnosticKind::RequiresOverride => "requires-override",
            DiagnosticKind::UnmappedType => "unmapped-type",
        };
        f.write_str(name)
    }
}

/// A diagnostic about one native symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Native symbol or type the diagnostic refers to.
    pub symbol: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, symbol, message)
    }

    pub fn warning(
        kind: DiagnosticKind,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, kind, symbol, message)
    }

    pub fn info(kind: DiagnosticKind, symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, kind, symbol, message)
    }

    fn new(
        severity: Severity,
        kind: DiagnosticKind,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            symbol: symbol.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} [{}]",
            self.severity, self.symbol, self.message, self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_severity_symbol_and_kind() {
        let d = Diagnostic::warning(
            DiagnosticKind::UndocumentedSymbol,
            "x_foo_frob",
            "no doc comment",
        );
        assert_eq!(
            d.to_string(),
            "warning: x_foo_frob: no doc comment [undocumented-symbol]"
        );
        assert!(!d.is_error());
    }

    #[test]
    fn severity_orders_errors_first() {
        let mut sev = vec![Severity::Info, Severity::Error, Severity::Warning];
        sev.sort();
        assert_eq!(sev, vec![Severity::Error, Severity::Warning, Severity::Info]);
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&DiagnosticKind::DocParseError).unwrap();
        assert_eq!(json, "\"doc-parse-error\"");
    }
}
