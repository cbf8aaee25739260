//! IR assembly: merges scanned declarations with doc-comment metadata.
//!
//! Problems are isolated per symbol. A function without a doc comment, with
//! a malformed one, or with no owning type is dropped with a diagnostic and
//! the rest of the library is assembled normally.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gluegen_ir::naming::{base_type, strip_prefix_once, symbol_prefix};
use gluegen_ir::{
    Dependencies, Diagnostic, DiagnosticKind, Library, Method, MethodRole, Modifier, ModifierSet,
    Module, Parameter, ReturnDescriptor, WrapperType,
};

use crate::doc::{extract_doc_blocks, symbol_name, DocComment, SymbolKind};
use crate::error::{Result, ScanError};
use crate::signature::{self, RawFunction};
use crate::strip::normalize;

/// Header text together with the path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSource {
    pub path: String,
    pub text: String,
}

impl HeaderSource {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a header from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }

    /// Module name: the header's file name without its extension.
    pub fn module_name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Result of assembling a library: the IR plus every per-symbol diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub library: Library,
    pub diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Builds a [`Library`] from header sources.
#[derive(Debug, Clone)]
pub struct Assembler {
    name: String,
    prefix: String,
    dependencies: Dependencies,
}

type DocTable = BTreeMap<String, std::result::Result<DocComment, ScanError>>;

impl Assembler {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            dependencies: Dependencies::default(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Assemble all headers, in order, into one library.
    pub fn assemble(&self, headers: &[HeaderSource]) -> Assembly {
        let mut diagnostics = Vec::new();
        let mut seen_types = BTreeSet::new();
        let modules = headers
            .iter()
            .map(|h| self.assemble_module(h, &mut seen_types, &mut diagnostics))
            .collect();

        Assembly {
            library: Library {
                name: self.name.clone(),
                prefix: self.prefix.clone(),
                modules,
                dependencies: self.dependencies.clone(),
            },
            diagnostics,
        }
    }

    fn assemble_module(
        &self,
        header: &HeaderSource,
        seen_types: &mut BTreeSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Module {
        let docs = doc_table(&header.text);
        let scanned = signature::scan(&normalize(&header.text));
        tracing::debug!(
            header = %header.path,
            types = scanned.types.len(),
            functions = scanned.functions.len(),
            docs = docs.len(),
            "scanned header"
        );

        let mut types = Vec::new();
        for cname in &scanned.types {
            if !seen_types.insert(cname.clone()) {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::DuplicateType,
                    cname,
                    "type declared more than once; keeping the first declaration",
                ));
                continue;
            }
            types.push(self.wrapper_type(cname, &docs));
        }

        let mut seen_functions = BTreeSet::new();
        for function in &scanned.functions {
            if !seen_functions.insert(function.name.as_str()) {
                tracing::trace!(symbol = %function.name, "ignoring repeated prototype");
                continue;
            }
            if let Some((owner, method, role)) =
                associate(function, &types, &docs, diagnostics)
            {
                attach(&mut types[owner], method, role, diagnostics);
            }
        }

        Module {
            name: header.module_name(),
            file: header.path.clone(),
            types,
            enums: scanned.enums,
            callbacks: scanned.callbacks,
            doc: String::new(),
        }
    }

    fn wrapper_type(&self, cname: &str, docs: &DocTable) -> WrapperType {
        let name = strip_prefix_once(cname, &self.prefix);
        let class_doc = [symbol_prefix(cname), cname.to_string()]
            .iter()
            .filter_map(|key| docs.get(key))
            .filter_map(|doc| doc.as_ref().ok())
            .find(|doc| doc.kind() == Some(SymbolKind::Class) && !doc.description.is_empty())
            .map(|doc| doc.description.clone());

        WrapperType {
            doc: class_doc
                .unwrap_or_else(|| format!("Class {name} bound from native type {cname}")),
            name,
            cname: cname.to_string(),
            constructor: None,
            destructor: None,
            methods: Vec::new(),
        }
    }
}

/// Role of an associated function within its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Constructor,
    Destructor,
    Method,
}

/// Doc comments of one header keyed by canonical symbol name.
fn doc_table(text: &str) -> DocTable {
    let mut table = DocTable::new();
    for body in extract_doc_blocks(text) {
        let Some(symbol) = symbol_name(&body) else {
            continue;
        };
        if table.contains_key(&symbol) {
            tracing::trace!(%symbol, "ignoring repeated doc comment");
            continue;
        }
        table.insert(symbol, DocComment::parse(&body));
    }
    table
}

/// Index of the type owning `symbol` by longest matching symbol prefix.
pub fn resolve_owner(symbol: &str, types: &[WrapperType]) -> Option<(usize, Vec<usize>)> {
    let mut matches: Vec<(usize, usize)> = types
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let prefix = t.symbol_prefix();
            symbol
                .strip_prefix(prefix.as_str())
                .filter(|rest| rest.starts_with('_') && rest.len() > 1)
                .map(|_| (prefix.len(), i))
        })
        .collect();
    // Longest prefix first; declaration order breaks equal lengths.
    matches.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let best = matches.first()?.1;
    Some((best, matches.into_iter().map(|(_, i)| i).collect()))
}

fn associate(
    function: &RawFunction,
    types: &[WrapperType],
    docs: &DocTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(usize, Method, Slot)> {
    let symbol = function.name.as_str();
    let doc = match docs.get(symbol) {
        None => {
            tracing::debug!(%symbol, "dropping undocumented symbol");
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::UndocumentedSymbol,
                symbol,
                "no doc comment; parameter modifiers unknown, symbol skipped",
            ));
            return None;
        }
        Some(Err(e)) => {
            tracing::debug!(%symbol, error = %e, "dropping symbol with malformed doc comment");
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::DocParseError,
                symbol,
                e.to_string(),
            ));
            return None;
        }
        Some(Ok(doc)) => doc,
    };

    if doc.kind() == Some(SymbolKind::Initializer) {
        diagnostics.push(Diagnostic::info(
            DiagnosticKind::InitializerSkipped,
            symbol,
            "initializers are not exposed",
        ));
        return None;
    }

    let Some((owner, candidates)) = resolve_owner(symbol, types) else {
        tracing::debug!(%symbol, "no owning type");
        diagnostics.push(Diagnostic::warning(
            DiagnosticKind::UnassociatedSymbol,
            symbol,
            "name matches no type declared in this header",
        ));
        return None;
    };
    let ty = &types[owner];
    if candidates.len() > 1 {
        let others: Vec<&str> = candidates[1..]
            .iter()
            .map(|i| types[*i].cname.as_str())
            .collect();
        tracing::debug!(%symbol, owner = %ty.cname, ?others, "longest prefix wins");
        diagnostics.push(Diagnostic::info(
            DiagnosticKind::DuplicateAssociation,
            symbol,
            format!(
                "matches {} and {}; longest prefix selects {}",
                ty.cname,
                others.join(", "),
                ty.cname
            ),
        ));
    }

    let classification = doc.classification.as_ref();
    if let Some(declared) = classification.and_then(|c| c.owner.as_deref()) {
        let prefix = ty.symbol_prefix();
        if declared != prefix && declared != ty.cname && declared != ty.name {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::OwnerMismatch,
                symbol,
                format!(
                    "doc comment names owner '{declared}' but the name resolves to {}",
                    ty.cname
                ),
            ));
        }
    }

    let member = symbol[ty.symbol_prefix().len() + 1..].to_string();
    let slot = match member.as_str() {
        "new" => Slot::Constructor,
        "free" => Slot::Destructor,
        _ => Slot::Method,
    };

    let role = match classification {
        Some(c) if c.kind == SymbolKind::Getter && slot == Slot::Method => MethodRole::Getter {
            property: c.property.clone().unwrap_or_default(),
        },
        Some(c) if c.kind == SymbolKind::Setter && slot == Slot::Method => MethodRole::Setter {
            property: c.property.clone().unwrap_or_default(),
        },
        _ => MethodRole::Method,
    };
    let accessor_modifiers = classification
        .map(|c| c.modifiers.clone())
        .unwrap_or_default();

    let params = build_params(function, ty, slot, doc, &role, &accessor_modifiers);
    if let Err(message) = check_layout(&params) {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::InvalidParameterLayout,
            symbol,
            message,
        ));
        return None;
    }

    let mut returns = doc.returns.as_ref().map(|r| ReturnDescriptor {
        spelling: r.spelling.clone(),
        subtype: r.element.clone(),
        modifiers: r.modifiers.clone(),
    });
    if matches!(role, MethodRole::Getter { .. }) && !accessor_modifiers.is_empty() {
        let desc = returns.get_or_insert_with(|| ReturnDescriptor {
            spelling: function.rtype.clone(),
            subtype: None,
            modifiers: ModifierSet::new(),
        });
        for m in accessor_modifiers.iter() {
            desc.modifiers.insert(m);
        }
    }

    let method = Method {
        name: member,
        cname: symbol.to_string(),
        owner: ty.cname.clone(),
        role,
        rtype: function.rtype.clone(),
        returns,
        params,
        doc: doc.doc_text(),
    };
    Some((owner, method, slot))
}

fn build_params(
    function: &RawFunction,
    ty: &WrapperType,
    slot: Slot,
    doc: &DocComment,
    role: &MethodRole,
    accessor_modifiers: &ModifierSet,
) -> Vec<Parameter> {
    let mut receiver_marked = slot == Slot::Constructor;
    let mut optional_seen = false;
    let mut params: Vec<Parameter> = function
        .params
        .iter()
        .map(|raw| {
            let receiver = !receiver_marked && base_type(&raw.ctype) == ty.cname;
            receiver_marked |= receiver;

            let mut modifiers = doc
                .param(&raw.name)
                .map(|p| p.modifiers.clone())
                .unwrap_or_default();
            if raw.varargs {
                modifiers.insert(Modifier::Varargs);
            } else if !receiver {
                if optional_seen {
                    modifiers.insert(Modifier::Optional);
                }
                optional_seen |= modifiers.contains(Modifier::Optional);
            }

            Parameter {
                name: raw.name.clone(),
                ctype: raw.ctype.clone(),
                modifiers,
                receiver,
            }
        })
        .collect();

    if matches!(role, MethodRole::Setter { .. }) && !accessor_modifiers.is_empty() {
        if let Some(value) = params.iter_mut().rev().find(|p| !p.receiver) {
            for m in accessor_modifiers.iter() {
                value.modifiers.insert(m);
            }
        }
    }
    params
}

/// A `len` parameter must directly follow the (non-receiver) buffer it measures.
fn check_layout(params: &[Parameter]) -> std::result::Result<(), String> {
    for (i, p) in params.iter().enumerate() {
        if !p.has(Modifier::Len) {
            continue;
        }
        let buffer = i.checked_sub(1).map(|j| &params[j]);
        match buffer {
            Some(b) if !b.receiver && !b.is_varargs() && !b.has(Modifier::Len) => {}
            _ => {
                return Err(format!(
                    "length parameter '{}' does not follow a buffer parameter",
                    p.name
                ))
            }
        }
    }
    Ok(())
}

fn attach(ty: &mut WrapperType, method: Method, slot: Slot, diagnostics: &mut Vec<Diagnostic>) {
    let target = match slot {
        Slot::Constructor => &mut ty.constructor,
        Slot::Destructor => &mut ty.destructor,
        Slot::Method => {
            ty.methods.push(method);
            return;
        }
    };
    if let Some(existing) = target {
        diagnostics.push(Diagnostic::warning(
            DiagnosticKind::DuplicateRole,
            &method.cname,
            format!("{} already fills this role for {}", existing.cname, ty.cname),
        ));
        return;
    }
    *target = Some(method);
}
