//! Declaration scanner.
//!
//! Works on normalized header text (see [`crate::strip::normalize`]) one
//! statement at a time. This is a best-effort pattern scan over a
//! constrained C subset, not a C grammar: one declaration per statement,
//! parameter lists without nested parentheses, no macro expansion.

use gluegen_ir::naming::normalize_ctype;
use gluegen_ir::{Callback, Enum};

use crate::error::{Result, ScanError};

/// A scanned function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParam {
    /// Declared name, or `arg<N>` for unnamed parameters, or `...`.
    pub name: String,
    /// Normalized native type spelling (`...` for varargs).
    pub ctype: String,
    pub varargs: bool,
}

/// A scanned function prototype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunction {
    pub name: String,
    /// Normalized return type spelling.
    pub rtype: String,
    pub params: Vec<RawParam>,
}

/// Everything the scanner found in one header, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedHeader {
    /// Wrapper-type candidates from struct typedefs.
    pub types: Vec<String>,
    pub enums: Vec<Enum>,
    pub callbacks: Vec<Callback>,
    pub functions: Vec<RawFunction>,
}

/// Words that name a type rather than a parameter.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "bool",
    "_Bool", "size_t",
];

/// Scan normalized header text.
pub fn scan(normalized: &str) -> ScannedHeader {
    let mut header = ScannedHeader::default();
    for stmt in statements(normalized) {
        if let Err(e) = scan_statement(&stmt, &mut header) {
            tracing::trace!(statement = %stmt, error = %e, "skipping declaration");
        }
    }
    header
}

fn scan_statement(stmt: &str, header: &mut ScannedHeader) -> Result<()> {
    let stmt = stmt.strip_prefix("extern ").unwrap_or(stmt).trim();

    if let Some(rest) = stmt.strip_prefix("typedef ") {
        let rest = rest.trim();
        if rest.contains("(*") {
            header.callbacks.push(parse_callback(rest)?);
        } else if rest.starts_with("enum") {
            header.enums.push(parse_enum(rest, true)?);
        } else if let Some(body) = rest.strip_prefix("struct ") {
            header.types.push(parse_struct_typedef(body)?);
        }
        return Ok(());
    }

    if stmt.starts_with("enum ") && stmt.contains('{') {
        header.enums.push(parse_enum(stmt, false)?);
        return Ok(());
    }

    if stmt.starts_with("struct ") || !stmt.ends_with(')') {
        return Ok(());
    }

    header.functions.push(parse_function(stmt)?);
    Ok(())
}

/// Split normalized text into top-level statements.
///
/// `extern "C" {` wrappers and their closing braces are dropped; function
/// definitions (bodies at top level) are skipped.
fn statements(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in text.chars() {
        match ch {
            '{' => {
                if depth == 0 && current.trim_end().ends_with("extern \"C\"") {
                    current.clear();
                    continue;
                }
                depth += 1;
                current.push(ch);
            }
            '}' => {
                if depth == 0 {
                    current.clear();
                    continue;
                }
                depth -= 1;
                current.push(ch);
                if depth == 0 && is_definition(&current) {
                    tracing::trace!(definition = %current.trim(), "skipping function body");
                    current.clear();
                }
            }
            ';' if depth == 0 => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    out.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    out
}

/// A braced block that closes a function definition rather than a type body.
fn is_definition(stmt: &str) -> bool {
    let head = stmt.trim_start();
    let before_brace = head.split('{').next().unwrap_or("");
    !(head.starts_with("typedef")
        || head.starts_with("enum")
        || head.starts_with("struct")
        || head.starts_with("union")
        || before_brace.contains('='))
        && before_brace.trim_end().ends_with(')')
}

/// Tokenize a declaration fragment, keeping `*` as separate tokens.
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for part in s.split_whitespace() {
        let mut remaining = part;
        while !remaining.is_empty() {
            if let Some(star_pos) = remaining.find('*') {
                if star_pos > 0 {
                    tokens.push(&remaining[..star_pos]);
                }
                tokens.push("*");
                remaining = &remaining[star_pos + 1..];
            } else {
                tokens.push(remaining);
                break;
            }
        }
    }
    tokens
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(detail: impl Into<String>) -> ScanError {
    ScanError::InvalidDeclaration {
        detail: detail.into(),
    }
}

/// `_XFoo XFoo` or `{ ... } XFoo`, after `typedef struct `.
fn parse_struct_typedef(body: &str) -> Result<String> {
    let name = match body.rfind('}') {
        Some(close) => body[close + 1..].split(',').next().unwrap_or("").trim(),
        None => {
            let tokens = tokenize(body);
            if tokens.len() != 2 {
                return Err(invalid(format!("unsupported struct typedef '{body}'")));
            }
            tokens[1]
        }
    };
    if !is_identifier(name) {
        return Err(invalid(format!("struct typedef without a plain name: '{body}'")));
    }
    Ok(name.to_string())
}

/// `enum [tag] { A = 1 << 0, B } Name` (typedef form) or `enum Name { ... }`.
fn parse_enum(text: &str, typedef: bool) -> Result<Enum> {
    let open = text.find('{').ok_or_else(|| invalid("enum without a body"))?;
    let close = text.rfind('}').ok_or_else(|| invalid("unterminated enum body"))?;
    if close < open {
        return Err(invalid("malformed enum body"));
    }
    let body = &text[open + 1..close];

    let name = if typedef {
        text[close + 1..].trim()
    } else {
        text["enum".len()..open].trim()
    };
    if !is_identifier(name) {
        return Err(invalid(format!("enum without a plain name: '{text}'")));
    }

    let entries = body
        .split(',')
        .map(|entry| entry.split('=').next().unwrap_or("").trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if is_identifier(entry) {
                Ok(entry.to_string())
            } else {
                Err(invalid(format!("bad enum entry '{entry}' in {name}")))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Enum {
        name: name.to_string(),
        flags: body.contains("<<"),
        entries,
    })
}

/// `R (*name) (params)`, after `typedef `.
fn parse_callback(text: &str) -> Result<Callback> {
    let star = text.find("(*").ok_or_else(|| invalid("callback without '(*'"))?;
    let rtype = normalize_ctype(&text[..star]);
    let after = &text[star + 2..];
    let name_end = after
        .find(')')
        .ok_or_else(|| invalid("unterminated callback name"))?;
    let name = after[..name_end].trim();
    if !is_identifier(name) {
        return Err(invalid(format!("bad callback name '{name}'")));
    }
    let rest = after[name_end + 1..].trim();
    let params = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| invalid(format!("callback '{name}' without parameter list")))?;
    let params = parse_params(params)?
        .into_iter()
        .map(|p| p.ctype)
        .collect();

    Ok(Callback {
        name: name.to_string(),
        rtype,
        params,
    })
}

/// `R name (params)`.
fn parse_function(stmt: &str) -> Result<RawFunction> {
    let open = stmt.find('(').ok_or_else(|| invalid("missing '('"))?;
    let params = &stmt[open + 1..stmt.len() - 1];
    if params.contains('(') || params.contains(')') {
        return Err(invalid("nested parentheses in parameter list"));
    }

    let mut tokens = tokenize(&stmt[..open]);
    tokens.retain(|t| *t != "static" && *t != "inline");
    let name = match tokens.pop() {
        Some(name) if is_identifier(name) => name,
        _ => return Err(invalid(format!("missing function name in '{stmt}'"))),
    };
    if tokens.is_empty() {
        return Err(invalid(format!("missing return type for '{name}'")));
    }

    Ok(RawFunction {
        name: name.to_string(),
        rtype: normalize_ctype(&tokens.join(" ")),
        params: parse_params(params)?,
    })
}

fn parse_params(text: &str) -> Result<Vec<RawParam>> {
    let text = text.trim();
    if text.is_empty() || text == "void" {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(i, p)| parse_param(p.trim(), i))
        .collect()
}

fn parse_param(text: &str, index: usize) -> Result<RawParam> {
    if text == "..." {
        return Ok(RawParam {
            name: "...".to_string(),
            ctype: "...".to_string(),
            varargs: true,
        });
    }

    // `char *argv[]` is `char **argv`
    let (text, array) = match text.find('[') {
        Some(bracket) => (&text[..bracket], true),
        None => (text, false),
    };
    let mut tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(invalid(format!("empty parameter {index}")));
    }

    let type_words = tokens
        .iter()
        .filter(|t| !matches!(**t, "*" | "const" | "struct" | "enum" | "volatile"))
        .count();
    let last = tokens[tokens.len() - 1];
    let named = type_words >= 2 && is_identifier(last) && !TYPE_KEYWORDS.contains(&last);

    let name = if named {
        tokens.pop();
        last.to_string()
    } else {
        format!("arg{index}")
    };
    let mut ctype = normalize_ctype(&tokens.join(" "));
    if array {
        ctype = normalize_ctype(&format!("{ctype} *"));
    }

    Ok(RawParam {
        name,
        ctype,
        varargs: false,
    })
}
