//! Name derivation shared by the scanner and the emitter.
//!
//! Native names come in two shapes: CamelCase struct typedefs (`XFoo`) and
//! underscored `_t` typedefs (`ta_atom_entry_t`). Functions operating on a
//! type share its underscored *symbol prefix* (`x_foo_`, `ta_atom_entry_`).

/// Remove `prefix` from `name` exactly once, wherever it first occurs.
///
/// An empty prefix leaves the name untouched.
pub fn strip_prefix_once(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    name.replacen(prefix, "", 1)
}

/// Convert `XFooBar` into `x_foo_bar`.
pub fn camel_to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i != 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

/// Convert `use_colors` into `UseColors`.
pub fn underscore_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Underscored prefix shared by all functions of a native type.
///
/// `ta_atom_entry_t` -> `ta_atom_entry`, `XFoo` -> `x_foo`.
pub fn symbol_prefix(cname: &str) -> String {
    match cname.strip_suffix("_t") {
        Some(stem) => stem.to_string(),
        None => camel_to_underscore(cname),
    }
}

/// CamelCase name used for host-side identifiers of a wrapper type.
///
/// `log_t` -> `Log`, `Foo` -> `Foo`.
pub fn host_name(logical: &str) -> String {
    let stem = logical.strip_suffix("_t").unwrap_or(logical);
    underscore_to_camel(stem)
}

/// Default namespace prefix of a library: its first character, upper-cased.
pub fn default_prefix(library: &str) -> String {
    library
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

/// Native type with qualifiers and pointer stars removed.
///
/// `const XFoo *` -> `XFoo`.
pub fn base_type(ctype: &str) -> String {
    ctype
        .replace('*', " ")
        .split_whitespace()
        .filter(|w| *w != "const" && *w != "struct")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of pointer indirections in a type spelling.
pub fn pointer_depth(ctype: &str) -> usize {
    ctype.chars().filter(|c| *c == '*').count()
}

pub fn is_pointer(ctype: &str) -> bool {
    pointer_depth(ctype) > 0
}

/// Canonical spelling of a native type: single spaces between words and one
/// space before the run of stars (`const char*` -> `const char *`).
pub fn normalize_ctype(ctype: &str) -> String {
    let depth = pointer_depth(ctype);
    let words = ctype
        .replace('*', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if depth == 0 {
        words
    } else {
        format!("{words} {}", "*".repeat(depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_removes_first_occurrence_only() {
        assert_eq!(strip_prefix_once("XFoo", "X"), "Foo");
        assert_eq!(strip_prefix_once("XFooX", "X"), "FooX");
        assert_eq!(strip_prefix_once("log_t", "T"), "log_t");
        assert_eq!(strip_prefix_once("XFoo", ""), "XFoo");
    }

    #[test]
    fn camel_and_underscore_conversions() {
        assert_eq!(camel_to_underscore("XFoo"), "x_foo");
        assert_eq!(camel_to_underscore("JAtomEntry"), "j_atom_entry");
        assert_eq!(underscore_to_camel("use_colors"), "UseColors");
        assert_eq!(underscore_to_camel("atom_entry"), "AtomEntry");
    }

    #[test]
    fn symbol_prefix_handles_both_naming_styles() {
        assert_eq!(symbol_prefix("ta_atom_entry_t"), "ta_atom_entry");
        assert_eq!(symbol_prefix("XFoo"), "x_foo");
        assert_eq!(symbol_prefix("log_t"), "log");
    }

    #[test]
    fn host_name_strips_typedef_suffix() {
        assert_eq!(host_name("log_t"), "Log");
        assert_eq!(host_name("Foo"), "Foo");
        assert_eq!(host_name("ta_xmpp_client_t"), "TaXmppClient");
    }

    #[test]
    fn default_prefix_is_upper_first_char() {
        assert_eq!(default_prefix("taningia"), "T");
        assert_eq!(default_prefix(""), "");
    }

    #[test]
    fn type_spellings_normalize() {
        assert_eq!(normalize_ctype("const  char*"), "const char *");
        assert_eq!(normalize_ctype("char **"), "char **");
        assert_eq!(normalize_ctype("int"), "int");
        assert_eq!(base_type("const XFoo *"), "XFoo");
        assert_eq!(base_type("struct tm *"), "tm");
        assert!(is_pointer("iks *"));
        assert!(!is_pointer("time_t"));
    }
}
