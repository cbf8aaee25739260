//! Structured doc-comment parser.
//!
//! Doc comments are `/** ... */` blocks placed anywhere in a header. Each
//! names the symbol it documents with an `@name:` tag, so association never
//! depends on where the comment sits relative to the declaration.
//!
//! ```text
//! /**
//!  * @name: ta_atom_link::new
//!  * @type: constructor
//!  * @param href: Link target.
//!  * @param title (optional): Link title.
//!  * @return: ta_list (ta_atom_link)
//!  *
//!  * Free text description.
//!  */
//! ```

use gluegen_ir::{Modifier, ModifierSet};

use crate::error::{Result, ScanError};

/// What kind of symbol a doc comment describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    Constructor,
    Destructor,
    Initializer,
    Getter,
    Setter,
    Class,
}

impl SymbolKind {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "constructor" => Some(SymbolKind::Constructor),
            "destructor" => Some(SymbolKind::Destructor),
            "initializer" => Some(SymbolKind::Initializer),
            "getter" => Some(SymbolKind::Getter),
            "setter" => Some(SymbolKind::Setter),
            "class" => Some(SymbolKind::Class),
            _ => None,
        }
    }

    pub fn is_accessor(self) -> bool {
        matches!(self, SymbolKind::Getter | SymbolKind::Setter)
    }
}

/// The `@type:` classification of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: SymbolKind,
    /// Owning type as written in the doc comment (`log`, `ta_atom_link`).
    pub owner: Option<String>,
    /// Accessed property, present for getters and setters.
    pub property: Option<String>,
    /// Modifiers applying to the accessed value.
    pub modifiers: ModifierSet,
}

/// One `@param` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocParam {
    pub name: String,
    pub modifiers: ModifierSet,
    pub text: String,
}

/// The `@return` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocReturn {
    /// Outer spelling (`ta_list` in `ta_list (ta_atom_link)`).
    pub spelling: String,
    /// Element spelling of a container return.
    pub element: Option<String>,
    pub modifiers: ModifierSet,
}

/// A parsed doc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Canonical symbol name (`owner::member` joined with `_`).
    pub symbol: Option<String>,
    /// Owner half of an `owner::member` name.
    pub name_owner: Option<String>,
    /// Member half of an `owner::member` name.
    pub member: Option<String>,
    pub classification: Option<Classification>,
    pub params: Vec<DocParam>,
    pub returns: Option<DocReturn>,
    pub raises: Vec<String>,
    pub description: String,
}

impl DocComment {
    /// Parse a doc-comment body (the text between `/**` and `*/`).
    ///
    /// Missing tags leave the corresponding fields empty; only a malformed
    /// `@type:` marker fails.
    pub fn parse(body: &str) -> Result<Self> {
        let mut doc = DocComment::default();
        let mut type_value: Option<String> = None;
        let mut description: Vec<&str> = Vec::new();
        let mut continuing = false;

        for line in body_lines(body) {
            if line.is_empty() {
                continuing = false;
                if description.last().is_some_and(|l| !l.is_empty()) {
                    description.push("");
                }
                continue;
            }

            let Some(tagged) = line.strip_prefix('@') else {
                if continuing {
                    if let Some(param) = doc.params.last_mut() {
                        if !param.text.is_empty() {
                            param.text.push(' ');
                        }
                        param.text.push_str(line);
                        continue;
                    }
                }
                description.push(line);
                continue;
            };

            let tag_len = tagged
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tagged.len());
            let tag = &tagged[..tag_len];
            let (head, value) = split_header(&tagged[tag_len..]);
            continuing = false;

            match tag {
                "name" => doc.set_name(value),
                "type" => type_value = Some(value.to_string()),
                "param" => {
                    let (name, modifiers) = split_modifiers(head);
                    if name.is_empty() {
                        return Err(ScanError::InvalidDocComment {
                            detail: "@param without a parameter name".to_string(),
                        });
                    }
                    doc.params.push(DocParam {
                        name: name.to_string(),
                        modifiers,
                        text: value.to_string(),
                    });
                    continuing = true;
                }
                "return" | "returns" => {
                    let (_, modifiers) = split_modifiers(head);
                    doc.returns = Some(parse_return(value, modifiers));
                }
                "raise" | "raises" => {
                    doc.raises.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
                other => {
                    tracing::trace!(tag = other, "ignoring unknown doc tag");
                }
            }
        }

        while description.last() == Some(&"") {
            description.pop();
        }
        doc.description = description.join("\n");

        if let Some(value) = type_value {
            doc.classification = Some(doc.classify(&value)?);
        }
        Ok(doc)
    }

    fn set_name(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match value.split_once("::") {
            Some((owner, member)) => {
                let (owner, member) = (owner.trim(), member.trim());
                self.symbol = Some(format!("{owner}_{member}"));
                self.name_owner = Some(owner.to_string());
                self.member = Some(member.to_string());
            }
            None => self.symbol = Some(value.to_string()),
        }
    }

    fn classify(&self, value: &str) -> Result<Classification> {
        let invalid = |detail: String| ScanError::InvalidDocComment { detail };

        let (words, modifiers) = split_modifiers(value);
        let words: Vec<&str> = words.split_whitespace().collect();
        let (kind_word, target) = match words.as_slice() {
            [] => return Err(invalid("@type without a kind".to_string())),
            [kind] => (*kind, None),
            [kind, target] => (*kind, Some(*target)),
            _ => {
                return Err(invalid(format!(
                    "@type '{}' has more than two words",
                    value.trim()
                )))
            }
        };
        let kind = SymbolKind::from_word(kind_word)
            .ok_or_else(|| invalid(format!("unknown @type kind '{kind_word}'")))?;

        let mut owner = self.name_owner.clone();
        let mut property = None;
        if let Some(target) = target {
            match target.split_once(':') {
                Some((o, p)) => {
                    if o.is_empty() || p.is_empty() {
                        return Err(invalid(format!("@type target '{target}' is incomplete")));
                    }
                    if !kind.is_accessor() {
                        return Err(invalid(format!(
                            "property '{p}' given for non-accessor kind '{kind_word}'"
                        )));
                    }
                    owner = Some(o.to_string());
                    property = Some(p.to_string());
                }
                None => owner = Some(target.to_string()),
            }
        }

        if kind.is_accessor() && property.is_none() {
            property = self.default_property();
            if property.is_none() {
                return Err(invalid(format!(
                    "cannot determine the property of accessor '{}'",
                    self.symbol.as_deref().unwrap_or("?")
                )));
            }
        }

        Ok(Classification {
            kind,
            owner,
            property,
            modifiers,
        })
    }

    /// Property implied by an accessor's name.
    fn default_property(&self) -> Option<String> {
        if let Some(member) = &self.member {
            let prop = member
                .strip_prefix("get_")
                .or_else(|| member.strip_prefix("set_"))
                .unwrap_or(member);
            return (!prop.is_empty()).then(|| prop.to_string());
        }
        let symbol = self.symbol.as_deref()?;
        ["_get_", "_set_"]
            .iter()
            .filter_map(|marker| symbol.rfind(marker).map(|i| &symbol[i + marker.len()..]))
            .find(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// Doc entry for a parameter name.
    pub fn param(&self, name: &str) -> Option<&DocParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn kind(&self) -> Option<SymbolKind> {
        self.classification.as_ref().map(|c| c.kind)
    }

    /// Text attached to the generated member: description plus raised errors.
    pub fn doc_text(&self) -> String {
        if self.raises.is_empty() {
            return self.description.clone();
        }
        let raises = format!("Raises: {}", self.raises.join(", "));
        if self.description.is_empty() {
            raises
        } else {
            format!("{}\n\n{raises}", self.description)
        }
    }
}

/// Bodies of all `/** ... */` comments in raw header text, in order.
pub fn extract_doc_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("/**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("*/") else {
            break;
        };
        let body = after.get(1..end).unwrap_or("");
        blocks.push(body.to_string());
        rest = &after[end + 2..];
    }
    blocks
}

/// Canonical `@name:` of a doc body without parsing the rest.
pub fn symbol_name(body: &str) -> Option<String> {
    body_lines(body).find_map(|line| {
        let value = line.strip_prefix("@name")?.trim_start().strip_prefix(':')?;
        let mut doc = DocComment::default();
        doc.set_name(value);
        doc.symbol
    })
}

/// Body lines with indentation and one leading `*` removed.
fn body_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(|line| {
        let line = line.trim();
        line.strip_prefix('*').unwrap_or(line).trim()
    })
}

/// Split `head: value` at the first colon.
fn split_header(rest: &str) -> (&str, &str) {
    match rest.split_once(':') {
        Some((head, value)) => (head.trim(), value.trim()),
        None => (rest.trim(), ""),
    }
}

/// Split `words (mod, mod)` into the words and the modifier set.
fn split_modifiers(text: &str) -> (&str, ModifierSet) {
    let Some(open) = text.find('(') else {
        return (text.trim(), ModifierSet::new());
    };
    let close = text[open..].find(')').map_or(text.len(), |c| open + c);
    let mut modifiers = ModifierSet::new();
    for word in text[open + 1..close]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
    {
        match Modifier::from_word(word) {
            Some(m) => {
                modifiers.insert(m);
            }
            None => tracing::trace!(modifier = word, "ignoring unknown modifier"),
        }
    }
    (text[..open].trim(), modifiers)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `outer (inner)` is a container return; anything else is a plain spelling.
fn parse_return(value: &str, modifiers: ModifierSet) -> DocReturn {
    let container = value
        .strip_suffix(')')
        .and_then(|v| v.split_once('('))
        .map(|(outer, inner)| (outer.trim(), inner.trim()))
        .filter(|(outer, inner)| is_identifier(outer) && is_identifier(inner));

    match container {
        Some((outer, inner)) => DocReturn {
            spelling: outer.to_string(),
            element: Some(inner.to_string()),
            modifiers,
        },
        None => DocReturn {
            spelling: value.to_string(),
            element: None,
            modifiers,
        },
    }
}
