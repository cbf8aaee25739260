//! IR data model.
//!
//! Everything here is derived once per run from header text and is not
//! mutated after assembly. All collections are ordered so that serializing
//! the same library twice yields the same bytes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming;

/// A scanned native library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Library name (e.g., "taningia").
    pub name: String,
    /// Namespace prefix removed from native type names to form logical names.
    pub prefix: String,
    /// Modules in header order.
    pub modules: Vec<Module>,
    /// Include dependencies of the generated glue.
    #[serde(default)]
    pub dependencies: Dependencies,
}

/// Public and private include dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Includes placed in generated declaration files.
    #[serde(default)]
    pub public: Vec<String>,
    /// Includes placed only in generated implementation files.
    #[serde(default, rename = "priv")]
    pub private: Vec<String>,
}

/// One scanned header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module name (header basename without extension).
    pub name: String,
    /// Path of the header the module was scanned from.
    pub file: String,
    /// Wrapper types in declaration order.
    #[serde(default)]
    pub types: Vec<WrapperType>,
    /// Enums in declaration order.
    #[serde(default)]
    pub enums: Vec<Enum>,
    /// Function-pointer typedefs in declaration order.
    #[serde(default)]
    pub callbacks: Vec<Callback>,
    /// Module documentation.
    #[serde(default)]
    pub doc: String,
}

/// A native struct type exposed to the host through a wrapper object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperType {
    /// Logical name: the native name with the library prefix removed once.
    pub name: String,
    /// Native type name.
    pub cname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructor: Option<Method>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub doc: String,
}

impl WrapperType {
    /// Underscored prefix shared by all functions operating on this type.
    pub fn symbol_prefix(&self) -> String {
        naming::symbol_prefix(&self.cname)
    }

    /// Constructor, destructor and methods, in emission order.
    pub fn all_methods(&self) -> impl Iterator<Item = &Method> {
        self.constructor
            .iter()
            .chain(self.methods.iter())
            .chain(self.destructor.iter())
    }
}

/// Accessor classification of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MethodRole {
    /// Plain method.
    #[default]
    Method,
    /// Reads the named property.
    Getter { property: String },
    /// Writes the named property.
    Setter { property: String },
}

/// A native function bound to a wrapper type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// Logical name: the native symbol with the owner prefix removed.
    pub name: String,
    /// Native symbol.
    pub cname: String,
    /// Native name of the owning wrapper type, resolved during assembly.
    pub owner: String,
    #[serde(default)]
    pub role: MethodRole,
    /// Native return type spelling.
    pub rtype: String,
    /// Documented return shape, when the doc comment declared one.
    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnDescriptor>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub doc: String,
}

impl Method {
    /// Element type of a container return (`outer(inner)`), if any.
    pub fn element_type(&self) -> Option<&str> {
        self.returns.as_ref().and_then(|r| r.subtype.as_deref())
    }

    /// Modifiers declared on the return value.
    pub fn return_modifiers(&self) -> ModifierSet {
        self.returns
            .as_ref()
            .map(|r| r.modifiers.clone())
            .unwrap_or_default()
    }

    /// Parameters the host passes explicitly (everything but the receiver).
    pub fn host_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| !p.receiver)
    }

    /// Whether the native function takes the owner's handle as a receiver.
    pub fn has_receiver(&self) -> bool {
        self.params.iter().any(|p| p.receiver)
    }
}

/// Documented return shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDescriptor {
    /// Outer type as written in the doc comment.
    #[serde(rename = "type")]
    pub spelling: String,
    /// Element type for container returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "ModifierSet::is_empty")]
    pub modifiers: ModifierSet,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Native type spelling, normalized (`const char *`).
    #[serde(rename = "type")]
    pub ctype: String,
    #[serde(default, skip_serializing_if = "ModifierSet::is_empty")]
    pub modifiers: ModifierSet,
    /// Whether this parameter receives the owning object's handle.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub receiver: bool,
}

impl Parameter {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(modifier)
    }

    pub fn is_varargs(&self) -> bool {
        self.has(Modifier::Varargs)
    }
}

/// Parameter annotation altering marshaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Optional,
    Out,
    Len,
    Nullable,
    Varargs,
}

impl Modifier {
    /// Parse a modifier word as written in doc comments.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "optional" => Some(Modifier::Optional),
            "out" => Some(Modifier::Out),
            "len" => Some(Modifier::Len),
            "nullable" => Some(Modifier::Nullable),
            "varargs" => Some(Modifier::Varargs),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Optional => write!(f, "optional"),
            Modifier::Out => write!(f, "out"),
            Modifier::Len => write!(f, "len"),
            Modifier::Nullable => write!(f, "nullable"),
            Modifier::Varargs => write!(f, "varargs"),
        }
    }
}

/// Ordered set of modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierSet(BTreeSet<Modifier>);

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, modifier: Modifier) -> bool {
        self.0.insert(modifier)
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0.contains(&modifier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A native enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    /// True when the entries are bit flags (`1 << n` values).
    pub flags: bool,
    /// Entry names with value assignments stripped.
    pub entries: Vec<String>,
}

/// A function-pointer typedef.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub name: String,
    /// Native return type spelling.
    pub rtype: String,
    /// Native parameter type spellings.
    pub params: Vec<String>,
}

impl Library {
    /// Iterate every wrapper type together with its module.
    pub fn types(&self) -> impl Iterator<Item = (&Module, &WrapperType)> {
        self.modules
            .iter()
            .flat_map(|m| m.types.iter().map(move |t| (m, t)))
    }

    /// Find a wrapper type by native name.
    pub fn find_type(&self, cname: &str) -> Option<&WrapperType> {
        self.types().map(|(_, t)| t).find(|t| t.cname == cname)
    }

    /// Find a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}
