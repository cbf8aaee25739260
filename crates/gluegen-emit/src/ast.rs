//! Structured C output.
//!
//! Marshaling decisions build these nodes; [`crate::printer`] turns them into
//! text. Keeping the two apart lets tests inspect what was decided without
//! matching on formatted source.

/// One generated C file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CFile {
    pub items: Vec<Item>,
}

impl CFile {
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    /// All functions in the file, in order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().find(|f| f.name == name)
    }
}

/// Top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// `/* text */`
    Comment(String),
    /// `#include <path>` or `#include "path"`.
    Include { path: String, system: bool },
    /// `#define name value`; a multi-line value gets continuation lines.
    Define { name: String, value: String },
    /// Any other preprocessor or raw line, printed as is.
    Line(String),
    /// `typedef struct { head; fields; } name;`
    Struct {
        name: String,
        head: Option<String>,
        fields: Vec<Field>,
    },
    /// A single declaration statement (`static PyTypeObject PyFooType;`).
    Declaration(String),
    Function(Function),
    /// `storage ty name[] = { rows, sentinel };`
    Array {
        storage: String,
        ty: String,
        name: String,
        rows: Vec<String>,
        sentinel: Option<String>,
    },
    /// `storage ty name = { head fields };`
    StructInit {
        storage: String,
        ty: String,
        name: String,
        head: Option<String>,
        fields: Vec<String>,
    },
    /// Hand-written source copied unchanged.
    Verbatim(String),
    Blank,
}

/// A struct member declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub ty: String,
    pub name: String,
}

impl Field {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub is_static: bool,
    pub ret: String,
    pub name: String,
    /// Full parameter declarations (`PyObject *args`).
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(ret: impl Into<String>, name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            is_static: true,
            ret: ret.into(),
            name: name.into(),
            params,
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    /// Every statement of the body, nested ones included, depth first.
    pub fn statements(&self) -> Vec<&Stmt> {
        fn walk<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a Stmt>) {
            for s in stmts {
                out.push(s);
                match s {
                    Stmt::If {
                        then, otherwise, ..
                    } => {
                        walk(then, out);
                        walk(otherwise, out);
                    }
                    Stmt::For { body, .. } | Stmt::Block(body) => walk(body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.body, &mut out);
        out
    }

    /// Number of `return` statements, nested ones included.
    pub fn exit_count(&self) -> usize {
        self.statements()
            .iter()
            .filter(|s| matches!(s, Stmt::Return(_)))
            .count()
    }
}

/// A statement inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Local declaration with optional initializer.
    Decl {
        ty: String,
        name: String,
        init: Option<String>,
    },
    /// Expression statement; the printer adds the semicolon.
    Expr(String),
    Return(Option<String>),
    If {
        cond: String,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    For {
        init: String,
        cond: String,
        step: String,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Comment(String),
    Blank,
}

impl Stmt {
    pub fn decl(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Stmt::Decl {
            ty: ty.into(),
            name: name.into(),
            init: None,
        }
    }

    pub fn decl_init(ty: impl Into<String>, name: impl Into<String>, init: impl Into<String>) -> Self {
        Stmt::Decl {
            ty: ty.into(),
            name: name.into(),
            init: Some(init.into()),
        }
    }

    pub fn expr(text: impl Into<String>) -> Self {
        Stmt::Expr(text.into())
    }

    pub fn ret(value: impl Into<String>) -> Self {
        Stmt::Return(Some(value.into()))
    }

    pub fn if_then(cond: impl Into<String>, then: Vec<Stmt>) -> Self {
        Stmt::If {
            cond: cond.into(),
            then,
            otherwise: Vec::new(),
        }
    }

    pub fn if_else(cond: impl Into<String>, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            cond: cond.into(),
            then,
            otherwise,
        }
    }

    /// `PyErr_SetString (exc, "message");` followed by `return failure;`.
    pub fn raise(exception: &str, message: &str, failure: &str) -> Vec<Stmt> {
        vec![
            Stmt::expr(format!(
                "PyErr_SetString ({exception}, {})",
                crate::printer::c_string(message)
            )),
            Stmt::ret(failure),
        ]
    }
}

/// `ty name` with the star of a pointer type attached to the name.
pub fn declarator(ty: &str, name: &str) -> String {
    if ty.ends_with('*') {
        format!("{ty}{name}")
    } else {
        format!("{ty} {name}")
    }
}
