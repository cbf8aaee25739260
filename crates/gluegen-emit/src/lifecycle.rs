//! Object lifecycle glue: allocation, deallocation and the cycle-collector
//! protocol for wrappers that hold host references.

use std::collections::BTreeMap;

use gluegen_ir::Library;

use crate::ast::{Function, Item, Stmt};
use crate::overrides::OverrideRegistry;
use crate::registry::{TypeRegistry, WrapperInfo};

/// Cyclic-collection participants of a library.
///
/// Computed once before any type is emitted: the flags, allocator and
/// destructor of a type all depend on it.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    participants: BTreeMap<String, Vec<String>>,
}

impl Lifecycle {
    pub fn analyze(library: &Library, types: &TypeRegistry, overrides: &OverrideRegistry) -> Self {
        let mut participants = BTreeMap::new();
        for (_, ty) in library.types() {
            let Some(info) = types.get(&ty.cname) else {
                continue;
            };
            let fields = overrides.extra_fields(&info.cname, &info.object);
            if !fields.is_empty() {
                tracing::debug!(ty = %ty.cname, fields = ?fields, "cyclic collection participant");
                participants.insert(ty.cname.clone(), fields.to_vec());
            }
        }
        Self { participants }
    }

    pub fn is_cyclic(&self, cname: &str) -> bool {
        self.participants.contains_key(cname)
    }

    /// Extra host-reference fields of a wrapper; empty for non-participants.
    pub fn fields(&self, cname: &str) -> &[String] {
        self.participants
            .get(cname)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants.keys().map(String::as_str)
    }
}

/// `tp_flags` value for a wrapper type.
pub fn type_flags(cyclic: bool) -> String {
    if cyclic {
        "Py_TPFLAGS_DEFAULT | Py_TPFLAGS_BASETYPE | Py_TPFLAGS_HAVE_GC".to_string()
    } else {
        "Py_TPFLAGS_DEFAULT | Py_TPFLAGS_BASETYPE".to_string()
    }
}

/// Traverse, clear, allocation and member table of a participant.
pub fn gc_items(info: &WrapperInfo, fields: &[String]) -> Vec<Item> {
    let object = &info.object;
    let self_param = format!("{object} *self");

    let mut traverse: Vec<Stmt> = fields
        .iter()
        .map(|f| Stmt::expr(format!("Py_VISIT (self->{f})")))
        .collect();
    traverse.push(Stmt::ret("0"));

    let mut clear: Vec<Stmt> = fields
        .iter()
        .map(|f| Stmt::expr(format!("Py_CLEAR (self->{f})")))
        .collect();
    clear.push(Stmt::ret("0"));

    let mut alloc = vec![
        Stmt::decl(format!("{object} *"), "self"),
        Stmt::Blank,
        Stmt::expr(format!("self = ({object} *) type->tp_alloc (type, 0)")),
        Stmt::if_then("self == NULL", vec![Stmt::ret("NULL")]),
        Stmt::expr("self->inner = NULL"),
    ];
    for f in fields {
        alloc.push(Stmt::expr("Py_INCREF (Py_None)"));
        alloc.push(Stmt::expr(format!("self->{f} = Py_None")));
    }
    alloc.push(Stmt::ret("(PyObject *) self"));

    let members = fields
        .iter()
        .map(|f| format!("{{ \"{f}\", T_OBJECT_EX, offsetof ({object}, {f}), 0, \"{f}\" }}"))
        .collect();

    vec![
        Item::Function(
            Function::new(
                "int",
                format!("{object}_traverse"),
                vec![self_param.clone(), "visitproc visit".into(), "void *arg".into()],
            )
            .with_body(traverse),
        ),
        Item::Function(
            Function::new("int", format!("{object}_clear"), vec![self_param]).with_body(clear),
        ),
        Item::Function(
            Function::new(
                "PyObject *",
                format!("{object}_new"),
                vec![
                    "PyTypeObject *type".into(),
                    "PyObject *args".into(),
                    "PyObject *kwds".into(),
                ],
            )
            .with_body(alloc),
        ),
        Item::Array {
            storage: "static".to_string(),
            ty: "PyMemberDef".to_string(),
            name: format!("{object}_members"),
            rows: members,
            sentinel: Some("{ NULL }".to_string()),
        },
    ]
}

/// Wrap a native handle into a new host object; `NULL` becomes `None`.
pub fn wrap_function(info: &WrapperInfo, cyclic: bool) -> Function {
    let object = &info.object;
    let alloc = if cyclic {
        format!("self = ({object} *) {object}_new (&{}, NULL, NULL)", info.type_object)
    } else {
        format!(
            "self = ({object} *) {ty}.tp_alloc (&{ty}, 0)",
            ty = info.type_object
        )
    };
    Function::new(
        "PyObject *",
        info.wrap_fn.clone(),
        vec![format!("{} *inner", info.cname)],
    )
    .with_body(vec![
        Stmt::decl(format!("{object} *"), "self"),
        Stmt::Blank,
        Stmt::if_then("inner == NULL", vec![Stmt::expr("Py_RETURN_NONE")]),
        Stmt::expr(alloc),
        Stmt::if_then("self == NULL", vec![Stmt::ret("NULL")]),
        Stmt::expr("self->inner = inner"),
        Stmt::ret("(PyObject *) self"),
    ])
}

/// Deallocator. Participants leave everything to their clear routine; other
/// types release the native handle through `native_free` when one exists.
pub fn dealloc(info: &WrapperInfo, cyclic: bool, native_free: Option<&str>) -> Function {
    let object = &info.object;
    let mut body = Vec::new();
    if cyclic {
        body.push(Stmt::expr("PyObject_GC_UnTrack (self)"));
        body.push(Stmt::expr(format!("{object}_clear (self)")));
    } else if let Some(free) = native_free {
        body.push(Stmt::if_then(
            "self->inner",
            vec![Stmt::expr(format!("{free} (self->inner)"))],
        ));
    }
    body.push(Stmt::expr("Py_TYPE (self)->tp_free ((PyObject *) self)"));
    Function::new("void", format!("{object}_dealloc"), vec![format!("{object} *self")])
        .with_body(body)
}
