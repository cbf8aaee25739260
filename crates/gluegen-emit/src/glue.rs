//! Per-type glue: wrap helper, initializer, methods, properties,
//! deallocator, method and property tables, and the type object.

use gluegen_ir::naming::{camel_to_underscore, normalize_ctype, pointer_depth};
use gluegen_ir::{Diagnostic, DiagnosticKind, Method, MethodRole, WrapperType};

use crate::ast::{Function, Item, Stmt};
use crate::callback::{callback_items, takes_callback};
use crate::lifecycle::{dealloc, gc_items, type_flags, wrap_function, Lifecycle};
use crate::mapping::{Element, ReturnMarshal, TypeMapper};
use crate::overrides::OverrideRegistry;
use crate::plan::{plan_call, CallPlan};
use crate::printer::c_string;
use crate::registry::{ModuleNames, WrapperInfo};
use crate::validate::glue_function;

/// Shared read-only state for emitting types.
#[derive(Debug, Clone, Copy)]
pub struct GlueContext<'a> {
    pub mapper: &'a TypeMapper<'a>,
    pub overrides: &'a OverrideRegistry,
    pub lifecycle: &'a Lifecycle,
}

/// Glue for one wrapper type.
#[derive(Debug, Clone, Default)]
pub struct TypeGlue {
    pub items: Vec<Item>,
    /// `PyMethodDef` rows for methods without a receiver; these live in the
    /// module's function table rather than on the type.
    pub functions: Vec<String>,
    pub uses_time: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// A method that made it into the method table.
struct Bound<'m> {
    method: &'m Method,
    function: String,
    host_arity: usize,
}

/// Emit everything for `ty`, in definition order.
pub fn emit_type(ctx: GlueContext<'_>, module: &ModuleNames, ty: &WrapperType) -> TypeGlue {
    let mut out = TypeGlue::default();
    let Some(info) = ctx.mapper.types().get(&ty.cname) else {
        return out;
    };
    let cyclic = ctx.lifecycle.is_cyclic(&ty.cname);
    let fields = ctx.lifecycle.fields(&ty.cname);

    if cyclic {
        out.items.extend(gc_items(info, fields));
    }
    out.items.push(Item::Function(wrap_function(info, cyclic)));

    let has_init = emit_constructor(ctx, info, ty, &mut out);

    let mut bound = Vec::new();
    for method in &ty.methods {
        if !method.has_receiver() {
            if let Some(b) = emit_method(ctx, info, ty, method, fields, true, &mut out) {
                let name = format!("{}_{}", camel_to_underscore(&info.export_name), method.name);
                out.functions.push(method_row(&name, &b));
            }
            continue;
        }
        if let Some(b) = emit_method(ctx, info, ty, method, fields, false, &mut out) {
            bound.push(b);
        }
    }

    emit_destructor(ctx, info, ty, cyclic, &mut out);

    let rows = bound
        .iter()
        .map(|b| method_row(&b.method.name, b))
        .collect();
    out.items.push(Item::Array {
        storage: "static".to_string(),
        ty: "PyMethodDef".to_string(),
        name: format!("{}_methods", info.object),
        rows,
        sentinel: Some("{ NULL }".to_string()),
    });

    let has_getset = emit_properties(info, &bound, &mut out);

    let mut slots = vec![
        format!(".tp_name = \"{}.{}\"", module.qualified, info.export_name),
        format!(".tp_basicsize = sizeof ({})", info.object),
        format!(".tp_dealloc = (destructor) {}_dealloc", info.object),
        format!(".tp_flags = {}", type_flags(cyclic)),
        format!(".tp_doc = {}", c_string(&ty.doc)),
    ];
    if cyclic {
        slots.push(format!(".tp_traverse = (traverseproc) {}_traverse", info.object));
        slots.push(format!(".tp_clear = (inquiry) {}_clear", info.object));
    }
    slots.push(format!(".tp_methods = {}_methods", info.object));
    if cyclic {
        slots.push(format!(".tp_members = {}_members", info.object));
    }
    if has_getset {
        slots.push(format!(".tp_getset = {}_getset", info.object));
    }
    if has_init {
        slots.push(format!(".tp_init = (initproc) {}_init", info.object));
    }
    slots.push(if cyclic {
        format!(".tp_new = {}_new", info.object)
    } else {
        ".tp_new = PyType_GenericNew".to_string()
    });
    out.items.push(Item::StructInit {
        storage: "static".to_string(),
        ty: "PyTypeObject".to_string(),
        name: info.type_object.clone(),
        head: Some("PyVarObject_HEAD_INIT (NULL, 0)".to_string()),
        fields: slots,
    });
    out
}

fn method_row(name: &str, bound: &Bound<'_>) -> String {
    let flags = if bound.host_arity == 0 {
        "METH_NOARGS"
    } else {
        "METH_VARARGS"
    };
    format!(
        "{{ \"{name}\", (PyCFunction) {}, {flags}, {} }}",
        bound.function,
        c_string(&bound.method.doc)
    )
}

fn requires_override(out: &mut TypeGlue, method: &Method, reason: &str) {
    tracing::debug!(symbol = %method.cname, reason, "omitting method");
    out.diagnostics.push(Diagnostic::warning(
        DiagnosticKind::RequiresOverride,
        &method.cname,
        format!("{reason}; provide an override"),
    ));
}

fn note_unmapped(out: &mut TypeGlue, method: &Method, plan: &CallPlan) {
    for name in &plan.unmapped {
        out.diagnostics.push(Diagnostic::info(
            DiagnosticKind::UnmappedType,
            &method.cname,
            format!("parameter `{name}` is passed as a host object"),
        ));
    }
}

/// Returns whether the type ends up with an initializer.
fn emit_constructor(
    ctx: GlueContext<'_>,
    info: &WrapperInfo,
    ty: &WrapperType,
    out: &mut TypeGlue,
) -> bool {
    let Some(ctor) = &ty.constructor else {
        out.diagnostics.push(Diagnostic::warning(
            DiagnosticKind::MissingConstructor,
            &ty.cname,
            "no constructor; instances can only come from native code",
        ));
        return false;
    };
    if let Some(text) = ctx.overrides.verbatim(&ctor.cname) {
        out.items.push(Item::Verbatim(text.to_string()));
        return true;
    }
    if ctx.overrides.is_suppressed(&ctor.cname) {
        return false;
    }
    let plan = match plan_call(ctor, ctx.mapper, "-1") {
        Ok(plan) => plan,
        Err(reason) => {
            requires_override(out, ctor, &reason);
            return false;
        }
    };
    note_unmapped(out, ctor, &plan);
    out.uses_time |= plan.uses_time;

    let mut body = plan.decls.clone();
    if !body.is_empty() {
        body.push(Stmt::Blank);
    }
    body.push(plan.parse_stmt("-1"));
    body.extend(plan.checks.iter().cloned());
    body.extend(plan.conversions.iter().cloned());
    body.push(Stmt::expr(format!(
        "self->inner = {}",
        plan.call_expr(&ctor.cname)
    )));
    body.push(Stmt::if_then(
        "self->inner == NULL",
        Stmt::raise("PyExc_ValueError", "Probable error in parameters", "-1"),
    ));
    body.push(Stmt::ret("0"));

    out.items.push(Item::Function(
        Function::new(
            "int",
            format!("{}_init", info.object),
            vec![
                format!("{} *self", info.object),
                "PyObject *args".to_string(),
                "PyObject *kwds".to_string(),
            ],
        )
        .with_body(body),
    ));
    true
}

fn emit_method<'m>(
    ctx: GlueContext<'_>,
    info: &WrapperInfo,
    ty: &WrapperType,
    method: &'m Method,
    fields: &[String],
    module_level: bool,
    out: &mut TypeGlue,
) -> Option<Bound<'m>> {
    let function = glue_function(info, ty, method);
    if ctx.overrides.is_suppressed(&method.cname) {
        tracing::debug!(symbol = %method.cname, "suppressed by override");
        return None;
    }
    if let Some(text) = ctx.overrides.verbatim(&method.cname) {
        out.items.push(Item::Verbatim(text.to_string()));
        return Some(Bound {
            method,
            function,
            host_arity: method.host_params().filter(|p| !p.is_varargs()).count(),
        });
    }

    if takes_callback(method, ctx.mapper) {
        if module_level {
            requires_override(out, method, "callback registration without a receiver");
            return None;
        }
        if !ctx.lifecycle.is_cyclic(&ty.cname) {
            requires_override(
                out,
                method,
                &format!("callback registration on {} which stores no host references", ty.cname),
            );
            return None;
        }
        return match callback_items(info, method, fields, ctx.mapper) {
            Ok(items) => {
                out.items.extend(items);
                Some(Bound {
                    method,
                    function,
                    host_arity: 2,
                })
            }
            Err(reason) => {
                requires_override(out, method, &reason);
                None
            }
        };
    }

    let plan = match plan_call(method, ctx.mapper, "NULL") {
        Ok(plan) => plan,
        Err(reason) => {
            requires_override(out, method, &reason);
            return None;
        }
    };
    let lowering = match lower_return(ctx.mapper, method, &plan.call_expr(&method.cname)) {
        Ok(lowering) => lowering,
        Err(reason) => {
            requires_override(out, method, &reason);
            return None;
        }
    };
    note_unmapped(out, method, &plan);
    out.uses_time |= plan.uses_time || lowering.uses_time;

    let mut body = plan.decls.clone();
    body.extend(lowering.decls);
    if !body.is_empty() {
        body.push(Stmt::Blank);
    }
    if plan.host_arity > 0 {
        body.push(plan.parse_stmt("NULL"));
    }
    body.extend(plan.checks.iter().cloned());
    body.extend(plan.conversions.iter().cloned());
    body.extend(lowering.body);

    let first = if module_level {
        "PyObject *module".to_string()
    } else {
        format!("{} *self", info.object)
    };
    out.items.push(Item::Function(
        Function::new(
            "PyObject *",
            function.clone(),
            vec![first, "PyObject *args".to_string()],
        )
        .with_body(body),
    ));
    Some(Bound {
        method,
        function,
        host_arity: plan.host_arity,
    })
}

fn emit_destructor(
    ctx: GlueContext<'_>,
    info: &WrapperInfo,
    ty: &WrapperType,
    cyclic: bool,
    out: &mut TypeGlue,
) {
    let Some(dtor) = &ty.destructor else {
        out.diagnostics.push(Diagnostic::warning(
            DiagnosticKind::MissingDestructor,
            &ty.cname,
            "no destructor; native handles are never released",
        ));
        out.items.push(Item::Function(dealloc(info, cyclic, None)));
        return;
    };
    if let Some(text) = ctx.overrides.verbatim(&dtor.cname) {
        out.items.push(Item::Verbatim(text.to_string()));
        return;
    }
    let free = (!ctx.overrides.is_suppressed(&dtor.cname)).then_some(dtor.cname.as_str());
    out.items.push(Item::Function(dealloc(info, cyclic, free)));
}

/// Property table from getters without host arguments and setters with one.
fn emit_properties(info: &WrapperInfo, bound: &[Bound<'_>], out: &mut TypeGlue) -> bool {
    let mut rows = Vec::new();
    for getter in bound {
        let MethodRole::Getter { property } = &getter.method.role else {
            continue;
        };
        if getter.host_arity != 0 || rows.iter().any(|(p, _): &(String, String)| p == property) {
            continue;
        }
        let get_fn = format!("{}_prop_get_{property}", info.object);
        out.items.push(Item::Function(
            Function::new(
                "PyObject *",
                get_fn.clone(),
                vec![format!("{} *self", info.object), "void *closure".to_string()],
            )
            .with_body(vec![Stmt::ret(format!("{} (self, NULL)", getter.function))]),
        ));

        let setter = bound.iter().find(|b| {
            b.host_arity == 1
                && matches!(&b.method.role, MethodRole::Setter { property: p } if p == property)
        });
        let set_fn = match setter {
            Some(setter) => {
                let set_fn = format!("{}_prop_set_{property}", info.object);
                out.items.push(Item::Function(property_setter(info, &set_fn, property, &setter.function)));
                format!("(setter) {set_fn}")
            }
            None => "NULL".to_string(),
        };
        rows.push((
            property.clone(),
            format!(
                "{{ \"{property}\", (getter) {get_fn}, {set_fn}, {}, NULL }}",
                c_string(&getter.method.doc)
            ),
        ));
    }
    if rows.is_empty() {
        return false;
    }
    out.items.push(Item::Array {
        storage: "static".to_string(),
        ty: "PyGetSetDef".to_string(),
        name: format!("{}_getset", info.object),
        rows: rows.into_iter().map(|(_, row)| row).collect(),
        sentinel: Some("{ NULL }".to_string()),
    });
    true
}

fn property_setter(info: &WrapperInfo, name: &str, property: &str, method_fn: &str) -> Function {
    Function::new(
        "int",
        name,
        vec![
            format!("{} *self", info.object),
            "PyObject *value".to_string(),
            "void *closure".to_string(),
        ],
    )
    .with_body(vec![
        Stmt::decl("PyObject *", "args"),
        Stmt::decl("PyObject *", "ret"),
        Stmt::Blank,
        Stmt::if_then(
            "value == NULL",
            Stmt::raise(
                "PyExc_TypeError",
                &format!("Cannot delete the {property} attribute"),
                "-1",
            ),
        ),
        Stmt::expr("args = PyTuple_Pack (1, value)"),
        Stmt::if_then("args == NULL", vec![Stmt::ret("-1")]),
        Stmt::expr(format!("ret = {method_fn} (self, args)")),
        Stmt::expr("Py_DECREF (args)"),
        Stmt::if_then("ret == NULL", vec![Stmt::ret("-1")]),
        Stmt::expr("Py_DECREF (ret)"),
        Stmt::ret("0"),
    ])
}

/// Statements turning the native call into a host return value.
struct Lowering {
    decls: Vec<Stmt>,
    body: Vec<Stmt>,
    uses_time: bool,
}

fn lower_return(
    mapper: &TypeMapper<'_>,
    method: &Method,
    call: &str,
) -> std::result::Result<Lowering, String> {
    let rtype = normalize_ctype(&method.rtype);
    let mut decls = Vec::new();
    let mut uses_time = false;
    let body = match mapper.returns(method) {
        ReturnMarshal::Void => vec![Stmt::expr(call), Stmt::expr("Py_RETURN_NONE")],
        ReturnMarshal::Wrapper(info) => vec![Stmt::ret(format!(
            "{} (({} *) {call})",
            info.from_macro, info.cname
        ))],
        ReturnMarshal::Opaque(rule) => {
            decls.push(Stmt::decl(&rtype, "ret"));
            vec![
                Stmt::expr(format!("ret = {call}")),
                Stmt::if_then("ret == NULL", vec![Stmt::expr("Py_RETURN_NONE")]),
                Stmt::ret(format!("{} (ret)", rule.wrap)),
            ]
        }
        ReturnMarshal::Time { nullable } => {
            uses_time = true;
            decls.push(Stmt::decl(&rtype, "ret"));
            decls.push(Stmt::decl("struct tm *", "tm"));
            let mut body = vec![Stmt::expr(format!("ret = {call}"))];
            if nullable {
                body.push(Stmt::if_then("ret == 0", vec![Stmt::expr("Py_RETURN_NONE")]));
            }
            body.push(Stmt::expr("tm = localtime (&ret)"));
            body.push(Stmt::if_then(
                "tm == NULL",
                Stmt::raise("PyExc_ValueError", "invalid time", "NULL"),
            ));
            body.push(Stmt::ret(
                "PyDateTime_FromDateAndTime (tm->tm_year + 1900, tm->tm_mon + 1, tm->tm_mday, \
                 tm->tm_hour, tm->tm_min, tm->tm_sec, 0)",
            ));
            body
        }
        ReturnMarshal::Enum(_) => vec![Stmt::ret(format!("PyLong_FromLong ((long) {call})"))],
        ReturnMarshal::Primitive(rule) if rule.is_object() => {
            decls.push(Stmt::decl(&rtype, "ret"));
            object_return(call)
        }
        ReturnMarshal::Primitive(rule) => match &rule.from_native {
            Some(convert) => vec![Stmt::ret(format!("{convert} ({call})"))],
            None => vec![Stmt::ret(format!(
                "Py_BuildValue ({}, {call})",
                c_string(&rule.build)
            ))],
        },
        ReturnMarshal::Object => {
            if pointer_depth(&rtype) == 0 {
                return Err(format!("return type {rtype} has no host conversion"));
            }
            decls.push(Stmt::decl(&rtype, "ret"));
            object_return(call)
        }
        ReturnMarshal::Sequence { container, element } => {
            decls.push(Stmt::decl(&rtype, "ret"));
            decls.push(Stmt::decl(&rtype, "node"));
            decls.push(Stmt::decl("PyObject *", "list"));
            decls.push(Stmt::decl("PyObject *", "item"));
            let data = format!("node->{}", container.data);
            let mut each = element_conversion(element, &data);
            each.push(Stmt::if_then(
                "item == NULL",
                vec![Stmt::expr("Py_DECREF (list)"), Stmt::ret("NULL")],
            ));
            each.push(Stmt::if_then(
                "PyList_Append (list, item) < 0",
                vec![
                    Stmt::expr("Py_DECREF (item)"),
                    Stmt::expr("Py_DECREF (list)"),
                    Stmt::ret("NULL"),
                ],
            ));
            each.push(Stmt::expr("Py_DECREF (item)"));
            vec![
                Stmt::expr(format!("ret = {call}")),
                Stmt::expr("list = PyList_New (0)"),
                Stmt::if_then("list == NULL", vec![Stmt::ret("NULL")]),
                Stmt::For {
                    init: "node = ret".to_string(),
                    cond: "node != NULL".to_string(),
                    step: format!("node = node->{}", container.next),
                    body: each,
                },
                Stmt::ret("list"),
            ]
        }
    };
    Ok(Lowering {
        decls,
        body,
        uses_time,
    })
}

fn object_return(call: &str) -> Vec<Stmt> {
    vec![
        Stmt::expr(format!("ret = {call}")),
        Stmt::if_then("ret == NULL", vec![Stmt::expr("Py_RETURN_NONE")]),
        Stmt::expr("Py_INCREF ((PyObject *) ret)"),
        Stmt::ret("(PyObject *) ret"),
    ]
}

fn element_conversion(element: Element<'_>, data: &str) -> Vec<Stmt> {
    match element {
        Element::Wrapper(info) => vec![Stmt::expr(format!(
            "item = {} (({} *) {data})",
            info.from_macro, info.cname
        ))],
        Element::Opaque(rule) => vec![Stmt::expr(format!(
            "item = {} (({} *) {data})",
            rule.wrap,
            gluegen_ir::naming::base_type(&rule.ctype)
        ))],
        Element::Primitive(rule) => match &rule.from_native {
            Some(convert) => vec![Stmt::expr(format!("item = {convert} ((long) {data})"))],
            None => vec![Stmt::expr(format!(
                "item = Py_BuildValue ({}, ({}) {data})",
                c_string(&rule.build),
                rule.ctype
            ))],
        },
        Element::Object => vec![
            Stmt::expr(format!(
                "item = {data} != NULL ? (PyObject *) {data} : Py_None"
            )),
            Stmt::expr("Py_INCREF (item)"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CFile;
    use crate::mapping::MappingConfig;
    use crate::overrides::Override;
    use crate::printer::print_file;
    use crate::registry::{CallbackRegistry, EnumRegistry, TypeRegistry};
    use gluegen_ir::{
        Dependencies, Library, Modifier, ModifierSet, Module, Parameter, ReturnDescriptor,
    };

    fn param(name: &str, ctype: &str, mods: &[Modifier], receiver: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            ctype: ctype.to_string(),
            modifiers: mods.iter().copied().collect(),
            receiver,
        }
    }

    fn method(name: &str, rtype: &str, role: MethodRole, params: Vec<Parameter>) -> Method {
        Method {
            name: name.to_string(),
            cname: format!("x_foo_{name}"),
            owner: "XFoo".to_string(),
            role,
            rtype: rtype.to_string(),
            returns: None,
            params,
            doc: format!("Docs for {name}."),
        }
    }

    fn this() -> Parameter {
        param("foo", "XFoo *", &[], true)
    }

    fn foo() -> WrapperType {
        let mut children = method("get_children", "x_list_t *", MethodRole::Method, vec![this()]);
        children.returns = Some(ReturnDescriptor {
            spelling: "x_list".to_string(),
            subtype: Some("x_foo".to_string()),
            modifiers: ModifierSet::new(),
        });
        let mut published = method("get_published", "time_t", MethodRole::Method, vec![this()]);
        published.returns = Some(ReturnDescriptor {
            spelling: "time_t".to_string(),
            subtype: None,
            modifiers: [Modifier::Nullable].into_iter().collect(),
        });
        WrapperType {
            name: "Foo".to_string(),
            cname: "XFoo".to_string(),
            constructor: Some(method(
                "new",
                "XFoo *",
                MethodRole::Method,
                vec![param("name", "const char *", &[], false)],
            )),
            destructor: Some(method("free", "void", MethodRole::Method, vec![this()])),
            methods: vec![
                method(
                    "get_title",
                    "const char *",
                    MethodRole::Getter {
                        property: "title".to_string(),
                    },
                    vec![this()],
                ),
                method(
                    "set_title",
                    "void",
                    MethodRole::Setter {
                        property: "title".to_string(),
                    },
                    vec![this(), param("title", "const char *", &[], false)],
                ),
                method(
                    "get_updated",
                    "time_t",
                    MethodRole::Method,
                    vec![this()],
                ),
                published,
                method(
                    "set_deadline",
                    "void",
                    MethodRole::Method,
                    vec![this(), param("deadline", "time_t", &[], false)],
                ),
                children,
                method(
                    "publish_text",
                    "int",
                    MethodRole::Method,
                    vec![param("to", "const char *", &[], false)],
                ),
                method(
                    "query",
                    "int",
                    MethodRole::Method,
                    vec![this(), param("result", "int *", &[Modifier::Out], false)],
                ),
            ],
            doc: "A foo.".to_string(),
        }
    }

    fn library() -> Library {
        Library {
            name: "x".to_string(),
            prefix: "X".to_string(),
            modules: vec![Module {
                name: "foo".to_string(),
                file: "foo.h".to_string(),
                types: vec![foo()],
                enums: vec![],
                callbacks: vec![],
                doc: String::new(),
            }],
            dependencies: Dependencies::default(),
        }
    }

    fn emit(overrides: OverrideRegistry) -> (TypeGlue, String) {
        let lib = library();
        let config = MappingConfig::default();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);
        let lifecycle = Lifecycle::analyze(&lib, &types, &overrides);
        let ctx = GlueContext {
            mapper: &mapper,
            overrides: &overrides,
            lifecycle: &lifecycle,
        };
        let glue = emit_type(ctx, &ModuleNames::new("x", "foo"), &lib.modules[0].types[0]);
        let text = print_file(&CFile {
            items: glue.items.clone(),
        });
        (glue, text)
    }

    #[test]
    fn constructor_signals_null_handle() {
        let (_, text) = emit(OverrideRegistry::new());
        assert!(text.contains("PyFooObject_init (PyFooObject *self, PyObject *args, PyObject *kwds)"));
        assert!(text.contains("self->inner = x_foo_new (name);"));
        assert!(text.contains("\"Probable error in parameters\""));
    }

    #[test]
    fn sequence_return_walks_list_in_order() {
        let (glue, text) = emit(OverrideRegistry::new());
        let file = CFile { items: glue.items };
        let f = file.function("PyFooObject_get_children").unwrap();
        assert!(f.statements().iter().any(|s| matches!(s, Stmt::For { .. })));
        assert!(text.contains("list = PyList_New (0);"));
        assert!(text.contains("for (node = ret; node != NULL; node = node->next)"));
        assert!(text.contains("item = PyFoo_FromFoo ((XFoo *) node->data);"));
        assert!(text.contains("return list;"));
    }

    fn function_text(glue: &TypeGlue, name: &str) -> String {
        let file = CFile {
            items: glue.items.clone(),
        };
        let f = file.function(name).unwrap().clone();
        print_file(&CFile {
            items: vec![Item::Function(f)],
        })
    }

    #[test]
    fn time_return_converts_through_localtime() {
        let (glue, _) = emit(OverrideRegistry::new());
        assert!(glue.uses_time);
        let text = function_text(&glue, "PyFooObject_get_updated");
        assert!(text.contains("tm = localtime (&ret);"));
        assert!(!text.contains("if (ret == 0)"));
    }

    #[test]
    fn nullable_time_return_maps_zero_to_none() {
        let (glue, _) = emit(OverrideRegistry::new());
        let text = function_text(&glue, "PyFooObject_get_published");
        assert!(text.contains(
            "  ret = x_foo_get_published (self->inner);\n  if (ret == 0)\n    Py_RETURN_NONE;\n  \
             tm = localtime (&ret);\n"
        ));
    }

    #[test]
    fn unrepresentable_time_raises_instead_of_dereferencing() {
        let (glue, _) = emit(OverrideRegistry::new());
        for name in ["PyFooObject_get_updated", "PyFooObject_get_published"] {
            let text = function_text(&glue, name);
            let guard = text
                .find("  if (tm == NULL)\n    {\n      PyErr_SetString (PyExc_ValueError, \"invalid time\");\n      return NULL;\n    }\n")
                .unwrap();
            assert!(guard > text.find("tm = localtime (&ret);").unwrap());
            assert!(guard < text.find("tm->tm_year").unwrap());
        }
    }

    #[test]
    fn required_time_parameter_is_checked_before_conversion() {
        let (glue, _) = emit(OverrideRegistry::new());
        let text = function_text(&glue, "PyFooObject_set_deadline");
        let check = text
            .find("  if (!PyDateTime_Check (deadline))\n    {\n      PyErr_SetString (PyExc_TypeError, \"deadline must be a datetime\");\n      return NULL;\n    }\n")
            .unwrap();
        let convert = text.find("_time_deadline = mktime (&_tm_deadline);").unwrap();
        assert!(check < convert);
        assert!(!text.contains("deadline != Py_None"));
        assert!(text.contains("x_foo_set_deadline (self->inner, _time_deadline);"));
    }

    #[test]
    fn accessors_become_properties() {
        let (_, text) = emit(OverrideRegistry::new());
        assert!(text.contains(
            "{ \"title\", (getter) PyFooObject_prop_get_title, (setter) PyFooObject_prop_set_title, \"Docs for get_title.\", NULL },"
        ));
        assert!(text.contains("args = PyTuple_Pack (1, value);"));
        assert!(text.contains("{ \"get_title\", (PyCFunction) PyFooObject_get_title, METH_NOARGS,"));
        assert!(text.contains("{ \"set_title\", (PyCFunction) PyFooObject_set_title, METH_VARARGS,"));
    }

    #[test]
    fn out_parameters_are_omitted_with_warning() {
        let (glue, text) = emit(OverrideRegistry::new());
        assert!(!text.contains("PyFooObject_query"));
        let warn = glue
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::RequiresOverride)
            .unwrap();
        assert_eq!(warn.symbol, "x_foo_query");
    }

    #[test]
    fn verbatim_and_suppressed_methods() {
        let mut overrides = OverrideRegistry::new();
        overrides
            .insert(
                "x_foo_query",
                Override::Verbatim(
                    "static PyObject *\nPyFooObject_query (PyFooObject *self, PyObject *args)\n{\n  Py_RETURN_NONE;\n}"
                        .to_string(),
                ),
            )
            .unwrap();
        overrides.insert("x_foo_get_updated", Override::Suppressed).unwrap();
        let (glue, text) = emit(overrides);
        assert!(text.contains("PyFooObject_query (PyFooObject *self, PyObject *args)\n{\n  Py_RETURN_NONE;\n}"));
        assert!(text.contains("{ \"query\", (PyCFunction) PyFooObject_query, METH_VARARGS,"));
        assert!(!text.contains("get_updated"));
        assert!(glue
            .diagnostics
            .iter()
            .all(|d| d.kind != DiagnosticKind::RequiresOverride));
    }

    #[test]
    fn methods_without_receiver_become_module_functions() {
        let (glue, text) = emit(OverrideRegistry::new());
        assert_eq!(
            glue.functions,
            vec![
                "{ \"foo_publish_text\", (PyCFunction) PyFooObject_publish_text, METH_VARARGS, \"Docs for publish_text.\" }"
                    .to_string()
            ]
        );
        let body = function_text(&glue, "PyFooObject_publish_text");
        assert!(body.contains("PyFooObject_publish_text (PyObject *module, PyObject *args)"));
        assert!(body.contains("x_foo_publish_text (to)"));
        assert!(!body.contains("self"));
        assert!(!text.contains("{ \"publish_text\""));
    }

    #[test]
    fn plain_types_use_generic_allocation() {
        let (_, text) = emit(OverrideRegistry::new());
        assert!(text.contains(".tp_new = PyType_GenericNew,"));
        assert!(text.contains(".tp_name = \"x.foo.Foo\","));
        assert!(!text.contains("_traverse"));
        assert!(text.contains("x_foo_free (self->inner);"));
    }

    #[test]
    fn participants_get_gc_slots() {
        let mut overrides = OverrideRegistry::new();
        overrides
            .insert("XFoo", Override::ExtraFields(vec!["cb".to_string()]))
            .unwrap();
        let (_, text) = emit(overrides);
        assert!(text.contains(".tp_traverse = (traverseproc) PyFooObject_traverse,"));
        assert!(text.contains(".tp_new = PyFooObject_new,"));
        assert!(text.contains("Py_TPFLAGS_HAVE_GC"));
        assert!(!text.contains("x_foo_free (self->inner)"));
    }
}
