//! Callback trampolines.
//!
//! A native function taking `(callback, void *user_data)` gets a trampoline
//! with the callback's native signature. The host object rides along as the
//! user data; the trampoline calls the callable stored in the object's first
//! extra field with the value stored in its second.

use gluegen_ir::naming::{base_type, normalize_ctype};
use gluegen_ir::{Callback, Method};

use crate::ast::{Function, Item, Stmt};
use crate::mapping::{Marshal, TypeMapper};
use crate::plan::local_name;
use crate::printer::c_string;
use crate::registry::WrapperInfo;

/// Whether the method takes a native callback at all.
pub fn takes_callback(method: &Method, mapper: &TypeMapper<'_>) -> bool {
    method
        .host_params()
        .any(|p| matches!(mapper.param(p), Marshal::Callback(_)))
}

/// Trampoline and setter glue for a callback-registering method.
///
/// `fields` are the owner's extra fields. An `Err` carries the reason the
/// method needs a hand-written override instead.
pub fn callback_items(
    info: &WrapperInfo,
    method: &Method,
    fields: &[String],
    mapper: &TypeMapper<'_>,
) -> std::result::Result<Vec<Item>, String> {
    let host: Vec<_> = method.host_params().filter(|p| !p.is_varargs()).collect();
    let [cb_param, data_param] = host.as_slice() else {
        return Err("callback methods must take exactly a callback and its user data".to_string());
    };
    let Marshal::Callback(cb) = mapper.param(cb_param) else {
        return Err("the first argument must be the callback".to_string());
    };
    if normalize_ctype(&data_param.ctype) != "void *" {
        return Err(format!("`{}` must be a void * user data pointer", data_param.name));
    }
    let [callable, data, ..] = fields else {
        return Err(format!(
            "{} needs two extra fields to store a callback and its data",
            info.cname
        ));
    };

    let trampoline = trampoline(info, method, cb, callable, data, mapper)?;
    let tramp_name = trampoline.name.clone();

    let cb_local = local_name(&cb_param.name);
    let data_local = local_name(&data_param.name);
    let native_args: Vec<String> = method
        .params
        .iter()
        .filter(|p| !p.is_varargs())
        .map(|p| {
            if p.receiver {
                "self->inner".to_string()
            } else if p.name == cb_param.name {
                format!("({}) {tramp_name}", cb.name)
            } else {
                "(void *) self".to_string()
            }
        })
        .collect();

    let setter = Function::new(
        "PyObject *",
        format!("{}_{}", info.object, method.name),
        vec![format!("{} *self", info.object), "PyObject *args".to_string()],
    )
    .with_body(vec![
        Stmt::decl_init("PyObject *", &cb_local, "NULL"),
        Stmt::decl_init("PyObject *", &data_local, "NULL"),
        Stmt::Blank,
        Stmt::if_then(
            format!("!PyArg_ParseTuple (args, \"O|O\", &{cb_local}, &{data_local})"),
            vec![Stmt::ret("NULL")],
        ),
        Stmt::if_then(
            format!("!PyCallable_Check ({cb_local})"),
            Stmt::raise(
                "PyExc_TypeError",
                &format!("{} must be callable", cb_param.name),
                "NULL",
            ),
        ),
        Stmt::if_then(
            format!("{data_local} == NULL"),
            vec![Stmt::expr(format!("{data_local} = Py_None"))],
        ),
        Stmt::expr(format!("Py_INCREF ({cb_local})")),
        Stmt::expr(format!("Py_XSETREF (self->{callable}, {cb_local})")),
        Stmt::expr(format!("Py_INCREF ({data_local})")),
        Stmt::expr(format!("Py_XSETREF (self->{data}, {data_local})")),
        Stmt::expr(format!("{} ({})", method.cname, native_args.join(", "))),
        Stmt::expr("Py_RETURN_NONE"),
    ]);

    Ok(vec![Item::Function(trampoline), Item::Function(setter)])
}

fn trampoline(
    info: &WrapperInfo,
    method: &Method,
    cb: &Callback,
    callable: &str,
    data: &str,
    mapper: &TypeMapper<'_>,
) -> std::result::Result<Function, String> {
    let params: Vec<String> = cb.params.iter().map(|p| normalize_ctype(p)).collect();
    let Some(user_data) = params.iter().rposition(|p| p == "void *") else {
        return Err(format!("{} has no void * user data parameter", cb.name));
    };

    let mut codes = String::from("(");
    let mut values = Vec::new();
    for (i, ctype) in params.iter().enumerate() {
        if i == user_data {
            continue;
        }
        let arg = format!("a{i}");
        let (code, value) = build_arg(info, ctype, &arg, mapper).ok_or_else(|| {
            format!("{} argument {i} of type {ctype} has no host conversion", cb.name)
        })?;
        codes.push_str(&code);
        values.push(value);
    }
    codes.push_str("O)");
    values.push(format!("self->{data}"));

    let rtype = normalize_ctype(&cb.rtype);
    let result = match rtype.as_str() {
        "void" => None,
        r if r.ends_with('*') => Some("NULL"),
        _ => Some("0"),
    };
    let exit = || match result {
        Some(value) => Stmt::ret(value),
        None => Stmt::Return(None),
    };

    let mut body = vec![
        Stmt::decl_init(
            format!("{} *", info.object),
            "self",
            format!("({} *) a{user_data}", info.object),
        ),
        Stmt::decl("PyGILState_STATE", "gstate"),
        Stmt::decl("PyObject *", "args"),
        Stmt::decl("PyObject *", "result"),
        Stmt::Blank,
        Stmt::expr("gstate = PyGILState_Ensure ()"),
        Stmt::expr(format!(
            "args = Py_BuildValue ({}, {})",
            c_string(&codes),
            values.join(", ")
        )),
        Stmt::if_then(
            "args == NULL",
            vec![
                Stmt::expr("PyErr_Print ()"),
                Stmt::expr("PyGILState_Release (gstate)"),
                exit(),
            ],
        ),
        Stmt::expr(format!("result = PyObject_CallObject (self->{callable}, args)")),
        Stmt::expr("Py_DECREF (args)"),
        Stmt::if_else(
            "result == NULL",
            vec![Stmt::expr("PyErr_Print ()")],
            vec![Stmt::expr("Py_DECREF (result)")],
        ),
        Stmt::expr("PyGILState_Release (gstate)"),
    ];
    if result.is_some() {
        body.push(exit());
    }

    let params = params
        .iter()
        .enumerate()
        .map(|(i, ctype)| crate::ast::declarator(ctype, &format!("a{i}")))
        .collect();
    Ok(Function::new(rtype, format!("{}_{}_trampoline", info.object, method.name), params)
        .with_body(body))
}

/// `Py_BuildValue` code and value for one native callback argument.
fn build_arg(
    info: &WrapperInfo,
    ctype: &str,
    arg: &str,
    mapper: &TypeMapper<'_>,
) -> Option<(String, String)> {
    if base_type(ctype) == info.cname {
        return Some(("O".to_string(), "(PyObject *) self".to_string()));
    }
    if let Some(other) = mapper.types().resolve_ctype(ctype).filter(|i| i.exposed) {
        return Some((
            "N".to_string(),
            format!("{} (({} *) {arg})", other.from_macro, other.cname),
        ));
    }
    let probe = gluegen_ir::Parameter {
        name: arg.to_string(),
        ctype: ctype.to_string(),
        modifiers: Default::default(),
        receiver: false,
    };
    match mapper.param(&probe) {
        Marshal::Enum(_) => Some(("i".to_string(), format!("(int) {arg}"))),
        Marshal::Primitive(rule) if !rule.build.is_empty() && !rule.is_object() => {
            Some((rule.build.clone(), arg.to_string()))
        }
        _ => None,
    }
}
