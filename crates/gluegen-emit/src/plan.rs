//! Argument marshaling plan for one native call.
//!
//! Walks a method's parameters once, deciding for each how it is declared,
//! parsed, validated and passed. The plan is pure data; [`crate::glue`]
//! arranges it into a function body.

use gluegen_ir::{Method, Modifier};

use crate::ast::Stmt;
use crate::mapping::{Marshal, TypeMapper};
use crate::printer::c_string;

/// Everything needed to call one native function from parsed host arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallPlan {
    /// `PyArg_ParseTuple` format.
    pub format: String,
    /// Local declarations receiving parsed values.
    pub decls: Vec<Stmt>,
    /// `&local` parse targets, in format order.
    pub targets: Vec<String>,
    /// Type validation run after parsing.
    pub checks: Vec<Stmt>,
    /// Host-to-native conversions run after validation.
    pub conversions: Vec<Stmt>,
    /// Native call arguments, in native parameter order.
    pub native_args: Vec<String>,
    /// Number of host-visible arguments.
    pub host_arity: usize,
    /// Parameters passed through as plain host objects.
    pub unmapped: Vec<String>,
    /// Whether any parameter converts a host date-time.
    pub uses_time: bool,
}

impl CallPlan {
    /// `if (!PyArg_ParseTuple (...)) return failure;`
    pub fn parse_stmt(&self, failure: &str) -> Stmt {
        let mut call = format!("PyArg_ParseTuple (args, {}", c_string(&self.format));
        for target in &self.targets {
            call.push_str(", ");
            call.push_str(target);
        }
        call.push(')');
        Stmt::if_then(format!("!{call}"), vec![Stmt::ret(failure)])
    }

    /// `symbol (arg, arg)`
    pub fn call_expr(&self, symbol: &str) -> String {
        format!("{symbol} ({})", self.native_args.join(", "))
    }
}

/// Local variable name for a parameter; avoids the glue's own locals.
pub fn local_name(param: &str) -> String {
    match param {
        "self" | "module" | "args" | "ret" | "kwds" | "list" | "node" | "item" => format!("{param}_"),
        _ => param.to_string(),
    }
}

/// Plan the call of `method`. `failure` is what the glue returns on error
/// (`NULL` for methods, `-1` for initializers).
///
/// An `Err` carries the reason the method needs a hand-written override.
pub fn plan_call(
    method: &Method,
    mapper: &TypeMapper<'_>,
    failure: &str,
) -> std::result::Result<CallPlan, String> {
    let mut plan = CallPlan::default();
    let mut optional_seen = false;

    for param in &method.params {
        if param.receiver {
            plan.native_args.push("self->inner".to_string());
            continue;
        }
        if param.is_varargs() {
            break;
        }
        if param.has(Modifier::Out) {
            return Err(format!("out parameter `{}` needs hand-written glue", param.name));
        }
        let name = local_name(&param.name);

        if param.has(Modifier::Len) {
            // Pairs with the buffer parsed just before it.
            if !plan.format.ends_with(['s', 'z', 'y']) {
                return Err(format!("len parameter `{}` has no buffer", param.name));
            }
            plan.format.push('#');
            plan.decls.push(Stmt::decl_init("Py_ssize_t", &name, "0"));
            plan.targets.push(format!("&{name}"));
            plan.native_args.push(format!("({}) {name}", param.ctype));
            continue;
        }

        let code = match mapper.param(param) {
            Marshal::Wrapper { info, optional } => {
                object_param(
                    &mut plan,
                    &name,
                    optional,
                    &info.check_macro,
                    &format!("{} object", info.export_name),
                    failure,
                );
                plan.native_args.push(if optional {
                    format!(
                        "({name} != NULL && {name} != Py_None) ? {} ({name}) : NULL",
                        info.as_native
                    )
                } else {
                    format!("{} ({name})", info.as_native)
                });
                "O".to_string()
            }
            Marshal::Opaque { rule, optional } => {
                let what = rule.object.trim_start_matches("Py").trim_end_matches("Object");
                object_param(&mut plan, &name, optional, &rule.check, what, failure);
                plan.native_args.push(if optional {
                    format!(
                        "({name} != NULL && {name} != Py_None) ? {} ({name}) : NULL",
                        rule.unwrap
                    )
                } else {
                    format!("{} ({name})", rule.unwrap)
                });
                "O".to_string()
            }
            Marshal::Time { nullable } => {
                time_param(&mut plan, &name, nullable || param.has(Modifier::Optional), failure);
                "O".to_string()
            }
            Marshal::Enum(_) => {
                plan.decls.push(Stmt::decl_init("int", &name, "0"));
                plan.native_args.push(format!("({}) {name}", param.ctype));
                "i".to_string()
            }
            Marshal::Callback(cb) => {
                return Err(format!(
                    "callback parameter `{}` of type {} needs a trampoline",
                    param.name, cb.name
                ));
            }
            Marshal::Primitive(rule) => {
                if rule.parse.is_empty() {
                    return Err(format!(
                        "parameter `{}` of type {} cannot be parsed",
                        param.name, param.ctype
                    ));
                }
                let init = if rule.decl.ends_with('*') { "NULL" } else { "0" };
                plan.decls.push(Stmt::decl_init(&rule.decl, &name, init));
                plan.native_args.push(if rule.is_object() {
                    format!("(void *) {name}")
                } else if rule.needs_cast() {
                    format!("({}) {name}", param.ctype)
                } else {
                    name.clone()
                });
                rule.parse.clone()
            }
            Marshal::Object => {
                plan.decls.push(Stmt::decl_init("PyObject *", &name, "NULL"));
                plan.native_args.push(format!("({}) {name}", param.ctype));
                plan.unmapped.push(param.name.clone());
                "O".to_string()
            }
        };

        if param.has(Modifier::Optional) && !optional_seen {
            plan.format.push('|');
            optional_seen = true;
        }
        plan.format.push_str(&code);
        plan.targets.push(format!("&{name}"));
        plan.host_arity += 1;
    }
    Ok(plan)
}

fn object_param(
    plan: &mut CallPlan,
    name: &str,
    optional: bool,
    check: &str,
    what: &str,
    failure: &str,
) {
    plan.decls.push(Stmt::decl_init("PyObject *", name, "NULL"));
    let cond = if optional {
        format!("{name} != NULL && {name} != Py_None && !{check} ({name})")
    } else {
        format!("!{check} ({name})")
    };
    plan.checks.push(Stmt::if_then(
        cond,
        Stmt::raise("PyExc_TypeError", &format!("{name} must be a {what}"), failure),
    ));
}

fn time_param(plan: &mut CallPlan, name: &str, nullable: bool, failure: &str) {
    let tm = format!("_tm_{name}");
    let value = format!("_time_{name}");
    plan.uses_time = true;
    plan.decls.push(Stmt::decl_init("PyObject *", name, "NULL"));
    plan.decls.push(Stmt::decl_init("time_t", &value, "0"));

    let present = format!("{name} != NULL && {name} != Py_None");
    let cond = if nullable {
        format!("{present} && !PyDateTime_Check ({name})")
    } else {
        format!("!PyDateTime_Check ({name})")
    };
    plan.checks.push(Stmt::if_then(
        cond,
        Stmt::raise("PyExc_TypeError", &format!("{name} must be a datetime"), failure),
    ));

    let mut convert = vec![
        Stmt::decl("struct tm", &tm),
        Stmt::expr(format!("memset (&{tm}, 0, sizeof (struct tm))")),
        Stmt::expr(format!("{tm}.tm_year = PyDateTime_GET_YEAR ({name}) - 1900")),
        Stmt::expr(format!("{tm}.tm_mon = PyDateTime_GET_MONTH ({name}) - 1")),
        Stmt::expr(format!("{tm}.tm_mday = PyDateTime_GET_DAY ({name})")),
        Stmt::expr(format!("{tm}.tm_hour = PyDateTime_DATE_GET_HOUR ({name})")),
        Stmt::expr(format!("{tm}.tm_min = PyDateTime_DATE_GET_MINUTE ({name})")),
        Stmt::expr(format!("{tm}.tm_sec = PyDateTime_DATE_GET_SECOND ({name})")),
        Stmt::expr(format!("{tm}.tm_isdst = -1")),
        Stmt::expr(format!("{value} = mktime (&{tm})")),
    ];
    convert.push(Stmt::if_then(
        format!("{value} == (time_t) -1"),
        Stmt::raise("PyExc_ValueError", "Invalid date", failure),
    ));
    plan.conversions.push(if nullable {
        Stmt::if_then(present, convert)
    } else {
        Stmt::Block(convert)
    });
    plan.native_args.push(value);
}
