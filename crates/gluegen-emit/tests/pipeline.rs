//! Scan-to-glue runs over annotated headers.

use gluegen_emit::{EmitError, EmitOptions, EmitOutput, Emitter, OverrideRegistry};
use gluegen_ir::{DiagnosticKind, IrDocument, Library};
use gluegen_scan::{scan_library, HeaderSource};
use pretty_assertions::assert_eq;

const FOO_H: &str = r#"
#ifndef _X_FOO_H_
#define _X_FOO_H_

typedef struct _XFoo XFoo;
typedef struct _XBar XBar;

typedef void (*x_bar_cb_t) (XBar *bar, const char *msg, void *data);

typedef enum {
  X_FOO_PLAIN = 1 << 0,
  X_FOO_FANCY = 1 << 1
} x_foo_style_t;

/**
 * @name: x_foo_new
 * @type: constructor x_foo
 * @param name: Name of the new foo
 */
XFoo *x_foo_new (const char *name);

/**
 * @name: x_foo_free
 * @type: destructor x_foo
 */
void x_foo_free (XFoo *foo);

/**
 * @name: x_foo_get_children
 * @type: method x_foo
 * @return: x_list (x_foo)
 *
 * Children of this foo, in insertion order.
 */
x_list_t *x_foo_get_children (XFoo *foo);

/**
 * @name: x_foo_configure
 * @type: method x_foo
 * @param name: New name
 * @param depth (optional): Nesting depth
 * @param parent: Parent foo
 */
void x_foo_configure (XFoo *foo, const char *name, int depth, XFoo *parent);

/**
 * @name: x_foo_get_style
 * @type: getter x_foo:style
 */
x_foo_style_t x_foo_get_style (XFoo *foo);

/**
 * @name: x_foo_get_published
 * @type: method x_foo
 * @return (nullable): time_t
 */
time_t x_foo_get_published (XFoo *foo);

/**
 * @name: x_foo_expire
 * @type: method x_foo
 * @param when: Expiry date
 */
void x_foo_expire (XFoo *foo, time_t when);

/**
 * @name: x_foo_lookup
 * @type: method x_foo
 * @param name: Name to find
 */
XFoo *x_foo_lookup (const char *name);

/**
 * @name: x_bar_new
 * @type: constructor x_bar
 */
XBar *x_bar_new (void);

/**
 * @name: x_bar_free
 * @type: destructor x_bar
 */
void x_bar_free (XBar *bar);

/**
 * @name: x_bar_set_callback
 * @type: method x_bar
 * @param cb: Called for every message
 * @param data: Passed back to @cb
 */
void x_bar_set_callback (XBar *bar, x_bar_cb_t cb, void *data);

#endif
"#;

const OVERRIDES: &str = r#"
[[override]]
symbol = "XBar"
fields = ["callback", "data"]
"#;

fn library() -> Library {
    let assembly = scan_library("x", "X", &[HeaderSource::new("include/x/foo.h", FOO_H)]);
    assert!(!assembly.has_errors(), "{:?}", assembly.diagnostics);
    assembly.library
}

fn emit(library: Library) -> EmitOutput {
    let overrides = OverrideRegistry::parse(OVERRIDES).unwrap();
    Emitter::new(library, overrides, EmitOptions::default())
        .unwrap()
        .emit_all()
        .unwrap()
}

fn source(output: &EmitOutput) -> &str {
    &output
        .files
        .iter()
        .find(|f| f.name == "foomodule.c")
        .unwrap()
        .contents
}

#[test]
fn generation_is_idempotent() {
    let first = emit(library());
    let second = emit(library());
    assert_eq!(first.files, second.files);
}

#[test]
fn json_round_trip_yields_identical_output() {
    let direct = emit(library());
    let json = IrDocument::new(library()).to_json().unwrap();
    let reloaded = IrDocument::from_json(&json).unwrap().into_library();
    let via_json = emit(reloaded);
    assert_eq!(direct.files, via_json.files);
}

#[test]
fn constructor_takes_the_documented_string() {
    let lib = library();
    let foo = lib.find_type("XFoo").unwrap();
    assert_eq!(foo.name, "Foo");
    let ctor = foo.constructor.as_ref().unwrap();
    assert_eq!(ctor.params.len(), 1);
    assert_eq!(ctor.params[0].name, "name");
    assert_eq!(ctor.params[0].ctype, "const char *");

    let out = emit(lib);
    assert!(source(&out).contains("if (!PyArg_ParseTuple (args, \"s\", &name))\n    return -1;"));
}

#[test]
fn optional_marker_precedes_first_optional_code() {
    let out = emit(library());
    assert!(source(&out).contains(
        "PyArg_ParseTuple (args, \"s|iO\", &name, &depth, &parent)"
    ));
}

#[test]
fn container_return_converts_each_element() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.contains("for (node = ret; node != NULL; node = node->next)"));
    assert!(text.contains("item = PyFoo_FromFoo ((XFoo *) node->data);"));
}

#[test]
fn nullable_time_return_yields_none_for_zero() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.contains(
        "  ret = x_foo_get_published (self->inner);\n  if (ret == 0)\n    Py_RETURN_NONE;\n  \
         tm = localtime (&ret);\n  if (tm == NULL)\n    {\n      \
         PyErr_SetString (PyExc_ValueError, \"invalid time\");\n      return NULL;\n    }\n"
    ));
}

#[test]
fn required_time_argument_is_type_checked_then_converted() {
    let out = emit(library());
    let text = source(&out);
    let start = text.find("PyFooObject_expire (PyFooObject *self, PyObject *args)").unwrap();
    let body = &text[start..];
    let body = &body[..body.find("\n}\n").unwrap()];
    assert!(body.contains("PyArg_ParseTuple (args, \"O\", &when)"));
    let check = body.find("if (!PyDateTime_Check (when))").unwrap();
    let convert = body.find("_time_when = mktime (&_tm_when);").unwrap();
    assert!(check < convert);
    assert!(body.contains("x_foo_expire (self->inner, _time_when);"));
}

#[test]
fn receiverless_functions_land_in_module_table() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.contains("PyFooObject_lookup (PyObject *module, PyObject *args)"));
    assert!(text.contains(
        "static PyMethodDef foo_functions[] = {\n  { \"foo_lookup\", (PyCFunction) PyFooObject_lookup, METH_VARARGS,"
    ));
    assert!(text.contains("  .m_methods = foo_functions,\n"));
    let table = text.find("static PyMethodDef PyFooObject_methods[]").unwrap();
    let table = &text[table..];
    let table = &table[..table.find("};").unwrap()];
    assert!(!table.contains("lookup"));
}

#[test]
fn gc_routines_exist_only_for_participants() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.contains("PyBarObject_traverse (PyBarObject *self, visitproc visit, void *arg)"));
    assert!(text.contains("PyBarObject_clear (PyBarObject *self)"));
    assert!(!text.contains("PyFooObject_traverse"));
    assert!(!text.contains("PyFooObject_clear"));
    assert!(text.contains("x_foo_free (self->inner);"));
    assert!(!text.contains("x_bar_free"));
}

#[test]
fn callback_registration_uses_trampoline() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.contains("PyBarObject_set_callback_trampoline (XBar *a0, const char *a1, void *a2)"));
    assert!(text.contains("gstate = PyGILState_Ensure ();"));
    assert!(text.contains(
        "x_bar_set_callback (self->inner, (x_bar_cb_t) PyBarObject_set_callback_trampoline, (void *) self);"
    ));
    assert!(out
        .diagnostics
        .iter()
        .all(|d| d.kind != DiagnosticKind::RequiresOverride));
}

#[test]
fn module_exports_enums_types_and_capsule() {
    let out = emit(library());
    let text = source(&out);
    assert!(text.starts_with(
        "/* Generated by gluegen from include/x/foo.h. Do not edit. */\n\n#define PY_SSIZE_T_CLEAN\n#define PyFoo_BUILD_CORE\n"
    ));
    assert!(text.contains("PyModule_AddIntConstant (m, \"X_FOO_FANCY\", X_FOO_FANCY);"));
    assert!(text.contains("PyModule_AddObject (m, \"Bar\", (PyObject *) &PyBarType);"));
    assert!(text.contains("capi = PyCapsule_New ((void *) &PyFooAPI_table, \"x.foo._C_API\", NULL);"));
    assert!(text.contains("PyMODINIT_FUNC\nPyInit_foo (void)\n{"));
    assert!(text.contains("{ \"style\", (getter) PyFooObject_prop_get_style, NULL,"));
}

#[test]
fn without_fields_the_callback_method_needs_an_override() {
    let emitter = Emitter::new(library(), OverrideRegistry::new(), EmitOptions::default()).unwrap();
    let out = emitter.emit_all().unwrap();
    assert!(!source(&out).contains("PyBarObject_set_callback"));
    let warning = out
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::RequiresOverride)
        .unwrap();
    assert_eq!(warning.symbol, "x_bar_set_callback");
}

#[test]
fn override_for_unscanned_symbol_aborts() {
    let overrides =
        OverrideRegistry::parse("[[override]]\nsymbol = \"x_foo_gone\"\nsuppress = true\n").unwrap();
    let err = Emitter::new(library(), overrides, EmitOptions::default()).unwrap_err();
    assert!(matches!(err, EmitError::UnresolvedOverride { .. }));
}
