//! Override validation, run before anything is rendered.

use gluegen_ir::{Library, Method, WrapperType};

use crate::error::{EmitError, Result};
use crate::overrides::{Override, OverrideRegistry};
use crate::registry::{TypeRegistry, WrapperInfo};

/// Name of the glue function generated (or hand-written) for `method`.
pub fn glue_function(info: &WrapperInfo, ty: &WrapperType, method: &Method) -> String {
    let is = |slot: &Option<Method>| slot.as_ref().is_some_and(|m| m.cname == method.cname);
    if is(&ty.constructor) {
        format!("{}_init", info.object)
    } else if is(&ty.destructor) {
        format!("{}_dealloc", info.object)
    } else {
        format!("{}_{}", info.object, method.name)
    }
}

fn find_method<'a>(library: &'a Library, symbol: &str) -> Option<(&'a WrapperType, &'a Method)> {
    library
        .types()
        .flat_map(|(_, ty)| ty.all_methods().map(move |m| (ty, m)))
        .find(|(_, m)| m.cname == symbol)
}

/// Check every override against the library.
///
/// Method overrides must name a scanned function; field overrides must name a
/// wrapper type; verbatim text must define the glue function it replaces.
pub fn validate_overrides(
    library: &Library,
    types: &TypeRegistry,
    overrides: &OverrideRegistry,
) -> Result<()> {
    for (symbol, value) in overrides.iter() {
        let is_type = types.get(symbol).is_some() || types.by_object(symbol).is_some();
        let method = find_method(library, symbol);
        match value {
            Override::ExtraFields(_) => {
                if is_type {
                    continue;
                }
                if method.is_some() {
                    return Err(EmitError::InvalidOverride {
                        symbol: symbol.to_string(),
                        detail: "`fields` can only extend a wrapper type".to_string(),
                    });
                }
            }
            Override::Verbatim(text) => {
                if let Some((ty, m)) = method {
                    let Some(info) = types.get(&ty.cname) else {
                        continue;
                    };
                    let function = glue_function(info, ty, m);
                    let defined = text.contains(&format!("{function} ("))
                        || text.contains(&format!("{function}("));
                    if !defined {
                        return Err(EmitError::MissingOverrideDefinition {
                            symbol: symbol.to_string(),
                            function,
                        });
                    }
                    continue;
                }
                if is_type {
                    return Err(EmitError::InvalidOverride {
                        symbol: symbol.to_string(),
                        detail: "a wrapper type cannot be replaced verbatim".to_string(),
                    });
                }
            }
            Override::Suppressed => {
                if method.is_some() {
                    continue;
                }
                if is_type {
                    return Err(EmitError::InvalidOverride {
                        symbol: symbol.to_string(),
                        detail: "a wrapper type cannot be suppressed".to_string(),
                    });
                }
            }
        }
        return Err(EmitError::UnresolvedOverride {
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gluegen_ir::{Dependencies, MethodRole, Module, Parameter};

    fn method(name: &str) -> Method {
        Method {
            name: name.to_string(),
            cname: format!("x_foo_{name}"),
            owner: "XFoo".to_string(),
            role: MethodRole::Method,
            rtype: "void".to_string(),
            returns: None,
            params: vec![Parameter {
                name: "foo".to_string(),
                ctype: "XFoo *".to_string(),
                modifiers: Default::default(),
                receiver: true,
            }],
            doc: String::new(),
        }
    }

    fn library() -> Library {
        Library {
            name: "x".to_string(),
            prefix: "X".to_string(),
            modules: vec![Module {
                name: "foo".to_string(),
                file: "foo.h".to_string(),
                types: vec![WrapperType {
                    name: "Foo".to_string(),
                    cname: "XFoo".to_string(),
                    constructor: Some(method("new")),
                    destructor: Some(method("free")),
                    methods: vec![method("send")],
                    doc: String::new(),
                }],
                enums: vec![],
                callbacks: vec![],
                doc: String::new(),
            }],
            dependencies: Dependencies::default(),
        }
    }

    fn check(overrides: &str) -> Result<()> {
        let lib = library();
        let types = TypeRegistry::build(&lib, &[]);
        validate_overrides(&lib, &types, &OverrideRegistry::parse(overrides)?)
    }

    #[test]
    fn glue_function_names_by_slot() {
        let lib = library();
        let types = TypeRegistry::build(&lib, &[]);
        let ty = &lib.modules[0].types[0];
        let info = types.get("XFoo").unwrap();
        let names: Vec<_> = ty.all_methods().map(|m| glue_function(info, ty, m)).collect();
        assert_eq!(
            names,
            vec!["PyFooObject_init", "PyFooObject_send", "PyFooObject_dealloc"]
        );
    }

    #[test]
    fn accepts_well_formed_overrides() {
        check(
            r#"
[[override]]
symbol = "x_foo_send"
verbatim = "static PyObject *\nPyFooObject_send (PyFooObject *self, PyObject *args)\n{ Py_RETURN_NONE; }"

[[override]]
symbol = "x_foo_free"
suppress = true

[[override]]
symbol = "XFoo"
fields = ["cb"]
"#,
        )
        .unwrap();
    }

    #[test]
    fn dangling_symbol_is_unresolved() {
        let err = check("[[override]]\nsymbol = \"x_foo_gone\"\nsuppress = true\n").unwrap_err();
        assert!(matches!(err, EmitError::UnresolvedOverride { symbol } if symbol == "x_foo_gone"));
    }

    #[test]
    fn verbatim_must_define_referenced_function() {
        let err = check("[[override]]\nsymbol = \"x_foo_new\"\nverbatim = \"static int other (void) {}\"\n")
            .unwrap_err();
        assert!(matches!(
            err,
            EmitError::MissingOverrideDefinition { function, .. } if function == "PyFooObject_init"
        ));
    }

    #[test]
    fn shapes_must_fit_their_target() {
        let err = check("[[override]]\nsymbol = \"x_foo_send\"\nfields = [\"cb\"]\n").unwrap_err();
        assert!(matches!(err, EmitError::InvalidOverride { .. }));
        let err = check("[[override]]\nsymbol = \"PyFooObject\"\nsuppress = true\n").unwrap_err();
        assert!(matches!(err, EmitError::InvalidOverride { .. }));
    }
}
