//! Implementation file of a module: includes, per-type glue, the C-API
//! table and the module init function.

use std::collections::{BTreeMap, BTreeSet};

use gluegen_ir::{Library, Module};

use crate::ast::{CFile, Function, Item, Stmt};
use crate::glue::TypeGlue;
use crate::header::banner;
use crate::mapping::MappingConfig;
use crate::printer::c_string;
use crate::registry::{ModuleNames, TypeRegistry};

/// Other modules whose wrapper types `module` references, merged with the
/// configured extras. Sorted; never contains `module` itself.
pub fn module_dependencies(
    module: &Module,
    types: &TypeRegistry,
    configured: &BTreeMap<String, Vec<String>>,
) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    let mut note = |module_name: &str| {
        if module_name != module.name {
            deps.insert(module_name.to_string());
        }
    };
    for ty in &module.types {
        for method in ty.all_methods() {
            for param in method.params.iter().filter(|p| !p.receiver) {
                if let Some(info) = types.resolve_ctype(&param.ctype).filter(|i| i.exposed) {
                    note(&info.module);
                }
            }
            if let Some(info) = types.resolve_ctype(&method.rtype).filter(|i| i.exposed) {
                note(&info.module);
            }
            if let Some(info) = method
                .element_type()
                .and_then(|e| types.resolve_element(e))
                .filter(|i| i.exposed)
            {
                note(&info.module);
            }
        }
    }
    if let Some(extra) = configured.get(&module.name) {
        for dep in extra {
            note(dep);
        }
    }
    deps
}

/// Everything the implementation file is assembled from.
pub struct ModuleParts<'a> {
    pub library: &'a Library,
    pub module: &'a Module,
    pub names: &'a ModuleNames,
    pub types: &'a TypeRegistry,
    pub mapping: &'a MappingConfig,
    pub dependencies: &'a BTreeSet<String>,
    pub glue: Vec<TypeGlue>,
}

/// `<module>module.c`
pub fn module_source(parts: ModuleParts<'_>) -> CFile {
    let ModuleParts {
        library,
        module,
        names,
        types,
        mapping,
        dependencies,
        glue,
    } = parts;
    let uses_time = glue.iter().any(|g| g.uses_time);
    let functions: Vec<String> = glue.iter().flat_map(|g| g.functions.iter().cloned()).collect();
    let infos: Vec<_> = module
        .types
        .iter()
        .filter_map(|ty| types.get(&ty.cname))
        .collect();

    let mut file = CFile::default();
    file.push(banner(module));
    file.push(Item::Blank);
    file.push(Item::Define {
        name: "PY_SSIZE_T_CLEAN".to_string(),
        value: String::new(),
    });
    file.push(Item::Define {
        name: names.build_core.clone(),
        value: String::new(),
    });
    let system = |path: &str| Item::Include {
        path: path.to_string(),
        system: true,
    };
    file.push(system("Python.h"));
    file.push(system("structmember.h"));
    if uses_time {
        file.push(system("string.h"));
        file.push(system("time.h"));
        file.push(system("datetime.h"));
    }
    for dep in &library.dependencies.private {
        file.push(system(dep));
    }
    file.push(Item::Include {
        path: names.header.clone(),
        system: false,
    });
    for dep in dependencies {
        file.push(Item::Include {
            path: ModuleNames::new(&library.name, dep).header,
            system: false,
        });
    }
    for include in mapping.opaque.iter().filter_map(|o| o.include.as_deref()) {
        file.push(system(include));
    }
    file.push(Item::Blank);

    for info in &infos {
        file.push(Item::Declaration(format!(
            "static PyTypeObject {};",
            info.type_object
        )));
        file.push(Item::Declaration(format!(
            "static PyObject *{} ({} *inner);",
            info.wrap_fn, info.cname
        )));
    }
    file.push(Item::Blank);

    for type_glue in glue {
        file.extend(type_glue.items);
    }

    let api_table = format!("{}_table", names.api_var);
    let mut capi_rows = Vec::new();
    for info in &infos {
        capi_rows.push(format!("&{}", info.type_object));
        capi_rows.push(info.wrap_fn.clone());
    }
    if capi_rows.is_empty() {
        capi_rows.push("0".to_string());
    }
    file.push(Item::StructInit {
        storage: "static".to_string(),
        ty: names.capi_struct.clone(),
        name: api_table.clone(),
        head: None,
        fields: capi_rows,
    });

    let mut def_fields = vec![
        format!(".m_name = \"{}\"", names.qualified),
        format!(".m_doc = {}", c_string(&module.doc)),
        ".m_size = -1".to_string(),
    ];
    if !functions.is_empty() {
        let table = format!("{}_functions", module.name);
        file.push(Item::Array {
            storage: "static".to_string(),
            ty: "PyMethodDef".to_string(),
            name: table.clone(),
            rows: functions,
            sentinel: Some("{ NULL }".to_string()),
        });
        def_fields.push(format!(".m_methods = {table}"));
    }
    let def = format!("{}_module", module.name);
    file.push(Item::StructInit {
        storage: "static".to_string(),
        ty: "PyModuleDef".to_string(),
        name: def.clone(),
        head: Some("PyModuleDef_HEAD_INIT,".to_string()),
        fields: def_fields,
    });

    let mut body = vec![
        Stmt::decl("PyObject *", "m"),
        Stmt::decl("PyObject *", "capi"),
        Stmt::Blank,
    ];
    if uses_time {
        body.push(Stmt::expr("PyDateTime_IMPORT"));
        body.push(Stmt::if_then("PyDateTimeAPI == NULL", vec![Stmt::ret("NULL")]));
    }
    for dep in dependencies {
        let dep_names = ModuleNames::new(&library.name, dep);
        body.push(Stmt::expr(dep_names.import_macro));
        body.push(Stmt::if_then(
            format!("{} == NULL", dep_names.api_var),
            vec![Stmt::ret("NULL")],
        ));
    }
    for import in mapping.opaque.iter().filter_map(|o| o.import.as_deref()) {
        body.push(Stmt::expr(import.trim_end_matches(';')));
    }
    for info in &infos {
        body.push(Stmt::if_then(
            format!("PyType_Ready (&{}) < 0", info.type_object),
            vec![Stmt::ret("NULL")],
        ));
    }
    body.push(Stmt::Blank);
    body.push(Stmt::expr(format!("m = PyModule_Create (&{def})")));
    body.push(Stmt::if_then("m == NULL", vec![Stmt::ret("NULL")]));
    body.push(Stmt::Blank);
    body.push(Stmt::expr(format!(
        "capi = PyCapsule_New ((void *) &{api_table}, \"{}\", NULL)",
        names.capsule
    )));
    body.push(Stmt::if_then(
        "capi == NULL || PyModule_AddObject (m, \"_C_API\", capi) < 0",
        vec![
            Stmt::expr("Py_XDECREF (capi)"),
            Stmt::expr("Py_DECREF (m)"),
            Stmt::ret("NULL"),
        ],
    ));

    for e in &module.enums {
        for entry in &e.entries {
            body.push(Stmt::expr(format!(
                "PyModule_AddIntConstant (m, \"{entry}\", {entry})"
            )));
        }
    }
    for info in &infos {
        body.push(Stmt::expr(format!("Py_INCREF (&{})", info.type_object)));
        body.push(Stmt::expr(format!(
            "PyModule_AddObject (m, \"{}\", (PyObject *) &{})",
            info.export_name, info.type_object
        )));
    }
    body.push(Stmt::ret("m"));

    let mut init = Function::new("PyMODINIT_FUNC", format!("PyInit_{}", module.name), vec![])
        .with_body(body);
    init.is_static = false;
    file.push(Item::Function(init));
    file
}
