//! Declaration file of a module: host structs, accessor macros and the
//! C-API capsule other modules import.

use gluegen_ir::{Library, Module};

use crate::ast::{CFile, Field, Item};
use crate::lifecycle::Lifecycle;
use crate::registry::{ModuleNames, TypeRegistry};

pub(crate) fn banner(module: &Module) -> Item {
    Item::Comment(format!(
        "Generated by gluegen from {}. Do not edit.",
        module.file
    ))
}

/// `<module>module.h`
pub fn module_header(
    library: &Library,
    module: &Module,
    names: &ModuleNames,
    types: &TypeRegistry,
    lifecycle: &Lifecycle,
) -> CFile {
    let mut file = CFile::default();
    file.push(banner(module));
    file.push(Item::Blank);
    file.push(Item::Line(format!("#ifndef {}", names.guard)));
    file.push(Item::Line(format!("#define {}", names.guard)));
    file.push(Item::Blank);
    file.push(Item::Include {
        path: "Python.h".to_string(),
        system: true,
    });
    file.push(Item::Include {
        path: format!("{}/{}.h", library.name, module.name),
        system: true,
    });
    for dep in &library.dependencies.public {
        file.push(Item::Include {
            path: dep.clone(),
            system: true,
        });
    }
    file.push(Item::Blank);

    let infos: Vec<_> = module
        .types
        .iter()
        .filter_map(|ty| types.get(&ty.cname))
        .collect();

    for info in &infos {
        let mut fields = vec![Field::new(format!("{} *", info.cname), "inner")];
        fields.extend(
            lifecycle
                .fields(&info.cname)
                .iter()
                .map(|f| Field::new("PyObject *", f)),
        );
        file.push(Item::Struct {
            name: info.object.clone(),
            head: Some("PyObject_HEAD".to_string()),
            fields,
        });
        file.push(Item::Define {
            name: format!("{}(o)", info.as_native),
            value: format!("((({} *) (o))->inner)", info.object),
        });
        file.push(Item::Blank);
    }

    let mut capi = Vec::new();
    for info in &infos {
        capi.push(Field::new("PyTypeObject *", format!("{}Type", info.host)));
        capi.push(Field::new(
            "PyObject *",
            format!("(*{host}_From{host}) ({} *inner)", info.cname, host = info.host),
        ));
    }
    if capi.is_empty() {
        capi.push(Field::new("int", "unused"));
    }
    file.push(Item::Struct {
        name: names.capi_struct.clone(),
        head: None,
        fields: capi,
    });

    file.push(Item::Line(format!("#ifndef {}", names.build_core)));
    file.push(Item::Blank);
    file.push(Item::Declaration(format!(
        "static {} *{} = NULL;",
        names.capi_struct, names.api_var
    )));
    file.push(Item::Blank);
    file.push(Item::Define {
        name: names.import_macro.clone(),
        value: format!(
            "{} = ({} *) PyCapsule_Import (\"{}\", 0)",
            names.api_var, names.capi_struct, names.capsule
        ),
    });
    file.push(Item::Blank);
    for info in &infos {
        file.push(Item::Define {
            name: format!("{}(o)", info.check_macro),
            value: format!("PyObject_TypeCheck (o, {}->{}Type)", names.api_var, info.host),
        });
        file.push(Item::Define {
            name: format!("{}(inner)", info.from_macro),
            value: format!(
                "{}->{host}_From{host} (inner)",
                names.api_var,
                host = info.host
            ),
        });
    }
    file.push(Item::Blank);
    file.push(Item::Line("#else".to_string()));
    file.push(Item::Blank);
    for info in &infos {
        file.push(Item::Define {
            name: format!("{}(o)", info.check_macro),
            value: format!("PyObject_TypeCheck (o, &{})", info.type_object),
        });
        file.push(Item::Define {
            name: format!("{}(inner)", info.from_macro),
            value: format!("{} (inner)", info.wrap_fn),
        });
    }
    file.push(Item::Blank);
    file.push(Item::Line(format!("#endif /* {} */", names.build_core)));
    file.push(Item::Blank);
    file.push(Item::Line(format!("#endif /* {} */", names.guard)));
    file
}
