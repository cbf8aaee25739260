//! Lookup tables built once from an assembled library.
//!
//! The registries are immutable after [`TypeRegistry::build`] and friends;
//! the emitter borrows them for the whole run.

use std::collections::BTreeMap;

use gluegen_ir::naming::{base_type, camel_to_underscore, host_name, pointer_depth, symbol_prefix};
use gluegen_ir::{Callback, Enum, Library};

/// Host-side names derived for one wrapper type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperInfo {
    /// Native type name (`ta_atom_entry_t`).
    pub cname: String,
    /// Logical name (`atom_entry_t`).
    pub logical: String,
    /// CamelCase host name (`AtomEntry`).
    pub host: String,
    /// Host object struct (`PyAtomEntryObject`).
    pub object: String,
    /// Static type object (`PyAtomEntryType`).
    pub type_object: String,
    /// Wrap-from-native function (`new_py_atom_entry`).
    pub wrap_fn: String,
    /// Wrap macro exported through the C-API (`PyAtomEntry_FromAtomEntry`).
    pub from_macro: String,
    /// Type check macro (`PyAtomEntryObject_Check`).
    pub check_macro: String,
    /// Native handle accessor macro (`PyAtomEntryObject_AS_NATIVE`).
    pub as_native: String,
    /// Module declaring the type.
    pub module: String,
    pub symbol_prefix: String,
    /// Attribute name inside the host module.
    pub export_name: String,
    /// False for types of skipped modules: they resolve but have no glue.
    pub exposed: bool,
}

impl WrapperInfo {
    fn new(cname: &str, logical: &str, module: &str, exposed: bool) -> Self {
        let host = host_name(logical);
        let module_camel = ModuleNames::camel(module);
        let export_name = match host.strip_prefix(&module_camel) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => host.clone(),
        };
        Self {
            cname: cname.to_string(),
            logical: logical.to_string(),
            object: format!("Py{host}Object"),
            type_object: format!("Py{host}Type"),
            wrap_fn: format!("new_py_{}", camel_to_underscore(&host)),
            from_macro: format!("Py{host}_From{host}"),
            check_macro: format!("Py{host}Object_Check"),
            as_native: format!("Py{host}Object_AS_NATIVE"),
            module: module.to_string(),
            symbol_prefix: symbol_prefix(cname),
            export_name,
            exposed,
            host,
        }
    }
}

/// Wrapper types of the whole library, keyed by native name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, WrapperInfo>,
}

impl TypeRegistry {
    /// Register every type of `library`; types of `skip` modules are kept
    /// resolvable but marked as not exposed.
    pub fn build(library: &Library, skip: &[String]) -> Self {
        let mut types = BTreeMap::new();
        for (module, ty) in library.types() {
            let exposed = !skip.iter().any(|s| *s == module.name);
            types
                .entry(ty.cname.clone())
                .or_insert_with(|| WrapperInfo::new(&ty.cname, &ty.name, &module.name, exposed));
        }
        Self { types }
    }

    pub fn get(&self, cname: &str) -> Option<&WrapperInfo> {
        self.types.get(cname)
    }

    /// Wrapper for a native parameter or return spelling (`XFoo *`).
    ///
    /// Only single pointers to a registered type resolve.
    pub fn resolve_ctype(&self, ctype: &str) -> Option<&WrapperInfo> {
        if pointer_depth(ctype) != 1 {
            return None;
        }
        self.types.get(&base_type(ctype))
    }

    /// Wrapper for a container element spelling from a doc comment.
    ///
    /// Tries the native name, then the name with `_t`, then the symbol prefix.
    pub fn resolve_element(&self, spelling: &str) -> Option<&WrapperInfo> {
        let spelling = base_type(spelling);
        self.types
            .get(&spelling)
            .or_else(|| self.types.get(&format!("{spelling}_t")))
            .or_else(|| self.types.values().find(|info| info.symbol_prefix == spelling))
    }

    /// Wrapper by host object struct name (`PyFooObject`).
    pub fn by_object(&self, object: &str) -> Option<&WrapperInfo> {
        self.types.values().find(|info| info.object == object)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WrapperInfo> {
        self.types.values()
    }
}

/// Enums of the whole library, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    enums: BTreeMap<String, Enum>,
}

impl EnumRegistry {
    pub fn build(library: &Library) -> Self {
        let enums = library
            .modules
            .iter()
            .flat_map(|m| m.enums.iter())
            .map(|e| (e.name.clone(), e.clone()))
            .collect();
        Self { enums }
    }

    /// Enum named by a non-pointer native spelling.
    pub fn resolve(&self, ctype: &str) -> Option<&Enum> {
        if pointer_depth(ctype) != 0 {
            return None;
        }
        self.enums.get(&base_type(ctype))
    }
}

/// Function-pointer typedefs of the whole library.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    callbacks: BTreeMap<String, Callback>,
}

impl CallbackRegistry {
    pub fn build(library: &Library) -> Self {
        let callbacks = library
            .modules
            .iter()
            .flat_map(|m| m.callbacks.iter())
            .map(|c| (c.name.clone(), c.clone()))
            .collect();
        Self { callbacks }
    }

    pub fn resolve(&self, ctype: &str) -> Option<&Callback> {
        if pointer_depth(ctype) != 0 {
            return None;
        }
        self.callbacks.get(&base_type(ctype))
    }
}

/// Host-side names derived for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNames {
    pub module: String,
    /// C-API capsule struct (`PyLog_CAPI`).
    pub capi_struct: String,
    /// Imported C-API pointer (`PyLogAPI`).
    pub api_var: String,
    /// Import macro (`PyLog_IMPORT`).
    pub import_macro: String,
    /// Defined only while compiling the module itself (`PyLog_BUILD_CORE`).
    pub build_core: String,
    pub header: String,
    pub source: String,
    pub guard: String,
    /// Capsule name (`taningia.log._C_API`).
    pub capsule: String,
    /// Dotted module path (`taningia.log`).
    pub qualified: String,
}

impl ModuleNames {
    pub fn new(library: &str, module: &str) -> Self {
        let camel = Self::camel(module);
        Self {
            module: module.to_string(),
            capi_struct: format!("Py{camel}_CAPI"),
            api_var: format!("Py{camel}API"),
            import_macro: format!("Py{camel}_IMPORT"),
            build_core: format!("Py{camel}_BUILD_CORE"),
            header: format!("{module}module.h"),
            source: format!("{module}module.c"),
            guard: format!("_PY_{}_H_", module.to_ascii_uppercase()),
            capsule: format!("{library}.{module}._C_API"),
            qualified: format!("{library}.{module}"),
        }
    }

    /// CamelCase module name (`xmpp_client` -> `XmppClient`).
    pub fn camel(module: &str) -> String {
        gluegen_ir::naming::underscore_to_camel(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gluegen_ir::{Dependencies, Module, WrapperType};

    fn ty(name: &str, cname: &str) -> WrapperType {
        WrapperType {
            name: name.to_string(),
            cname: cname.to_string(),
            constructor: None,
            destructor: None,
            methods: vec![],
            doc: String::new(),
        }
    }

    fn library() -> Library {
        Library {
            name: "taningia".to_string(),
            prefix: "ta_".to_string(),
            modules: vec![
                Module {
                    name: "atom".to_string(),
                    file: "atom.h".to_string(),
                    types: vec![ty("atom_entry_t", "ta_atom_entry_t")],
                    enums: vec![Enum {
                        name: "ta_atom_kind_t".to_string(),
                        flags: false,
                        entries: vec!["TA_ATOM_A".to_string()],
                    }],
                    callbacks: vec![],
                    doc: String::new(),
                },
                Module {
                    name: "iri".to_string(),
                    file: "iri.h".to_string(),
                    types: vec![ty("iri_t", "ta_iri_t")],
                    enums: vec![],
                    callbacks: vec![],
                    doc: String::new(),
                },
            ],
            dependencies: Dependencies::default(),
        }
    }

    #[test]
    fn wrapper_names_follow_host_conventions() {
        let reg = TypeRegistry::build(&library(), &[]);
        let entry = reg.get("ta_atom_entry_t").unwrap();
        assert_eq!(entry.host, "AtomEntry");
        assert_eq!(entry.object, "PyAtomEntryObject");
        assert_eq!(entry.type_object, "PyAtomEntryType");
        assert_eq!(entry.wrap_fn, "new_py_atom_entry");
        assert_eq!(entry.from_macro, "PyAtomEntry_FromAtomEntry");
        assert_eq!(entry.export_name, "Entry");
        assert_eq!(entry.symbol_prefix, "ta_atom_entry");
    }

    #[test]
    fn export_name_keeps_module_named_types() {
        let reg = TypeRegistry::build(&library(), &[]);
        assert_eq!(reg.get("ta_iri_t").unwrap().export_name, "Iri");
    }

    #[test]
    fn resolves_single_pointers_only() {
        let reg = TypeRegistry::build(&library(), &[]);
        assert!(reg.resolve_ctype("ta_iri_t *").is_some());
        assert!(reg.resolve_ctype("const ta_iri_t *").is_some());
        assert!(reg.resolve_ctype("ta_iri_t **").is_none());
        assert!(reg.resolve_ctype("ta_iri_t").is_none());
    }

    #[test]
    fn element_spellings_resolve_three_ways() {
        let reg = TypeRegistry::build(&library(), &[]);
        assert_eq!(reg.resolve_element("ta_iri_t").unwrap().cname, "ta_iri_t");
        assert_eq!(reg.resolve_element("ta_iri").unwrap().cname, "ta_iri_t");
        assert!(reg.resolve_element("ta_tag").is_none());
        assert_eq!(reg.by_object("PyIriObject").unwrap().cname, "ta_iri_t");
    }

    #[test]
    fn skipped_modules_stay_resolvable() {
        let reg = TypeRegistry::build(&library(), &["iri".to_string()]);
        let iri = reg.resolve_ctype("ta_iri_t *").unwrap();
        assert!(!iri.exposed);
        assert!(reg.get("ta_atom_entry_t").unwrap().exposed);
    }

    #[test]
    fn enums_resolve_by_value_spelling() {
        let reg = EnumRegistry::build(&library());
        assert!(reg.resolve("ta_atom_kind_t").is_some());
        assert!(reg.resolve("ta_atom_kind_t *").is_none());
    }

    #[test]
    fn module_names() {
        let names = ModuleNames::new("taningia", "xmpp");
        assert_eq!(names.capi_struct, "PyXmpp_CAPI");
        assert_eq!(names.import_macro, "PyXmpp_IMPORT");
        assert_eq!(names.header, "xmppmodule.h");
        assert_eq!(names.guard, "_PY_XMPP_H_");
        assert_eq!(names.capsule, "taningia.xmpp._C_API");
    }
}
