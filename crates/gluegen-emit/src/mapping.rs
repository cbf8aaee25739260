//! Native type to marshaling strategy mapping.
//!
//! Rules are consulted in a fixed priority order: registered wrapper types,
//! opaque pass-through handles, time values, enums, callbacks, then the
//! primitive table. Anything left over is passed through as a host object.

use gluegen_ir::naming::{base_type, normalize_ctype, pointer_depth};
use gluegen_ir::{Callback, Enum, Method, Modifier, Parameter};
use serde::{Deserialize, Serialize};

use crate::registry::{CallbackRegistry, EnumRegistry, TypeRegistry, WrapperInfo};

/// Type-mapper extensions read from the project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MappingConfig {
    /// Native spellings converted to and from host date-time values.
    pub time_types: Vec<String>,
    /// Externally owned handles with their own conversion pair.
    pub opaque: Vec<OpaqueRule>,
    /// Singly-linked list types returned as host sequences.
    pub containers: Vec<ContainerRule>,
    /// Extra primitive rules; these shadow built-ins with the same spelling.
    pub primitives: Vec<PrimitiveRule>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            time_types: vec!["time_t".to_string()],
            opaque: Vec::new(),
            containers: Vec::new(),
            primitives: Vec::new(),
        }
    }
}

/// An opaque pass-through handle (`iks *` bridged by an external module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OpaqueRule {
    /// Native type name, without the pointer (`iks`).
    pub ctype: String,
    /// Host object struct (`PyIksObject`).
    pub object: String,
    /// Type check macro (`PyIks_Check`).
    pub check: String,
    /// Host object to native handle (`PyIks_AsIks`).
    pub unwrap: String,
    /// Native handle to new host object (`PyIks_FromIks`).
    pub wrap: String,
    /// Header declaring the conversion pair.
    #[serde(default)]
    pub include: Option<String>,
    /// Statement run at module init to load the conversion pair.
    #[serde(default)]
    pub import: Option<String>,
}

/// A native list type walked through `next`/`data` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerRule {
    pub ctype: String,
    #[serde(default = "default_next")]
    pub next: String,
    #[serde(default = "default_data")]
    pub data: String,
}

fn default_next() -> String {
    "next".to_string()
}

fn default_data() -> String {
    "data".to_string()
}

/// A primitive type with its argument-parse and value-build codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrimitiveRule {
    /// Native spelling, normalized (`const char *`).
    pub ctype: String,
    /// Type of the local the argument is parsed into.
    pub decl: String,
    /// `PyArg_ParseTuple` code.
    pub parse: String,
    /// `Py_BuildValue` code; empty for types that never return a value.
    #[serde(default)]
    pub build: String,
    /// Converter used for returns instead of `Py_BuildValue`.
    #[serde(default)]
    pub from_native: Option<String>,
}

impl PrimitiveRule {
    fn new(ctype: &str, decl: &str, parse: &str, build: &str) -> Self {
        Self {
            ctype: ctype.to_string(),
            decl: decl.to_string(),
            parse: parse.to_string(),
            build: build.to_string(),
            from_native: None,
        }
    }

    /// Whether the parsed local needs a cast to reach the native type.
    pub fn needs_cast(&self) -> bool {
        self.decl != self.ctype
    }

    /// Whether values are host objects passed through untouched.
    pub fn is_object(&self) -> bool {
        self.parse == "O"
    }
}

/// Primitive rules every run starts with.
pub fn builtin_primitives() -> Vec<PrimitiveRule> {
    let mut bool_rule = PrimitiveRule::new("bool", "int", "p", "");
    bool_rule.from_native = Some("PyBool_FromLong".to_string());
    vec![
        PrimitiveRule::new("const char *", "const char *", "s", "s"),
        PrimitiveRule::new("char *", "const char *", "s", "s"),
        PrimitiveRule::new("int", "int", "i", "i"),
        PrimitiveRule::new("unsigned int", "unsigned int", "I", "I"),
        PrimitiveRule::new("long", "long", "l", "l"),
        PrimitiveRule::new("unsigned long", "unsigned long", "k", "k"),
        PrimitiveRule::new("double", "double", "d", "d"),
        PrimitiveRule::new("float", "float", "f", "f"),
        bool_rule,
        PrimitiveRule::new("size_t", "Py_ssize_t", "n", "n"),
        PrimitiveRule::new("void *", "PyObject *", "O", "O"),
        PrimitiveRule::new("void", "void", "", ""),
    ]
}

/// How one parameter crosses into native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marshal<'a> {
    /// Unwrap a generated wrapper; null-safe when optional.
    Wrapper { info: &'a WrapperInfo, optional: bool },
    /// Unwrap through an external conversion pair.
    Opaque { rule: &'a OpaqueRule, optional: bool },
    /// Host date-time to native time value.
    Time { nullable: bool },
    /// Host integer to native enum.
    Enum(&'a Enum),
    /// Native function pointer; needs a trampoline.
    Callback(&'a Callback),
    Primitive(&'a PrimitiveRule),
    /// Unmapped: the host object itself is handed over.
    Object,
}

/// How one return value crosses back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnMarshal<'a> {
    Void,
    /// Native list converted into a host list, element by element.
    Sequence {
        container: ContainerRule,
        element: Element<'a>,
    },
    Wrapper(&'a WrapperInfo),
    Opaque(&'a OpaqueRule),
    /// Native time value to host date-time; zero becomes `None` when nullable.
    Time { nullable: bool },
    Enum(&'a Enum),
    Primitive(&'a PrimitiveRule),
    /// Unmapped pointer or value returned as a host object.
    Object,
}

/// Conversion applied to every element of a sequence return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element<'a> {
    Wrapper(&'a WrapperInfo),
    Opaque(&'a OpaqueRule),
    Primitive(&'a PrimitiveRule),
    Object,
}

/// Priority-ordered mapping over the registries of one run.
#[derive(Debug)]
pub struct TypeMapper<'a> {
    types: &'a TypeRegistry,
    enums: &'a EnumRegistry,
    callbacks: &'a CallbackRegistry,
    config: &'a MappingConfig,
    primitives: Vec<PrimitiveRule>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(
        types: &'a TypeRegistry,
        enums: &'a EnumRegistry,
        callbacks: &'a CallbackRegistry,
        config: &'a MappingConfig,
    ) -> Self {
        let mut primitives: Vec<PrimitiveRule> = config
            .primitives
            .iter()
            .cloned()
            .map(|mut rule| {
                rule.ctype = normalize_ctype(&rule.ctype);
                rule
            })
            .collect();
        primitives.extend(builtin_primitives());
        Self {
            types,
            enums,
            callbacks,
            config,
            primitives,
        }
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Strategy for a non-receiver parameter.
    pub fn param(&self, param: &Parameter) -> Marshal<'_> {
        let optional = param.has(Modifier::Optional);
        if let Some(info) = self.wrapper(&param.ctype) {
            return Marshal::Wrapper { info, optional };
        }
        if let Some(rule) = self.opaque(&param.ctype) {
            return Marshal::Opaque { rule, optional };
        }
        if self.is_time(&param.ctype) {
            return Marshal::Time {
                nullable: param.has(Modifier::Nullable),
            };
        }
        if let Some(e) = self.enums.resolve(&param.ctype) {
            return Marshal::Enum(e);
        }
        if let Some(cb) = self.callbacks.resolve(&param.ctype) {
            return Marshal::Callback(cb);
        }
        match self.primitive(&param.ctype) {
            Some(rule) => Marshal::Primitive(rule),
            None => {
                tracing::debug!(ctype = %param.ctype, "no mapping rule, passing host object");
                Marshal::Object
            }
        }
    }

    /// Strategy for a method's return value.
    pub fn returns(&self, method: &Method) -> ReturnMarshal<'_> {
        let rtype = normalize_ctype(&method.rtype);
        if let Some(spelling) = method.element_type() {
            let outer = method
                .returns
                .as_ref()
                .map(|r| r.spelling.as_str())
                .unwrap_or_default();
            return ReturnMarshal::Sequence {
                container: self.container(&rtype, outer),
                element: self.element(spelling),
            };
        }
        if rtype == "void" {
            return ReturnMarshal::Void;
        }
        if let Some(info) = self.wrapper(&rtype) {
            return ReturnMarshal::Wrapper(info);
        }
        if let Some(rule) = self.opaque(&rtype) {
            return ReturnMarshal::Opaque(rule);
        }
        if self.is_time(&rtype) {
            return ReturnMarshal::Time {
                nullable: method.return_modifiers().contains(Modifier::Nullable),
            };
        }
        if let Some(e) = self.enums.resolve(&rtype) {
            return ReturnMarshal::Enum(e);
        }
        match self.primitive(&rtype) {
            Some(rule) if !rule.build.is_empty() || rule.from_native.is_some() => {
                ReturnMarshal::Primitive(rule)
            }
            _ => {
                tracing::debug!(ctype = %rtype, symbol = %method.cname, "unmapped return");
                ReturnMarshal::Object
            }
        }
    }

    /// Conversion for the elements of a container return.
    pub fn element(&self, spelling: &str) -> Element<'_> {
        if let Some(info) = self.types.resolve_element(spelling).filter(|i| i.exposed) {
            return Element::Wrapper(info);
        }
        let base = base_type(spelling);
        let suffixed = format!("{base}_t");
        if let Some(rule) = self
            .config
            .opaque
            .iter()
            .find(|r| base_type(&r.ctype) == base || base_type(&r.ctype) == suffixed)
        {
            return Element::Opaque(rule);
        }
        let primitive = match base.as_str() {
            "string" | "char" => self.primitive("const char *"),
            _ => self.primitive(spelling),
        };
        match primitive {
            Some(rule) if !rule.build.is_empty() => Element::Primitive(rule),
            _ => Element::Object,
        }
    }

    fn wrapper(&self, ctype: &str) -> Option<&'a WrapperInfo> {
        self.types.resolve_ctype(ctype).filter(|info| info.exposed)
    }

    fn opaque(&self, ctype: &str) -> Option<&'a OpaqueRule> {
        if pointer_depth(ctype) != 1 {
            return None;
        }
        let base = base_type(ctype);
        self.config
            .opaque
            .iter()
            .find(|rule| base_type(&rule.ctype) == base)
    }

    fn is_time(&self, ctype: &str) -> bool {
        pointer_depth(ctype) == 0
            && self
                .config
                .time_types
                .iter()
                .any(|t| *t == base_type(ctype))
    }

    /// Primitive rule by exact normalized spelling; a top-level `const` on a
    /// value type is ignored.
    pub fn primitive(&self, ctype: &str) -> Option<&PrimitiveRule> {
        let spelling = normalize_ctype(ctype);
        let find = |s: &str| self.primitives.iter().find(|r| r.ctype == s);
        find(&spelling).or_else(|| {
            if pointer_depth(&spelling) == 0 {
                spelling.strip_prefix("const ").and_then(find)
            } else {
                None
            }
        })
    }

    fn container(&self, rtype: &str, outer: &str) -> ContainerRule {
        let base = base_type(rtype);
        let outer = base_type(outer);
        let suffixed = format!("{outer}_t");
        self.config
            .containers
            .iter()
            .find(|c| {
                let ctype = base_type(&c.ctype);
                ctype == base || ctype == outer || ctype == suffixed
            })
            .cloned()
            .unwrap_or_else(|| ContainerRule {
                ctype: base,
                next: default_next(),
                data: default_data(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gluegen_ir::{
        Dependencies, Library, MethodRole, ModifierSet, Module, ReturnDescriptor, WrapperType,
    };

    fn library() -> Library {
        Library {
            name: "taningia".to_string(),
            prefix: "ta_".to_string(),
            modules: vec![Module {
                name: "atom".to_string(),
                file: "atom.h".to_string(),
                types: vec![
                    WrapperType {
                        name: "atom_person_t".to_string(),
                        cname: "ta_atom_person_t".to_string(),
                        constructor: None,
                        destructor: None,
                        methods: vec![],
                        doc: String::new(),
                    },
                    WrapperType {
                        name: "list_t".to_string(),
                        cname: "ta_list_t".to_string(),
                        constructor: None,
                        destructor: None,
                        methods: vec![],
                        doc: String::new(),
                    },
                ],
                enums: vec![Enum {
                    name: "ta_log_level_t".to_string(),
                    flags: true,
                    entries: vec![],
                }],
                callbacks: vec![Callback {
                    name: "ta_handler_t".to_string(),
                    rtype: "int".to_string(),
                    params: vec!["void *".to_string()],
                }],
                doc: String::new(),
            }],
            dependencies: Dependencies::default(),
        }
    }

    fn config() -> MappingConfig {
        MappingConfig {
            opaque: vec![OpaqueRule {
                ctype: "iks".to_string(),
                object: "PyIksObject".to_string(),
                check: "PyIks_Check".to_string(),
                unwrap: "PyIks_AsIks".to_string(),
                wrap: "PyIks_FromIks".to_string(),
                include: Some("iksemel.h".to_string()),
                import: None,
            }],
            ..MappingConfig::default()
        }
    }

    fn param(ctype: &str, mods: &[Modifier]) -> Parameter {
        Parameter {
            name: "p".to_string(),
            ctype: ctype.to_string(),
            modifiers: mods.iter().copied().collect(),
            receiver: false,
        }
    }

    fn method(rtype: &str, returns: Option<ReturnDescriptor>) -> Method {
        Method {
            name: "get".to_string(),
            cname: "ta_x_get".to_string(),
            owner: "ta_x_t".to_string(),
            role: MethodRole::Method,
            rtype: rtype.to_string(),
            returns,
            params: vec![],
            doc: String::new(),
        }
    }

    #[test]
    fn parameters_follow_priority_order() {
        let lib = library();
        let config = config();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);

        assert!(matches!(
            mapper.param(&param("ta_atom_person_t *", &[Modifier::Optional])),
            Marshal::Wrapper { optional: true, .. }
        ));
        assert!(matches!(
            mapper.param(&param("iks *", &[])),
            Marshal::Opaque { optional: false, .. }
        ));
        assert_eq!(
            mapper.param(&param("time_t", &[Modifier::Nullable])),
            Marshal::Time { nullable: true }
        );
        assert!(matches!(mapper.param(&param("ta_log_level_t", &[])), Marshal::Enum(_)));
        assert!(matches!(mapper.param(&param("ta_handler_t", &[])), Marshal::Callback(_)));
        match mapper.param(&param("const char *", &[])) {
            Marshal::Primitive(rule) => assert_eq!(rule.parse, "s"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mapper.param(&param("struct stat *", &[])), Marshal::Object);
    }

    #[test]
    fn const_value_types_use_plain_rule() {
        let lib = library();
        let config = MappingConfig::default();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);
        assert_eq!(mapper.primitive("const int").unwrap().parse, "i");
        assert_eq!(mapper.primitive("char*").unwrap().decl, "const char *");
    }

    #[test]
    fn configured_primitives_shadow_builtins() {
        let lib = library();
        let config = MappingConfig {
            primitives: vec![PrimitiveRule::new("int", "long", "l", "l")],
            ..MappingConfig::default()
        };
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);
        assert_eq!(mapper.primitive("int").unwrap().decl, "long");
    }

    #[test]
    fn container_annotation_wins_over_wrapper() {
        let lib = library();
        let config = config();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);

        let authors = method(
            "ta_list_t *",
            Some(ReturnDescriptor {
                spelling: "ta_list".to_string(),
                subtype: Some("ta_atom_person".to_string()),
                modifiers: ModifierSet::new(),
            }),
        );
        match mapper.returns(&authors) {
            ReturnMarshal::Sequence { container, element } => {
                assert_eq!(container.ctype, "ta_list_t");
                assert_eq!(container.next, "next");
                match element {
                    Element::Wrapper(info) => assert_eq!(info.cname, "ta_atom_person_t"),
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            mapper.returns(&method("ta_list_t *", None)),
            ReturnMarshal::Wrapper(_)
        ));
    }

    #[test]
    fn element_fallbacks() {
        let lib = library();
        let config = config();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);

        assert!(matches!(mapper.element("iks"), Element::Opaque(_)));
        match mapper.element("string") {
            Element::Primitive(rule) => assert_eq!(rule.build, "s"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mapper.element("ta_unknown"), Element::Object);
    }

    #[test]
    fn returns_without_build_code_fall_back_to_object() {
        let lib = library();
        let config = config();
        let types = TypeRegistry::build(&lib, &[]);
        let enums = EnumRegistry::build(&lib);
        let callbacks = CallbackRegistry::build(&lib);
        let mapper = TypeMapper::new(&types, &enums, &callbacks, &config);

        assert_eq!(mapper.returns(&method("void", None)), ReturnMarshal::Void);
        assert!(matches!(
            mapper.returns(&method("bool", None)),
            ReturnMarshal::Primitive(_)
        ));
        assert_eq!(mapper.returns(&method("ta_x_t **", None)), ReturnMarshal::Object);
        assert_eq!(
            mapper.returns(&method("time_t", None)),
            ReturnMarshal::Time { nullable: false }
        );
    }
}
