//! Whole-header scans of realistic annotated headers.

use gluegen_ir::{DiagnosticKind, MethodRole, Modifier, Severity};
use gluegen_scan::{scan_library, HeaderSource};
use pretty_assertions::assert_eq;

const LOG_H: &str = r#"
#ifndef _TANINGIA_LOG_H_
#define _TANINGIA_LOG_H_

#define MAX_DATE_SIZE 64

typedef struct _log_t log_t;

typedef enum {
  LOG_INFO     = 1 << 1,
  LOG_WARN     = 1 << 2,
  LOG_DEBUG    = 1 << 3
} log_level_t;

typedef int *(*log_handler_func_t) (log_t *, log_level_t, const char *, void *);

/**
 * @name: log_new
 * @type: constructor log
 */
log_t *log_new (const char *domain_name);

/**
 * @name: log_free
 * @type: destructor log
 */
void log_free (log_t *log);

/**
 * @name: log_set_level
 * @type: setter log:level
 */
void log_set_level (log_t *log, log_level_t level);

/**
 * @name: log_get_level
 * @type: getter log:level
 */
log_level_t log_get_level (log_t *log);

/**
 * @name: log_set_handler
 * @type: method log
 * @param handler: The handler function
 * @param user_data: Parameter to be passed to the handler
 *   function when it is called.
 *
 * Sets a hook called for every message.
 */
void log_set_handler (log_t *log, log_handler_func_t handler, void *user_data);

/**
 * @name: log_info
 * @type: method log
 *
 * Log an info message.
 */
void log_info (log_t *log, const char *fmt, ...);

#endif /* _TANINGIA_LOG_H_ */
"#;

const ENTRY_H: &str = r#"
typedef struct _ta_atom_entry_t ta_atom_entry_t;
typedef struct _ta_atom_entry_content_t ta_atom_entry_content_t;

/**
 * @name: ta_atom_entry::new
 * @type: constructor
 * @param title (optional): The entry title
 */
ta_atom_entry_t *ta_atom_entry_new (const char *title);

/**
 * @name: ta_atom_entry::set_published
 * @type: setter (nullable)
 */
void ta_atom_entry_set_published (ta_atom_entry_t *entry, time_t published);

/**
 * @name: ta_atom_entry::get_authors
 * @type: getter
 * @return: ta_list (ta_atom_person)
 */
ta_list_t *ta_atom_entry_get_authors (ta_atom_entry_t *entry);

/**
 * @name: ta_atom_entry_content::get_src
 * @type: getter
 */
const char *ta_atom_entry_content_get_src (ta_atom_entry_content_t *content);
"#;

#[test]
fn log_header_assembles_completely() {
    let assembly = scan_library("taningia", "T", &[HeaderSource::new("include/log.h", LOG_H)]);
    assert!(assembly.diagnostics.is_empty(), "{:?}", assembly.diagnostics);

    let module = &assembly.library.modules[0];
    assert_eq!(module.name, "log");
    assert_eq!(module.enums[0].name, "log_level_t");
    assert!(module.enums[0].flags);
    assert_eq!(module.callbacks[0].name, "log_handler_func_t");

    let log = &module.types[0];
    assert_eq!(log.name, "log_t");
    assert_eq!(log.constructor.as_ref().unwrap().params[0].name, "domain_name");
    assert!(log.destructor.is_some());

    let names: Vec<_> = log.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["set_level", "get_level", "set_handler", "info"]);
    assert_eq!(
        log.methods[1].role,
        MethodRole::Getter {
            property: "level".to_string()
        }
    );
    assert_eq!(
        log.methods[2].doc,
        "Sets a hook called for every message."
    );
}

#[test]
fn entry_header_accessors_and_containers() {
    let assembly = scan_library(
        "taningia",
        "T",
        &[HeaderSource::new("include/atom.h", ENTRY_H)],
    );
    assert!(!assembly.has_errors());

    let module = &assembly.library.modules[0];
    let entry = &module.types[0];
    let content = &module.types[1];

    let ctor = entry.constructor.as_ref().unwrap();
    assert!(ctor.params[0].has(Modifier::Optional));

    let published = &entry.methods[0];
    assert_eq!(
        published.role,
        MethodRole::Setter {
            property: "published".to_string()
        }
    );
    assert!(published.params[1].has(Modifier::Nullable));

    let authors = &entry.methods[1];
    assert_eq!(authors.element_type(), Some("ta_atom_person"));

    // ta_atom_entry_content_get_src belongs to the longer prefix
    assert_eq!(content.methods.len(), 1);
    assert_eq!(content.methods[0].name, "get_src");
    let ties: Vec<_> = assembly
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateAssociation)
        .collect();
    assert_eq!(ties.len(), 1);
    assert_eq!(ties[0].severity, Severity::Info);
}

#[test]
fn headers_become_modules_in_input_order() {
    let assembly = scan_library(
        "taningia",
        "T",
        &[
            HeaderSource::new("include/log.h", LOG_H),
            HeaderSource::new("include/atom.h", ENTRY_H),
        ],
    );
    let names: Vec<_> = assembly
        .library
        .modules
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["log", "atom"]);
}
