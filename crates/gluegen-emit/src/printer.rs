//! GNU-style C pretty-printer for [`crate::ast`] nodes.

use crate::ast::{declarator, CFile, Function, Item, Stmt};

const INDENT: usize = 2;

/// Render a file. Output always ends with exactly one newline.
pub fn print_file(file: &CFile) -> String {
    let mut out = String::new();
    for item in &file.items {
        print_item(item, &mut out);
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

/// Quote text as a C string literal.
pub fn c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn print_item(item: &Item, out: &mut String) {
    match item {
        Item::Comment(text) => {
            let mut lines = text.lines();
            let first = lines.next().unwrap_or("");
            let rest: Vec<&str> = lines.collect();
            if rest.is_empty() {
                out.push_str(&format!("/* {first} */\n"));
            } else {
                out.push_str(&format!("/* {first}\n"));
                for line in rest {
                    out.push_str(&format!(" * {line}\n").replace(" * \n", " *\n"));
                }
                out.push_str(" */\n");
            }
        }
        Item::Include { path, system } => {
            if *system {
                out.push_str(&format!("#include <{path}>\n"));
            } else {
                out.push_str(&format!("#include \"{path}\"\n"));
            }
        }
        Item::Define { name, value } => {
            let lines: Vec<&str> = value.lines().collect();
            match lines.as_slice() {
                [] => out.push_str(&format!("#define {name}\n")),
                [single] => out.push_str(&format!("#define {name} {single}\n")),
                many => {
                    out.push_str(&format!("#define {name} \\\n"));
                    let last = many.len() - 1;
                    for (i, line) in many.iter().enumerate() {
                        let cont = if i == last { "" } else { " \\" };
                        out.push_str(&format!("  {line}{cont}\n"));
                    }
                }
            }
        }
        Item::Line(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Item::Struct { name, head, fields } => {
            out.push_str("typedef struct {\n");
            if let Some(head) = head {
                out.push_str(&format!("  {head}\n"));
            }
            for field in fields {
                out.push_str(&format!("  {};\n", declarator(&field.ty, &field.name)));
            }
            out.push_str(&format!("}} {name};\n\n"));
        }
        Item::Declaration(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Item::Function(f) => print_function(f, out),
        Item::Array {
            storage,
            ty,
            name,
            rows,
            sentinel,
        } => {
            out.push_str(&format!("{} {ty} {name}[] = {{\n", storage));
            for row in rows {
                out.push_str(&format!("  {row},\n"));
            }
            if let Some(sentinel) = sentinel {
                out.push_str(&format!("  {sentinel}\n"));
            }
            out.push_str("};\n\n");
        }
        Item::StructInit {
            storage,
            ty,
            name,
            head,
            fields,
        } => {
            out.push_str(&format!("{storage} {ty} {name} = {{\n"));
            if let Some(head) = head {
                out.push_str(&format!("  {head}\n"));
            }
            for field in fields {
                out.push_str(&format!("  {field},\n"));
            }
            out.push_str("};\n\n");
        }
        Item::Verbatim(text) => {
            out.push_str(text.trim_matches('\n'));
            out.push_str("\n\n");
        }
        Item::Blank => out.push('\n'),
    }
}

fn print_function(f: &Function, out: &mut String) {
    if f.is_static {
        out.push_str("static ");
    }
    out.push_str(&f.ret);
    out.push('\n');
    let params = if f.params.is_empty() {
        "void".to_string()
    } else {
        f.params.join(", ")
    };
    out.push_str(&format!("{} ({params})\n{{\n", f.name));
    print_stmts(&f.body, INDENT, out);
    out.push_str("}\n\n");
}

fn print_stmts(stmts: &[Stmt], indent: usize, out: &mut String) {
    for stmt in stmts {
        print_stmt(stmt, indent, out);
    }
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

/// A body that can follow `if`/`else`/`for` without braces.
fn single_simple(body: &[Stmt]) -> Option<&Stmt> {
    match body {
        [s @ (Stmt::Expr(_) | Stmt::Return(_))] => Some(s),
        _ => None,
    }
}

fn print_body(body: &[Stmt], indent: usize, out: &mut String) {
    match single_simple(body) {
        Some(stmt) => print_stmt(stmt, indent + INDENT, out),
        None => {
            out.push_str(&format!("{}{{\n", pad(indent + INDENT)));
            print_stmts(body, indent + 2 * INDENT, out);
            out.push_str(&format!("{}}}\n", pad(indent + INDENT)));
        }
    }
}

fn print_stmt(stmt: &Stmt, indent: usize, out: &mut String) {
    let p = pad(indent);
    match stmt {
        Stmt::Decl { ty, name, init } => {
            let decl = declarator(ty, name);
            match init {
                Some(init) => out.push_str(&format!("{p}{decl} = {init};\n")),
                None => out.push_str(&format!("{p}{decl};\n")),
            }
        }
        Stmt::Expr(text) => out.push_str(&format!("{p}{text};\n")),
        Stmt::Return(Some(value)) => out.push_str(&format!("{p}return {value};\n")),
        Stmt::Return(None) => out.push_str(&format!("{p}return;\n")),
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            out.push_str(&format!("{p}if ({cond})\n"));
            print_body(then, indent, out);
            if otherwise.is_empty() {
                return;
            }
            if let [Stmt::If { .. }] = otherwise.as_slice() {
                out.push_str(&format!("{p}else "));
                let mut nested = String::new();
                print_stmt(&otherwise[0], indent, &mut nested);
                out.push_str(nested.trim_start());
            } else {
                out.push_str(&format!("{p}else\n"));
                print_body(otherwise, indent, out);
            }
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            out.push_str(&format!("{p}for ({init}; {cond}; {step})\n"));
            print_body(body, indent, out);
        }
        Stmt::Block(body) => {
            out.push_str(&format!("{p}{{\n"));
            print_stmts(body, indent + INDENT, out);
            out.push_str(&format!("{p}}}\n"));
        }
        Stmt::Comment(text) => out.push_str(&format!("{p}/* {text} */\n")),
        Stmt::Blank => out.push('\n'),
    }
}
