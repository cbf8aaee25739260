//! Comment stripping and whitespace normalization.
//!
//! The signature scanner works on text with comments and preprocessor
//! directives removed and all whitespace runs collapsed to one space.

/// Remove `/* */` and `//` comments.
///
/// A block comment spanning lines is replaced by a newline so that
/// line-oriented passes still see line boundaries; an unterminated block
/// comment drops the rest of the text. String literals are copied through.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("/*") {
            match after.find("*/") {
                Some(end) => {
                    let body = &after[..end];
                    out.push(if body.contains('\n') { '\n' } else { ' ' });
                    rest = &after[end + 2..];
                }
                None => break,
            }
        } else if rest.starts_with("//") {
            match rest.find('\n') {
                Some(nl) => rest = &rest[nl..],
                None => break,
            }
        } else if rest.starts_with('"') {
            let len = string_literal_len(rest);
            out.push_str(&rest[..len]);
            rest = &rest[len..];
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                out.push(ch);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Byte length of the string literal at the start of `text`, quotes included.
fn string_literal_len(text: &str) -> usize {
    let mut escaped = false;
    for (i, ch) in text.char_indices().skip(1) {
        match ch {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return i + 1,
            '\n' => return i,
            _ => escaped = false,
        }
    }
    text.len()
}

/// Remove preprocessor lines, including backslash continuations.
pub fn strip_preprocessor(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut continuing = false;
    for line in text.lines() {
        let directive = continuing || line.trim_start().starts_with('#');
        if directive {
            continuing = line.trim_end().ends_with('\\');
            out.push('\n');
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full normalization used before signature scanning.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(&strip_preprocessor(&strip_comments(text)))
}
