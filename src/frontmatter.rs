//! Front matter: the `---` delimited YAML block at the top of articles.

use std::fmt::Write;

use anyhow::Context;
use serde_yaml::{Mapping, Value};

pub const DELIMITER: &str = "---";

///
/// Prepend a front matter block to a Markdown document.
///
/// Fields are written in the mapping's order, one `key: value` line each. Null values are
/// skipped, strings are always double-quoted (with control characters escaped), other values
/// are written as-is.
///
pub fn add_frontmatter(markdown: &str, fields: &Mapping) -> String {
    let mut lines = vec![DELIMITER.to_string()];

    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        lines.push(format!("{}: {}", plain(key), field_value(value)));
    }

    lines.push(DELIMITER.to_string());
    lines.push(String::new());

    lines.join("\n") + markdown
}

fn field_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        other => plain(other),
    }
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() || c == '\u{feff}' => {
                let _ = write!(quoted, "\\u{:04X}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Natural textual representation of a value. Sequences and mappings are written in flow style.
fn plain(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

///
/// Split a document into its front matter source (without delimiters) and its body. Documents
/// that don't start with a delimiter line have no front matter. An unclosed block isn't front
/// matter either.
///
pub fn split_frontmatter(doc: &str) -> (Option<&str>, &str) {
    let doc = doc.strip_prefix('\u{feff}').unwrap_or(doc);

    let first_end = match doc.find('\n') {
        Some(i) => i + 1,
        None => return (None, doc),
    };
    if doc[..first_end].trim_end() != DELIMITER {
        return (None, doc);
    }

    let mut pos = first_end;
    while pos < doc.len() {
        let end = doc[pos..].find('\n').map(|i| pos + i + 1).unwrap_or(doc.len());
        if doc[pos..end].trim_end() == DELIMITER {
            return (Some(&doc[first_end..pos]), &doc[end..]);
        }
        pos = end;
    }

    (None, doc)
}

/// Parse the front matter of a document into a YAML mapping, and return it with the body.
pub fn read_frontmatter(doc: &str) -> anyhow::Result<(Mapping, &str)> {
    let (yaml, body) = split_frontmatter(doc);
    let fields = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str::<Mapping>(yaml).context("Invalid front matter")?
        }
        _ => Mapping::new(),
    };
    Ok((fields, body))
}
