//! Sigil-prefixed references inside component specs
//!
//! - `@name` refers to the component `name`
//! - `%key` refers to the config param `key`
//! - `@@text` / `%%text` are escaped literals and decode to `@text` / `%text`
//!
//! Everything else, the empty string included, is a plain literal.

use crate::types::Value;

pub const COMPONENT_SIGIL: char = '@';
pub const PARAM_SIGIL: char = '%';

/// A decoded reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    Component(&'a str),
    Param(&'a str),
    /// Escaped or plain text, returned as is
    Literal(&'a str),
}

impl<'a> Reference<'a> {
    pub fn parse(text: &'a str) -> Self {
        let Some(sigil) = text.chars().next() else {
            return Reference::Literal(text);
        };
        if sigil != COMPONENT_SIGIL && sigil != PARAM_SIGIL {
            return Reference::Literal(text);
        }

        let rest = &text[sigil.len_utf8()..];
        if rest.starts_with(sigil) {
            // Doubled sigil, drop one
            return Reference::Literal(rest);
        }

        if sigil == COMPONENT_SIGIL {
            Reference::Component(rest)
        } else {
            Reference::Param(rest)
        }
    }
}

/// Escapes a value so it is never read as a reference
///
/// Strings starting with a sigil get it doubled, lists and maps are walked.
pub fn escape(value: &Value) -> Value {
    match value {
        Value::Str(text) => Value::Str(escape_str(text)),
        Value::List(items) => Value::List(items.iter().map(escape).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), escape(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub fn escape_str(text: &str) -> String {
    match text.chars().next() {
        Some(sigil @ (COMPONENT_SIGIL | PARAM_SIGIL)) => {
            let mut escaped = String::with_capacity(text.len() + 1);
            escaped.push(sigil);
            escaped.push_str(text);
            escaped
        }
        _ => text.to_string(),
    }
}
