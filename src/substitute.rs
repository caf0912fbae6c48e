use regex::{Captures, Regex};
use std::sync::LazyLock;
use toml::Value;
use crate::environment::Environment;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Replaces every `{Name}` with the matching variable.
/// Unknown names stay as written. Replacement text is never re-scanned.
pub fn substitute_str(input: &str, env: &Environment) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures| match env.substitutable(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Expands placeholders in every string leaf, keeping the shape of lists and tables.
pub fn substitute(input: &Value, env: &Environment) -> Value {
    match input {
        Value::String(s) => Value::String(substitute_str(s, env)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, env)).collect()),
        Value::Table(table) => Value::Table(
            table
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, env)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Absent input stays absent.
pub fn substitute_opt(input: Option<&Value>, env: &Environment) -> Option<Value> {
    input.map(|v| substitute(v, env))
}

pub fn substitute_all(items: &[String], env: &Environment) -> Vec<String> {
    items.iter().map(|s| substitute_str(s, env)).collect()
}
