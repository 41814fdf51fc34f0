//! Template interpolation for pipeline configs
//!
//! Handles `{{ variable }}` interpolation in request params and auth bodies.
//! Roots are `env` (process environment), `entity` (the entity being
//! fetched), `window` (the day being fetched) and `vars` (free-form).

use crate::error::{Error, Result};
use crate::types::JsonValue as Value;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables
    pub env: Value,
    /// Current entity (`id`)
    pub entity: Value,
    /// Current day (`date`, `start_time`, `end_time`)
    pub window: Value,
    /// Additional context variables
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding the process environment
    pub fn from_env() -> Self {
        let env: serde_json::Map<String, Value> = std::env::vars()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Self {
            env: Value::Object(env),
            ..Default::default()
        }
    }

    /// Set environment values
    pub fn set_env(&mut self, env: Value) -> &mut Self {
        self.env = env;
        self
    }

    /// Set the current entity
    pub fn set_entity(&mut self, id: &str) -> &mut Self {
        self.entity = json!({ "id": id });
        self
    }

    /// Set the current day; times cover the whole day
    pub fn set_window(&mut self, day: NaiveDate) -> &mut Self {
        let date = day.format("%Y-%m-%d").to_string();
        self.window = json!({
            "start_time": format!("{date} 00:00:00"),
            "end_time": format!("{date} 23:59:59"),
            "date": date,
        });
        self
    }

    /// Set additional variables
    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g., "window.start_time")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let root = match parts.first().copied()? {
            "env" => &self.env,
            "entity" => &self.entity,
            "window" => &self.window,
            "vars" => &self.vars,
            // Bare names resolve against vars
            _ => return get_nested_value(&self.vars, &parts),
        };

        get_nested_value(root, &parts[1..])
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        current = current.as_object()?.get(*part)?;
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        match ctx.get(&cap[1]) {
            Some(value) => value_to_string(value),
            None => {
                missing.push(cap[1].to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render all string values in a JSON value
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    match value {
        Value::String(s) if has_templates(s) => Ok(Value::String(render(s, ctx)?)),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (k, v) in map {
                rendered.insert(k.clone(), render_value(v, ctx)?);
            }
            Ok(Value::Object(rendered))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| render_value(v, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        _ => Ok(value.clone()),
    }
}
