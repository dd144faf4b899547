//! Template interpolation for source definitions
//!
//! Handles `{{ variable }}` interpolation in YAML definitions.
//! Supports `{{ env.SHOPIFY_TOKEN }}` for environment variables and
//! `{{ config.shop }}` for values passed on the command line.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .unwrap_or_else(|e| panic!("invalid template regex: {e}"))
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Configuration values (`--config-json`)
    pub config: Value,
    /// Environment variables
    pub env: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with config values and the process environment
    pub fn from_env(config: Value) -> Self {
        Self {
            config,
            env: std::env::vars().collect(),
        }
    }

    /// Context with config values only
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Add or replace one environment variable
    #[must_use]
    pub fn env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Look up a variable path
    ///
    /// `env.NAME` reads the environment, `config.a.b` reads config values.
    /// A bare path is looked up in config.
    pub fn get(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["env", name] => self.env.get(*name).map(|v| Value::String(v.clone())),
            ["config", rest @ ..] => get_nested_value(&self.config, rest).cloned(),
            rest => get_nested_value(&self.config, rest).cloned(),
        }
    }
}

fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        current = current.as_object()?.get(*part)?;
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

/// Render a template string with the given context
///
/// Every undefined variable is reported in one error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut last = 0;

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let (Some(full), Some(var)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        result.push_str(&template[last..full.start()]);
        match ctx.get(var.as_str()) {
            Some(value) => result.push_str(&value_to_string(&value)),
            None => missing.push(var.as_str().to_string()),
        }
        last = full.end();
    }
    result.push_str(&template[last..]);

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Render an optional template
pub fn render_opt(template: Option<&str>, ctx: &TemplateContext) -> Result<Option<String>> {
    template.map(|t| render(t, ctx)).transpose()
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Render all string values in a JSON value
///
/// A string that is exactly one `{{ var }}` takes the variable's JSON type,
/// so `first: "{{ config.page_size }}"` stays a number.
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    match value {
        Value::String(s) if has_templates(s) => {
            if let Some(var) = whole_variable(s) {
                return ctx
                    .get(var)
                    .ok_or_else(|| Error::undefined_var(var.to_string()));
            }
            Ok(Value::String(render(s, ctx)?))
        }
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (k, v) in map {
                rendered.insert(k.clone(), render_value(v, ctx)?);
            }
            Ok(Value::Object(rendered))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| render_value(v, ctx))
                .collect::<Result<_>>()?,
        )),
        other => Ok(other.clone()),
    }
}

fn whole_variable(s: &str) -> Option<&str> {
    let cap = TEMPLATE_REGEX.captures(s.trim())?;
    let full = cap.get(0)?;
    (full.as_str().len() == s.trim().len()).then(|| cap.get(1).map(|m| m.as_str()))?
}
