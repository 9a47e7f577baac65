//! Loosely-typed option bags
//!
//! Actions receive their inputs as a JSON object. `OptionBag` pulls typed
//! fields out of it: required fields fail with the caller's message, optional
//! fields fall back to a default when absent or null. Scalars are coerced the
//! way a form field would be (`"true"` is a bool, `"300"` is a number).

use serde_json::{Map, Value};

use crate::error::ActionError;

/// A JSON object of action options
#[derive(Debug, Clone, Default)]
pub struct OptionBag {
    fields: Map<String, Value>,
}

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an arbitrary JSON value; `null` becomes an empty bag
    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::new()),
            other => Err(ActionError::validation(format!(
                "options must be a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(v) if !v.is_null())
    }

    /// A non-empty string field; fails with `message` when missing, empty or not a string
    pub fn required_str(&self, field: &str, message: &str) -> Result<String, ActionError> {
        match self.fields.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(ActionError::validation(message)),
        }
    }

    pub fn optional_str(&self, field: &str, default: &str) -> Result<String, ActionError> {
        Ok(self
            .optional_string(field)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// A string field with no default
    pub fn optional_string(&self, field: &str) -> Result<Option<String>, ActionError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(wrong_type(field, "a string", other)),
        }
    }

    pub fn optional_bool(&self, field: &str, default: bool) -> Result<bool, ActionError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(wrong_type(field, "a boolean", other)),
        }
    }

    pub fn optional_u64(&self, field: &str, default: u64) -> Result<u64, ActionError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| wrong_type(field, "a non-negative integer", &Value::Number(n.clone()))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| wrong_type(field, "a non-negative integer", &Value::String(s.clone()))),
            Some(other) => Err(wrong_type(field, "a non-negative integer", other)),
        }
    }
}

impl From<Map<String, Value>> for OptionBag {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn wrong_type(field: &str, expected: &str, got: &Value) -> ActionError {
    ActionError::validation(format!(
        "{} must be {}, got {}",
        field,
        expected,
        type_name(got)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
