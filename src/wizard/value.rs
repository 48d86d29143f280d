//! Field values and the cumulative field store shared by every step.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, WizardError};

/// A single form value as entered by the user or derived by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// Returns `true` when the value carries nothing a required check would
    /// accept. `false` checkboxes are blank; a zero number is not.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Bool(flag) => !flag,
            FieldValue::Number(_) => false,
            FieldValue::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Number(number) => serde_json::Number::from_f64(*number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(flag) => write!(f, "{}", if *flag { "yes" } else { "no" }),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Input control a field is bound to. Drives type coercion on update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Secret,
    Number,
    Checkbox,
    Choice(Vec<String>),
}

impl FieldKind {
    /// Coerces an incoming value to the shape stored for this control.
    pub fn coerce(&self, field: &str, value: FieldValue) -> Result<FieldValue> {
        match self {
            FieldKind::Checkbox => match value {
                FieldValue::Bool(flag) => Ok(FieldValue::Bool(flag)),
                FieldValue::Number(number) => Ok(FieldValue::Bool(number != 0.0)),
                FieldValue::Text(text) => parse_flag(&text).map(FieldValue::Bool).ok_or_else(|| {
                    WizardError::InvalidValue {
                        field: field.to_string(),
                        reason: "enter yes/no, true/false, or 1/0".into(),
                    }
                }),
            },
            FieldKind::Number => match value {
                FieldValue::Number(number) => Ok(FieldValue::Number(number)),
                FieldValue::Bool(_) => Err(WizardError::InvalidValue {
                    field: field.to_string(),
                    reason: "expected a number".into(),
                }),
                FieldValue::Text(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Ok(FieldValue::empty());
                    }
                    trimmed
                        .parse::<f64>()
                        .map(FieldValue::Number)
                        .map_err(|_| WizardError::InvalidValue {
                            field: field.to_string(),
                            reason: "expected a number".into(),
                        })
                }
            },
            FieldKind::Choice(options) => {
                let text = value.to_string();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(FieldValue::empty());
                }
                options
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
                    .map(|candidate| FieldValue::Text(candidate.clone()))
                    .ok_or_else(|| WizardError::InvalidValue {
                        field: field.to_string(),
                        reason: format!("must be one of: {}", options.join(", ")),
                    })
            }
            FieldKind::Text | FieldKind::Secret => Ok(match value {
                FieldValue::Text(text) => FieldValue::Text(text),
                other => FieldValue::Text(other.to_string()),
            }),
        }
    }

    /// Value a freshly created wizard holds for this control.
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldKind::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::empty(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "on" => Some(true),
        "n" | "no" | "false" | "0" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Cumulative form data across every step of a wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStore {
    values: BTreeMap<String, FieldValue>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a single value, leaving every other field untouched.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Text content of a field, or an empty string for missing and non-text
    /// values.
    pub fn text(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or("")
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values.get(name).map(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.values.get(name).map(FieldValue::is_blank).unwrap_or(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds a plain JSON payload from the selected fields.
    pub fn payload<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Map<String, Value> {
        names
            .into_iter()
            .filter_map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.to_string(), value.to_json()))
            })
            .collect()
    }
}
