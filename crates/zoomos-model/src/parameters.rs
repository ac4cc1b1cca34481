//! Descriptions of the parameters a strategy accepts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterKind {
    String,
    Number,
    Select,
    /// ISO `YYYY-MM-DD`.
    Date,
    Boolean,
    /// JSON array of strings.
    StringList,
}

/// One parameter of a stage: how to show it and how to check it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub default_value: Option<String>,
    pub allowed_values: Vec<String>,
}

impl ParameterDescriptor {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            description: String::new(),
            kind,
            required: false,
            default_value: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Check a supplied value; `None` means the parameter was not given.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self, value: Option<&Value>) -> Result<(), String> {
        let value = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(other) => Some(other),
        };
        let Some(value) = value else {
            if self.required {
                return Err(format!("parameter '{}' is required", self.display_name));
            }
            return Ok(());
        };
        let valid = match self.kind {
            ParameterKind::String => value.is_string() || value.is_number(),
            ParameterKind::Number => {
                value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|text| text.trim().parse::<f64>().is_ok())
            }
            ParameterKind::Boolean => {
                value.is_boolean()
                    || matches!(value.as_str().map(str::trim), Some("true" | "false"))
            }
            ParameterKind::Date => value.as_str().is_some_and(|text| {
                chrono::NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()
            }),
            ParameterKind::Select => value
                .as_str()
                .is_some_and(|text| self.allowed_values.iter().any(|allowed| allowed == text)),
            ParameterKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };
        if valid {
            Ok(())
        } else {
            Err(format!(
                "invalid value for parameter '{}': {value}",
                self.display_name
            ))
        }
    }
}
