// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request body validator.
//!
//! Each request kind declares its fields as constants ([`TextField`],
//! [`IntField`], [`BoolField`]) and reads them through a [`Payload`].
//! Every field is checked and every violation collected; the typed request
//! is only handed out when the list is empty. Unknown keys are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("Invalid email regex")
});

/// A single field violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every violation found in one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} invalid field(s)", .0.len())]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors for a body that could not be read as a JSON object.
    pub fn malformed_body(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push("body", message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Whether any violation concerns `field`.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

/// String format constraint.
#[derive(Debug, Clone, Copy)]
pub enum Format {
    Plain,
    Email,
    /// Absolute http(s) URL with a host
    Url,
    OneOf(&'static [&'static str]),
}

/// Trimmed string field.
#[derive(Debug, Clone, Copy)]
pub struct TextField {
    pub name: &'static str,
    pub max_len: usize,
    pub format: Format,
}

impl TextField {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            max_len: usize::MAX,
            format: Format::Plain,
        }
    }

    pub const fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}

/// Integer field with an inclusive range. Out-of-range values are rejected.
#[derive(Debug, Clone, Copy)]
pub struct IntField {
    pub name: &'static str,
    pub min: i64,
    pub max: i64,
}

impl IntField {
    pub const fn new(name: &'static str, min: i64, max: i64) -> Self {
        Self { name, min, max }
    }
}

/// Required boolean field.
#[derive(Debug, Clone, Copy)]
pub struct BoolField {
    pub name: &'static str,
}

impl BoolField {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

/// A request kind that can be validated from a JSON object.
pub trait Schema: Sized {
    /// Build the typed request, or report every violated constraint.
    fn from_payload(payload: Payload<'_>) -> Result<Self, FieldErrors>;
}

/// Parse a raw body and validate it against `S`.
pub fn validate<S: Schema>(body: &[u8]) -> Result<S, FieldErrors> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Body is not valid JSON");
        FieldErrors::malformed_body("Malformed JSON body")
    })?;

    match value {
        Value::Object(object) => S::from_payload(Payload::new(&object)),
        _ => Err(FieldErrors::malformed_body("Expected a JSON object")),
    }
}

/// Field reader that accumulates violations.
///
/// Accessors for required fields return a placeholder on failure so a
/// schema can build its struct unconditionally; [`Payload::finish`] then
/// discards that struct if anything was recorded.
pub struct Payload<'a> {
    object: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Payload<'a> {
    pub fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            errors: FieldErrors::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.object.get(name).filter(|v| !v.is_null())
    }

    /// Required, non-empty after trimming.
    pub fn text(&mut self, field: &TextField) -> String {
        match self.read_text(field) {
            Ok(Some(value)) => value,
            Ok(None) => {
                self.errors.push(field.name, "Required");
                String::new()
            }
            Err(message) => {
                self.errors.push(field.name, message);
                String::new()
            }
        }
    }

    /// Optional; absent, null and empty-after-trim all read as `None`.
    pub fn optional_text(&mut self, field: &TextField) -> Option<String> {
        match self.read_text(field) {
            Ok(value) => value,
            Err(message) => {
                self.errors.push(field.name, message);
                None
            }
        }
    }

    fn read_text(&self, field: &TextField) -> Result<Option<String>, String> {
        let raw = match self.get(field.name) {
            None => return Ok(None),
            Some(Value::String(s)) => s,
            Some(_) => return Err("Expected a string".to_string()),
        };

        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }
        if value.chars().count() > field.max_len {
            return Err(format!("Must be at most {} characters", field.max_len));
        }

        match field.format {
            Format::Plain => {}
            Format::Email => {
                if !is_valid_email(value) {
                    return Err("Invalid email address".to_string());
                }
            }
            Format::Url => {
                if !is_valid_url(value) {
                    return Err("Invalid URL".to_string());
                }
            }
            Format::OneOf(options) => {
                if !options.contains(&value) {
                    return Err(format!("Must be one of: {}", options.join(", ")));
                }
            }
        }

        Ok(Some(value.to_string()))
    }

    /// Required integer within the field's range.
    pub fn int(&mut self, field: &IntField) -> i64 {
        match self.read_int(field) {
            Ok(Some(value)) => value,
            Ok(None) => {
                self.errors.push(field.name, "Required");
                field.min
            }
            Err(message) => {
                self.errors.push(field.name, message);
                field.min
            }
        }
    }

    /// Optional integer within the field's range.
    pub fn optional_int(&mut self, field: &IntField) -> Option<i64> {
        match self.read_int(field) {
            Ok(value) => value,
            Err(message) => {
                self.errors.push(field.name, message);
                None
            }
        }
    }

    fn read_int(&self, field: &IntField) -> Result<Option<i64>, String> {
        let value = match self.get(field.name) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| "Expected an integer".to_string())?,
            Some(_) => return Err("Expected an integer".to_string()),
        };

        if value < field.min || value > field.max {
            return Err(if field.max == i64::MAX {
                format!("Must be at least {}", field.min)
            } else {
                format!("Must be between {} and {}", field.min, field.max)
            });
        }
        Ok(Some(value))
    }

    /// Required boolean.
    pub fn boolean(&mut self, field: &BoolField) -> bool {
        match self.get(field.name) {
            Some(Value::Bool(b)) => *b,
            None => {
                self.errors.push(field.name, "Required");
                false
            }
            Some(_) => {
                self.errors.push(field.name, "Expected a boolean");
                false
            }
        }
    }

    /// Hand out `value` only if no violation was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// Email address check, rejecting leading dots and empty labels.
pub fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_REGEX.is_match(value)
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
