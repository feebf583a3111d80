//! Input validation utilities
//!
//! Request bodies are accepted as loose JSON objects ([`Payload`]) because
//! clients send numbers as strings and use optional legacy fields. A
//! [`Validator`] then applies field-scoped rules, keeping the first failure
//! per field.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::response::{ApiError, FieldErrors};

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Lowercase and trim an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A JSON object request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Whether the key is present with a non-null value
    pub fn has(&self, key: &str) -> bool {
        !matches!(self.0.get(key), None | Some(Value::Null))
    }

    /// String form of a scalar field
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
            _ => None,
        }
    }

    /// Trimmed, non-empty string field
    pub fn trimmed(&self, key: &str) -> Option<String> {
        self.text(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_i64() != Some(0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Payload(map),
            _ => Payload::default(),
        }
    }
}

/// Field-scoped rule chain over a [`Payload`]
pub struct Validator<'a> {
    payload: &'a Payload,
    errors: FieldErrors,
}

impl<'a> Validator<'a> {
    pub fn new(payload: &'a Payload) -> Self {
        Self {
            payload,
            errors: FieldErrors::new(),
        }
    }

    fn fail(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_insert(message);
    }

    fn value(&self, field: &str) -> Option<String> {
        if self.payload.has(field) {
            self.payload.text(field)
        } else {
            None
        }
    }

    pub fn required(&mut self, field: &str) -> &mut Self {
        let missing = self
            .value(field)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true);
        if missing {
            self.fail(field, format!("{} is required", label(field)));
        }
        self
    }

    pub fn email(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            if validate_email(value.trim()).is_err() {
                self.fail(field, "Invalid email format".to_string());
            }
        }
        self
    }

    pub fn min_length(&mut self, field: &str, min: usize) -> &mut Self {
        if let Some(value) = self.value(field) {
            if value.trim().chars().count() < min {
                self.fail(
                    field,
                    format!("{} must be at least {} characters", label(field), min),
                );
            }
        }
        self
    }

    pub fn max_length(&mut self, field: &str, max: usize) -> &mut Self {
        if let Some(value) = self.value(field) {
            if value.chars().count() > max {
                self.fail(
                    field,
                    format!("{} must not exceed {} characters", label(field), max),
                );
            }
        }
        self
    }

    pub fn numeric(&mut self, field: &str) -> &mut Self {
        if self.payload.has(field) && self.payload.number(field).is_none() {
            self.fail(field, format!("{} must be numeric", label(field)));
        }
        self
    }

    pub fn min(&mut self, field: &str, min: f64) -> &mut Self {
        if let Some(value) = self.payload.number(field) {
            if value < min {
                self.fail(field, format!("{} must be at least {}", label(field), min));
            }
        }
        self
    }

    pub fn positive_integer(&mut self, field: &str) -> &mut Self {
        if self.payload.has(field) && !matches!(self.payload.integer(field), Some(v) if v > 0) {
            self.fail(
                field,
                format!("{} must be a positive integer", label(field)),
            );
        }
        self
    }

    pub fn one_of(&mut self, field: &str, allowed: &[&str]) -> &mut Self {
        if let Some(value) = self.value(field) {
            if !allowed.contains(&value.as_str()) {
                self.fail(
                    field,
                    format!("{} must be one of: {}", label(field), allowed.join(", ")),
                );
            }
        }
        self
    }

    /// `YYYY-MM-DD`
    pub fn date(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            if NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_err() {
                self.fail(field, format!("{} must be a valid date", label(field)));
            }
        }
        self
    }

    /// `HH:MM` or `HH:MM:SS`
    pub fn time(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            if parse_time(&value).is_none() {
                self.fail(field, format!("{} must be a valid time", label(field)));
            }
        }
        self
    }

    /// Record a custom rule outcome
    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.fail(field, message.to_string());
        }
        self
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn collected failures into a 422
    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}
