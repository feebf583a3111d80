//! API models for request and response payloads

use chrono::NaiveDate;
use i18n::Locale;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

pub mod account;
pub mod booking;
pub mod catalog;
pub mod message;
pub mod profile;

/// Resolve a `lang` query value to a supported locale code, defaulting to English
pub fn language(lang: Option<&str>) -> &'static str {
    lang.and_then(|code| Locale::from_code(code.trim()))
        .unwrap_or(Locale::En)
        .code()
}

/// `?lang=` only
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

/// `?page=&limit=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Admin list filters, paged by `limit`/`offset`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub verification: Option<String>,
    pub include_deactivated: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A typed column value in a partial update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(Option<i32>),
    Float(Option<f64>),
    Boolean(bool),
    Date(Option<NaiveDate>),
}

/// Ordered `column = value` pairs for a dynamic `UPDATE ... SET`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: FieldValue) {
        self.fields.push((column, value));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    /// Append `col = $n, ...` to an `UPDATE ... SET ` prefix
    pub fn push_assignments(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut assignments = builder.separated(", ");
        for (column, value) in &self.fields {
            assignments.push(format!("{} = ", column));
            match value.clone() {
                FieldValue::Text(v) => assignments.push_bind_unseparated(v),
                FieldValue::Integer(v) => assignments.push_bind_unseparated(v),
                FieldValue::Float(v) => assignments.push_bind_unseparated(v),
                FieldValue::Boolean(v) => assignments.push_bind_unseparated(v),
                FieldValue::Date(v) => assignments.push_bind_unseparated(v),
            };
        }
    }
}

/// Parse query-string booleans the way browsers send them
pub fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}
