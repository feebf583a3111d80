//! Catalog, offering and content models

use chrono::{DateTime, Utc};
use common::{
    response::{ApiError, ApiResult},
    validation::{Payload, Validator},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{Changes, FieldValue};

pub const PRICE_TYPES: [&str; 4] = ["fixed", "hourly", "per_item", "custom"];

/// Active category with its translated name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub category_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    pub service_count: i64,
}

/// Catalog service with translated name and description
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Service {
    pub id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub service_name: String,
    pub description: Option<String>,
    pub service_image: Option<String>,
    pub base_price: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub is_popular: bool,
    pub is_featured: bool,
    pub total_bookings: i32,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
}

/// Catalog service as seen by administrators
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminService {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers_offering: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

/// Image attached to an offering
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OfferImage {
    #[serde(skip)]
    pub provider_service_id: i64,
    pub url: String,
    pub public_id: Option<String>,
    pub sort_order: i32,
}

/// Public listing of a provider's offering
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Offer {
    pub provider_service_id: i64,
    pub provider_id: i64,
    pub service_id: i64,
    pub base_price: f64,
    pub price_type: String,
    pub total_bookings: i32,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub service_name: String,
    pub duration_minutes: Option<i32>,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub service_image: Option<String>,
    pub primary_image: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub business_name: Option<String>,
    pub provider_avatar: String,
    pub provider_city: Option<String>,
    pub provider_type: Option<String>,
    pub verification_status: Option<String>,
    pub availability_status: Option<String>,
    pub average_rating: Option<f64>,
    pub total_reviews: Option<i32>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<OfferImage>>,
}

/// An offering as managed by its provider
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Offering {
    pub id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub service_description: Option<String>,
    pub price: f64,
    pub price_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub total_bookings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub images: Vec<OfferImage>,
}

/// Fields for a new offering
#[derive(Debug, Clone, PartialEq)]
pub struct NewOffering {
    pub service_id: i64,
    pub price: f64,
    pub price_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub images: Vec<NewImage>,
}

/// Edits to an offering; `images` replaces the whole set when present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferingUpdate {
    pub changes: Changes,
    pub images: Option<Vec<NewImage>>,
}

/// Uploaded image reference sent by the client
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub url: String,
    pub public_id: Option<String>,
}

/// Published content page in the requested language
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContentPage {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub lang: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferQuery {
    pub provider_service_id: Option<i64>,
    pub include_images: Option<String>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub lang: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl OfferQuery {
    /// Images are attached on request, and always for a single offering
    pub fn wants_images(&self) -> bool {
        self.provider_service_id.is_some() || super::truthy(self.include_images.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopularQuery {
    pub category_id: Option<i64>,
    pub lang: Option<String>,
    pub limit: Option<i64>,
}

/// Whether the admin listing covers the catalog or only offered services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    Catalog,
    Offered,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminServiceQuery {
    pub scope: Option<String>,
    pub status: Option<String>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub lang: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AdminServiceQuery {
    pub fn scope(&self) -> ServiceScope {
        match self.scope.as_deref().map(str::trim) {
            Some("offered") => ServiceScope::Offered,
            _ => ServiceScope::Catalog,
        }
    }

    /// `Some(true)` for `status=active`, `Some(false)` for `status=inactive`
    pub fn active_filter(&self) -> Option<bool> {
        match self.status.as_deref().map(str::trim) {
            Some("active") => Some(true),
            Some("inactive") => Some(false),
            _ => None,
        }
    }
}

/// Trimmed, non-empty search term as a contains-pattern with wildcards escaped
pub fn search_term(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

const MAX_IMAGES: usize = 10;

/// Parse `images` as URLs or `{url, public_id}` objects
///
/// `None` when the field is absent.
pub fn offering_images(payload: &Payload) -> ApiResult<Option<Vec<NewImage>>> {
    let Some(raw) = payload.as_map().get("images") else {
        return Ok(None);
    };

    let items = match raw {
        Value::Null => return Ok(Some(Vec::new())),
        Value::Array(items) => items,
        _ => return Err(ApiError::validation_error("images", "Images must be a list")),
    };

    let mut images = Vec::with_capacity(items.len());
    for item in items {
        let (url, public_id) = match item {
            Value::String(url) => (url.trim().to_string(), None),
            Value::Object(map) => (
                map.get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                map.get("public_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            _ => (String::new(), None),
        };
        if !url.starts_with("https://res.cloudinary.com/") {
            return Err(ApiError::validation_error(
                "images",
                "Images must be uploaded via Cloudinary",
            ));
        }
        images.push(NewImage { url, public_id });
    }

    if images.len() > MAX_IMAGES {
        return Err(ApiError::validation_error(
            "images",
            format!("At most {} images are allowed", MAX_IMAGES),
        ));
    }
    Ok(Some(images))
}

/// Validate a `POST providers/services` body
pub fn new_offering(payload: &Payload) -> ApiResult<NewOffering> {
    Validator::new(payload)
        .required("service_id")
        .numeric("service_id")
        .positive_integer("service_id")
        .required("price")
        .numeric("price")
        .min("price", 0.0)
        .one_of("price_type", &PRICE_TYPES)
        .finish()?;

    Ok(NewOffering {
        service_id: payload.integer("service_id").unwrap_or_default(),
        price: payload.number("price").unwrap_or_default(),
        price_type: payload
            .trimmed("price_type")
            .unwrap_or_else(|| "fixed".to_string()),
        description: payload.trimmed("description"),
        is_active: payload.flag("is_active").unwrap_or(true),
        images: offering_images(payload)?.unwrap_or_default(),
    })
}

/// Validate a `PUT providers/services/{id}` body
pub fn offering_update(payload: &Payload) -> ApiResult<OfferingUpdate> {
    Validator::new(payload)
        .numeric("price")
        .min("price", 0.0)
        .one_of("price_type", &PRICE_TYPES)
        .finish()?;

    let mut changes = Changes::new();
    if let Some(price) = payload.number("price") {
        changes.set("price", FieldValue::Float(Some(price)));
    }
    if let Some(price_type) = payload.trimmed("price_type") {
        changes.set("price_type", FieldValue::Text(Some(price_type)));
    }
    if payload.as_map().contains_key("description") {
        changes.set("description", FieldValue::Text(payload.trimmed("description")));
    }
    if let Some(active) = payload.flag("is_active") {
        changes.set("is_active", FieldValue::Boolean(active));
    }

    let update = OfferingUpdate {
        changes,
        images: offering_images(payload)?,
    };
    if update.changes.is_empty() && update.images.is_none() {
        return Err(ApiError::BadRequest("No changes provided".to_string()));
    }
    Ok(update)
}
