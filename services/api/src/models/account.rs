//! Account read models for favorites, dashboards and moderation

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A customer's saved provider
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Favorite {
    pub id: i64,
    pub provider_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub business_name: Option<String>,
    pub profile_picture: String,
    pub city: Option<String>,
    pub average_rating: Option<f64>,
    pub total_reviews: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Counters shown on the provider dashboard
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProviderStatistics {
    pub total_bookings: i32,
    pub completed_bookings: i32,
    pub cancelled_bookings: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub response_rate: f64,
    pub acceptance_rate: f64,
}

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminStats {
    pub total_providers: i64,
    pub total_users: i64,
    pub pending_verifications: i64,
    pub total_bookings: i64,
    pub verified_providers: i64,
    pub active_users: i64,
}

/// Row in the admin user and provider lists
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub profile_picture: String,
    pub account_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<i32>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of an administrator deleting an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Deleted,
    /// Related rows blocked the delete; the account was deactivated instead
    Deactivated,
}
