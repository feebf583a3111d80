//! Booking models and the status transition rules

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{
    accounts::AccountRole,
    response::{ApiError, ApiResult},
    validation::{Payload, Validator, parse_time},
};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const REFERENCE_PREFIX: &str = "BK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Refunded,
}

impl BookingStatus {
    pub const ALL: [&'static str; 7] = [
        "pending",
        "confirmed",
        "in_progress",
        "completed",
        "cancelled",
        "rejected",
        "refunded",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "rejected" => Some(BookingStatus::Rejected),
            "refunded" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `role` may move a booking from `from` to `to`
///
/// Providers run the job forward, customers may only cancel before work
/// starts, and administrators may force any change.
pub fn can_transition(role: AccountRole, from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;

    if from == to {
        return false;
    }

    match role {
        AccountRole::Admin => true,
        AccountRole::Provider => matches!(
            (from, to),
            (Pending, Confirmed) | (Pending, Rejected) | (Confirmed, InProgress) | (InProgress, Completed)
        ),
        AccountRole::User => matches!((from, to), (Pending, Cancelled) | (Confirmed, Cancelled)),
    }
}

pub fn check_transition(role: AccountRole, from: BookingStatus, to: BookingStatus) -> ApiResult<()> {
    if can_transition(role, from, to) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            from, to
        )))
    }
}

/// New booking reference: `BK`, the UTC date, then six random characters
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}{}{}", REFERENCE_PREFIX, now.format("%Y%m%d"), suffix)
}

/// Row from `bookings`
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub booking_reference: String,
    pub user_id: i64,
    pub provider_id: i64,
    pub service_id: i64,
    pub provider_service_id: Option<i64>,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub address: String,
    pub city: String,
    pub notes: Option<String>,
    pub price: f64,
    pub booking_status: String,
    pub cancellation_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn status(&self) -> Option<BookingStatus> {
        BookingStatus::parse(&self.booking_status)
    }

    /// The customer, the provider, or any administrator
    pub fn is_visible_to(&self, role: AccountRole, account_id: i64) -> bool {
        match role {
            AccountRole::Admin => true,
            AccountRole::User => self.user_id == account_id,
            AccountRole::Provider => self.provider_id == account_id,
        }
    }
}

/// A booking joined with the names of everyone involved
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub booking: Booking,
    pub service_name: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
    pub provider_first_name: String,
    pub provider_last_name: String,
    pub provider_email: String,
    pub business_name: Option<String>,
    pub provider_picture: String,
}

/// Active offering a booking is made against
#[derive(Debug, Clone, FromRow)]
pub struct BookableOffering {
    pub id: i64,
    pub provider_id: i64,
    pub service_id: i64,
    pub price: f64,
}

/// Validated `POST bookings` body
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub provider_service_id: i64,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub address: String,
    pub city: String,
    pub notes: Option<String>,
}

impl NewBooking {
    pub fn from_payload(payload: &Payload, today: NaiveDate) -> ApiResult<Self> {
        let mut validator = Validator::new(payload);
        validator
            .required("provider_service_id")
            .positive_integer("provider_service_id")
            .required("booking_date")
            .date("booking_date")
            .required("booking_time")
            .time("booking_time")
            .required("address")
            .min_length("address", 2)
            .required("city")
            .min_length("city", 2)
            .max_length("notes", 1000);

        let booking_date = payload
            .trimmed("booking_date")
            .and_then(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok());
        if let Some(date) = booking_date {
            validator.check(
                "booking_date",
                date >= today,
                "Booking_date cannot be in the past",
            );
        }
        validator.finish()?;

        let booking_time = payload.trimmed("booking_time").and_then(|value| parse_time(&value));
        match (booking_date, booking_time) {
            (Some(booking_date), Some(booking_time)) => Ok(Self {
                provider_service_id: payload.integer("provider_service_id").unwrap_or_default(),
                booking_date,
                booking_time,
                address: payload.trimmed("address").unwrap_or_default(),
                city: payload.trimmed("city").unwrap_or_default(),
                notes: payload.trimmed("notes"),
            }),
            _ => Err(ApiError::validation_error(
                "booking_date",
                "Booking_date must be a valid date",
            )),
        }
    }
}

/// Validated `PUT bookings/{id}/status` body
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn from_payload(payload: &Payload) -> ApiResult<Self> {
        Validator::new(payload)
            .required("status")
            .one_of("status", &BookingStatus::ALL)
            .max_length("reason", 500)
            .finish()?;

        let status = payload
            .text("status")
            .and_then(|value| BookingStatus::parse(&value))
            .ok_or_else(|| ApiError::validation_error("status", "Status is required"))?;

        Ok(Self {
            status,
            reason: payload.trimmed("reason"),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BookingQuery {
    /// Known status filter; unknown values are ignored
    pub fn status(&self) -> Option<BookingStatus> {
        self.status.as_deref().and_then(BookingStatus::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use BookingStatus::*;

    #[test]
    fn provider_moves_the_job_forward() {
        let role = AccountRole::Provider;
        assert!(can_transition(role, Pending, Confirmed));
        assert!(can_transition(role, Pending, Rejected));
        assert!(can_transition(role, Confirmed, InProgress));
        assert!(can_transition(role, InProgress, Completed));

        assert!(!can_transition(role, Pending, Completed));
        assert!(!can_transition(role, Confirmed, Cancelled));
        assert!(!can_transition(role, Completed, Refunded));
    }

    #[test]
    fn customer_may_only_cancel_before_work_starts() {
        let role = AccountRole::User;
        assert!(can_transition(role, Pending, Cancelled));
        assert!(can_transition(role, Confirmed, Cancelled));

        assert!(!can_transition(role, InProgress, Cancelled));
        assert!(!can_transition(role, Pending, Confirmed));
    }

    #[test]
    fn admin_may_force_any_change() {
        assert!(can_transition(AccountRole::Admin, Completed, Refunded));
        assert!(can_transition(AccountRole::Admin, Cancelled, Pending));
        assert!(!can_transition(AccountRole::Admin, Pending, Pending));
    }

    #[test]
    fn invalid_transition_message() {
        let err = check_transition(AccountRole::User, InProgress, Cancelled).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Invalid status transition from in_progress to cancelled"
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for value in BookingStatus::ALL {
            let status = BookingStatus::parse(value).expect("known status");
            assert_eq!(status.as_str(), value);
        }
        assert_eq!(BookingStatus::parse("done"), None);
    }

    #[test]
    fn references_carry_prefix_and_date() {
        let now = DateTime::parse_from_rfc3339("2025-03-09T10:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let reference = generate_reference(now);
        assert!(reference.starts_with("BK20250309"));
        assert_eq!(reference.len(), 16);
        assert!(reference[10..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn bookings_cannot_be_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).expect("date");
        let payload = Payload::from(json!({
            "provider_service_id": 5,
            "booking_date": "2025-03-08",
            "booking_time": "10:30",
            "address": "12 Rue Didouche",
            "city": "Algiers",
        }));
        let err = NewBooking::from_payload(&payload, today).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors["booking_date"], "Booking_date cannot be in the past");
    }

    #[test]
    fn valid_booking_payload() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).expect("date");
        let payload = Payload::from(json!({
            "provider_service_id": "5",
            "booking_date": "2025-03-09",
            "booking_time": "10:30",
            "address": " 12 Rue Didouche ",
            "city": "Algiers",
            "notes": "",
        }));
        let booking = NewBooking::from_payload(&payload, today).expect("booking");
        assert_eq!(booking.provider_service_id, 5);
        assert_eq!(booking.booking_time, NaiveTime::from_hms_opt(10, 30, 0).expect("time"));
        assert_eq!(booking.address, "12 Rue Didouche");
        assert_eq!(booking.notes, None);
    }

    #[test]
    fn status_change_requires_known_status() {
        let err = StatusChange::from_payload(&Payload::from(json!({"status": "done"}))).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let change = StatusChange::from_payload(&Payload::from(json!({
            "status": "cancelled",
            "reason": "Travelling",
        })))
        .expect("change");
        assert_eq!(change.status, Cancelled);
        assert_eq!(change.reason.as_deref(), Some("Travelling"));
    }
}
