//! Profile edits: which fields each caller may change and how they are checked

use chrono::NaiveDate;
use common::{
    accounts::AccountStatus,
    response::{ApiError, ApiResult},
    validation::{Payload, Validator},
};

use super::{Changes, FieldValue};

pub const DEFAULT_AVATAR: &str = "/assets/images/default-avatar.jpg";

const GENDERS: [&str; 2] = ["male", "female"];
const AVAILABILITY: [&str; 3] = ["available", "busy", "unavailable"];
const VERIFICATION: [&str; 3] = ["pending", "verified", "rejected"];

/// Account columns that cannot be cleared
const NON_NULL_TEXT: [&str; 4] = ["first_name", "last_name", "country", "preferred_language"];
/// Account columns that are cleared by an empty value
const NULLABLE_TEXT: [&str; 6] = ["phone", "address", "city", "state", "zip_code", "timezone"];

const PROVIDER_TEXT: [&str; 4] = ["business_name", "bio", "specialization", "languages_spoken"];

/// Profile pictures must come from the upload CDN or the bundled assets
pub fn is_allowed_picture(url: &str) -> bool {
    url.starts_with("https://res.cloudinary.com/") || url.starts_with("/assets/images/")
}

/// Self-service edits, split by target table
#[derive(Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub account: Changes,
    pub provider: Changes,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.account.is_empty() && self.provider.is_empty()
    }
}

fn present(payload: &Payload, field: &str) -> bool {
    payload.as_map().contains_key(field)
}

fn text_changes(payload: &Payload, changes: &mut Changes, non_null: &[&'static str], nullable: &[&'static str]) {
    for &field in non_null {
        if let Some(value) = payload.trimmed(field) {
            changes.set(field, FieldValue::Text(Some(value)));
        }
    }
    for &field in nullable {
        if present(payload, field) {
            changes.set(field, FieldValue::Text(payload.trimmed(field)));
        }
    }
}

/// Blank names are skipped rather than cleared, so only non-blank ones are checked
fn check_names(validator: &mut Validator<'_>, payload: &Payload) {
    for field in ["first_name", "last_name"] {
        if payload.trimmed(field).is_some() {
            validator.min_length(field, 2);
        }
    }
}

/// Collect account (and, for providers, profile) edits from a request body
pub fn profile_update(payload: &Payload, include_provider: bool) -> ApiResult<ProfileUpdate> {
    let mut validator = Validator::new(payload);
    check_names(&mut validator, payload);
    validator
        .date("date_of_birth")
        .one_of("preferred_language", &["en", "fr", "ar"]);

    if let Some(gender) = payload.trimmed("gender") {
        validator.check(
            "gender",
            GENDERS.contains(&gender.as_str()),
            "Invalid gender. Allowed values: male, female.",
        );
    }
    if let Some(picture) = payload.trimmed("profile_picture") {
        validator.check(
            "profile_picture",
            is_allowed_picture(&picture),
            "Invalid profile picture URL. Please upload via Cloudinary.",
        );
    }
    if include_provider {
        validator
            .numeric("experience_years")
            .min("experience_years", 0.0)
            .numeric("service_radius")
            .min("service_radius", 0.0)
            .numeric("hourly_rate")
            .min("hourly_rate", 0.0)
            .one_of("availability_status", &AVAILABILITY);
    }
    validator.finish()?;

    let mut update = ProfileUpdate::default();
    text_changes(payload, &mut update.account, &NON_NULL_TEXT, &NULLABLE_TEXT);

    if present(payload, "gender") {
        update
            .account
            .set("gender", FieldValue::Text(payload.trimmed("gender")));
    }
    if present(payload, "profile_picture") {
        let picture = payload
            .trimmed("profile_picture")
            .unwrap_or_else(|| DEFAULT_AVATAR.to_string());
        update
            .account
            .set("profile_picture", FieldValue::Text(Some(picture)));
    }
    if present(payload, "date_of_birth") {
        let date = payload
            .trimmed("date_of_birth")
            .and_then(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok());
        update.account.set("date_of_birth", FieldValue::Date(date));
    }

    if include_provider {
        text_changes(payload, &mut update.provider, &[], &PROVIDER_TEXT);
        if let Some(status) = payload.trimmed("availability_status") {
            update
                .provider
                .set("availability_status", FieldValue::Text(Some(status)));
        }
        for field in ["experience_years", "service_radius"] {
            if present(payload, field) {
                let value = payload.integer(field).and_then(|v| i32::try_from(v).ok());
                update.provider.set(field, FieldValue::Integer(value));
            }
        }
        if present(payload, "hourly_rate") {
            update
                .provider
                .set("hourly_rate", FieldValue::Float(payload.number("hourly_rate")));
        }
    }

    Ok(update)
}

/// Moderation edits an administrator may make to an account
pub fn admin_update(payload: &Payload, include_provider: bool) -> ApiResult<ProfileUpdate> {
    let mut validator = Validator::new(payload);
    validator.one_of("account_status", &AccountStatus::ALL);
    check_names(&mut validator, payload);
    if include_provider {
        validator.one_of("verification_status", &VERIFICATION);
    }
    validator.finish()?;

    let mut update = ProfileUpdate::default();
    text_changes(
        payload,
        &mut update.account,
        &["account_status", "first_name", "last_name"],
        &["phone", "city", "address"],
    );
    if include_provider {
        if let Some(status) = payload.trimmed("verification_status") {
            update
                .provider
                .set("verification_status", FieldValue::Text(Some(status)));
        }
    }

    if update.is_empty() {
        return Err(ApiError::BadRequest("No valid fields to update".to_string()));
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from(value)
    }

    #[test]
    fn empty_gender_clears_the_column() {
        let update = profile_update(&payload(json!({"gender": ""})), false).expect("update");
        assert_eq!(update.account.get("gender"), Some(&FieldValue::Text(None)));
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let err = profile_update(&payload(json!({"gender": "other"})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn pictures_must_come_from_the_cdn_or_assets() {
        assert!(is_allowed_picture("https://res.cloudinary.com/demo/image/upload/a.jpg"));
        assert!(is_allowed_picture("/assets/images/default-avatar.jpg"));
        assert!(!is_allowed_picture("http://res.cloudinary.com/demo/a.jpg"));
        assert!(!is_allowed_picture("https://evil.example.com/a.jpg"));

        let err =
            profile_update(&payload(json!({"profile_picture": "https://evil.example.com/a.jpg"})), false)
                .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn blank_picture_resets_to_default_avatar() {
        let update = profile_update(&payload(json!({"profile_picture": " "})), false).expect("update");
        assert_eq!(
            update.account.get("profile_picture"),
            Some(&FieldValue::Text(Some(DEFAULT_AVATAR.to_string())))
        );
    }

    #[test]
    fn blank_names_are_ignored_not_cleared() {
        let update = profile_update(&payload(json!({"first_name": "", "city": ""})), false).expect("update");
        assert_eq!(update.account.get("first_name"), None);
        assert_eq!(update.account.get("city"), Some(&FieldValue::Text(None)));
    }

    #[test]
    fn short_names_are_still_rejected() {
        let err = profile_update(&payload(json!({"last_name": " A "})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = admin_update(&payload(json!({"first_name": "B"})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn admin_blank_name_is_not_an_edit() {
        let err = admin_update(&payload(json!({"first_name": "  "})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn customers_cannot_touch_provider_fields() {
        let update = profile_update(&payload(json!({"bio": "hello"})), false).expect("update");
        assert!(update.is_empty());

        let update = profile_update(&payload(json!({"bio": "hello", "service_radius": "15"})), true)
            .expect("update");
        assert_eq!(update.provider.get("bio"), Some(&FieldValue::Text(Some("hello".into()))));
        assert_eq!(update.provider.get("service_radius"), Some(&FieldValue::Integer(Some(15))));
    }

    #[test]
    fn admin_update_requires_a_known_field() {
        let err = admin_update(&payload(json!({"email": "x@example.com"})), true).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No valid fields to update");

        let err = admin_update(&payload(json!({"account_status": "banned"})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn verification_status_is_provider_only() {
        let err = admin_update(&payload(json!({"verification_status": "verified"})), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let update = admin_update(&payload(json!({"verification_status": "verified"})), true).expect("update");
        assert_eq!(update.provider.columns(), vec!["verification_status"]);
    }
}
