//! Account roles, lifecycle statuses and account-type resolution
//!
//! Clients send the requested account type under several historical field
//! names and synonyms. [`resolve_account_type`] normalizes them to a single
//! [`AccountRole`].

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// The three kinds of principal that can hold a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    User,
    Provider,
    Admin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Provider => "provider",
            AccountRole::Admin => "admin",
        }
    }

    /// Human label used in login guidance messages
    pub fn label(&self) -> &'static str {
        match self {
            AccountRole::User => "Customer",
            AccountRole::Provider => "Provider",
            AccountRole::Admin => "Administrator",
        }
    }

    /// Map a role name or one of its synonyms onto a role
    pub fn normalize(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "customer" | "client" => Some(AccountRole::User),
            "provider" | "pro" | "vendor" | "freelancer" => Some(AccountRole::Provider),
            "admin" => Some(AccountRole::Admin),
            _ => None,
        }
    }

    /// Parse a stored role value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(AccountRole::User),
            "provider" => Some(AccountRole::Provider),
            "admin" => Some(AccountRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account lifecycle flag, independent of provider verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    Deactivated,
    Deleted,
}

impl AccountStatus {
    pub const ALL: [&'static str; 5] = ["active", "inactive", "suspended", "deactivated", "deleted"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Deactivated => "deactivated",
            AccountStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "suspended" => Some(AccountStatus::Suspended),
            "deactivated" => Some(AccountStatus::Deactivated),
            "deleted" => Some(AccountStatus::Deleted),
            _ => None,
        }
    }

    /// Statuses that refuse login
    pub fn blocks_login(&self) -> bool {
        !matches!(self, AccountStatus::Active)
    }
}

const TYPE_FIELDS: [&str; 4] = ["user_type", "account_type", "type", "role"];

/// Resolve the account type requested by a registration or login payload
///
/// Admin is never resolved here: admin accounts cannot be self-registered and
/// log in through a dedicated endpoint.
pub fn resolve_account_type(payload: &Map<String, Value>) -> Option<AccountRole> {
    for field in TYPE_FIELDS {
        if let Some(Value::String(raw)) = payload.get(field) {
            match AccountRole::normalize(raw) {
                Some(role @ (AccountRole::User | AccountRole::Provider)) => return Some(role),
                _ => continue,
            }
        }
    }

    match payload.get("is_provider")? {
        Value::Bool(true) => Some(AccountRole::Provider),
        Value::Bool(false) => Some(AccountRole::User),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(AccountRole::Provider),
            Some(0) => Some(AccountRole::User),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(AccountRole::Provider),
            "0" | "false" | "no" => Some(AccountRole::User),
            _ => None,
        },
        _ => None,
    }
}

/// Customer or provider row from `accounts`
///
/// Credentials and one-time tokens are never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub role: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub profile_picture: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub preferred_language: String,
    pub timezone: Option<String>,
    pub account_status: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn role(&self) -> Option<AccountRole> {
        AccountRole::parse(&self.role)
    }

    pub fn status(&self) -> Option<AccountStatus> {
        AccountStatus::parse(&self.account_status)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Provider-only fields, 1:1 with a provider account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProviderProfile {
    #[serde(skip_serializing)]
    pub account_id: i64,
    pub business_name: Option<String>,
    pub tax_id: Option<String>,
    pub business_registration: Option<String>,
    pub provider_type: String,
    pub verification_status: String,
    pub verification_date: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub specialization: Option<String>,
    pub languages_spoken: Option<String>,
    pub service_radius: Option<i32>,
    pub hourly_rate: Option<f64>,
    pub availability_status: String,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub total_bookings: i32,
    pub completed_bookings: i32,
    pub cancelled_bookings: i32,
    pub response_rate: f64,
    pub acceptance_rate: f64,
}

/// An account together with its provider profile, serialized as one object
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    #[serde(flatten)]
    pub account: Account,
    #[serde(flatten)]
    pub provider: Option<ProviderProfile>,
}

/// Row from `admin_users`
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Column list matching [`Account`]
pub const ACCOUNT_COLUMNS: &str = "id, role, email, password_hash, first_name, last_name, phone, \
     address, city, state, zip_code, country, profile_picture, date_of_birth, gender, \
     preferred_language, timezone, account_status, email_verified, verification_token, \
     reset_token, reset_token_expires, last_login, created_at, updated_at";

/// Column list matching [`ProviderProfile`]
pub const PROVIDER_PROFILE_COLUMNS: &str = "account_id, business_name, tax_id, \
     business_registration, provider_type, verification_status, verification_date, bio, \
     experience_years, specialization, languages_spoken, service_radius, hourly_rate, \
     availability_status, average_rating, total_reviews, total_bookings, completed_bookings, \
     cancelled_bookings, response_rate, acceptance_rate";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn synonyms_normalize() {
        assert_eq!(AccountRole::normalize("customer"), Some(AccountRole::User));
        assert_eq!(AccountRole::normalize(" Client "), Some(AccountRole::User));
        assert_eq!(AccountRole::normalize("VENDOR"), Some(AccountRole::Provider));
        assert_eq!(AccountRole::normalize("freelancer"), Some(AccountRole::Provider));
        assert_eq!(AccountRole::normalize("pro"), Some(AccountRole::Provider));
        assert_eq!(AccountRole::normalize("admin"), Some(AccountRole::Admin));
        assert_eq!(AccountRole::normalize("guest"), None);
    }

    #[test]
    fn first_recognized_field_wins() {
        let p = payload(json!({"user_type": "customer", "role": "provider"}));
        assert_eq!(resolve_account_type(&p), Some(AccountRole::User));

        let p = payload(json!({"account_type": "vendor"}));
        assert_eq!(resolve_account_type(&p), Some(AccountRole::Provider));

        let p = payload(json!({"type": "nonsense", "role": "freelancer"}));
        assert_eq!(resolve_account_type(&p), Some(AccountRole::Provider));
    }

    #[test]
    fn admin_is_never_resolved_from_payload() {
        let p = payload(json!({"user_type": "admin"}));
        assert_eq!(resolve_account_type(&p), None);

        let p = payload(json!({"user_type": "admin", "is_provider": true}));
        assert_eq!(resolve_account_type(&p), Some(AccountRole::Provider));
    }

    #[test]
    fn is_provider_flag_variants() {
        for value in [json!(true), json!(1), json!("1"), json!("true"), json!("yes")] {
            let p = payload(json!({ "is_provider": value }));
            assert_eq!(resolve_account_type(&p), Some(AccountRole::Provider));
        }
        for value in [json!(false), json!(0), json!("0"), json!("false"), json!("no")] {
            let p = payload(json!({ "is_provider": value }));
            assert_eq!(resolve_account_type(&p), Some(AccountRole::User));
        }
        let p = payload(json!({"is_provider": "maybe"}));
        assert_eq!(resolve_account_type(&p), None);
    }

    #[test]
    fn missing_type_is_unresolved() {
        let p = payload(json!({"email": "a@b.co"}));
        assert_eq!(resolve_account_type(&p), None);
    }

    #[test]
    fn only_active_accounts_may_log_in() {
        assert!(!AccountStatus::Active.blocks_login());
        for status in ["inactive", "suspended", "deactivated", "deleted"] {
            let parsed = AccountStatus::parse(status).expect("known status");
            assert!(parsed.blocks_login());
            assert_eq!(parsed.as_str(), status);
        }
    }
    #[test]
    fn secrets_are_not_serialized() {
        let now = Utc::now();
        let account = Account {
            id: 3,
            role: "provider".to_string(),
            email: "pro@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Haddad".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: "Algeria".to_string(),
            profile_picture: "/assets/images/default-avatar.jpg".to_string(),
            date_of_birth: None,
            gender: None,
            preferred_language: "en".to_string(),
            timezone: None,
            account_status: "active".to_string(),
            email_verified: false,
            verification_token: Some("verify-me".to_string()),
            reset_token: Some("reset-me".to_string()),
            reset_token_expires: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(account.role(), Some(AccountRole::Provider));
        assert_eq!(account.full_name(), "Sam Haddad");

        let json = serde_json::to_value(AccountProfile {
            account,
            provider: None,
        })
        .expect("serialize");
        assert_eq!(json["email"], "pro@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
        assert!(json.get("reset_token").is_none());
        assert!(json.get("business_name").is_none());
    }
}
