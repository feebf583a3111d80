//! Messaging models

use chrono::{DateTime, Utc};
use common::{
    accounts::AccountRole,
    response::ApiResult,
    validation::{Payload, Validator},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

const PARTY_TYPES: [&str; 3] = ["user", "provider", "admin"];

/// One side of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Party {
    #[serde(rename = "type")]
    pub role: AccountRole,
    pub id: i64,
}

/// Row from `messages`
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_type: String,
    pub sender_id: i64,
    pub receiver_type: String,
    pub receiver_id: i64,
    pub booking_id: Option<i64>,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Latest exchange with one counterpart, as read from the database
#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub other_type: String,
    pub other_id: i64,
    pub last_message_id: i64,
    pub last_message: String,
    pub last_subject: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub other_type: String,
    pub other_id: i64,
    pub other_name: String,
    pub other_avatar: Option<String>,
    pub last_message_id: i64,
    pub last_message: String,
    pub last_subject: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

/// Display name for a conversation counterpart
pub fn display_name(
    other_type: &str,
    business_name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> String {
    if let Some(business) = business_name.map(str::trim).filter(|s| !s.is_empty()) {
        return business.to_string();
    }

    let full_name = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        return full_name;
    }

    if other_type == "admin" {
        "Administrator".to_string()
    } else {
        "Unknown".to_string()
    }
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            other_name: display_name(
                &row.other_type,
                row.business_name.as_deref(),
                row.first_name.as_deref(),
                row.last_name.as_deref(),
            ),
            other_type: row.other_type,
            other_id: row.other_id,
            other_avatar: row.profile_picture,
            last_message_id: row.last_message_id,
            last_message: row.last_message,
            last_subject: row.last_subject,
            last_message_at: row.last_message_at,
            unread_count: row.unread_count,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadQuery {
    pub with_type: Option<String>,
    pub with_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ThreadQuery {
    /// The counterpart named by `with_type`/`with_id`
    pub fn counterpart(&self) -> ApiResult<Party> {
        let payload = Payload::from(serde_json::json!({
            "with_type": self.with_type.as_deref().map(|s| s.trim().to_ascii_lowercase()),
            "with_id": self.with_id.as_deref().map(str::trim),
        }));

        Validator::new(&payload)
            .required("with_type")
            .one_of("with_type", &PARTY_TYPES)
            .required("with_id")
            .positive_integer("with_id")
            .finish()?;

        Ok(Party {
            role: payload
                .text("with_type")
                .and_then(|value| AccountRole::parse(&value))
                .unwrap_or(AccountRole::User),
            id: payload.integer("with_id").unwrap_or_default(),
        })
    }
}

/// Validated `POST messages/send` body
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub receiver: Party,
    pub message: String,
    pub subject: Option<String>,
    pub booking_id: Option<i64>,
}

impl OutgoingMessage {
    pub fn from_payload(payload: &Payload) -> ApiResult<Self> {
        Validator::new(payload)
            .required("receiver_type")
            .one_of("receiver_type", &PARTY_TYPES)
            .required("receiver_id")
            .positive_integer("receiver_id")
            .required("message")
            .max_length("message", 5000)
            .max_length("subject", 255)
            .positive_integer("booking_id")
            .finish()?;

        Ok(Self {
            receiver: Party {
                role: payload
                    .text("receiver_type")
                    .and_then(|value| AccountRole::parse(&value))
                    .unwrap_or(AccountRole::User),
                id: payload.integer("receiver_id").unwrap_or_default(),
            },
            message: payload.trimmed("message").unwrap_or_default(),
            subject: payload.trimmed("subject"),
            booking_id: payload.integer("booking_id"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn names_prefer_business_then_person() {
        assert_eq!(
            display_name("provider", Some("Clean Co"), Some("Amina"), Some("Saidi")),
            "Clean Co"
        );
        assert_eq!(
            display_name("provider", Some("  "), Some("Amina"), Some("Saidi")),
            "Amina Saidi"
        );
        assert_eq!(display_name("user", None, Some("Karim"), None), "Karim");
        assert_eq!(display_name("admin", None, None, None), "Administrator");
        assert_eq!(display_name("user", None, None, None), "Unknown");
    }

    #[test]
    fn thread_requires_a_valid_counterpart() {
        let query = ThreadQuery {
            with_type: Some("robot".into()),
            with_id: Some("-3".into()),
            ..Default::default()
        };
        let err = query.counterpart().unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let query = ThreadQuery {
            with_type: Some(" Provider ".into()),
            with_id: Some("12".into()),
            ..Default::default()
        };
        assert_eq!(
            query.counterpart().expect("party"),
            Party {
                role: AccountRole::Provider,
                id: 12
            }
        );
    }

    #[test]
    fn blank_message_is_rejected() {
        let err = OutgoingMessage::from_payload(&Payload::from(json!({
            "receiver_type": "provider",
            "receiver_id": 4,
            "message": "   ",
        })))
        .unwrap_err();
        let common::response::ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors["message"], "Message is required");
    }

    #[test]
    fn outgoing_message_is_trimmed() {
        let outgoing = OutgoingMessage::from_payload(&Payload::from(json!({
            "receiver_type": "admin",
            "receiver_id": "1",
            "message": " Hello ",
            "booking_id": 9,
        })))
        .expect("message");
        assert_eq!(outgoing.receiver.role, AccountRole::Admin);
        assert_eq!(outgoing.message, "Hello");
        assert_eq!(outgoing.booking_id, Some(9));
    }
}
