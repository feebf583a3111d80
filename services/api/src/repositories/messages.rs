//! Message repository

use common::{accounts::AccountRole, error::DatabaseResult, response::Pagination};
use sqlx::PgPool;

use crate::models::message::{ConversationRow, Message, OutgoingMessage, Party};

const MESSAGE_COLUMNS: &str = "id, sender_type, sender_id, receiver_type, receiver_id, booking_id, \
                               subject, message, is_read, read_at, created_at";

/// Messages the party at `$1`/`$2` sent or received, tagged with the other side
const MINE_CTE: &str = r#"
    WITH mine AS (
        SELECT m.*,
               CASE WHEN m.sender_type = $1 AND m.sender_id = $2
                    THEN m.receiver_type ELSE m.sender_type END AS other_type,
               CASE WHEN m.sender_type = $1 AND m.sender_id = $2
                    THEN m.receiver_id ELSE m.sender_id END AS other_id
        FROM messages m
        WHERE (m.sender_type = $1 AND m.sender_id = $2)
           OR (m.receiver_type = $1 AND m.receiver_id = $2)
    )
"#;

/// Message repository
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One row per counterpart, most recent conversation first
    pub async fn conversations(
        &self,
        me: Party,
        page: Pagination,
    ) -> DatabaseResult<(Vec<ConversationRow>, i64)> {
        let sql = format!(
            r#"
            {MINE_CTE},
            latest AS (
                SELECT DISTINCT ON (other_type, other_id)
                       other_type, other_id, id AS last_message_id, message AS last_message,
                       subject AS last_subject, created_at AS last_message_at
                FROM mine
                ORDER BY other_type, other_id, created_at DESC, id DESC
            ),
            unread AS (
                SELECT other_type, other_id, COUNT(*) AS unread_count
                FROM mine
                WHERE receiver_type = $1 AND receiver_id = $2 AND NOT is_read
                GROUP BY other_type, other_id
            )
            SELECT l.other_type, l.other_id, l.last_message_id, l.last_message, l.last_subject,
                   l.last_message_at, COALESCE(u.unread_count, 0) AS unread_count,
                   a.first_name, a.last_name, pp.business_name, a.profile_picture
            FROM latest l
            LEFT JOIN unread u ON u.other_type = l.other_type AND u.other_id = l.other_id
            LEFT JOIN accounts a ON a.id = l.other_id AND a.role = l.other_type
            LEFT JOIN provider_profiles pp
                   ON l.other_type = 'provider' AND pp.account_id = l.other_id
            ORDER BY l.last_message_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as(&sql)
            .bind(me.role.as_str())
            .bind(me.id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "{MINE_CTE} SELECT COUNT(*) FROM (SELECT DISTINCT other_type, other_id FROM mine) c"
        );
        let total = sqlx::query_scalar(&count_sql)
            .bind(me.role.as_str())
            .bind(me.id)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Messages between two parties, oldest first
    pub async fn thread(
        &self,
        me: Party,
        other: Party,
        page: Pagination,
    ) -> DatabaseResult<Vec<Message>> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE (sender_type = $1 AND sender_id = $2 AND receiver_type = $3 AND receiver_id = $4)
               OR (sender_type = $3 AND sender_id = $4 AND receiver_type = $1 AND receiver_id = $2)
            ORDER BY created_at ASC, id ASC
            LIMIT $5 OFFSET $6
            "#
        );
        let messages = sqlx::query_as(&sql)
            .bind(me.role.as_str())
            .bind(me.id)
            .bind(other.role.as_str())
            .bind(other.id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    /// Mark everything `other` sent to `me` as read
    pub async fn mark_read(&self, me: Party, other: Party) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE, read_at = NOW()
            WHERE receiver_type = $1 AND receiver_id = $2
              AND sender_type = $3 AND sender_id = $4
              AND NOT is_read
            "#,
        )
        .bind(me.role.as_str())
        .bind(me.id)
        .bind(other.role.as_str())
        .bind(other.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether a party can receive messages
    pub async fn party_exists(&self, party: Party) -> DatabaseResult<bool> {
        let exists = match party.role {
            AccountRole::Admin => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM admin_users WHERE id = $1 AND is_active)",
                )
                .bind(party.id)
                .fetch_one(&self.pool)
                .await?
            }
            role => {
                sqlx::query_scalar(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM accounts
                        WHERE id = $1 AND role = $2 AND account_status <> 'deleted'
                    )
                    "#,
                )
                .bind(party.id)
                .bind(role.as_str())
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(exists)
    }

    pub async fn send(&self, sender: Party, outgoing: &OutgoingMessage) -> DatabaseResult<Message> {
        let sql = format!(
            r#"
            INSERT INTO messages (sender_type, sender_id, receiver_type, receiver_id,
                                  booking_id, subject, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let message = sqlx::query_as(&sql)
            .bind(sender.role.as_str())
            .bind(sender.id)
            .bind(outgoing.receiver.role.as_str())
            .bind(outgoing.receiver.id)
            .bind(outgoing.booking_id)
            .bind(&outgoing.subject)
            .bind(&outgoing.message)
            .fetch_one(&self.pool)
            .await?;
        Ok(message)
    }
}
