//! Moderation queries for the admin console

use common::{
    accounts::{AccountRole, AccountStatus},
    error::DatabaseResult,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use crate::models::account::{AccountSummary, AdminStats, DeleteOutcome};

/// Filters for the admin account lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub account_status: Option<String>,
    pub verification_status: Option<String>,
    pub include_deactivated: bool,
}

impl AccountFilter {
    /// Interpret the `status`, `verification` and `include_deactivated` query values
    ///
    /// `status=pending` means pending verification. Any other explicit
    /// status also reveals deactivated and deleted accounts.
    pub fn from_query(
        status: Option<&str>,
        verification: Option<&str>,
        include_deactivated: bool,
    ) -> Self {
        let status = status.map(str::trim).filter(|s| !s.is_empty());
        let mut filter = Self {
            include_deactivated,
            verification_status: verification
                .map(str::trim)
                .filter(|v| ["pending", "verified", "rejected"].contains(v))
                .map(str::to_string),
            ..Default::default()
        };

        match status {
            Some("pending") => filter.verification_status = Some("pending".to_string()),
            Some(status) if AccountStatus::parse(status).is_some() => {
                filter.account_status = Some(status.to_string());
                filter.include_deactivated = true;
            }
            _ => {}
        }
        filter
    }

    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = &self.account_status {
            builder.push(" AND a.account_status = ").push_bind(status.clone());
        }
        if let Some(verification) = &self.verification_status {
            builder
                .push(" AND pp.verification_status = ")
                .push_bind(verification.clone());
        }
        if !self.include_deactivated {
            builder.push(" AND a.account_status NOT IN ('deactivated', 'deleted')");
        }
    }
}

#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self) -> DatabaseResult<AdminStats> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM accounts WHERE role = 'provider') AS total_providers,
                (SELECT COUNT(*) FROM accounts WHERE role = 'user') AS total_users,
                (SELECT COUNT(*) FROM provider_profiles WHERE verification_status = 'pending')
                    AS pending_verifications,
                (SELECT COUNT(*) FROM bookings) AS total_bookings,
                (SELECT COUNT(*) FROM provider_profiles WHERE verification_status = 'verified')
                    AS verified_providers,
                (SELECT COUNT(*) FROM accounts
                  WHERE role = 'user' AND last_login >= NOW() - INTERVAL '30 days') AS active_users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Newest accounts of a role first
    pub async fn list_accounts(
        &self,
        role: AccountRole,
        filter: &AccountFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<AccountSummary>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT a.id, a.email, a.first_name, a.last_name, a.phone, a.city, a.profile_picture,
                   a.account_status, pp.verification_status, pp.average_rating, pp.total_reviews,
                   a.last_login, a.created_at
            FROM accounts a
            LEFT JOIN provider_profiles pp ON pp.account_id = a.id
            WHERE a.role = "#,
        );
        builder.push_bind(role.as_str());
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let accounts = builder
            .build_query_as::<AccountSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    /// Record a verification decision and the matching account status
    pub async fn verify_provider(&self, id: i64, verified: bool) -> DatabaseResult<bool> {
        let (verification, account_status) = if verified {
            ("verified", "active")
        } else {
            ("rejected", "inactive")
        };

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE provider_profiles
            SET verification_status = $1, verification_date = NOW()
            WHERE account_id = $2
            "#,
        )
        .bind(verification)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE accounts SET account_status = $1, updated_at = NOW() WHERE id = $2 AND role = 'provider'",
        )
        .bind(account_status)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Provider {} marked {}", id, verification);
        Ok(true)
    }

    /// Delete an account, deactivating it when related rows still point at it.
    /// Messages reference accounts by type and id without a foreign key, so
    /// they are counted here.
    pub async fn delete_account(&self, id: i64, role: AccountRole) -> DatabaseResult<DeleteOutcome> {
        let has_messages: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM messages \
             WHERE (sender_type = $1 AND sender_id = $2) OR (receiver_type = $1 AND receiver_id = $2))",
        )
        .bind(role.as_str())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if has_messages {
            warn!("{} {} has messages; deactivating instead", role, id);
            return self.deactivate_account(id, role).await;
        }

        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await;

        match deleted {
            Ok(result) if result.rows_affected() > 0 => {
                info!("Deleted {} {}", role, id);
                Ok(DeleteOutcome::Deleted)
            }
            Ok(_) => Ok(DeleteOutcome::NotFound),
            Err(err) => {
                let err = common::error::DatabaseError::from(err);
                if !err.is_foreign_key_violation() {
                    return Err(err);
                }
                warn!("{} {} has related records; deactivating instead", role, id);
                self.deactivate_account(id, role).await
            }
        }
    }

    async fn deactivate_account(&self, id: i64, role: AccountRole) -> DatabaseResult<DeleteOutcome> {
        let result = sqlx::query(
            "UPDATE accounts SET account_status = 'deactivated', updated_at = NOW() \
             WHERE id = $1 AND role = $2",
        )
        .bind(id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(DeleteOutcome::NotFound);
        }
        Ok(DeleteOutcome::Deactivated)
    }
}
