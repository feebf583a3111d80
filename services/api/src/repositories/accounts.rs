//! Self-service account repository: profiles, passwords, favorites, statistics

use common::{
    accounts::{ACCOUNT_COLUMNS, Account, AccountProfile, AccountRole, PROVIDER_PROFILE_COLUMNS},
    error::DatabaseResult,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::models::{
    account::{Favorite, ProviderStatistics},
    profile::ProfileUpdate,
};

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// An account of the given role with its provider profile
    pub async fn profile(&self, id: i64, role: AccountRole) -> DatabaseResult<Option<AccountProfile>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1 AND role = $2", ACCOUNT_COLUMNS);
        let account: Option<Account> = sqlx::query_as(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(account) = account else {
            return Ok(None);
        };

        let provider = if role == AccountRole::Provider {
            let sql = format!(
                "SELECT {} FROM provider_profiles WHERE account_id = $1",
                PROVIDER_PROFILE_COLUMNS
            );
            sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        } else {
            None
        };

        Ok(Some(AccountProfile { account, provider }))
    }

    /// Write account and provider profile changes together; `false` when no such account
    pub async fn update_profile(
        &self,
        id: i64,
        role: AccountRole,
        update: &ProfileUpdate,
    ) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE accounts SET ");
        if !update.account.is_empty() {
            update.account.push_assignments(&mut builder);
            builder.push(", ");
        }
        builder
            .push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" AND role = ")
            .push_bind(role.as_str());
        let result = builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if !update.provider.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new("UPDATE provider_profiles SET ");
            update.provider.push_assignments(&mut builder);
            builder.push(" WHERE account_id = ").push_bind(id);
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(
            "Updated {} {} fields: {:?}",
            role,
            id,
            [update.account.columns(), update.provider.columns()].concat()
        );
        Ok(true)
    }

    pub async fn password_hash(&self, id: i64, role: AccountRole) -> DatabaseResult<Option<String>> {
        let hash = sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> DatabaseResult<()> {
        sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// A provider account that has not been deleted
    pub async fn provider_exists(&self, id: i64) -> DatabaseResult<bool> {
        let exists = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM accounts
                WHERE id = $1 AND role = 'provider' AND account_status <> 'deleted'
            )
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn favorites(&self, user_id: i64) -> DatabaseResult<Vec<Favorite>> {
        let favorites = sqlx::query_as(
            r#"
            SELECT f.id, f.provider_id, a.first_name, a.last_name, pp.business_name,
                   a.profile_picture, a.city, pp.average_rating, pp.total_reviews, f.created_at
            FROM favorites f
            JOIN accounts a ON a.id = f.provider_id
            LEFT JOIN provider_profiles pp ON pp.account_id = f.provider_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }

    /// Save a provider; a repeat surfaces as a unique violation
    pub async fn add_favorite(&self, user_id: i64, provider_id: i64) -> DatabaseResult<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO favorites (user_id, provider_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn remove_favorite(&self, user_id: i64, provider_id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND provider_id = $2")
            .bind(user_id)
            .bind(provider_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn statistics(&self, provider_id: i64) -> DatabaseResult<Option<ProviderStatistics>> {
        let stats = sqlx::query_as(
            r#"
            SELECT total_bookings, completed_bookings, cancelled_bookings, average_rating,
                   total_reviews, response_rate, acceptance_rate
            FROM provider_profiles
            WHERE account_id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stats)
    }
}
