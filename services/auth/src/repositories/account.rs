//! Account repository for registration, login and token flows

use chrono::{DateTime, Utc};
use common::{
    accounts::{ACCOUNT_COLUMNS, Account, AccountRole, PROVIDER_PROFILE_COLUMNS, ProviderProfile},
    error::DatabaseResult,
};
use sqlx::PgPool;
use tracing::info;

/// Fields collected at registration
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: AccountRole,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub verification_token: String,
    pub business_name: Option<String>,
    pub provider_type: Option<String>,
}

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an account, and its provider profile for providers
    ///
    /// A taken email surfaces as [`common::error::DatabaseError::UniqueViolation`].
    pub async fn create(&self, new_account: &NewAccount) -> DatabaseResult<Account> {
        info!(
            "Creating {} account for {}",
            new_account.role, new_account.email
        );

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO accounts (role, email, password_hash, first_name, last_name,
                                  phone, address, city, country, verification_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account: Account = sqlx::query_as(&sql)
            .bind(new_account.role.as_str())
            .bind(&new_account.email)
            .bind(&new_account.password_hash)
            .bind(&new_account.first_name)
            .bind(&new_account.last_name)
            .bind(&new_account.phone)
            .bind(&new_account.address)
            .bind(&new_account.city)
            .bind(&new_account.country)
            .bind(&new_account.verification_token)
            .fetch_one(&mut *tx)
            .await?;

        if new_account.role == AccountRole::Provider {
            sqlx::query(
                r#"
                INSERT INTO provider_profiles (account_id, business_name, provider_type)
                VALUES ($1, $2, COALESCE($3, 'individual'))
                "#,
            )
            .bind(account.id)
            .bind(&new_account.business_name)
            .bind(&new_account.provider_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(account)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn provider_profile(&self, account_id: i64) -> DatabaseResult<Option<ProviderProfile>> {
        let sql = format!(
            "SELECT {} FROM provider_profiles WHERE account_id = $1",
            PROVIDER_PROFILE_COLUMNS
        );
        let profile = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn touch_last_login(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE accounts SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark the owner of a verification token as verified
    pub async fn verify_email(&self, token: &str) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email_verified = TRUE, verification_token = NULL, updated_at = NOW()
            WHERE verification_token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a reset token; returns false when no account owns the email
    pub async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET reset_token = $2, reset_token_expires = $3 WHERE email = $1",
        )
        .bind(email)
        .bind(token)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password of the holder of an unexpired reset token
    pub async fn reset_password(&self, token: &str, password_hash: &str) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, reset_token = NULL, reset_token_expires = NULL, updated_at = NOW()
            WHERE reset_token = $1 AND reset_token_expires > NOW()
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
