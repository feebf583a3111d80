//! Admin user repository

use common::{accounts::AdminUser, error::DatabaseResult};
use sqlx::PgPool;
use tracing::info;

const ADMIN_COLUMNS: &str =
    "id, email, password_hash, full_name, role, is_active, last_login, created_at";

#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<AdminUser>> {
        let sql = format!("SELECT {} FROM admin_users WHERE email = $1", ADMIN_COLUMNS);
        let admin = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<AdminUser>> {
        let sql = format!("SELECT {} FROM admin_users WHERE id = $1", ADMIN_COLUMNS);
        let admin = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    pub async fn touch_last_login(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE admin_users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert the first administrator; an existing email is left untouched
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
    ) -> DatabaseResult<bool> {
        info!("Creating administrator {}", email);
        let result = sqlx::query(
            r#"
            INSERT INTO admin_users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, 'super_admin')
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
