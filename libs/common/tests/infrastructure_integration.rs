//! Integration tests for the infrastructure components
//!
//! These tests verify that PostgreSQL (with the schema migrations applied)
//! and Redis are reachable and usable from the application. They need live
//! services and are ignored by default.

use common::{
    accounts::AccountRole,
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::TokenService,
    settings::JwtSettings,
};

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live PostgreSQL"]
async fn test_database_migrations_apply() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;

    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_categories")
        .fetch_one(&pool)
        .await?;
    assert!(categories > 0, "seed categories missing");

    Ok(())
}

#[tokio::test]
#[ignore = "requires REDIS_URL pointing at a live Redis"]
async fn test_token_revocation_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let redis_config = RedisConfig::from_env().ok_or("REDIS_URL not set")?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    assert!(redis_pool.health_check().await?, "Redis health check failed");

    let tokens = TokenService::new(&JwtSettings {
        secret: "integration-secret".to_string(),
        expiration: 60,
        issuer: "marketplace".to_string(),
    });
    let claims = tokens.validate(&tokens.issue(1, AccountRole::User)?)?;

    assert!(!tokens.is_revoked(&redis_pool, &claims).await?);
    tokens.revoke(&redis_pool, &claims).await?;
    assert!(tokens.is_revoked(&redis_pool, &claims).await?);

    Ok(())
}
