use std::env;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod login;
mod rate_limiter;
mod repositories;
mod routes;

use common::{
    auth::Authenticator,
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    http::{CorsPolicy, ErrorDetailPolicy},
    jwt::TokenService,
    password::hash_password,
    settings::Settings,
    validation::normalize_email,
};
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::{
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{AccountRepository, AdminRepository},
};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ADMIN_EMAIL: &str = "admin@moueene.local";
const DEFAULT_ADMIN_PASSWORD: &str = "ChangeMe123!";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub authenticator: Authenticator,
    pub accounts: AccountRepository,
    pub admins: AdminRepository,
    pub rate_limiter: RateLimiter,
    pub cors: CorsPolicy,
    pub error_detail: ErrorDetailPolicy,
}

impl AppState {
    pub fn new(db_pool: PgPool, settings: &Settings, revocations: Option<RedisPool>) -> Self {
        Self {
            authenticator: Authenticator::new(TokenService::new(&settings.jwt), revocations),
            accounts: AccountRepository::new(db_pool.clone()),
            admins: AdminRepository::new(db_pool.clone()),
            rate_limiter: RateLimiter::new(RateLimiterConfig::from(&settings.rate_limit)),
            cors: CorsPolicy::new(&settings.cors),
            error_detail: ErrorDetailPolicy {
                expose: settings.app.debug,
            },
            db_pool,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    info!("Starting authentication service");

    let settings = Settings::load(DEFAULT_PORT)?;
    if settings.uses_default_jwt_secret() {
        warn!("Using the default JWT secret. Set MARKET__JWT__SECRET in production.");
    }

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Token revocation needs Redis; without it logout only discards client side
    let revocations = match RedisConfig::from_env() {
        Some(redis_config) => Some(RedisPool::new(&redis_config).await?),
        None => {
            warn!("REDIS_URL not set; token revocation is disabled");
            None
        }
    };

    let app_state = AppState::new(pool, &settings, revocations);
    seed_admin(&app_state.admins).await?;

    info!(
        "Login limiter: {} attempts per {}s, {}s lockout",
        app_state.rate_limiter.config().max_attempts,
        app_state.rate_limiter.config().window_seconds,
        app_state.rate_limiter.config().lockout_seconds
    );

    let app = routes::create_router(app_state);

    let address = settings.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the first administrator from `ADMIN_EMAIL` / `ADMIN_PASSWORD`
async fn seed_admin(admins: &AdminRepository) -> Result<()> {
    if admins.count().await? > 0 {
        return Ok(());
    }

    let email = normalize_email(
        &env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),
    );
    let password =
        env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
    let full_name = env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| "Administrator".to_string());

    if password == DEFAULT_ADMIN_PASSWORD {
        warn!("ADMIN_PASSWORD not set. Using the default administrator password; change it in production.");
    }

    let password_hash = hash_password(&password)?;
    if admins.create(&email, &password_hash, &full_name).await? {
        info!("Seeded administrator {}", email);
    }

    Ok(())
}
