use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cloudinary;
mod models;
mod repositories;
mod routes;
mod state;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    settings::Settings,
};
use i18n::Catalog;
use tokio::net::TcpListener;

use crate::state::AppState;

const DEFAULT_PORT: u16 = 3001;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    info!("Starting API service");

    let settings = Settings::load(DEFAULT_PORT)?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    let revocations = match RedisConfig::from_env() {
        Some(redis_config) => Some(RedisPool::new(&redis_config).await?),
        None => {
            warn!("REDIS_URL not set; revoked tokens stay valid until they expire");
            None
        }
    };

    let translations = Arc::new(Catalog::embedded()?);
    if cloudinary::UploadSigner::from_settings(&settings.cloudinary).is_err() {
        warn!("Cloudinary is not configured; upload signatures will fail");
    }

    let app_state = AppState::new(pool, &settings, revocations, translations);
    let app = routes::create_router(app_state);

    let address = settings.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
