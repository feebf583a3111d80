//! Application state shared across handlers

use std::sync::Arc;

use common::{
    auth::Authenticator,
    cache::RedisPool,
    http::{CorsPolicy, ErrorDetailPolicy},
    jwt::TokenService,
    settings::{AppSettings, CloudinarySettings, Settings},
};
use i18n::Catalog;
use sqlx::PgPool;

use crate::repositories::Repositories;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub authenticator: Authenticator,
    pub repos: Repositories,
    pub translations: Arc<Catalog>,
    pub cloudinary: CloudinarySettings,
    pub app: AppSettings,
    pub cors: CorsPolicy,
    pub error_detail: ErrorDetailPolicy,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        settings: &Settings,
        revocations: Option<RedisPool>,
        translations: Arc<Catalog>,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(TokenService::new(&settings.jwt), revocations),
            repos: Repositories::new(db_pool.clone()),
            translations,
            cloudinary: settings.cloudinary.clone(),
            app: settings.app.clone(),
            cors: CorsPolicy::new(&settings.cors),
            error_detail: ErrorDetailPolicy {
                expose: settings.app.debug,
            },
            db_pool,
        }
    }
}
