//! API service routes

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use common::{
    auth::{AuthUser, auth_middleware},
    database,
    http::{cors, envelope_errors, expose_error_detail, log_requests, not_found},
    response::{ApiError, ApiResponse},
};
use serde_json::{Value, json};

use crate::state::AppState;

mod account;
mod admin;
mod bookings;
mod categories;
mod content;
mod messages;
mod meta;
mod providers;
mod services;
mod uploads;
mod users;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let admin = admin::routes().route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .merge(users::routes())
        .merge(providers::routes())
        .merge(bookings::routes())
        .merge(messages::routes())
        .merge(uploads::routes())
        .nest("/admin", admin)
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .merge(meta::routes())
        .merge(categories::routes())
        .merge(content::routes())
        .merge(services::routes())
        .merge(protected);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.error_detail,
            expose_error_detail,
        ))
        .layer(middleware::from_fn(envelope_errors))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn_with_state(state.cors.clone(), cors))
        .with_state(state)
}

/// Admin-only guard; runs after [`auth_middleware`]
async fn require_admin(user: AuthUser, req: Request, next: Next) -> Result<Response, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(next.run(req).await)
}

/// Resource index
async fn index(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::ok(json!({
        "name": state.app.name,
        "version": state.app.version,
        "endpoints": {
            "auth": "/api/v1/auth",
            "meta": "/api/v1/meta",
            "categories": "/api/v1/categories",
            "services": "/api/v1/services",
            "content": "/api/v1/content/{slug}",
            "users": "/api/v1/users",
            "providers": "/api/v1/providers",
            "bookings": "/api/v1/bookings",
            "messages": "/api/v1/messages",
            "uploads": "/api/v1/uploads",
            "admin": "/api/v1/admin",
        },
    }))
    .with_message("OK")
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<Value> {
    let database = database::health_check(&state.db_pool).await.unwrap_or(false);
    ApiResponse::ok(json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "api",
        "database": database,
    }))
    .with_message("OK")
}
