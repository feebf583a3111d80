//! Customer dashboard routes

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use common::{
    accounts::{AccountProfile, AccountRole},
    auth::AuthUser,
    response::{ApiError, ApiResponse, ApiResult},
    validation::{Payload, Validator},
};
use serde_json::{Value, json};

use super::account;
use crate::{
    models::{account::Favorite, booking::BookingDetail},
    state::AppState,
};

const UPCOMING_LIMIT: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/change-password", post(change_password))
        .route("/users/bookings", get(upcoming_bookings))
        .route("/users/favorites", get(list_favorites).post(add_favorite))
        .route("/users/favorites/:provider_id", delete(remove_favorite))
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<AccountProfile>> {
    account::profile(&state, user, AccountRole::User).await
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    account::update_profile(&state, user, AccountRole::User, &payload).await
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<()>> {
    account::change_password(&state, user, AccountRole::User, &payload).await
}

/// Pending and confirmed bookings, soonest first
async fn upcoming_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Vec<BookingDetail>>> {
    user.require(AccountRole::User)?;
    let bookings = state.repos.bookings.upcoming(user.id, UPCOMING_LIMIT).await?;
    Ok(ApiResponse::ok(bookings))
}

async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Vec<Favorite>>> {
    user.require(AccountRole::User)?;
    let favorites = state.repos.accounts.favorites(user.id).await?;
    Ok(ApiResponse::ok(favorites))
}

async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Value>> {
    user.require(AccountRole::User)?;
    Validator::new(&payload)
        .required("provider_id")
        .positive_integer("provider_id")
        .finish()?;
    let provider_id = payload.integer("provider_id").unwrap_or_default();

    let accounts = &state.repos.accounts;
    if !accounts.provider_exists(provider_id).await? {
        return Err(ApiError::not_found("Provider"));
    }

    match accounts.add_favorite(user.id, provider_id).await {
        Ok(id) => Ok(ApiResponse::created(json!({ "id": id, "provider_id": provider_id }))
            .with_message("Provider added to favorites")),
        Err(err) if err.is_unique_violation() => Err(ApiError::Conflict(
            "Provider already in favorites".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Succeeds whether or not the provider was saved
async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(provider_id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    user.require(AccountRole::User)?;
    state
        .repos
        .accounts
        .remove_favorite(user.id, provider_id)
        .await?;
    Ok(ApiResponse::message("Provider removed from favorites"))
}
