//! Provider dashboard routes: profile, bookings, statistics and offerings

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use common::{
    accounts::{AccountProfile, AccountRole},
    auth::AuthUser,
    response::{ApiError, ApiResponse, ApiResult, clamp_limit},
    validation::Payload,
};
use tracing::info;

use super::account;
use crate::{
    models::{
        account::ProviderStatistics,
        booking::{BookingDetail, BookingQuery},
        catalog::{Offering, new_offering, offering_update},
    },
    repositories::bookings::Participant,
    state::AppState,
};

const OFFERING_NOT_FOUND: &str = "Service offering not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/providers/profile", get(get_profile).put(update_profile))
        .route("/providers/change-password", post(change_password))
        .route("/providers/bookings", get(list_bookings))
        .route("/providers/statistics", get(statistics))
        .route("/providers/services", get(list_offerings).post(create_offering))
        .route(
            "/providers/services/:id",
            put(update_offering).delete(deactivate_offering),
        )
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<AccountProfile>> {
    account::profile(&state, user, AccountRole::Provider).await
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    account::update_profile(&state, user, AccountRole::Provider, &payload).await
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<()>> {
    account::change_password(&state, user, AccountRole::Provider, &payload).await
}

async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingQuery>,
) -> ApiResult<ApiResponse<Vec<BookingDetail>>> {
    user.require(AccountRole::Provider)?;
    let limit = clamp_limit(query.limit, 10, 100);
    let statuses: Vec<_> = query.status().into_iter().collect();

    let bookings = state
        .repos
        .bookings
        .recent(Participant::Provider(user.id), &statuses, limit, 0)
        .await?;
    Ok(ApiResponse::ok(bookings))
}

async fn statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<ProviderStatistics>> {
    user.require(AccountRole::Provider)?;
    let stats = state
        .repos
        .accounts
        .statistics(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider"))?;
    Ok(ApiResponse::ok(stats))
}

async fn list_offerings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Vec<Offering>>> {
    user.require(AccountRole::Provider)?;
    let offerings = state.repos.offerings.for_provider(user.id).await?;
    Ok(ApiResponse::ok(offerings))
}

async fn create_offering(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Offering>> {
    user.require(AccountRole::Provider)?;
    let offering = new_offering(&payload)?;

    if !state.repos.catalog.is_active_service(offering.service_id).await? {
        return Err(ApiError::not_found("Service"));
    }

    let offerings = &state.repos.offerings;
    let id = match offerings.create(user.id, &offering).await {
        Ok(id) => id,
        Err(err) if err.is_unique_violation() => {
            return Err(ApiError::Conflict(
                "You already offer this service".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let created = offerings
        .find_for_provider(user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(OFFERING_NOT_FOUND.to_string()))?;
    Ok(ApiResponse::created(created).with_message("Service added successfully"))
}

async fn update_offering(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Offering>> {
    user.require(AccountRole::Provider)?;
    let update = offering_update(&payload)?;

    let offerings = &state.repos.offerings;
    if !offerings.update(user.id, id, &update).await? {
        return Err(ApiError::NotFound(OFFERING_NOT_FOUND.to_string()));
    }
    info!("Provider {} updated offering {}", user.id, id);

    let updated = offerings
        .find_for_provider(user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(OFFERING_NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(updated).with_message("Service updated successfully"))
}

async fn deactivate_offering(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    user.require(AccountRole::Provider)?;
    if !state.repos.offerings.deactivate(user.id, id).await? {
        return Err(ApiError::NotFound(OFFERING_NOT_FOUND.to_string()));
    }
    Ok(ApiResponse::message("Service removed successfully"))
}
