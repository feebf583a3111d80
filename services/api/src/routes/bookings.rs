//! Booking routes shared by customers, providers and administrators

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use chrono::Utc;
use common::{
    accounts::AccountRole,
    auth::AuthUser,
    response::{ApiError, ApiResponse, ApiResult, Pagination},
    validation::Payload,
};
use serde_json::{Value, json};
use tracing::warn;

use crate::{
    models::booking::{
        Booking, BookingDetail, BookingQuery, NewBooking, StatusChange, check_transition,
        generate_reference,
    },
    repositories::bookings::Participant,
    state::AppState,
};

/// Fresh references tried before giving up on a collision
const REFERENCE_ATTEMPTS: usize = 3;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/status", put(update_status))
}

async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Value>> {
    user.require(AccountRole::User)?;
    let booking = NewBooking::from_payload(&payload, Utc::now().date_naive())?;

    let bookings = &state.repos.bookings;
    let offering = bookings
        .bookable_offering(booking.provider_service_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service offering not found".to_string()))?;

    let mut attempt = 0;
    let created = loop {
        attempt += 1;
        let reference = generate_reference(Utc::now());
        match bookings.create(user.id, &reference, &offering, &booking).await {
            Ok(created) => break created,
            Err(err) if err.is_unique_violation() && attempt < REFERENCE_ATTEMPTS => {
                warn!("Booking reference {} already taken; retrying", reference);
            }
            Err(err) => return Err(err.into()),
        }
    };

    Ok(ApiResponse::created(json!({
        "booking_id": created.id,
        "booking_reference": created.booking_reference,
        "booking": created,
    }))
    .with_message("Booking created successfully"))
}

async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingQuery>,
) -> ApiResult<ApiResponse<Vec<BookingDetail>>> {
    let page = Pagination::new(query.page, query.limit, 20, 100);
    let statuses: Vec<_> = query.status().into_iter().collect();

    let (bookings, total) = state
        .repos
        .bookings
        .list(Participant::of(user.role, user.id), &statuses, page)
        .await?;
    Ok(ApiResponse::paginated(bookings, page.meta(total)))
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<BookingDetail>> {
    let booking = state
        .repos
        .bookings
        .detail(id)
        .await?
        .filter(|detail| detail.booking.is_visible_to(user.role, user.id))
        .ok_or_else(|| ApiError::not_found("Booking"))?;
    Ok(ApiResponse::ok(booking))
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Booking>> {
    let change = StatusChange::from_payload(&payload)?;

    let bookings = &state.repos.bookings;
    let booking = bookings
        .find(id)
        .await?
        .filter(|booking| booking.is_visible_to(user.role, user.id))
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    let current = booking.status().ok_or_else(|| {
        ApiError::Internal(format!("Booking {} has an unknown status", booking.id))
    })?;
    check_transition(user.role, current, change.status)?;

    let updated = bookings
        .transition(&booking, current, change.status, change.reason.as_deref())
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("Booking status changed meanwhile; reload and try again".to_string())
        })?;
    Ok(ApiResponse::ok(updated).with_message("Booking status updated"))
}
