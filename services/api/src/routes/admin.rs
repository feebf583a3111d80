//! Admin console: moderation of the catalog, accounts and bookings
//!
//! Mounted under `/admin` behind the admin guard, so handlers here can
//! assume an administrator.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use common::{
    accounts::{AccountProfile, AccountRole},
    response::{ApiError, ApiResponse, ApiResult, Pagination, clamp_limit},
    validation::{Payload, Validator},
};
use serde_json::{Value, json};

use crate::{
    models::{
        AdminListQuery,
        account::{AccountSummary, AdminStats, DeleteOutcome},
        booking::{BookingDetail, BookingQuery},
        catalog::{AdminService, AdminServiceQuery, search_term},
        language,
        profile::admin_update,
        truthy,
    },
    repositories::{
        admin::AccountFilter,
        bookings::Participant,
        catalog::{DeactivatedService, ServiceFilter},
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/services", get(list_services))
        .route("/services/:id", delete(deactivate_service))
        .route("/providers", get(list_providers))
        .route(
            "/providers/:id",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route("/providers/:id/verify", post(verify_provider))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/bookings", get(list_bookings))
}

async fn stats(State(state): State<AppState>) -> ApiResult<ApiResponse<AdminStats>> {
    let stats = state.repos.admin.stats().await?;
    Ok(ApiResponse::ok(stats))
}

async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<AdminServiceQuery>,
) -> ApiResult<ApiResponse<Vec<AdminService>>> {
    let page = Pagination::new(query.page, query.limit, 50, 200);
    let active = query.active_filter();
    let filter = ServiceFilter {
        lang: language(query.lang.as_deref()).to_string(),
        category_id: query.category_id,
        search: search_term(query.search.as_deref()),
        active,
    };

    let (services, total) = state
        .repos
        .catalog
        .admin_services(&filter, query.scope(), active, page)
        .await?;
    Ok(ApiResponse::paginated(services, page.meta(total)))
}

async fn deactivate_service(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<DeactivatedService>> {
    let deactivated = state
        .repos
        .catalog
        .deactivate_service(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(ApiResponse::ok(deactivated).with_message("Service deactivated successfully"))
}

async fn list_accounts(
    state: &AppState,
    role: AccountRole,
    query: &AdminListQuery,
) -> ApiResult<ApiResponse<Vec<AccountSummary>>> {
    let limit = clamp_limit(query.limit, 20, 100);
    let offset = query.offset.unwrap_or(0).max(0);
    let filter = AccountFilter::from_query(
        query.status.as_deref(),
        query.verification.as_deref(),
        truthy(query.include_deactivated.as_deref()),
    );
    let accounts = state
        .repos
        .admin
        .list_accounts(role, &filter, limit, offset)
        .await?;
    Ok(ApiResponse::ok(accounts))
}

async fn get_account(
    state: &AppState,
    role: AccountRole,
    id: i64,
) -> ApiResult<ApiResponse<AccountProfile>> {
    let profile = state
        .repos
        .accounts
        .profile(id, role)
        .await?
        .ok_or_else(|| ApiError::not_found(role.label()))?;
    Ok(ApiResponse::ok(profile))
}

async fn update_account(
    state: &AppState,
    role: AccountRole,
    id: i64,
    payload: &Payload,
) -> ApiResult<ApiResponse<AccountProfile>> {
    let update = admin_update(payload, role == AccountRole::Provider)?;

    let accounts = &state.repos.accounts;
    if !accounts.update_profile(id, role, &update).await? {
        return Err(ApiError::not_found(role.label()));
    }
    let profile = accounts
        .profile(id, role)
        .await?
        .ok_or_else(|| ApiError::not_found(role.label()))?;
    Ok(ApiResponse::ok(profile).with_message(format!("{} updated successfully", role.label())))
}

async fn delete_account(
    state: &AppState,
    role: AccountRole,
    id: i64,
) -> ApiResult<ApiResponse<Value>> {
    let label = role.label();
    match state.repos.admin.delete_account(id, role).await? {
        DeleteOutcome::Deleted => Ok(ApiResponse::ok(json!({ "soft_deleted": false }))
            .with_message(format!("{} deleted successfully", label))),
        DeleteOutcome::Deactivated => Ok(ApiResponse::ok(json!({ "soft_deleted": true }))
            .with_message(format!(
                "{} has related records; account deactivated instead",
                label
            ))),
        DeleteOutcome::NotFound => Err(ApiError::not_found(label)),
    }
}

async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<ApiResponse<Vec<AccountSummary>>> {
    list_accounts(&state, AccountRole::Provider, &query).await
}

async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    get_account(&state, AccountRole::Provider, id).await
}

async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    update_account(&state, AccountRole::Provider, id, &payload).await
}

async fn delete_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<Value>> {
    delete_account(&state, AccountRole::Provider, id).await
}

async fn verify_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Value>> {
    Validator::new(&payload)
        .required("status")
        .one_of("status", &["verified", "rejected"])
        .finish()?;
    let verified = payload.trimmed("status").as_deref() == Some("verified");

    if !state.repos.admin.verify_provider(id, verified).await? {
        return Err(ApiError::not_found("Provider"));
    }

    let (verification_status, account_status) = if verified {
        ("verified", "active")
    } else {
        ("rejected", "inactive")
    };
    Ok(ApiResponse::ok(json!({
        "provider_id": id,
        "verification_status": verification_status,
        "account_status": account_status,
    }))
    .with_message(format!("Provider {}", verification_status)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<ApiResponse<Vec<AccountSummary>>> {
    list_accounts(&state, AccountRole::User, &query).await
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    get_account(&state, AccountRole::User, id).await
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<AccountProfile>> {
    update_account(&state, AccountRole::User, id, &payload).await
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<Value>> {
    delete_account(&state, AccountRole::User, id).await
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingQuery>,
) -> ApiResult<ApiResponse<Vec<BookingDetail>>> {
    let limit = clamp_limit(query.limit, 20, 100);
    let offset = query.offset.unwrap_or(0).max(0);
    let statuses: Vec<_> = query.status().into_iter().collect();

    let bookings = state
        .repos
        .bookings
        .recent(Participant::Anyone, &statuses, limit, offset)
        .await?;
    Ok(ApiResponse::ok(bookings))
}

#[cfg(test)]
mod tests {
    use super::super::{create_router, test_support::*};
    use axum::http::StatusCode;
    use common::accounts::AccountRole;
    use serde_json::json;
    use sqlx::PgPool;
    use tower::ServiceExt;

    #[tokio::test]
    async fn verification_needs_a_decision() {
        let app = create_router(offline_state());
        let token = token(AccountRole::Admin, 1);
        let response = app
            .oneshot(request(
                "POST",
                "/api/v1/admin/providers/3/verify",
                Some(&token),
                Some(json!({ "status": "maybe" })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["errors"]["status"].is_string());
    }

    #[tokio::test]
    async fn empty_admin_update_is_rejected() {
        let app = create_router(offline_state());
        let token = token(AccountRole::Admin, 1);
        let response = app
            .oneshot(request(
                "PUT",
                "/api/v1/admin/users/3",
                Some(&token),
                Some(json!({ "password_hash": "nope" })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No valid fields to update");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a live PostgreSQL"]
    async fn deactivated_service_leaves_public_catalog(pool: PgPool) {
        let service_id: i64 = sqlx::query_scalar("SELECT id FROM services ORDER BY id LIMIT 1")
            .fetch_one(&pool)
            .await
            .expect("seeded service");
        let provider: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (role, email, password_hash, first_name, last_name) \
             VALUES ('provider', 'amina@example.com', 'x', 'Amina', 'Saidi') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .expect("insert provider");
        sqlx::query("INSERT INTO provider_profiles (account_id) VALUES ($1)")
            .bind(provider)
            .execute(&pool)
            .await
            .expect("insert profile");
        let offering: i64 = sqlx::query_scalar(
            "INSERT INTO provider_services (provider_id, service_id, price) \
             VALUES ($1, $2, 3500) RETURNING id",
        )
        .bind(provider)
        .bind(service_id)
        .fetch_one(&pool)
        .await
        .expect("insert offering");

        let app = create_router(state_with(pool.clone(), &settings()));
        let admin = token(AccountRole::Admin, 1);
        let offers_uri = format!("/api/v1/services/offers?provider_service_id={offering}");

        let response = app
            .clone()
            .oneshot(request("GET", &offers_uri, None, None))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["provider_service_id"], offering);

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/v1/admin/services/{service_id}"),
                Some(&admin),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["was_active"], true);

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/api/v1/services/{service_id}"), None, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let offering_active: bool =
            sqlx::query_scalar("SELECT is_active FROM provider_services WHERE id = $1")
                .bind(offering)
                .fetch_one(&pool)
                .await
                .expect("offering");
        assert!(!offering_active);

        let response = app
            .clone()
            .oneshot(request("GET", &offers_uri, None, None))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

        let response = app
            .oneshot(request(
                "GET",
                "/api/v1/admin/services?status=inactive&limit=200",
                Some(&admin),
                None,
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        let listed = body["data"]
            .as_array()
            .is_some_and(|services| services.iter().any(|s| s["id"] == service_id));
        assert!(listed);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a live PostgreSQL"]
    async fn account_with_bookings_is_deactivated_not_deleted(pool: PgPool) {
        let customer: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (role, email, password_hash, first_name, last_name) \
             VALUES ('user', 'karim@example.com', 'x', 'Karim', 'Haddad') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .expect("insert user");
        let provider: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (role, email, password_hash, first_name, last_name) \
             VALUES ('provider', 'amina@example.com', 'x', 'Amina', 'Saidi') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .expect("insert provider");
        sqlx::query(
            "INSERT INTO bookings (booking_reference, user_id, provider_id, service_id, \
             booking_date, booking_time, address, city, price) \
             SELECT 'BK20260101ABCDEF', $1, $2, id, CURRENT_DATE, TIME '10:00', 'Rue 1', 'Oran', 100 \
             FROM services ORDER BY id LIMIT 1",
        )
        .bind(customer)
        .bind(provider)
        .execute(&pool)
        .await
        .expect("insert booking");

        let app = create_router(state_with(pool, &settings()));
        let admin = token(AccountRole::Admin, 1);
        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/v1/admin/users/{customer}"),
                Some(&admin),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["soft_deleted"], true);

        let response = app
            .oneshot(request("GET", "/api/v1/admin/users", Some(&admin), None))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    }
}
