//! Public catalog and offering listings

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use common::response::{ApiError, ApiResponse, ApiResult, Pagination, clamp_limit};

use crate::{
    models::{
        LangQuery,
        catalog::{Offer, OfferQuery, PopularQuery, Service, ServiceQuery, search_term},
        language,
    },
    repositories::{catalog::ServiceFilter, offerings::OfferFilter},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/popular", get(popular_services))
        .route("/services/offers", get(list_offers))
        .route("/services/offers-popular", get(popular_offers))
        .route("/services/:id", get(get_service))
}

async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> ApiResult<ApiResponse<Vec<Service>>> {
    let page = Pagination::new(query.page, query.limit, 20, 100);
    let filter = ServiceFilter {
        lang: language(query.lang.as_deref()).to_string(),
        category_id: query.category_id,
        search: search_term(query.search.as_deref()),
        active: Some(true),
    };

    let (services, total) = state.repos.catalog.services(&filter, page).await?;
    Ok(ApiResponse::paginated(services, page.meta(total)))
}

async fn popular_services(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> ApiResult<ApiResponse<Vec<Service>>> {
    let lang = language(query.lang.as_deref());
    let limit = clamp_limit(query.limit, 10, 20);
    let services = state.repos.catalog.popular_services(lang, query.category_id, limit).await?;
    Ok(ApiResponse::ok(services))
}

async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<OfferQuery>,
) -> ApiResult<ApiResponse<Vec<Offer>>> {
    let page = Pagination::new(query.page, query.limit, 20, 100);
    let filter = OfferFilter {
        lang: language(query.lang.as_deref()).to_string(),
        provider_service_id: query.provider_service_id,
        category_id: query.category_id,
        search: search_term(query.search.as_deref()),
    };

    let offerings = &state.repos.offerings;
    let (mut offers, total) = offerings.offers(&filter, page).await?;
    if query.wants_images() {
        offerings.attach_images(&mut offers).await?;
    }
    Ok(ApiResponse::paginated(offers, page.meta(total)))
}

async fn popular_offers(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> ApiResult<ApiResponse<Vec<Offer>>> {
    let lang = language(query.lang.as_deref());
    let limit = clamp_limit(query.limit, 8, 20);
    let offers = state.repos.offerings.popular_offers(lang, query.category_id, limit).await?;
    Ok(ApiResponse::ok(offers))
}

async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LangQuery>,
) -> ApiResult<ApiResponse<Service>> {
    let lang = language(query.lang.as_deref());
    let service = state
        .repos
        .catalog
        .service(id, lang)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(ApiResponse::ok(service))
}
