//! Static content pages

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use common::response::{ApiError, ApiResponse, ApiResult};

use crate::{
    models::{LangQuery, catalog::ContentPage, language},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/content", get(missing_slug))
        .route("/content/:slug", get(content_page))
}

async fn missing_slug() -> ApiError {
    ApiError::BadRequest("Page slug required".to_string())
}

async fn content_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LangQuery>,
) -> ApiResult<ApiResponse<ContentPage>> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(missing_slug().await);
    }

    let lang = language(query.lang.as_deref());
    let page = state
        .repos
        .catalog
        .content_page(slug, lang)
        .await?
        .ok_or_else(|| ApiError::not_found("Page"))?;
    Ok(ApiResponse::ok(page))
}

#[cfg(test)]
mod tests {
    use super::super::{create_router, test_support::*};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn slug_is_required() {
        let app = create_router(offline_state());
        let response = app
            .oneshot(request("GET", "/api/v1/content", None, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Page slug required");
    }
}
