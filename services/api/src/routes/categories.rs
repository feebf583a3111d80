use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use common::response::{ApiResponse, ApiResult};

use crate::{
    models::{LangQuery, catalog::Category, language},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
) -> ApiResult<ApiResponse<Vec<Category>>> {
    let lang = language(query.lang.as_deref());
    let categories = state.repos.catalog.categories(lang).await?;
    Ok(ApiResponse::ok(categories))
}
