//! Build information and locale metadata

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use common::response::{ApiError, ApiResponse, ApiResult};
use i18n::{Dictionary, Locale};
use serde_json::{Value, json};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meta/version", get(version))
        .route("/meta/languages", get(languages))
        .route("/meta/translations/:lang", get(translations))
}

async fn version(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::ok(json!({
        "name": state.app.name,
        "version": state.app.version,
        "commit": state.app.commit.as_deref().unwrap_or("unknown"),
        "server_time": Utc::now().to_rfc3339(),
    }))
    .with_message("OK")
}

async fn languages() -> ApiResponse<Value> {
    let languages: Vec<Value> = Locale::ALL
        .iter()
        .map(|locale| {
            json!({
                "code": locale.code(),
                "name": locale.native_name(),
                "direction": locale.direction().as_str(),
            })
        })
        .collect();
    ApiResponse::ok(json!({ "default": Locale::En.code(), "languages": languages }))
}

/// Dictionary for a locale; English is the source and has an empty one
async fn translations(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let locale = Locale::from_code(lang.trim())
        .ok_or_else(|| ApiError::NotFound(format!("Unsupported language: {}", lang)))?;

    let empty = Dictionary::default();
    let dictionary = state.translations.dictionary(locale).unwrap_or(&empty);

    Ok(ApiResponse::ok(json!({
        "lang": locale.code(),
        "direction": locale.direction().as_str(),
        "phrases": dictionary.phrases,
        "words": dictionary.words,
    })))
}
