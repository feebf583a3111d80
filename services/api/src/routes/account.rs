//! Profile and password handlers shared by customers and providers

use common::{
    accounts::{AccountProfile, AccountRole},
    auth::AuthUser,
    password::{hash_password, verify_password},
    response::{ApiError, ApiResponse, ApiResult},
    validation::{Payload, Validator},
};
use tracing::info;

use crate::{models::profile::profile_update, state::AppState};

pub(super) async fn profile(
    state: &AppState,
    user: AuthUser,
    role: AccountRole,
) -> ApiResult<ApiResponse<AccountProfile>> {
    user.require(role)?;
    let profile = state
        .repos
        .accounts
        .profile(user.id, role)
        .await?
        .ok_or_else(|| ApiError::not_found(role.label()))?;
    Ok(ApiResponse::ok(profile))
}

pub(super) async fn update_profile(
    state: &AppState,
    user: AuthUser,
    role: AccountRole,
    payload: &Payload,
) -> ApiResult<ApiResponse<AccountProfile>> {
    user.require(role)?;

    let update = profile_update(payload, role == AccountRole::Provider)?;
    if update.is_empty() {
        return Err(ApiError::BadRequest("No changes provided".to_string()));
    }

    let accounts = &state.repos.accounts;
    if !accounts.update_profile(user.id, role, &update).await? {
        return Err(ApiError::not_found(role.label()));
    }

    let profile = accounts
        .profile(user.id, role)
        .await?
        .ok_or_else(|| ApiError::not_found(role.label()))?;
    Ok(ApiResponse::ok(profile).with_message("Profile updated successfully"))
}

pub(super) async fn change_password(
    state: &AppState,
    user: AuthUser,
    role: AccountRole,
    payload: &Payload,
) -> ApiResult<ApiResponse<()>> {
    user.require(role)?;

    Validator::new(payload)
        .required("current_password")
        .required("new_password")
        .min_length("new_password", 8)
        .required("confirm_password")
        .finish()?;

    let current = payload.text("current_password").unwrap_or_default();
    let new_password = payload.text("new_password").unwrap_or_default();
    if payload.text("confirm_password").as_deref() != Some(new_password.as_str()) {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    let accounts = &state.repos.accounts;
    let hash = accounts
        .password_hash(user.id, role)
        .await?
        .ok_or_else(|| ApiError::not_found(role.label()))?;
    if !verify_password(&current, &hash) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    accounts.set_password(user.id, &hash_password(&new_password)?).await?;
    info!("{} {} changed their password", role, user.id);

    Ok(ApiResponse::message("Password changed successfully"))
}
