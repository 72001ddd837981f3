/*
 * Responsibility
 * - signup / login issue a token together with the user
 * - /auth/me answers with the user the access middleware resolved
 */
use axum::extract::State;

use crate::api::dto::auth::{AuthResponse, LoginRequest, SignupRequest, UserData, UserResponse};
use crate::api::dto::envelope::{ApiResponse, ApiResult};
use crate::api::extractors::{ApiJson, AuthCtxExtractor};
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<AuthResponse> {
    let session = state.accounts.signup(req.into()).await?;
    let res = AuthResponse::from_session(&state.id_codec, session)?;
    Ok(ApiResponse::created(res).with_message("User registered successfully"))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let session = state.accounts.login(&req.email, &req.password).await?;
    let res = AuthResponse::from_session(&state.id_codec, session)?;
    Ok(ApiResponse::ok(res).with_message("Login successful"))
}

pub async fn me(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> ApiResult<UserData> {
    let user = state.accounts.me(ctx.user_id()).await?;
    Ok(ApiResponse::ok(UserData {
        user: UserResponse::from_domain(&state.id_codec, user)?,
    }))
}
