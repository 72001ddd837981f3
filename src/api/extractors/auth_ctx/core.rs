use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{AppError, MISSING_TOKEN};
use crate::state::AppState;

use super::AuthCtx;

/// Gives handlers the `AuthCtx` the access middleware stored in
/// request extensions. Missing context (route not behind the middleware)
/// is a 401.
pub struct AuthCtxExtractor(pub AuthCtx);

impl FromRequestParts<AppState> for AuthCtxExtractor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or_else(|| AppError::unauthorized(MISSING_TOKEN))
    }
}
