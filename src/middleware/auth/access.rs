//! Bearer token check → AuthCtx in request extensions.
//!
//! - `Authorization: Bearer <jwt>` is required; a missing header or another
//!   scheme is answered like a missing token.
//! - The token must verify and its subject must still exist.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};
use tracing::warn;

use crate::api::extractors::AuthCtx;
use crate::error::{AppError, MISSING_TOKEN};
use crate::state::AppState;

/// Puts every route registered so far behind the access check.
///
/// `route_layer` keeps unmatched paths on the 404 fallback instead of
/// answering them with 401.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // owned: the request body is not Sync, so no borrow of `req` may live
    // across the await below
    let token = bearer_token(&req)
        .map(str::to_owned)
        .ok_or_else(|| AppError::unauthorized(MISSING_TOKEN))?;

    let user = match state.accounts.authenticate(&token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, path = %req.uri().path(), "access token rejected");
            return Err(err);
        }
    };

    req.extensions_mut().insert(AuthCtx::new(user));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn takes_token_after_bearer_scheme() {
        let req = request(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_foreign_scheme_yields_nothing() {
        assert_eq!(bearer_token(&request(None)), None);
        assert_eq!(bearer_token(&request(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&request(Some("Bearer   "))), None);
    }
}
