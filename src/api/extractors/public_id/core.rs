/*
 * Responsibility
 * - take the public id from the path and decode it to the internal id
 * - generic over a tag type so each resource gets its own id type and its
 *   own "Invalid <resource> ID" message
 * - resource names and aliases live in types.rs, not here
 */
use std::marker::PhantomData;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::id_codec::IdCodec;
use crate::state::AppState;

pub trait IdTag {
    const RESOURCE: &'static str;
}

#[derive(Clone, Copy)]
pub struct PublicId<T> {
    pub id: i64,
    _marker: PhantomData<T>,
}

impl<T: IdTag> PublicId<T> {
    fn new(id: i64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    fn invalid() -> AppError {
        AppError::bad_request("INVALID_PUBLIC_ID", format!("Invalid {} ID", T::RESOURCE))
    }

    /// Decodes an id that arrived somewhere other than the path (body, query).
    pub fn decode(codec: &IdCodec, public_id: &str) -> Result<i64, AppError> {
        codec.decode(public_id.trim()).map_err(|_| Self::invalid())
    }
}

impl<T> FromRequestParts<AppState> for PublicId<T>
where
    T: IdTag + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(public_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Self::invalid())?;
        let id = Self::decode(&state.id_codec, &public_id)?;
        Ok(Self::new(id))
    }
}

impl<T> std::fmt::Debug for PublicId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicId").field("id", &self.id).finish()
    }
}
