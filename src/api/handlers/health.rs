/*
 * Responsibility
 * - GET /health (liveness, outside the access middleware)
 */
use crate::api::dto::envelope::{ApiResponse, ApiResult};

pub async fn health() -> ApiResult<()> {
    Ok(ApiResponse::message("Server is running"))
}
