pub mod auth_ctx;
pub mod json;
pub mod public_id;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use json::{ApiJson, ApiQuery};
