/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - hand the authenticated request context (AuthCtx) to handlers
 * - axum-specific code lives in core, the type itself in types
 */

mod core;
mod types;

pub use core::AuthCtxExtractor;
pub use types::AuthCtx;
