/**
 * Responsibility
 *  - ties core and types together
 *  - controls what handlers can see
 */
mod core;
mod types;

pub use core::{IdTag, PublicId};
pub use types::*;
