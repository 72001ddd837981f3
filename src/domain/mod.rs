/*
 * Responsibility
 * - marketplace records and the rules that hold regardless of storage
 * - validation, ownership, pagination and the order lifecycle live here
 */
use thiserror::Error;

pub mod category;
pub mod order;
pub mod ownership;
pub mod pagination;
pub mod product;
pub mod review;
pub mod user;
pub mod validation;

/// A stored or submitted string that does not name any variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Rounds a monetary or averaged value to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
