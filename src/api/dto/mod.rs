/*
 * Responsibility
 * - request/response shapes of the HTTP API (camelCase JSON)
 * - conversion between public ids and internal ids happens here
 */
use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod categories;
pub mod envelope;
pub mod orders;
pub mod pagination;
pub mod products;
pub mod reviews;

/// Tri-state field for partial updates, used with `#[serde(default)]`:
/// - field missing -> `None` (keep)
/// - `null` -> `Some(None)` (clear)
/// - value -> `Some(Some(v))` (set)
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        video: Option<Option<String>>,
    }

    #[test]
    fn missing_null_and_value_are_distinct() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"video":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"video":"v"}"#).unwrap();
        assert_eq!(missing.video, None);
        assert_eq!(null.video, Some(None));
        assert_eq!(set.video, Some(Some("v".to_string())));
    }
}
