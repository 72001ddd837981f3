/*
 * Responsibility
 * - what a repo reports upward, independent of the backing store
 * - unique violations are named by the field they protect
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("{field} already exists")]
    Conflict { field: &'static str },
    #[error("record is still referenced")]
    InUse,
    #[error("not enough stock for product {product_id}")]
    OutOfStock { product_id: i64 },
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23505")
        {
            return RepoError::Conflict {
                field: conflict_field(dbe.constraint()),
            };
        }
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23503")
        {
            return RepoError::InUse;
        }
        RepoError::Db(e)
    }
}

fn conflict_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "Email",
        Some("categories_name_key") => "Category",
        Some("orders_order_number_key") => "Order number",
        Some("reviews_order_product_key") => "Review",
        _ => "Record",
    }
}

impl From<crate::domain::UnknownVariant> for RepoError {
    fn from(e: crate::domain::UnknownVariant) -> Self {
        RepoError::Corrupt(e.to_string())
    }
}
