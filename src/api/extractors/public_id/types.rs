/**
 * Responsibility
 *  - one tagged id type per resource exposed through a public id
 *
 * Everything listed here is re-exported through ./mod.rs.
 */
use super::core::{IdTag, PublicId};

pub enum CategoryTag {}
impl IdTag for CategoryTag {
    const RESOURCE: &'static str = "category";
}
pub type PublicCategoryId = PublicId<CategoryTag>;

pub enum ProductTag {}
impl IdTag for ProductTag {
    const RESOURCE: &'static str = "product";
}
pub type PublicProductId = PublicId<ProductTag>;

pub enum OrderTag {}
impl IdTag for OrderTag {
    const RESOURCE: &'static str = "order";
}
pub type PublicOrderId = PublicId<OrderTag>;

pub enum ReviewTag {}
impl IdTag for ReviewTag {
    const RESOURCE: &'static str = "review";
}
pub type PublicReviewId = PublicId<ReviewTag>;
