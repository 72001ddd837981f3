use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::domain::ownership::{Owned, ensure_owner};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::review::{
    NewReview, Review, ReviewContent, ReviewPatch, SellerResponse, validate_response,
};
use crate::error::{AppError, AppResult};
use crate::repos::error::RepoError;
use crate::repos::order_repo::OrderRepo;
use crate::repos::product_repo::ProductRepo;
use crate::repos::review_repo::ReviewRepo;

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepo>,
    orders: Arc<dyn OrderRepo>,
    products: Arc<dyn ProductRepo>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepo>,
        orders: Arc<dyn OrderRepo>,
        products: Arc<dyn ProductRepo>,
    ) -> Self {
        Self {
            reviews,
            orders,
            products,
        }
    }

    /// Only the buyer of a delivered order may review a product from it,
    /// once per order and product.
    pub async fn create(
        &self,
        actor: Uuid,
        order_id: i64,
        product_id: i64,
        content: ReviewContent,
    ) -> AppResult<Review> {
        let content = content.normalize();
        content.validate()?;

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        if !order.is_owned_by(actor) {
            return Err(AppError::forbidden("You can only review your own orders"));
        }
        if order.status != OrderStatus::Delivered {
            return Err(AppError::validation("You can only review delivered orders"));
        }
        if !order.contains_product(product_id) {
            return Err(AppError::validation("This order does not contain the product"));
        }

        let review = self
            .reviews
            .create(NewReview {
                order_id,
                product_id,
                reviewer_id: actor,
                reviewee_id: order.seller_id,
                content,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict { .. } => {
                    AppError::validation("You have already reviewed this product for this order")
                }
                // the product was deleted after the order was placed
                RepoError::InUse => AppError::not_found("Product"),
                other => other.into(),
            })?;

        info!(review_id = review.id, product_id, order_id, rating = review.rating, "review created");
        Ok(review)
    }

    pub async fn list_for_product(&self, product_id: i64, page: PageRequest) -> AppResult<Page<Review>> {
        if self.products.find_by_id(product_id).await?.is_none() {
            return Err(AppError::not_found("Product"));
        }
        Ok(self.reviews.list_for_product(product_id, page).await?)
    }

    pub async fn get(&self, id: i64) -> AppResult<Review> {
        self.reviews
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    pub async fn update(&self, actor: Uuid, id: i64, patch: ReviewPatch) -> AppResult<Review> {
        let review = self.get(id).await?;
        review.ensure_owned_by(actor, "update")?;

        let content = patch.apply(review.content()).normalize();
        content.validate()?;

        self.reviews
            .update_content(id, &content)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    pub async fn respond(&self, actor: Uuid, id: i64, text: &str) -> AppResult<Review> {
        let review = self.get(id).await?;
        ensure_owner(actor, review.reviewee_id, "review", "respond to")?;

        let text = text.trim();
        validate_response(text)?;

        self.reviews
            .set_response(
                id,
                SellerResponse {
                    text: text.to_string(),
                    date: Utc::now(),
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    pub async fn delete(&self, actor: Uuid, id: i64) -> AppResult<()> {
        let review = self.get(id).await?;
        review.ensure_owned_by(actor, "delete")?;

        if !self.reviews.delete(id).await? {
            return Err(AppError::not_found("Review"));
        }
        info!(review_id = id, product_id = review.product_id, "review deleted");
        Ok(())
    }
}
