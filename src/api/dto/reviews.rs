use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::double_option;
use crate::api::dto::pagination::PaginationMeta;
use crate::domain::pagination::Page;
use crate::domain::review::{Review, ReviewContent, ReviewPatch, SellerResponse};
use crate::error::AppError;
use crate::services::id_codec::IdCodec;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub order: String,
    #[serde(default)]
    pub product: String,
    pub rating: i32,
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateReviewRequest {
    pub fn content(&self) -> ReviewContent {
        ReviewContent {
            rating: self.rating,
            comment: self.comment.clone(),
            images: self.images.clone(),
        }
    }
}

/// rating, comment and images only.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub comment: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl From<UpdateReviewRequest> for ReviewPatch {
    fn from(r: UpdateReviewRequest) -> Self {
        ReviewPatch {
            rating: r.rating,
            comment: r.comment,
            images: r.images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub order: String,
    pub product: String,
    pub reviewer: Uuid,
    pub reviewee: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub response: Option<SellerResponse>,
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn from_domain(codec: &IdCodec, r: Review) -> Result<Self, AppError> {
        Ok(Self {
            id: codec.encode(r.id)?,
            order: codec.encode(r.order_id)?,
            product: codec.encode(r.product_id)?,
            reviewer: r.reviewer_id,
            reviewee: r.reviewee_id,
            rating: r.rating,
            comment: r.comment,
            images: r.images,
            response: r.response,
            is_verified_purchase: r.is_verified_purchase,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewData {
    pub review: ReviewResponse,
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewResponse>,
    pub pagination: PaginationMeta,
}

impl ReviewList {
    pub fn from_page(codec: &IdCodec, page: Page<Review>) -> Result<Self, AppError> {
        let pagination = PaginationMeta::of(&page);
        let page = page.try_map(|x| ReviewResponse::from_domain(codec, x))?;
        Ok(Self {
            reviews: page.items,
            pagination,
        })
    }
}
