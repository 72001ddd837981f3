/*
 * Responsibility
 * - review reads are public, writes need the access middleware
 * - order/product ids in the body are public ids
 */
use axum::extract::State;

use crate::api::dto::envelope::{ApiResponse, ApiResult};
use crate::api::dto::reviews::{
    CreateReviewRequest, RespondRequest, ReviewData, ReviewList, ReviewListQuery, ReviewResponse,
    UpdateReviewRequest,
};
use crate::api::extractors::public_id::{PublicOrderId, PublicProductId, PublicReviewId};
use crate::api::extractors::{ApiJson, ApiQuery, AuthCtxExtractor};
use crate::domain::pagination::PageRequest;
use crate::domain::review::Review;
use crate::error::AppError;
use crate::state::AppState;

fn review_data(state: &AppState, review: Review) -> Result<ReviewData, AppError> {
    Ok(ReviewData {
        review: ReviewResponse::from_domain(&state.id_codec, review)?,
    })
}

pub async fn create_review(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> ApiResult<ReviewData> {
    let order_id = PublicOrderId::decode(&state.id_codec, &req.order)?;
    let product_id = PublicProductId::decode(&state.id_codec, &req.product)?;
    let review = state
        .reviews
        .create(ctx.user_id(), order_id, product_id, req.content())
        .await?;
    Ok(ApiResponse::created(review_data(&state, review)?).with_message("Review created successfully"))
}

pub async fn product_reviews(
    State(state): State<AppState>,
    product_id: PublicProductId,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> ApiResult<ReviewList> {
    let page = PageRequest::new(query.page, query.limit)?;
    let reviews = state.reviews.list_for_product(product_id.id, page).await?;
    Ok(ApiResponse::ok(ReviewList::from_page(&state.id_codec, reviews)?))
}

pub async fn get_review(
    State(state): State<AppState>,
    review_id: PublicReviewId,
) -> ApiResult<ReviewData> {
    let review = state.reviews.get(review_id.id).await?;
    Ok(ApiResponse::ok(review_data(&state, review)?))
}

pub async fn update_review(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    review_id: PublicReviewId,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> ApiResult<ReviewData> {
    let review = state
        .reviews
        .update(ctx.user_id(), review_id.id, req.into())
        .await?;
    Ok(ApiResponse::ok(review_data(&state, review)?).with_message("Review updated successfully"))
}

pub async fn respond_to_review(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    review_id: PublicReviewId,
    ApiJson(req): ApiJson<RespondRequest>,
) -> ApiResult<ReviewData> {
    let review = state
        .reviews
        .respond(ctx.user_id(), review_id.id, &req.text)
        .await?;
    Ok(ApiResponse::ok(review_data(&state, review)?).with_message("Response added successfully"))
}

pub async fn delete_review(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    review_id: PublicReviewId,
) -> ApiResult<()> {
    state.reviews.delete(ctx.user_id(), review_id.id).await?;
    Ok(ApiResponse::message("Review deleted successfully"))
}
