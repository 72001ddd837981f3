/*
 * Responsibility
 * - /categories CRUD and the idempotent seed
 * - the {category_id} path segment is a public id, decoded by the extractor
 */
use axum::extract::State;

use crate::api::dto::categories::{
    CategoryData, CategoryList, CategoryListQuery, CategoryResponse, CreateCategoryRequest,
    UpdateCategoryRequest,
};
use crate::api::dto::envelope::{ApiResponse, ApiResult};
use crate::api::extractors::public_id::PublicCategoryId;
use crate::api::extractors::{ApiJson, ApiQuery};
use crate::state::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> ApiResult<CategoryList> {
    let categories = state.categories.list(query.active).await?;
    Ok(ApiResponse::ok(CategoryList::from_entries(&state.id_codec, categories)?))
}

pub async fn get_category(
    State(state): State<AppState>,
    category_id: PublicCategoryId,
) -> ApiResult<CategoryData> {
    let category = state.categories.get(category_id.id).await?;
    Ok(ApiResponse::ok(CategoryData {
        category: CategoryResponse::from_entry(&state.id_codec, category)?,
    }))
}

pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> ApiResult<CategoryData> {
    let draft = req.into_draft(&state.id_codec)?;
    let category = state.categories.create(draft).await?;
    Ok(ApiResponse::created(CategoryData {
        category: CategoryResponse::from_entry(&state.id_codec, category)?,
    })
    .with_message("Category created successfully"))
}

pub async fn update_category(
    State(state): State<AppState>,
    category_id: PublicCategoryId,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<CategoryData> {
    let patch = req.into_patch(&state.id_codec)?;
    let category = state.categories.update(category_id.id, patch).await?;
    Ok(ApiResponse::ok(CategoryData {
        category: CategoryResponse::from_entry(&state.id_codec, category)?,
    })
    .with_message("Category updated successfully"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    category_id: PublicCategoryId,
) -> ApiResult<()> {
    state.categories.delete(category_id.id).await?;
    Ok(ApiResponse::message("Category deleted successfully"))
}

pub async fn seed_categories(State(state): State<AppState>) -> ApiResult<CategoryList> {
    let created = state.categories.seed().await?;
    let message = format!("{} categories seeded successfully", created.len());
    Ok(ApiResponse::created(CategoryList::from_entries(&state.id_codec, created)?).with_message(message))
}
