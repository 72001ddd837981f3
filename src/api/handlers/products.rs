/*
 * Responsibility
 * - public catalogue reads (list with filters, detail)
 * - seller-side listing management behind the access middleware
 * - ownership checks happen in the service; handlers only pass the actor
 */
use axum::extract::State;

use crate::api::dto::envelope::{ApiResponse, ApiResult};
use crate::api::dto::products::{
    CreateProductRequest, MyProductsQuery, ProductData, ProductList, ProductListQuery,
    ProductResponse, UpdateProductRequest,
};
use crate::api::extractors::public_id::PublicProductId;
use crate::api::extractors::{ApiJson, ApiQuery, AuthCtxExtractor};
use crate::domain::pagination::PageRequest;
use crate::state::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> ApiResult<ProductList> {
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = query.to_filter(&state.id_codec)?;
    let products = state.products.list(&filter, page).await?;
    Ok(ApiResponse::ok(ProductList::from_page(&state.id_codec, products)?))
}

pub async fn get_product(
    State(state): State<AppState>,
    product_id: PublicProductId,
) -> ApiResult<ProductData> {
    let product = state.products.get(product_id.id).await?;
    Ok(ApiResponse::ok(ProductData {
        product: ProductResponse::detailed(&state.id_codec, product)?,
    }))
}

pub async fn my_products(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    ApiQuery(query): ApiQuery<MyProductsQuery>,
) -> ApiResult<ProductList> {
    let page = PageRequest::new(query.page, query.limit)?;
    let products = state
        .products
        .my_products(ctx.user_id(), query.status()?, page)
        .await?;
    Ok(ApiResponse::ok(ProductList::from_page(&state.id_codec, products)?))
}

pub async fn create_product(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> ApiResult<ProductData> {
    let draft = req.into_draft(&state.id_codec)?;
    let product = state.products.create(ctx.user_id(), draft).await?;
    Ok(ApiResponse::created(ProductData {
        product: ProductResponse::summary(&state.id_codec, product)?,
    })
    .with_message("Product created successfully"))
}

pub async fn update_product(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    product_id: PublicProductId,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> ApiResult<ProductData> {
    let patch = req.into_patch(&state.id_codec)?;
    let product = state
        .products
        .update(ctx.user_id(), product_id.id, patch)
        .await?;
    Ok(ApiResponse::ok(ProductData {
        product: ProductResponse::summary(&state.id_codec, product)?,
    })
    .with_message("Product updated successfully"))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    product_id: PublicProductId,
) -> ApiResult<()> {
    state.products.delete(ctx.user_id(), product_id.id).await?;
    Ok(ApiResponse::message("Product deleted successfully"))
}
