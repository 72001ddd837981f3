/*
 * Responsibility
 * - /orders for the two parties of an order (buyer, seller)
 * - every route here sits behind the access middleware
 */
use axum::extract::State;

use crate::api::dto::envelope::{ApiResponse, ApiResult};
use crate::api::dto::orders::{
    CreateOrderRequest, OrderData, OrderList, OrderListQuery, OrderResponse, UpdateOrderRequest,
    UpdateStatusRequest,
};
use crate::api::extractors::public_id::PublicOrderId;
use crate::api::extractors::{ApiJson, ApiQuery, AuthCtxExtractor};
use crate::domain::order::Order;
use crate::domain::pagination::PageRequest;
use crate::error::AppError;
use crate::state::AppState;

fn order_data(state: &AppState, order: Order) -> Result<OrderData, AppError> {
    Ok(OrderData {
        order: OrderResponse::from_domain(&state.id_codec, order)?,
    })
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<OrderData> {
    let place = req.into_place_order(&state.id_codec)?;
    let order = state.orders.create(ctx.user_id(), place).await?;
    Ok(ApiResponse::created(order_data(&state, order)?).with_message("Order placed successfully"))
}

pub async fn list_orders(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<OrderList> {
    let page = PageRequest::new(query.page, query.limit)?;
    let orders = state
        .orders
        .list(ctx.user_id(), query.role()?, query.status()?, page)
        .await?;
    Ok(ApiResponse::ok(OrderList::from_page(&state.id_codec, orders)?))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    order_id: PublicOrderId,
) -> ApiResult<OrderData> {
    let order = state.orders.get(ctx.user_id(), order_id.id).await?;
    Ok(ApiResponse::ok(order_data(&state, order)?))
}

pub async fn update_order(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    order_id: PublicOrderId,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> ApiResult<OrderData> {
    let order = state
        .orders
        .update(ctx.user_id(), order_id.id, req.into())
        .await?;
    Ok(ApiResponse::ok(order_data(&state, order)?).with_message("Order updated successfully"))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    order_id: PublicOrderId,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> ApiResult<OrderData> {
    let next = req.status()?;
    let order = state
        .orders
        .update_status(ctx.user_id(), order_id.id, next, req.cancel_reason)
        .await?;
    Ok(ApiResponse::ok(order_data(&state, order)?).with_message("Order status updated"))
}

pub async fn delete_order(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    order_id: PublicOrderId,
) -> ApiResult<()> {
    state.orders.delete(ctx.user_id(), order_id.id).await?;
    Ok(ApiResponse::message("Order deleted successfully"))
}
