//! Order placement and lifecycle.
//!
//! Reads are open to both parties. Detail edits and deletion belong to the
//! buyer. Status changes go through [`OrderStatus::transition`] and are
//! written with a compare-and-set on the status the decision was made from.
//! Placed orders hold their quantities out of product stock until they are
//! cancelled or deleted.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::order::{
    NewOrder, Order, OrderDetailsPatch, OrderFilter, OrderItem, OrderParty, OrderStatus,
    PlaceOrder, generate_order_number, validate_cancel_reason,
};
use crate::domain::ownership::{Owned, OwnershipError};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::product::ProductStatus;
use crate::domain::round2;
use crate::error::{AppError, AppResult};
use crate::repos::error::RepoError;
use crate::repos::order_repo::OrderRepo;
use crate::repos::product_repo::ProductRepo;

const ORDER_NUMBER_ATTEMPTS: usize = 3;
const DELETABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Cancelled];

pub const CONCURRENT_CHANGE: &str = "Order was modified concurrently, reload and try again";

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepo>,
    products: Arc<dyn ProductRepo>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepo>, products: Arc<dyn ProductRepo>) -> Self {
        Self { orders, products }
    }

    pub async fn create(&self, buyer_id: Uuid, place: PlaceOrder) -> AppResult<Order> {
        place.validate()?;
        let lines = place.merged_lines()?;

        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, _> = self
            .products
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut seller_id = None;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| AppError::not_found("Product"))?;

            if product.status != ProductStatus::Available {
                return Err(AppError::validation(format!(
                    "{} is not available",
                    product.title
                )));
            }
            if product.quantity_available < line.quantity {
                return Err(AppError::validation(format!(
                    "Insufficient quantity for {}",
                    product.title
                )));
            }
            if product.seller_id == buyer_id {
                return Err(AppError::validation("You cannot order your own product"));
            }
            match seller_id {
                None => seller_id = Some(product.seller_id),
                Some(s) if s != product.seller_id => {
                    return Err(AppError::validation(
                        "All items in an order must come from the same seller",
                    ));
                }
                Some(_) => {}
            }

            items.push(OrderItem {
                product_id: product.id,
                product_name: product.title.clone(),
                quantity: line.quantity,
                price_per_unit: product.price,
                unit: product.unit,
                subtotal: round2(product.price * line.quantity as f64),
            });
        }
        let seller_id = seller_id.ok_or_else(|| AppError::validation("Order has no items"))?;
        let total_amount = round2(items.iter().map(|i| i.subtotal).sum());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let order = NewOrder {
                order_number: generate_order_number(Utc::now()),
                buyer_id,
                seller_id,
                items: items.clone(),
                total_amount,
                payment_method: place.payment_method.clone(),
                delivery_address: place.delivery_address.clone(),
                delivery_type: place.delivery_type,
                delivery_date: place.delivery_date,
                notes: place.notes.clone(),
            };
            match self.orders.create(order).await {
                Ok(order) => {
                    info!(
                        order_id = order.id,
                        order_number = %order.order_number,
                        buyer_id = %buyer_id,
                        seller_id = %seller_id,
                        total = order.total_amount,
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(RepoError::Conflict { .. }) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!(attempt, "order number collision, retrying");
                }
                // stock changed between the read above and the reservation
                Err(RepoError::OutOfStock { product_id }) => {
                    let title = products.get(&product_id).map_or("product", |p| p.title.as_str());
                    return Err(AppError::validation(format!("Insufficient quantity for {title}")));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        role: OrderParty,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> AppResult<Page<Order>> {
        let filter = OrderFilter {
            user_id,
            role,
            status,
        };
        Ok(self.orders.list(&filter, page).await?)
    }

    pub async fn get(&self, actor: Uuid, id: i64) -> AppResult<Order> {
        let order = self.find(id).await?;
        if order.party(actor).is_none() {
            return Err(OwnershipError {
                resource: "order",
                action: "view",
            }
            .into());
        }
        Ok(order)
    }

    pub async fn update(&self, actor: Uuid, id: i64, patch: OrderDetailsPatch) -> AppResult<Order> {
        let order = self.find(id).await?;
        order.ensure_owned_by(actor, "update")?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::validation("Only pending orders can be updated"));
        }

        let details = patch.apply(order.details());
        details.validate()?;

        self.orders
            .update_details(id, &details)
            .await?
            .ok_or_else(|| AppError::conflict(CONCURRENT_CHANGE))
    }

    pub async fn update_status(
        &self,
        actor: Uuid,
        id: i64,
        next: OrderStatus,
        cancel_reason: Option<String>,
    ) -> AppResult<Order> {
        let order = self.find(id).await?;
        let party = order.party(actor).ok_or(OwnershipError {
            resource: "order",
            action: "update",
        })?;

        if !party.may_request(order.status, next) {
            warn!(order_id = id, actor = %actor, from = %order.status, to = %next, "status change refused");
            return Err(AppError::forbidden(format!(
                "You are not allowed to set this order to {next}"
            )));
        }
        order.status.transition(next, order.delivery_type)?;

        let cancel_reason = if next == OrderStatus::Cancelled {
            cancel_reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
        } else {
            None
        };
        validate_cancel_reason(cancel_reason.as_deref())?;

        let updated = self
            .orders
            .update_status(id, order.status, next, cancel_reason.as_deref())
            .await?
            .ok_or_else(|| AppError::conflict(CONCURRENT_CHANGE))?;

        info!(order_id = id, from = %order.status, to = %next, "order status changed");
        Ok(updated)
    }

    pub async fn delete(&self, actor: Uuid, id: i64) -> AppResult<()> {
        let order = self.find(id).await?;
        order.ensure_owned_by(actor, "delete")?;
        if !DELETABLE.contains(&order.status) {
            return Err(AppError::validation(
                "Only pending or cancelled orders can be deleted",
            ));
        }

        if !self.orders.delete_if(id, &DELETABLE).await? {
            return Err(AppError::conflict(CONCURRENT_CHANGE));
        }
        info!(order_id = id, "order deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> AppResult<Order> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))
    }
}
