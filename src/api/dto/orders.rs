use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::double_option;
use crate::api::dto::pagination::PaginationMeta;
use crate::api::extractors::public_id::PublicProductId;
use crate::domain::order::{
    DeliveryAddress, DeliveryType, Order, OrderDetailsPatch, OrderItem, OrderLine, OrderParty,
    OrderStatus, PaymentStatus, PlaceOrder,
};
use crate::domain::pagination::Page;
use crate::domain::product::Unit;
use crate::error::AppError;
use crate::services::id_codec::IdCodec;

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_place_order(self, codec: &IdCodec) -> Result<PlaceOrder, AppError> {
        let lines = self
            .items
            .iter()
            .map(|i| {
                Ok(OrderLine {
                    product_id: PublicProductId::decode(codec, &i.product)?,
                    quantity: i.quantity,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(PlaceOrder {
            lines,
            delivery_address: self.delivery_address,
            delivery_type: self.delivery_type,
            delivery_date: self.delivery_date,
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            payment_method: self.payment_method,
        })
    }
}

/// Buyer-editable fields; everything else in the body is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub delivery_date: Option<Option<DateTime<Utc>>>,
    pub delivery_address: Option<DeliveryAddress>,
}

impl From<UpdateOrderRequest> for OrderDetailsPatch {
    fn from(r: UpdateOrderRequest) -> Self {
        OrderDetailsPatch {
            notes: r.notes,
            delivery_date: r.delivery_date,
            delivery_address: r.delivery_address,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    pub cancel_reason: Option<String>,
}

impl UpdateStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, AppError> {
        self.status
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid order status: {}", self.status)))
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl OrderListQuery {
    /// Buyer unless `role=seller`.
    pub fn role(&self) -> Result<OrderParty, AppError> {
        match self.role.as_deref() {
            None | Some("buyer") => Ok(OrderParty::Buyer),
            Some("seller") => Ok(OrderParty::Seller),
            Some(other) => Err(AppError::validation(format!("Invalid role: {other}"))),
        }
    }

    pub fn status(&self) -> Result<Option<OrderStatus>, AppError> {
        self.status
            .as_deref()
            .map(|s| {
                s.parse()
                    .map_err(|_| AppError::validation(format!("Invalid order status: {s}")))
            })
            .transpose()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub unit: Unit,
    pub subtotal: f64,
}

impl OrderItemResponse {
    fn from_domain(codec: &IdCodec, i: OrderItem) -> Result<Self, AppError> {
        Ok(Self {
            product: codec.encode(i.product_id)?,
            product_name: i.product_name,
            quantity: i.quantity,
            price_per_unit: i.price_per_unit,
            unit: i.unit,
            subtotal: i.subtotal,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub buyer: Uuid,
    pub seller: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_domain(codec: &IdCodec, o: Order) -> Result<Self, AppError> {
        let items = o
            .items
            .into_iter()
            .map(|i| OrderItemResponse::from_domain(codec, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: codec.encode(o.id)?,
            order_number: o.order_number,
            buyer: o.buyer_id,
            seller: o.seller_id,
            items,
            total_amount: o.total_amount,
            status: o.status,
            payment_status: o.payment_status,
            payment_method: o.payment_method,
            delivery_address: o.delivery_address,
            delivery_type: o.delivery_type,
            delivery_date: o.delivery_date,
            notes: o.notes,
            cancel_reason: o.cancel_reason,
            created_at: o.created_at,
            updated_at: o.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OrderData {
    pub order: OrderResponse,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderResponse>,
    pub pagination: PaginationMeta,
}

impl OrderList {
    pub fn from_page(codec: &IdCodec, page: Page<Order>) -> Result<Self, AppError> {
        let pagination = PaginationMeta::of(&page);
        let page = page.try_map(|x| OrderResponse::from_domain(codec, x))?;
        Ok(Self {
            orders: page.items,
            pagination,
        })
    }
}
