//! Orders and their lifecycle.
//!
//! Status moves through a fixed graph:
//!
//! ```text
//! pending -> confirmed -> preparing -> ready-for-pickup -> delivered   (pickup)
//!                                   -> in-transit       -> delivered   (delivery)
//! any non-terminal state -> cancelled
//! ```
//!
//! The seller drives the order forward. The buyer may only cancel, and only
//! before preparation starts.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::UnknownVariant;
use crate::domain::ownership::Owned;
use crate::domain::product::Unit;
use crate::domain::validation::{ValidationError, Violations, char_len, is_blank};

pub const MAX_ITEMS: usize = 50;
/// Upper bound for one product's quantity in an order, after merging.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_CANCEL_REASON_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready-for-pickup",
            OrderStatus::InTransit => "in-transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// States reachable in one step. Which hand-off state follows
    /// `preparing` depends on how the order is fulfilled.
    pub fn successors(self, delivery: DeliveryType) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match (self, delivery) {
            (Pending, _) => &[Confirmed, Cancelled],
            (Confirmed, _) => &[Preparing, Cancelled],
            (Preparing, DeliveryType::Pickup) => &[ReadyForPickup, Cancelled],
            (Preparing, DeliveryType::Delivery) => &[InTransit, Cancelled],
            (ReadyForPickup, _) | (InTransit, _) => &[Delivered, Cancelled],
            (Delivered, _) | (Cancelled, _) => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus, delivery: DeliveryType) -> bool {
        self.successors(delivery).contains(&next)
    }

    pub fn transition(
        self,
        next: OrderStatus,
        delivery: DeliveryType,
    ) -> Result<OrderStatus, TransitionError> {
        if self.can_transition_to(next, delivery) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("order status", s))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot move an order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Delivery => "delivery",
        }
    }
}

impl FromStr for DeliveryType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            other => Err(UnknownVariant::new("delivery type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl DeliveryAddress {
    fn check(&self, v: &mut Violations) {
        v.check(!is_blank(&self.street), "Delivery street is required");
        v.check(!is_blank(&self.city), "Delivery city is required");
        v.check(!is_blank(&self.state), "Delivery state is required");
        v.check(!is_blank(&self.zip_code), "Delivery zip code is required");
        v.check(!is_blank(&self.country), "Delivery country is required");
    }
}

/// A line of an order with the product data captured at purchase time, so
/// the order still reads correctly after the listing changes or disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub unit: Unit,
    pub subtotal: f64,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<OrderItem>,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderParty {
    Buyer,
    Seller,
}

impl Order {
    pub fn party(&self, actor: Uuid) -> Option<OrderParty> {
        if actor == self.buyer_id {
            Some(OrderParty::Buyer)
        } else if actor == self.seller_id {
            Some(OrderParty::Seller)
        } else {
            None
        }
    }

    pub fn contains_product(&self, product_id: i64) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn details(&self) -> OrderDetails {
        OrderDetails {
            notes: self.notes.clone(),
            delivery_date: self.delivery_date,
            delivery_address: self.delivery_address.clone(),
        }
    }
}

/// The buyer owns the order; the seller participates through [`OrderParty`].
impl Owned for Order {
    const RESOURCE: &'static str = "order";

    fn owner_id(&self) -> Uuid {
        self.buyer_id
    }
}

impl OrderParty {
    /// Whether this party may request `next` on an order currently in
    /// `current`. The lifecycle graph is checked separately.
    pub fn may_request(self, current: OrderStatus, next: OrderStatus) -> bool {
        match self {
            OrderParty::Seller => true,
            OrderParty::Buyer => {
                next == OrderStatus::Cancelled
                    && matches!(current, OrderStatus::Pending | OrderStatus::Confirmed)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub payment_method: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Buyer-editable fields of a pending order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub notes: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_address: DeliveryAddress,
}

impl OrderDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        self.delivery_address.check(&mut v);
        check_notes(&mut v, self.notes.as_deref());
        v.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderDetailsPatch {
    pub notes: Option<Option<String>>,
    pub delivery_date: Option<Option<DateTime<Utc>>>,
    pub delivery_address: Option<DeliveryAddress>,
}

impl OrderDetailsPatch {
    pub fn apply(self, mut details: OrderDetails) -> OrderDetails {
        if let Some(notes) = self.notes {
            details.notes = notes;
        }
        if let Some(delivery_date) = self.delivery_date {
            details.delivery_date = delivery_date;
        }
        if let Some(address) = self.delivery_address {
            details.delivery_address = address;
        }
        details
    }
}

/// A requested line before product data is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub lines: Vec<OrderLine>,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

impl PlaceOrder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.check(
            (1..=MAX_ITEMS).contains(&self.lines.len()),
            format!("An order must contain between 1 and {MAX_ITEMS} items"),
        );
        v.check(
            self.lines.iter().all(|l| l.quantity >= 1),
            "Quantity must be at least 1",
        );
        v.check(
            self.lines.iter().all(|l| l.quantity <= MAX_LINE_QUANTITY),
            format!("Quantity cannot exceed {MAX_LINE_QUANTITY}"),
        );
        self.delivery_address.check(&mut v);
        check_notes(&mut v, self.notes.as_deref());
        v.finish()
    }

    /// Lines with repeated products folded together, first occurrence order kept.
    /// A folded quantity above [`MAX_LINE_QUANTITY`] is rejected.
    pub fn merged_lines(&self) -> Result<Vec<OrderLine>, ValidationError> {
        let mut merged: Vec<OrderLine> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            match merged.iter_mut().find(|m| m.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .filter(|q| *q <= MAX_LINE_QUANTITY)
                        .ok_or_else(|| ValidationError::single("Quantity is too large"))?;
                }
                None => merged.push(*line),
            }
        }
        Ok(merged)
    }
}

fn check_notes(v: &mut Violations, notes: Option<&str>) {
    if let Some(notes) = notes {
        v.check(
            char_len(notes) <= MAX_NOTES_LEN,
            format!("Notes cannot exceed {MAX_NOTES_LEN} characters"),
        );
    }
}

pub fn validate_cancel_reason(reason: Option<&str>) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    if let Some(reason) = reason {
        v.check(
            char_len(reason) <= MAX_CANCEL_REASON_LEN,
            format!("Cancel reason cannot exceed {MAX_CANCEL_REASON_LEN} characters"),
        );
    }
    v.finish()
}

/// Orders visible to one user in one role, newest first.
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub user_id: Uuid,
    pub role: OrderParty,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        let party = match self.role {
            OrderParty::Buyer => order.buyer_id,
            OrderParty::Seller => order.seller_id,
        };
        party == self.user_id && self.status.is_none_or(|s| order.status == s)
    }
}

/// `ORD-<epoch millis>-<9 uppercase alphanumerics>`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("ORD-{}-{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn happy_path_for_pickup_orders() {
        let mut status = Pending;
        for next in [Confirmed, Preparing, ReadyForPickup, Delivered] {
            status = status.transition(next, DeliveryType::Pickup).unwrap();
        }
        assert_eq!(status, Delivered);
        assert!(status.is_terminal());
    }

    #[test]
    fn hand_off_state_depends_on_delivery_type() {
        assert!(Preparing.can_transition_to(InTransit, DeliveryType::Delivery));
        assert!(!Preparing.can_transition_to(InTransit, DeliveryType::Pickup));
        assert!(!Preparing.can_transition_to(ReadyForPickup, DeliveryType::Delivery));
    }

    #[test]
    fn cancel_is_reachable_from_every_non_terminal_state() {
        for status in OrderStatus::ALL {
            let reachable = status.can_transition_to(Cancelled, DeliveryType::Delivery)
                || status.can_transition_to(Cancelled, DeliveryType::Pickup);
            assert_eq!(reachable, !status.is_terminal(), "{status}");
        }
    }

    #[test]
    fn no_skipping_no_going_back_no_self_loops() {
        let err = Pending.transition(Delivered, DeliveryType::Pickup).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move an order from pending to delivered");
        assert!(Preparing.transition(Confirmed, DeliveryType::Pickup).is_err());
        assert!(Pending.transition(Pending, DeliveryType::Pickup).is_err());
        assert!(Cancelled.transition(Pending, DeliveryType::Pickup).is_err());
    }

    #[test]
    fn buyer_may_only_cancel_early() {
        assert!(OrderParty::Buyer.may_request(Pending, Cancelled));
        assert!(OrderParty::Buyer.may_request(Confirmed, Cancelled));
        assert!(!OrderParty::Buyer.may_request(Preparing, Cancelled));
        assert!(!OrderParty::Buyer.may_request(Pending, Confirmed));
        assert!(OrderParty::Seller.may_request(Preparing, Cancelled));
    }

    fn place(lines: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            lines,
            delivery_address: DeliveryAddress {
                street: "1 Main".into(),
                city: "Town".into(),
                state: "ST".into(),
                zip_code: "00001".into(),
                country: "US".into(),
            },
            delivery_type: DeliveryType::Pickup,
            delivery_date: None,
            notes: None,
            payment_method: None,
        }
    }

    #[test]
    fn repeated_lines_are_merged() {
        let place = place(vec![
            OrderLine { product_id: 2, quantity: 1 },
            OrderLine { product_id: 1, quantity: 2 },
            OrderLine { product_id: 2, quantity: 3 },
        ]);
        assert!(place.validate().is_ok());
        assert_eq!(
            place.merged_lines().unwrap(),
            vec![
                OrderLine { product_id: 2, quantity: 4 },
                OrderLine { product_id: 1, quantity: 2 },
            ]
        );
    }

    #[test]
    fn oversized_line_quantities_are_rejected() {
        let huge = place(vec![
            OrderLine { product_id: 1, quantity: i64::MAX },
            OrderLine { product_id: 1, quantity: i64::MAX },
        ]);
        let err = huge.validate().unwrap_err();
        assert_eq!(err.to_string(), "Quantity cannot exceed 1000000");
        assert_eq!(huge.merged_lines().unwrap_err().to_string(), "Quantity is too large");

        let folded = place(vec![
            OrderLine { product_id: 1, quantity: MAX_LINE_QUANTITY },
            OrderLine { product_id: 1, quantity: 1 },
        ]);
        assert!(folded.validate().is_ok());
        assert!(folded.merged_lines().is_err());
    }

    #[test]
    fn order_number_shape() {
        let n = generate_order_number(Utc::now());
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
