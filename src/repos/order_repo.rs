/*
 * Responsibility
 * - orders table access
 * - status and detail writes are compare-and-set on the current status,
 *   so a concurrent writer that got there first makes them return None
 * - placing an order takes its quantities out of product stock in the same
 *   transaction; cancelling or deleting a live order puts them back
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::order::{
    DeliveryAddress, NewOrder, Order, OrderDetails, OrderFilter, OrderItem, OrderParty,
    OrderStatus,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait OrderRepo: Send + Sync {
    async fn create(&self, order: NewOrder) -> RepoResult<Order>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>>;
    /// Newest first.
    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> RepoResult<Page<Order>>;
    /// Applied only while the order is still pending.
    async fn update_details(&self, id: i64, details: &OrderDetails) -> RepoResult<Option<Order>>;
    /// Moves the order from `from` to `to`. `None` when the order is gone or
    /// no longer in `from`.
    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> RepoResult<Option<Order>>;
    /// Deletes the order only while its status is one of `statuses`.
    async fn delete_if(&self, id: i64, statuses: &[OrderStatus]) -> RepoResult<bool>;
}

#[derive(Debug, FromRow)]
struct OrderRow {
    #[sqlx(rename = "orderId")]
    id: i64,
    #[sqlx(rename = "orderNumber")]
    order_number: String,
    #[sqlx(rename = "buyerId")]
    buyer_id: Uuid,
    #[sqlx(rename = "sellerId")]
    seller_id: Uuid,
    items: Json<Vec<OrderItem>>,
    #[sqlx(rename = "totalAmount")]
    total_amount: f64,
    status: String,
    #[sqlx(rename = "paymentStatus")]
    payment_status: String,
    #[sqlx(rename = "paymentMethod")]
    payment_method: Option<String>,
    #[sqlx(rename = "deliveryAddress")]
    delivery_address: Json<DeliveryAddress>,
    #[sqlx(rename = "deliveryType")]
    delivery_type: String,
    #[sqlx(rename = "deliveryDate")]
    delivery_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    #[sqlx(rename = "cancelReason")]
    cancel_reason: Option<String>,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepoError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id,
            order_number: r.order_number,
            buyer_id: r.buyer_id,
            seller_id: r.seller_id,
            items: r.items.0,
            total_amount: r.total_amount,
            status: r.status.parse()?,
            payment_status: r.payment_status.parse()?,
            payment_method: r.payment_method,
            delivery_address: r.delivery_address.0,
            delivery_type: r.delivery_type.parse()?,
            delivery_date: r.delivery_date,
            notes: r.notes,
            cancel_reason: r.cancel_reason,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const COLUMNS: &str = r#""orderId", "orderNumber", "buyerId", "sellerId", items, "totalAmount",
    status, "paymentStatus", "paymentMethod", "deliveryAddress", "deliveryType",
    "deliveryDate", notes, "cancelReason", "createdAt", "updatedAt""#;

const RESERVE_STOCK: &str = r#"
    UPDATE products
    SET "quantityAvailable" = "quantityAvailable" - $2, buys = buys + $2
    WHERE "productId" = $1 AND status = 'available' AND "quantityAvailable" >= $2
"#;

const RELEASE_STOCK: &str = r#"
    UPDATE products
    SET "quantityAvailable" = "quantityAvailable" + $2, buys = GREATEST(buys - $2, 0)
    WHERE "productId" = $1
"#;

/// Rows are touched in product id order so concurrent orders sharing
/// products lock them in the same sequence.
fn by_product(items: &[OrderItem]) -> Vec<(i64, i64)> {
    let mut lines: Vec<(i64, i64)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
    lines.sort_unstable();
    lines
}

async fn reserve_stock(conn: &mut PgConnection, items: &[OrderItem]) -> RepoResult<()> {
    for (product_id, quantity) in by_product(items) {
        let result = sqlx::query(RESERVE_STOCK)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::OutOfStock { product_id });
        }
    }
    Ok(())
}

async fn release_stock(conn: &mut PgConnection, items: &[OrderItem]) -> RepoResult<()> {
    for (product_id, quantity) in by_product(items) {
        sqlx::query(RELEASE_STOCK)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn party_column(role: OrderParty) -> &'static str {
    match role {
        OrderParty::Buyer => r#""buyerId""#,
        OrderParty::Seller => r#""sellerId""#,
    }
}

pub struct PgOrderRepo {
    db: PgPool,
}

impl PgOrderRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepo for PgOrderRepo {
    async fn create(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tx = self.db.begin().await?;
        reserve_stock(&mut *tx, &order.items).await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (
                "orderNumber", "buyerId", "sellerId", items, "totalAmount", "paymentMethod",
                "deliveryAddress", "deliveryType", "deliveryDate", notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&order.order_number)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(order.payment_method.as_deref())
        .bind(Json(&order.delivery_address))
        .bind(order.delivery_type.as_str())
        .bind(order.delivery_date)
        .bind(order.notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"SELECT {COLUMNS} FROM orders WHERE "orderId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> RepoResult<Page<Order>> {
        let party = party_column(filter.role);
        let status = filter.status.map(OrderStatus::as_str);

        let total: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE {party} = $1 AND ($2::TEXT IS NULL OR status = $2)
            "#
        ))
        .bind(filter.user_id)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM orders
            WHERE {party} = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY "createdAt" DESC, "orderId" DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.user_id)
        .bind(status)
        .bind(i64::from(page.limit()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(Page::new(items, u64::try_from(total).unwrap_or(0), page))
    }

    async fn update_details(&self, id: i64, details: &OrderDetails) -> RepoResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET notes = $2, "deliveryDate" = $3, "deliveryAddress" = $4, "updatedAt" = now()
            WHERE "orderId" = $1 AND status = 'pending'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(details.notes.as_deref())
        .bind(details.delivery_date)
        .bind(Json(&details.delivery_address))
        .fetch_optional(&self.db)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> RepoResult<Option<Order>> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET status = $3, "cancelReason" = COALESCE($4, "cancelReason"), "updatedAt" = now()
            WHERE "orderId" = $1 AND status = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(cancel_reason)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = row.map(Order::try_from).transpose()? else {
            return Ok(None);
        };
        if to == OrderStatus::Cancelled {
            release_stock(&mut *tx, &order.items).await?;
        }
        tx.commit().await?;
        Ok(Some(order))
    }

    async fn delete_if(&self, id: i64, statuses: &[OrderStatus]) -> RepoResult<bool> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let mut tx = self.db.begin().await?;
        let deleted: Option<(String, Json<Vec<OrderItem>>)> = sqlx::query_as(
            r#"DELETE FROM orders WHERE "orderId" = $1 AND status = ANY($2) RETURNING status, items"#,
        )
        .bind(id)
        .bind(&statuses)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        let Some((status, items)) = deleted else {
            return Ok(false);
        };
        // cancelled orders already gave their stock back
        if status.parse::<OrderStatus>()? != OrderStatus::Cancelled {
            release_stock(&mut *tx, &items.0).await?;
        }
        tx.commit().await?;
        Ok(true)
    }
}
