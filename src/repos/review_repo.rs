/*
 * Responsibility
 * - reviews table access
 * - every write that changes the set of ratings recomputes the product's
 *   rating aggregate in the same transaction
 * - those writes lock the product row first, so each recompute reads every
 *   review committed before it
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::pagination::{Page, PageRequest};
use crate::domain::review::{NewReview, Review, ReviewContent, SellerResponse};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait ReviewRepo: Send + Sync {
    async fn create(&self, review: NewReview) -> RepoResult<Review>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Review>>;
    /// Newest first.
    async fn list_for_product(&self, product_id: i64, page: PageRequest)
    -> RepoResult<Page<Review>>;
    async fn update_content(&self, id: i64, content: &ReviewContent)
    -> RepoResult<Option<Review>>;
    async fn set_response(&self, id: i64, response: SellerResponse) -> RepoResult<Option<Review>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    #[sqlx(rename = "reviewId")]
    id: i64,
    #[sqlx(rename = "orderId")]
    order_id: i64,
    #[sqlx(rename = "productId")]
    product_id: i64,
    #[sqlx(rename = "reviewerId")]
    reviewer_id: Uuid,
    #[sqlx(rename = "revieweeId")]
    reviewee_id: Uuid,
    rating: i32,
    comment: Option<String>,
    images: Vec<String>,
    #[sqlx(rename = "responseText")]
    response_text: Option<String>,
    #[sqlx(rename = "responseDate")]
    response_date: Option<DateTime<Utc>>,
    #[sqlx(rename = "isVerifiedPurchase")]
    is_verified_purchase: bool,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        let response = match (r.response_text, r.response_date) {
            (Some(text), Some(date)) => Some(SellerResponse { text, date }),
            _ => None,
        };
        Review {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            reviewer_id: r.reviewer_id,
            reviewee_id: r.reviewee_id,
            rating: r.rating,
            comment: r.comment,
            images: r.images,
            response,
            is_verified_purchase: r.is_verified_purchase,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const COLUMNS: &str = r#""reviewId", "orderId", "productId", "reviewerId", "revieweeId", rating,
    comment, images, "responseText", "responseDate", "isVerifiedPurchase", "createdAt",
    "updatedAt""#;

const LOCK_PRODUCT: &str = r#"SELECT 1 FROM products WHERE "productId" = $1 FOR UPDATE"#;

/// `false` when the product no longer exists.
async fn lock_product(conn: &mut PgConnection, product_id: i64) -> Result<bool, sqlx::Error> {
    let locked: Option<i32> = sqlx::query_scalar(LOCK_PRODUCT)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(locked.is_some())
}

async fn reviewed_product(conn: &mut PgConnection, id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT "productId" FROM reviews WHERE "reviewId" = $1"#)
        .bind(id)
        .fetch_optional(conn)
        .await
}

async fn recompute_rating(conn: &mut PgConnection, product_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE products
        SET "ratingAverage" = COALESCE(s.average, 0), "ratingCount" = s.count
        FROM (
            SELECT ROUND(AVG(rating)::NUMERIC, 2)::DOUBLE PRECISION AS average,
                   COUNT(*) AS count
            FROM reviews
            WHERE "productId" = $1
        ) AS s
        WHERE products."productId" = $1
        "#,
    )
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub struct PgReviewRepo {
    db: PgPool,
}

impl PgReviewRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewRepo for PgReviewRepo {
    async fn create(&self, review: NewReview) -> RepoResult<Review> {
        let mut tx = self.db.begin().await?;
        if !lock_product(&mut *tx, review.product_id).await? {
            return Err(RepoError::InUse);
        }

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews ("orderId", "productId", "reviewerId", "revieweeId", rating, comment, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(review.order_id)
        .bind(review.product_id)
        .bind(review.reviewer_id)
        .bind(review.reviewee_id)
        .bind(review.content.rating)
        .bind(review.content.comment.as_deref())
        .bind(&review.content.images)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        recompute_rating(&mut *tx, row.product_id).await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"SELECT {COLUMNS} FROM reviews WHERE "reviewId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Review::from))
    }

    async fn list_for_product(
        &self,
        product_id: i64,
        page: PageRequest,
    ) -> RepoResult<Page<Review>> {
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM reviews WHERE "productId" = $1"#)
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM reviews
            WHERE "productId" = $1
            ORDER BY "createdAt" DESC, "reviewId" DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(product_id)
        .bind(i64::from(page.limit()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await?;

        let items = rows.into_iter().map(Review::from).collect();
        Ok(Page::new(items, u64::try_from(total).unwrap_or(0), page))
    }

    async fn update_content(
        &self,
        id: i64,
        content: &ReviewContent,
    ) -> RepoResult<Option<Review>> {
        let mut tx = self.db.begin().await?;
        let Some(product_id) = reviewed_product(&mut *tx, id).await? else {
            return Ok(None);
        };
        lock_product(&mut *tx, product_id).await?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET rating = $2, comment = $3, images = $4, "updatedAt" = now()
            WHERE "reviewId" = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(content.rating)
        .bind(content.comment.as_deref())
        .bind(&content.images)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        recompute_rating(&mut *tx, row.product_id).await?;
        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn set_response(&self, id: i64, response: SellerResponse) -> RepoResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET "responseText" = $2, "responseDate" = $3, "updatedAt" = now()
            WHERE "reviewId" = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&response.text)
        .bind(response.date)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Review::from))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut tx = self.db.begin().await?;
        let Some(product_id) = reviewed_product(&mut *tx, id).await? else {
            return Ok(false);
        };
        lock_product(&mut *tx, product_id).await?;

        let result = sqlx::query(r#"DELETE FROM reviews WHERE "reviewId" = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        recompute_rating(&mut *tx, product_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_writes_take_a_row_lock_on_the_product() {
        assert!(LOCK_PRODUCT.ends_with("FOR UPDATE"));
        assert!(LOCK_PRODUCT.contains(r#""productId" = $1"#));
    }
}
