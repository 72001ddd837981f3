/*
 * Responsibility
 * - products table access, filtering and paging in SQL
 * - a listing write touches both products and the seller's productsListed,
 *   always inside one transaction
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::pagination::{Page, PageRequest, SortOrder};
use crate::domain::product::{
    Location, Product, ProductDraft, ProductFilter, ProductSortField, Rating,
};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// Inserts the product and records it in the seller's listings.
    async fn create_listing(&self, seller_id: Uuid, draft: ProductDraft) -> RepoResult<Product>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Product>>;
    /// Products for the given ids, in no particular order. Unknown ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Product>>;
    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> RepoResult<Page<Product>>;
    async fn update(&self, id: i64, draft: ProductDraft) -> RepoResult<Option<Product>>;
    /// Deletes the product and removes it from the seller's listings.
    async fn delete_listing(&self, id: i64, seller_id: Uuid) -> RepoResult<bool>;
    async fn increment_views(&self, id: i64) -> RepoResult<()>;
}

#[derive(Debug, FromRow)]
struct ProductRow {
    #[sqlx(rename = "productId")]
    id: i64,
    #[sqlx(rename = "sellerId")]
    seller_id: Uuid,
    title: String,
    description: String,
    #[sqlx(rename = "categoryId")]
    category_id: i64,
    images: Vec<String>,
    video: Option<String>,
    price: f64,
    unit: String,
    #[sqlx(rename = "quantityAvailable")]
    quantity_available: i64,
    location: Json<Location>,
    #[sqlx(rename = "isOrganic")]
    is_organic: bool,
    #[sqlx(rename = "harvestDate")]
    harvest_date: Option<DateTime<Utc>>,
    status: String,
    tags: Vec<String>,
    views: i64,
    buys: i64,
    #[sqlx(rename = "ratingAverage")]
    rating_average: f64,
    #[sqlx(rename = "ratingCount")]
    rating_count: i64,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepoError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: r.id,
            seller_id: r.seller_id,
            title: r.title,
            description: r.description,
            category_id: r.category_id,
            images: r.images,
            video: r.video,
            price: r.price,
            unit: r.unit.parse()?,
            quantity_available: r.quantity_available,
            location: r.location.0,
            is_organic: r.is_organic,
            harvest_date: r.harvest_date,
            status: r.status.parse()?,
            tags: r.tags,
            views: r.views,
            buys: r.buys,
            rating: Rating {
                average: r.rating_average,
                count: r.rating_count,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const COLUMNS: &str = r#""productId", "sellerId", title, description, "categoryId", images,
    video, price, unit, "quantityAvailable", location, "isOrganic", "harvestDate", status,
    tags, views, buys, "ratingAverage", "ratingCount", "createdAt", "updatedAt""#;

pub struct PgProductRepo {
    db: PgPool,
}

impl PgProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes LIKE metacharacters so search terms match literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(seller_id) = f.seller_id {
        qb.push(r#" AND "sellerId" = "#).push_bind(seller_id);
    }
    if let Some(category_id) = f.category_id {
        qb.push(r#" AND "categoryId" = "#).push_bind(category_id);
    }
    if let Some(min) = f.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = f.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(is_organic) = f.is_organic {
        qb.push(r#" AND "isOrganic" = "#).push_bind(is_organic);
    }
    if let Some(status) = f.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }

    let terms = f.search_terms();
    if !terms.is_empty() {
        qb.push(" AND (");
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let pattern = format!("%{}%", escape_like(term));
            qb.push("title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR array_to_string(tags, ' ') ILIKE ")
                .push_bind(pattern);
        }
        qb.push(")");
    }
}

fn sort_column(field: ProductSortField) -> &'static str {
    match field {
        ProductSortField::CreatedAt => r#""createdAt""#,
        ProductSortField::Price => "price",
        ProductSortField::Title => "lower(title)",
        ProductSortField::Views => "views",
        ProductSortField::Buys => "buys",
        ProductSortField::Rating => r#""ratingAverage""#,
    }
}

#[async_trait]
impl ProductRepo for PgProductRepo {
    async fn create_listing(&self, seller_id: Uuid, draft: ProductDraft) -> RepoResult<Product> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                "sellerId", title, description, "categoryId", images, video, price, unit,
                "quantityAvailable", location, "isOrganic", "harvestDate", status, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(seller_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(&draft.images)
        .bind(draft.video.as_deref())
        .bind(draft.price)
        .bind(draft.unit.as_str())
        .bind(draft.quantity_available)
        .bind(Json(&draft.location))
        .bind(draft.is_organic)
        .bind(draft.harvest_date)
        .bind(draft.status.as_str())
        .bind(&draft.tags)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        sqlx::query(
            r#"
            UPDATE users
            SET "productsListed" = array_append("productsListed", $2), "updatedAt" = now()
            WHERE "userId" = $1
            "#,
        )
        .bind(seller_id)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"SELECT {COLUMNS} FROM products WHERE "productId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"SELECT {COLUMNS} FROM products WHERE "productId" = ANY($1)"#
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> RepoResult<Page<Product>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let direction = match filter.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products"));
        push_filters(&mut select, filter);
        select.push(format!(
            r#" ORDER BY {} {direction}, "productId" {direction}"#,
            sort_column(filter.sort_by)
        ));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = select.build_query_as::<ProductRow>().fetch_all(&self.db).await?;
        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(Page::new(items, u64::try_from(total).unwrap_or(0), page))
    }

    async fn update(&self, id: i64, draft: ProductDraft) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET title = $2, description = $3, "categoryId" = $4, images = $5, video = $6,
                price = $7, unit = $8, "quantityAvailable" = $9, location = $10,
                "isOrganic" = $11, "harvestDate" = $12, status = $13, tags = $14,
                "updatedAt" = now()
            WHERE "productId" = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(&draft.images)
        .bind(draft.video.as_deref())
        .bind(draft.price)
        .bind(draft.unit.as_str())
        .bind(draft.quantity_available)
        .bind(Json(&draft.location))
        .bind(draft.is_organic)
        .bind(draft.harvest_date)
        .bind(draft.status.as_str())
        .bind(&draft.tags)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        row.map(Product::try_from).transpose()
    }

    async fn delete_listing(&self, id: i64, seller_id: Uuid) -> RepoResult<bool> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query(r#"DELETE FROM products WHERE "productId" = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE users
            SET "productsListed" = array_remove("productsListed", $2), "updatedAt" = now()
            WHERE "userId" = $1
            "#,
        )
        .bind(seller_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn increment_views(&self, id: i64) -> RepoResult<()> {
        sqlx::query(r#"UPDATE products SET views = views + 1 WHERE "productId" = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
