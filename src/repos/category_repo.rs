use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::domain::category::{Category, CategoryDraft};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn create(&self, draft: CategoryDraft) -> RepoResult<Category>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>>;
    /// Missing ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Category>>;
    /// Case-insensitive.
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    /// Sorted by name.
    async fn list(&self, active: Option<bool>) -> RepoResult<Vec<Category>>;
    async fn update(&self, id: i64, draft: CategoryDraft) -> RepoResult<Option<Category>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    #[sqlx(rename = "categoryId")]
    id: i64,
    name: String,
    description: Option<String>,
    image: Option<String>,
    #[sqlx(rename = "parentId")]
    parent_id: Option<i64>,
    #[sqlx(rename = "isActive")]
    is_active: bool,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category {
            id: r.id,
            name: r.name,
            description: r.description,
            image: r.image,
            parent_id: r.parent_id,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const COLUMNS: &str =
    r#""categoryId", name, description, image, "parentId", "isActive", "createdAt", "updatedAt""#;

pub struct PgCategoryRepo {
    db: PgPool,
}

impl PgCategoryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn create(&self, draft: CategoryDraft) -> RepoResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            INSERT INTO categories (name, description, image, "parentId", "isActive")
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(draft.description.as_deref())
        .bind(draft.image.as_deref())
        .bind(draft.parent_id)
        .bind(draft.is_active)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"SELECT {COLUMNS} FROM categories WHERE "categoryId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"SELECT {COLUMNS} FROM categories WHERE "categoryId" = ANY($1)"#
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"SELECT {COLUMNS} FROM categories WHERE lower(name) = lower($1)"#
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn list(&self, active: Option<bool>) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM categories
            WHERE $1::BOOLEAN IS NULL OR "isActive" = $1
            ORDER BY lower(name) ASC, "categoryId" ASC
            "#
        ))
        .bind(active)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(&self, id: i64, draft: CategoryDraft) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE categories
            SET name = $2, description = $3, image = $4, "parentId" = $5,
                "isActive" = $6, "updatedAt" = now()
            WHERE "categoryId" = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(draft.description.as_deref())
        .bind(draft.image.as_deref())
        .bind(draft.parent_id)
        .bind(draft.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.map(Category::from))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(r#"DELETE FROM categories WHERE "categoryId" = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(RepoError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}
