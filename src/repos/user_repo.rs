/*
 * Responsibility
 * - users table access
 * - email uniqueness is enforced by users_email_key
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::user::{NewUser, User};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Missing ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>>;
    /// Expects an already normalized (lowercase) email.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    #[sqlx(rename = "userId")]
    id: Uuid,
    #[sqlx(rename = "firstName")]
    first_name: String,
    #[sqlx(rename = "lastName")]
    last_name: String,
    email: String,
    #[sqlx(rename = "passwordHash")]
    password_hash: String,
    #[sqlx(rename = "phoneNumber")]
    phone_number: Option<String>,
    #[sqlx(rename = "productsListed")]
    products_listed: Vec<i64>,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password_hash: r.password_hash,
            phone_number: r.phone_number,
            products_listed: r.products_listed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const COLUMNS: &str = r#""userId", "firstName", "lastName", email, "passwordHash",
    "phoneNumber", "productsListed", "createdAt", "updatedAt""#;

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users ("userId", "firstName", "lastName", email, "passwordHash", "phoneNumber")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.phone_number.as_deref())
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE "userId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE "userId" = ANY($1)"#
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }
}
