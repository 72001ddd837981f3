use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::{Signup, User};
use crate::error::AppError;
use crate::services::accounts::Session;
use crate::services::id_codec::IdCodec;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl From<SignupRequest> for Signup {
    fn from(r: SignupRequest) -> Self {
        Signup {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password: r.password,
            phone_number: r.phone_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The password hash never leaves the service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub products_listed: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_domain(codec: &IdCodec, u: User) -> Result<Self, AppError> {
        let products_listed = u
            .products_listed
            .iter()
            .map(|id| codec.encode(*id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone_number: u.phone_number,
            products_listed,
            created_at: u.created_at,
            updated_at: u.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn from_session(codec: &IdCodec, s: Session) -> Result<Self, AppError> {
        Ok(Self {
            token: s.token.token,
            token_type: "Bearer",
            expires_at: s.token.expires_at,
            user: UserResponse::from_domain(codec, s.user)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}
