//! Registration, login and bearer-credential resolution.
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::user::{NewUser, Signup, User, normalize_email};
use crate::domain::validation::is_blank;
use crate::error::{AppError, AppResult};
use crate::repos::error::RepoError;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::{IssuedToken, PasswordService, TokenService};

pub const EMAIL_TAKEN: &str = "Email already registered";
pub const BAD_CREDENTIALS: &str = "Invalid email or password";

/// A freshly issued credential together with the user it identifies.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: IssuedToken,
    pub user: User,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepo>, passwords: PasswordService, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    pub async fn signup(&self, signup: Signup) -> AppResult<Session> {
        let signup = signup.normalize();
        signup.validate()?;

        if self.users.find_by_email(&signup.email).await?.is_some() {
            return Err(AppError::validation(EMAIL_TAKEN));
        }

        let password_hash = self.passwords.hash(&signup.password).await?;
        let user = self
            .users
            .create(NewUser {
                id: Uuid::new_v4(),
                first_name: signup.first_name,
                last_name: signup.last_name,
                email: signup.email,
                password_hash,
                phone_number: signup.phone_number,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent signup for the same address
                RepoError::Conflict { .. } => AppError::validation(EMAIL_TAKEN),
                other => other.into(),
            })?;

        info!(user_id = %user.id, "user registered");
        self.session(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        if is_blank(email) || password.is_empty() {
            return Err(AppError::validation("Please provide email and password"));
        }

        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            warn!("login attempt for unknown email");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        };

        if !self.passwords.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        }

        self.session(user)
    }

    /// Resolves a bearer credential to the stored user.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let user_id = self.tokens.validate(token)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    fn session(&self, user: User) -> AppResult<Session> {
        let token = self.tokens.issue(user.id)?;
        Ok(Session { token, user })
    }
}
