/*
 * Responsibility
 * - the authenticated context as handlers see it
 * - the access middleware resolves the bearer credential to a stored user
 *   and puts this type into request extensions
 */
use uuid::Uuid;

use crate::domain::user::User;

#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user: User,
}

impl AuthCtx {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}
