/*
 * Responsibility
 * - the shared context bound to the Router (AppState)
 * - Clone is cheap: every member is an Arc or wraps Arcs
 */
use std::sync::Arc;

use crate::config::Config;
use crate::repos::Repos;
use crate::services::accounts::AccountService;
use crate::services::auth::{PasswordService, TokenService, build_password_service, build_token_service};
use crate::services::categories::CategoryService;
use crate::services::id_codec::IdCodec;
use crate::services::orders::OrderService;
use crate::services::products::ProductService;
use crate::services::reviews::ReviewService;

#[derive(Clone)]
pub struct AppState {
    pub id_codec: IdCodec,
    pub tokens: Arc<TokenService>,
    pub accounts: AccountService,
    pub categories: CategoryService,
    pub products: ProductService,
    pub orders: OrderService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(
        repos: Repos,
        id_codec: IdCodec,
        tokens: Arc<TokenService>,
        passwords: PasswordService,
    ) -> Self {
        Self {
            id_codec,
            accounts: AccountService::new(repos.users.clone(), passwords, tokens.clone()),
            categories: CategoryService::new(repos.categories.clone()),
            products: ProductService::new(
                repos.products.clone(),
                repos.categories.clone(),
                repos.users.clone(),
            ),
            orders: OrderService::new(repos.orders.clone(), repos.products.clone()),
            reviews: ReviewService::new(repos.reviews, repos.orders, repos.products),
            tokens,
        }
    }

    pub fn from_config(config: &Config, repos: Repos) -> anyhow::Result<Self> {
        let id_codec = IdCodec::new(config.sqids_min_length, &config.sqids_alphabet)?;
        let tokens = build_token_service(config)?;
        let passwords = build_password_service(config)?;
        Ok(Self::new(repos, id_codec, tokens, passwords))
    }
}
