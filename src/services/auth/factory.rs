/// Factories: build the credential services from application `Config`.
use std::sync::Arc;

use tracing::error;

use crate::config::Config;
use crate::services::auth::{PasswordService, TokenService};

pub fn build_token_service(config: &Config) -> anyhow::Result<Arc<TokenService>> {
    let tokens = TokenService::new(
        &config.jwt_secret,
        config.token_ttl_seconds,
        config.token_leeway_seconds,
    )
    .map_err(|e| {
        error!(error = %e, "failed to build token service");
        e
    })?;

    Ok(Arc::new(tokens))
}

pub fn build_password_service(config: &Config) -> anyhow::Result<PasswordService> {
    let passwords =
        PasswordService::new(config.password_hash_memory_kib, config.password_hash_iterations)
            .map_err(|e| {
                error!(error = %e, "failed to build password service");
                e
            })?;

    Ok(passwords)
}
