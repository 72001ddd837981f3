/*
 * Responsibility
 * - load settings from the environment (DATABASE_URL, CORS, token and
 *   hashing parameters)
 * - validate them; anything missing or malformed fails startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::id_codec::DEFAULT_ALPHABET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {key}"),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {key}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,

    pub sqids_min_length: usize,
    pub sqids_alphabet: String,

    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
    pub token_leeway_seconds: u64,

    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print secrets
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("database_max_connections", &self.database_max_connections)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Optional numeric setting: absent means `default`, present but unparsable
/// is an error.
fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(default),
    }
}

/// Comma separated origins; every entry must be an absolute http(s) URL.
pub fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let url = url::Url::parse(s).map_err(|_| ConfigError::Invalid("CORS_ALLOWED_ORIGINS"))?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(ConfigError::Invalid("CORS_ALLOWED_ORIGINS"));
            }
            Ok(s.trim_end_matches('/').to_string())
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = parse_var("PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{port}"))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10)?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins =
            parse_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())?;

        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECONDS", 30)?);
        let body_limit_bytes = parse_var("BODY_LIMIT_BYTES", 1024 * 1024)?;

        let sqids_min_length = parse_var("SQIDS_MIN_LENGTH", 10)?;
        let sqids_alphabet =
            std::env::var("SQIDS_ALPHABET").unwrap_or_else(|_| DEFAULT_ALPHABET.to_string());

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let token_ttl_seconds = parse_var("TOKEN_TTL_SECONDS", 7 * 24 * 60 * 60)?;
        let token_leeway_seconds = parse_var("TOKEN_LEEWAY_SECONDS", 60)?;

        let password_hash_memory_kib = parse_var("PASSWORD_HASH_MEMORY_KIB", 19_456)?;
        let password_hash_iterations = parse_var("PASSWORD_HASH_ITERATIONS", 2)?;

        Ok(Self {
            addr,
            database_url,
            database_max_connections,
            app_env,
            cors_allowed_origins,
            request_timeout,
            body_limit_bytes,
            sqids_min_length,
            sqids_alphabet,
            jwt_secret,
            token_ttl_seconds,
            token_leeway_seconds,
            password_hash_memory_kib,
            password_hash_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_validated() {
        let origins = parse_origins(" http://localhost:5173 , https://shop.example/ ,").unwrap();
        assert_eq!(origins, vec!["http://localhost:5173", "https://shop.example"]);
        assert!(parse_origins("").unwrap().is_empty());
    }

    #[test]
    fn non_url_origin_is_invalid() {
        assert!(matches!(
            parse_origins("localhost:5173"),
            Err(ConfigError::Invalid("CORS_ALLOWED_ORIGINS"))
        ));
        assert!(parse_origins("ftp://files.example").is_err());
    }

    #[test]
    fn app_env_aliases() {
        assert!(AppEnv::parse("PROD").is_production());
        assert!(!AppEnv::parse("staging").is_production());
    }
}
