pub mod factory;
pub mod password;
pub mod token_service;

pub use factory::{build_password_service, build_token_service};
pub use password::{PasswordError, PasswordService};
pub use token_service::{IssuedToken, TokenError, TokenService};
