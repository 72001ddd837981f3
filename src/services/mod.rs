pub mod accounts;
pub mod auth;
pub mod categories;
pub mod id_codec;
pub mod orders;
pub mod products;
pub mod reviews;
