/*
 * Responsibility
 * - public interface of the middleware layers
 * - auth is applied per router, the rest to the whole app
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
