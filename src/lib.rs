/*
 * Responsibility
 * - module tree of the marketplace API
 * - exposed as a library so integration tests can build the router
 */
pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
