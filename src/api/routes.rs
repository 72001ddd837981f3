/*
 * Responsibility
 * - URL layout under /api
 * - public and protected routes are built separately; the access middleware
 *   is applied to the protected half only, then both are merged
 * - the same path may appear on both sides with different methods
 */
use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::api::handlers::{auth, categories, health::health, orders, products, reviews};
use crate::middleware::auth::access;
use crate::state::AppState;

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/categories", get(categories::list_categories))
        .route("/categories/seed", post(categories::seed_categories))
        .route("/categories/{category_id}", get(categories::get_category))
        .route("/products", get(products::list_products))
        .route("/products/{product_id}", get(products::get_product))
        .route("/products/{product_id}/reviews", get(reviews::product_reviews))
        .route("/reviews/{review_id}", get(reviews::get_review))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{category_id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/products", post(products::create_product))
        .route("/products/seller/my-products", get(products::my_products))
        .route(
            "/products/{product_id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route(
            "/orders/{order_id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/orders/{order_id}/status", patch(orders::update_order_status))
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/{review_id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/reviews/{review_id}/response", post(reviews::respond_to_review))
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = access::apply(protected_routes(), state);
    public_routes().merge(protected)
}
