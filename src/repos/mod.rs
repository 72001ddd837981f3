/*
 * Responsibility
 * - storage seams used by the services
 * - Repos bundles one handle per table; built explicitly and injected
 */
use std::sync::Arc;

use sqlx::PgPool;

pub mod category_repo;
pub mod error;
pub mod memory;
pub mod order_repo;
pub mod product_repo;
pub mod review_repo;
pub mod user_repo;

use category_repo::{CategoryRepo, PgCategoryRepo};
use memory::MemoryStore;
use order_repo::{OrderRepo, PgOrderRepo};
use product_repo::{PgProductRepo, ProductRepo};
use review_repo::{PgReviewRepo, ReviewRepo};
use user_repo::{PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub categories: Arc<dyn CategoryRepo>,
    pub products: Arc<dyn ProductRepo>,
    pub orders: Arc<dyn OrderRepo>,
    pub reviews: Arc<dyn ReviewRepo>,
}

impl Repos {
    pub fn postgres(db: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepo::new(db.clone())),
            categories: Arc::new(PgCategoryRepo::new(db.clone())),
            products: Arc::new(PgProductRepo::new(db.clone())),
            orders: Arc::new(PgOrderRepo::new(db.clone())),
            reviews: Arc::new(PgReviewRepo::new(db)),
        }
    }

    /// Every handle points at the same store.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            orders: store.clone(),
            reviews: store,
        }
    }
}
