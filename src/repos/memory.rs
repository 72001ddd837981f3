//! In-process store implementing every repository trait.
//!
//! All tables sit behind one async mutex, so each call observes and leaves a
//! consistent snapshot. Multi-record writes happen under a single lock
//! acquisition, which gives them the same all-or-nothing shape as the
//! Postgres transactions.
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::category::{Category, CategoryDraft};
use crate::domain::order::{
    NewOrder, Order, OrderDetails, OrderFilter, OrderItem, OrderStatus, PaymentStatus,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::product::{Product, ProductDraft, ProductFilter, ProductStatus, Rating};
use crate::domain::review::{NewReview, Review, ReviewContent, SellerResponse};
use crate::domain::user::{NewUser, User};
use crate::repos::category_repo::CategoryRepo;
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::order_repo::OrderRepo;
use crate::repos::product_repo::ProductRepo;
use crate::repos::review_repo::ReviewRepo;
use crate::repos::user_repo::UserRepo;

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    reviews: BTreeMap<i64, Review>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn recompute_rating(&mut self, product_id: i64) {
        let rating = Rating::from_scores(
            self.reviews
                .values()
                .filter(|r| r.product_id == product_id)
                .map(|r| r.rating),
        );
        if let Some(product) = self.products.get_mut(&product_id) {
            product.rating = rating;
        }
    }

    /// Takes every item's quantity out of stock, or nothing at all.
    fn reserve_stock(&mut self, items: &[OrderItem]) -> RepoResult<()> {
        for item in items {
            let enough = self.products.get(&item.product_id).is_some_and(|p| {
                p.status == ProductStatus::Available && p.quantity_available >= item.quantity
            });
            if !enough {
                return Err(RepoError::OutOfStock {
                    product_id: item.product_id,
                });
            }
        }
        for item in items {
            if let Some(product) = self.products.get_mut(&item.product_id) {
                product.quantity_available -= item.quantity;
                product.buys += item.quantity;
            }
        }
        Ok(())
    }

    fn release_stock(&mut self, items: &[OrderItem]) {
        for item in items {
            if let Some(product) = self.products.get_mut(&item.product_id) {
                product.quantity_available += item.quantity;
                product.buys = (product.buys - item.quantity).max(0);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; equal timestamps fall back to the most recent id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict { field: "Email" });
        }
        let now = Utc::now();
        let user = User {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            phone_number: user.phone_number,
            products_listed: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(ids.iter().filter_map(|id| t.users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn create(&self, draft: CategoryDraft) -> RepoResult<Category> {
        let mut t = self.tables.lock().await;
        if t.categories
            .values()
            .any(|c| c.name.to_lowercase() == draft.name.to_lowercase())
        {
            return Err(RepoError::Conflict { field: "Category" });
        }
        let now = Utc::now();
        let id = t.next_id();
        let category = Category {
            id,
            name: draft.name,
            description: draft.description,
            image: draft.image,
            parent_id: draft.parent_id,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        t.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Category>> {
        let t = self.tables.lock().await;
        Ok(ids.iter().filter_map(|id| t.categories.get(id).cloned()).collect())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let t = self.tables.lock().await;
        let name = name.to_lowercase();
        Ok(t.categories
            .values()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn list(&self, active: Option<bool>) -> RepoResult<Vec<Category>> {
        let t = self.tables.lock().await;
        let mut items: Vec<Category> = t
            .categories
            .values()
            .filter(|c| active.is_none_or(|a| c.is_active == a))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(items)
    }

    async fn update(&self, id: i64, draft: CategoryDraft) -> RepoResult<Option<Category>> {
        let mut t = self.tables.lock().await;
        let name = draft.name.to_lowercase();
        if t.categories
            .values()
            .any(|c| c.id != id && c.name.to_lowercase() == name)
        {
            return Err(RepoError::Conflict { field: "Category" });
        }
        let Some(category) = t.categories.get_mut(&id) else {
            return Ok(None);
        };
        category.name = draft.name;
        category.description = draft.description;
        category.image = draft.image;
        category.parent_id = draft.parent_id;
        category.is_active = draft.is_active;
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut t = self.tables.lock().await;
        if t.products.values().any(|p| p.category_id == id) {
            return Err(RepoError::InUse);
        }
        if t.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for child in t.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn create_listing(&self, seller_id: Uuid, draft: ProductDraft) -> RepoResult<Product> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let id = t.next_id();
        let product = Product {
            id,
            seller_id,
            title: draft.title,
            description: draft.description,
            category_id: draft.category_id,
            images: draft.images,
            video: draft.video,
            price: draft.price,
            unit: draft.unit,
            quantity_available: draft.quantity_available,
            location: draft.location,
            is_organic: draft.is_organic,
            harvest_date: draft.harvest_date,
            status: draft.status,
            tags: draft.tags,
            views: 0,
            buys: 0,
            rating: Rating::default(),
            created_at: now,
            updated_at: now,
        };
        t.products.insert(id, product.clone());
        if let Some(seller) = t.users.get_mut(&seller_id) {
            seller.products_listed.push(id);
            seller.updated_at = now;
        }
        Ok(product)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Product>> {
        let t = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.products.get(id).cloned())
            .collect())
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> RepoResult<Page<Product>> {
        let t = self.tables.lock().await;
        let mut items: Vec<Product> = t
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        items.sort_by(|a, b| filter.compare(a, b));
        Ok(Page::from_sorted(items, page))
    }

    async fn update(&self, id: i64, draft: ProductDraft) -> RepoResult<Option<Product>> {
        let mut t = self.tables.lock().await;
        let Some(p) = t.products.get_mut(&id) else {
            return Ok(None);
        };
        p.title = draft.title;
        p.description = draft.description;
        p.category_id = draft.category_id;
        p.images = draft.images;
        p.video = draft.video;
        p.price = draft.price;
        p.unit = draft.unit;
        p.quantity_available = draft.quantity_available;
        p.location = draft.location;
        p.is_organic = draft.is_organic;
        p.harvest_date = draft.harvest_date;
        p.status = draft.status;
        p.tags = draft.tags;
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    async fn delete_listing(&self, id: i64, seller_id: Uuid) -> RepoResult<bool> {
        let mut t = self.tables.lock().await;
        if t.products.remove(&id).is_none() {
            return Ok(false);
        }
        t.reviews.retain(|_, r| r.product_id != id);
        if let Some(seller) = t.users.get_mut(&seller_id) {
            seller.products_listed.retain(|listed| *listed != id);
            seller.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn increment_views(&self, id: i64) -> RepoResult<()> {
        if let Some(p) = self.tables.lock().await.products.get_mut(&id) {
            p.views += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn create(&self, order: NewOrder) -> RepoResult<Order> {
        let mut t = self.tables.lock().await;
        if t.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(RepoError::Conflict {
                field: "Order number",
            });
        }
        t.reserve_stock(&order.items)?;
        let now = Utc::now();
        let id = t.next_id();
        let order = Order {
            id,
            order_number: order.order_number,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            items: order.items,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            delivery_address: order.delivery_address,
            delivery_type: order.delivery_type,
            delivery_date: order.delivery_date,
            notes: order.notes,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };
        t.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> RepoResult<Page<Order>> {
        let t = self.tables.lock().await;
        let mut items: Vec<Order> = t
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        newest_first(&mut items, |o| (o.created_at, o.id));
        Ok(Page::from_sorted(items, page))
    }

    async fn update_details(&self, id: i64, details: &OrderDetails) -> RepoResult<Option<Order>> {
        let mut t = self.tables.lock().await;
        let Some(order) = t
            .orders
            .get_mut(&id)
            .filter(|o| o.status == OrderStatus::Pending)
        else {
            return Ok(None);
        };
        order.notes = details.notes.clone();
        order.delivery_date = details.delivery_date;
        order.delivery_address = details.delivery_address.clone();
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> RepoResult<Option<Order>> {
        let mut t = self.tables.lock().await;
        let Some(order) = t.orders.get_mut(&id).filter(|o| o.status == from) else {
            return Ok(None);
        };
        order.status = to;
        if let Some(reason) = cancel_reason {
            order.cancel_reason = Some(reason.to_string());
        }
        order.updated_at = Utc::now();
        let order = order.clone();
        if to == OrderStatus::Cancelled {
            t.release_stock(&order.items);
        }
        Ok(Some(order))
    }

    async fn delete_if(&self, id: i64, statuses: &[OrderStatus]) -> RepoResult<bool> {
        let mut t = self.tables.lock().await;
        let deletable = t
            .orders
            .get(&id)
            .is_some_and(|o| statuses.contains(&o.status));
        if !deletable {
            return Ok(false);
        }
        if let Some(order) = t.orders.remove(&id) {
            // cancelled orders already gave their stock back
            if order.status != OrderStatus::Cancelled {
                t.release_stock(&order.items);
            }
        }
        t.reviews.retain(|_, r| r.order_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ReviewRepo for MemoryStore {
    async fn create(&self, review: NewReview) -> RepoResult<Review> {
        let mut t = self.tables.lock().await;
        if t.reviews
            .values()
            .any(|r| r.order_id == review.order_id && r.product_id == review.product_id)
        {
            return Err(RepoError::Conflict { field: "Review" });
        }
        if !t.products.contains_key(&review.product_id) {
            return Err(RepoError::InUse);
        }
        let now = Utc::now();
        let id = t.next_id();
        let review = Review {
            id,
            order_id: review.order_id,
            product_id: review.product_id,
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.content.rating,
            comment: review.content.comment,
            images: review.content.images,
            response: None,
            is_verified_purchase: true,
            created_at: now,
            updated_at: now,
        };
        t.reviews.insert(id, review.clone());
        t.recompute_rating(review.product_id);
        Ok(review)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Review>> {
        Ok(self.tables.lock().await.reviews.get(&id).cloned())
    }

    async fn list_for_product(
        &self,
        product_id: i64,
        page: PageRequest,
    ) -> RepoResult<Page<Review>> {
        let t = self.tables.lock().await;
        let mut items: Vec<Review> = t
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        newest_first(&mut items, |r| (r.created_at, r.id));
        Ok(Page::from_sorted(items, page))
    }

    async fn update_content(
        &self,
        id: i64,
        content: &ReviewContent,
    ) -> RepoResult<Option<Review>> {
        let mut t = self.tables.lock().await;
        let Some(review) = t.reviews.get_mut(&id) else {
            return Ok(None);
        };
        review.rating = content.rating;
        review.comment = content.comment.clone();
        review.images = content.images.clone();
        review.updated_at = Utc::now();
        let review = review.clone();
        t.recompute_rating(review.product_id);
        Ok(Some(review))
    }

    async fn set_response(&self, id: i64, response: SellerResponse) -> RepoResult<Option<Review>> {
        let mut t = self.tables.lock().await;
        let Some(review) = t.reviews.get_mut(&id) else {
            return Ok(None);
        };
        review.response = Some(response);
        review.updated_at = Utc::now();
        Ok(Some(review.clone()))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(review) = t.reviews.remove(&id) else {
            return Ok(false);
        };
        t.recompute_rating(review.product_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::tests::draft;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        UserRepo::create(&store, new_user("a@b.co")).await.unwrap();
        let err = UserRepo::create(&store, new_user("a@b.co")).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict { field: "Email" }));
    }

    #[tokio::test]
    async fn listing_set_follows_create_and_delete() {
        let store = MemoryStore::new();
        let seller = UserRepo::create(&store, new_user("s@b.co")).await.unwrap();

        let a = store.create_listing(seller.id, draft()).await.unwrap();
        let b = store.create_listing(seller.id, draft()).await.unwrap();
        let listed = UserRepo::find_by_id(&store, seller.id).await.unwrap().unwrap();
        assert_eq!(listed.products_listed, vec![a.id, b.id]);

        assert!(store.delete_listing(a.id, seller.id).await.unwrap());
        let listed = UserRepo::find_by_id(&store, seller.id).await.unwrap().unwrap();
        assert_eq!(listed.products_listed, vec![b.id]);
        assert!(!store.delete_listing(a.id, seller.id).await.unwrap());
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() {
        let store = MemoryStore::new();
        let seller = UserRepo::create(&store, new_user("s@b.co")).await.unwrap();
        let cat = CategoryRepo::create(&store, CategoryDraft::named("Fruits", "Sweet"))
            .await
            .unwrap();
        let mut d = draft();
        d.category_id = cat.id;
        store.create_listing(seller.id, d).await.unwrap();

        let err = CategoryRepo::delete(&store, cat.id).await.unwrap_err();
        assert!(matches!(err, RepoError::InUse));
    }

    #[tokio::test]
    async fn category_names_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        CategoryRepo::create(&store, CategoryDraft::named("Herbs", "Green"))
            .await
            .unwrap();
        let err = CategoryRepo::create(&store, CategoryDraft::named("HERBS", "Again"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Category already exists");
    }

    #[tokio::test]
    async fn review_of_a_removed_product_is_refused() {
        let store = MemoryStore::new();
        let seller = UserRepo::create(&store, new_user("s@b.co")).await.unwrap();
        let product = store.create_listing(seller.id, draft()).await.unwrap();
        store.delete_listing(product.id, seller.id).await.unwrap();

        let err = ReviewRepo::create(
            &store,
            NewReview {
                order_id: 1,
                product_id: product.id,
                reviewer_id: Uuid::new_v4(),
                reviewee_id: seller.id,
                content: ReviewContent {
                    rating: 4,
                    ..ReviewContent::default()
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::InUse));
    }
}
