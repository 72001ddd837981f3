//! Product listings. The seller is fixed at creation and every mutation is
//! checked against it. Reads come back as [`ProductListing`]s with the seller
//! and category attached.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::ownership::Owned;
use crate::domain::pagination::{Page, PageRequest, SortOrder};
use crate::domain::product::{
    Product, ProductDraft, ProductFilter, ProductListing, ProductPatch, ProductSortField,
    ProductStatus,
};
use crate::error::{AppError, AppResult};
use crate::repos::category_repo::CategoryRepo;
use crate::repos::error::RepoError;
use crate::repos::product_repo::ProductRepo;
use crate::repos::user_repo::UserRepo;

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepo>,
    categories: Arc<dyn CategoryRepo>,
    users: Arc<dyn UserRepo>,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductRepo>,
        categories: Arc<dyn CategoryRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            products,
            categories,
            users,
        }
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> AppResult<Page<ProductListing>> {
        let page = self.products.list(filter, page).await?;
        self.resolve_page(page).await
    }

    /// Returns the product as stored, then counts the view.
    pub async fn get(&self, id: i64) -> AppResult<ProductListing> {
        let product = self.find(id).await?;
        if let Err(e) = self.products.increment_views(id).await {
            warn!(product_id = id, error = ?e, "failed to record product view");
        }
        self.resolve_one(product).await
    }

    pub async fn my_products(
        &self,
        seller_id: Uuid,
        status: Option<ProductStatus>,
        page: PageRequest,
    ) -> AppResult<Page<ProductListing>> {
        let filter = ProductFilter {
            seller_id: Some(seller_id),
            status,
            sort_by: ProductSortField::CreatedAt,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let page = self.products.list(&filter, page).await?;
        self.resolve_page(page).await
    }

    pub async fn create(&self, seller_id: Uuid, draft: ProductDraft) -> AppResult<ProductListing> {
        let draft = draft.normalize();
        draft.validate()?;
        self.check_category(draft.category_id).await?;

        let product = self.products.create_listing(seller_id, draft).await?;
        info!(product_id = product.id, seller_id = %seller_id, "product listed");
        self.resolve_one(product).await
    }

    pub async fn update(
        &self,
        actor: Uuid,
        id: i64,
        patch: ProductPatch,
    ) -> AppResult<ProductListing> {
        let current = self.find(id).await?;
        current.ensure_owned_by(actor, "update")?;

        let draft = patch.apply(current.draft()).normalize();
        draft.validate()?;
        if draft.category_id != current.category_id {
            self.check_category(draft.category_id).await?;
        }

        let updated = self
            .products
            .update(id, draft)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        self.resolve_one(updated).await
    }

    pub async fn delete(&self, actor: Uuid, id: i64) -> AppResult<()> {
        let current = self.find(id).await?;
        current.ensure_owned_by(actor, "delete")?;

        if !self.products.delete_listing(id, current.seller_id).await? {
            return Err(AppError::not_found("Product"));
        }
        info!(product_id = id, seller_id = %current.seller_id, "product deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> AppResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))
    }

    /// Attaches sellers and categories with one batch lookup each.
    async fn resolve(&self, products: Vec<Product>) -> AppResult<Vec<ProductListing>> {
        let mut seller_ids: Vec<Uuid> = products.iter().map(|p| p.seller_id).collect();
        seller_ids.sort_unstable();
        seller_ids.dedup();
        let mut category_ids: Vec<i64> = products.iter().map(|p| p.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        let sellers: HashMap<_, _> = self
            .users
            .find_many(&seller_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let categories: HashMap<_, _> = self
            .categories
            .find_many(&category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        products
            .into_iter()
            .map(|product| -> AppResult<ProductListing> {
                let seller = sellers.get(&product.seller_id).cloned().ok_or_else(|| {
                    RepoError::Corrupt(format!("product {} has no seller", product.id))
                })?;
                let category = categories.get(&product.category_id).cloned().ok_or_else(|| {
                    RepoError::Corrupt(format!("product {} has no category", product.id))
                })?;
                Ok(ProductListing {
                    product,
                    seller,
                    category,
                })
            })
            .collect()
    }

    async fn resolve_page(&self, page: Page<Product>) -> AppResult<Page<ProductListing>> {
        let Page {
            items,
            total,
            request,
        } = page;
        Ok(Page::new(self.resolve(items).await?, total, request))
    }

    async fn resolve_one(&self, product: Product) -> AppResult<ProductListing> {
        self.resolve(vec![product])
            .await?
            .pop()
            .ok_or(AppError::Internal)
    }

    async fn check_category(&self, category_id: i64) -> AppResult<()> {
        match self.categories.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation("Category not found")),
        }
    }
}
