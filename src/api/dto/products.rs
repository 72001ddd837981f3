use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::categories::CategorySummary;
use crate::api::dto::double_option;
use crate::api::dto::pagination::PaginationMeta;
use crate::api::extractors::public_id::PublicCategoryId;
use crate::domain::pagination::{Page, SortOrder};
use crate::domain::product::{
    Location, ProductDraft, ProductFilter, ProductListing, ProductPatch, ProductStatus, Rating,
    Unit,
};
use crate::domain::user::User;
use crate::error::AppError;
use crate::services::id_codec::IdCodec;

fn parse_or_400<T: std::str::FromStr>(value: Option<&str>, what: &str) -> Result<Option<T>, AppError> {
    value
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::validation(format!("Invalid {what}: {v}")))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub is_organic: Option<bool>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ProductListQuery {
    /// Listing defaults to available products.
    pub fn to_filter(&self, codec: &IdCodec) -> Result<ProductFilter, AppError> {
        let category_id = self
            .category
            .as_deref()
            .map(|c| PublicCategoryId::decode(codec, c))
            .transpose()?;

        Ok(ProductFilter {
            seller_id: None,
            category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            is_organic: self.is_organic,
            status: Some(
                parse_or_400(self.status.as_deref(), "status")?.unwrap_or(ProductStatus::Available),
            ),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort_by: parse_or_400(self.sort_by.as_deref(), "sortBy")?.unwrap_or_default(),
            sort_order: parse_or_400::<SortOrder>(self.sort_order.as_deref(), "sortOrder")?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MyProductsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

impl MyProductsQuery {
    pub fn status(&self) -> Result<Option<ProductStatus>, AppError> {
        parse_or_400(self.status.as_deref(), "status")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub video: Option<String>,
    pub price: f64,
    pub unit: Unit,
    #[serde(default)]
    pub quantity_available: i64,
    pub location: Location,
    #[serde(default)]
    pub is_organic: bool,
    pub harvest_date: Option<DateTime<Utc>>,
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateProductRequest {
    pub fn into_draft(self, codec: &IdCodec) -> Result<ProductDraft, AppError> {
        Ok(ProductDraft {
            title: self.title,
            description: self.description,
            category_id: PublicCategoryId::decode(codec, &self.category)?,
            images: self.images,
            video: self.video,
            price: self.price,
            unit: self.unit,
            quantity_available: self.quantity_available,
            location: self.location,
            is_organic: self.is_organic,
            harvest_date: self.harvest_date,
            status: self.status.unwrap_or_default(),
            tags: self.tags,
        })
    }
}

/// Allow-listed update. Anything else in the body, `seller` included, is
/// ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video: Option<Option<String>>,
    pub price: Option<f64>,
    pub unit: Option<Unit>,
    pub quantity_available: Option<i64>,
    pub location: Option<Location>,
    pub is_organic: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub harvest_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ProductStatus>,
    pub tags: Option<Vec<String>>,
}

impl UpdateProductRequest {
    pub fn into_patch(self, codec: &IdCodec) -> Result<ProductPatch, AppError> {
        Ok(ProductPatch {
            title: self.title,
            description: self.description,
            category_id: self
                .category
                .as_deref()
                .map(|c| PublicCategoryId::decode(codec, c))
                .transpose()?,
            images: self.images,
            video: self.video,
            price: self.price,
            unit: self.unit,
            quantity_available: self.quantity_available,
            location: self.location,
            is_organic: self.is_organic,
            harvest_date: self.harvest_date,
            status: self.status,
            tags: self.tags,
        })
    }
}

/// The seller as shown on a listing. Contact details only appear on the
/// product detail view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl SellerSummary {
    fn of(user: User, contact: bool) -> Self {
        let (email, phone_number) = if contact {
            (Some(user.email), user.phone_number)
        } else {
            (None, None)
        };
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email,
            phone_number,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub seller: SellerSummary,
    pub title: String,
    pub description: String,
    pub category: CategorySummary,
    pub images: Vec<String>,
    pub video: Option<String>,
    pub price: f64,
    pub unit: Unit,
    pub quantity_available: i64,
    pub location: Location,
    pub is_organic: bool,
    pub harvest_date: Option<DateTime<Utc>>,
    pub status: ProductStatus,
    pub tags: Vec<String>,
    pub views: i64,
    pub buys: i64,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    /// Seller names and category name, as used in lists and write responses.
    pub fn summary(codec: &IdCodec, listing: ProductListing) -> Result<Self, AppError> {
        Self::build(codec, listing, false)
    }

    /// Adds seller contact details and the category description.
    pub fn detailed(codec: &IdCodec, listing: ProductListing) -> Result<Self, AppError> {
        Self::build(codec, listing, true)
    }

    fn build(codec: &IdCodec, listing: ProductListing, detail: bool) -> Result<Self, AppError> {
        let ProductListing {
            product: p,
            seller,
            category,
        } = listing;
        let category = if detail {
            CategorySummary::with_description(codec, &category)?
        } else {
            CategorySummary::name_only(codec, &category)?
        };
        Ok(Self {
            id: codec.encode(p.id)?,
            seller: SellerSummary::of(seller, detail),
            title: p.title,
            description: p.description,
            category,
            images: p.images,
            video: p.video,
            price: p.price,
            unit: p.unit,
            quantity_available: p.quantity_available,
            location: p.location,
            is_organic: p.is_organic,
            harvest_date: p.harvest_date,
            status: p.status,
            tags: p.tags,
            views: p.views,
            buys: p.buys,
            rating: p.rating,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProductData {
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductResponse>,
    pub pagination: PaginationMeta,
}

impl ProductList {
    pub fn from_page(codec: &IdCodec, page: Page<ProductListing>) -> Result<Self, AppError> {
        let pagination = PaginationMeta::of(&page);
        let page = page.try_map(|x| ProductResponse::summary(codec, x))?;
        Ok(Self {
            products: page.items,
            pagination,
        })
    }
}
