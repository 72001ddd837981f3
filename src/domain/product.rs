use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::category::Category;
use crate::domain::ownership::Owned;
use crate::domain::pagination::SortOrder;
use crate::domain::user::User;
use crate::domain::validation::{ValidationError, Violations, char_len, is_blank, trim_optional};
use crate::domain::{UnknownVariant, round2};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_IMAGES: usize = 10;
pub const MAX_TAGS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    Lbs,
    Dozen,
    Piece,
    Bunch,
    Bag,
    Box,
    Liter,
}

impl Unit {
    pub const ALL: [Unit; 8] = [
        Unit::Kg,
        Unit::Lbs,
        Unit::Dozen,
        Unit::Piece,
        Unit::Bunch,
        Unit::Bag,
        Unit::Box,
        Unit::Liter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::Lbs => "lbs",
            Unit::Dozen => "dozen",
            Unit::Piece => "piece",
            Unit::Bunch => "bunch",
            Unit::Bag => "bag",
            Unit::Box => "box",
            Unit::Liter => "liter",
        }
    }
}

impl FromStr for Unit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("unit", s))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    #[default]
    Available,
    OutOfStock,
    Removed,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::OutOfStock => "out-of-stock",
            ProductStatus::Removed => "removed",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "out-of-stock" => Ok(Self::OutOfStock),
            "removed" => Ok(Self::Removed),
            other => Err(UnknownVariant::new("product status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rating {
    pub average: f64,
    pub count: i64,
}

impl Rating {
    pub fn from_scores(scores: impl IntoIterator<Item = i32>) -> Self {
        let (sum, count) = scores
            .into_iter()
            .fold((0i64, 0i64), |(sum, count), s| (sum + i64::from(s), count + 1));
        if count == 0 {
            return Self::default();
        }
        Self {
            average: round2(sum as f64 / count as f64),
            count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: i64,
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

impl Product {
    /// The seller-editable part of the record.
    pub fn draft(&self) -> ProductDraft {
        ProductDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            images: self.images.clone(),
            video: self.video.clone(),
            price: self.price,
            unit: self.unit,
            quantity_available: self.quantity_available,
            location: self.location.clone(),
            is_organic: self.is_organic,
            harvest_date: self.harvest_date,
            status: self.status,
            tags: self.tags.clone(),
        }
    }
}

impl Owned for Product {
    const RESOURCE: &'static str = "product";

    fn owner_id(&self) -> Uuid {
        self.seller_id
    }
}

/// A product together with the seller and category records it points at.
#[derive(Debug, Clone)]
pub struct ProductListing {
    pub product: Product,
    pub seller: User,
    pub category: Category,
}

/// Everything a seller may set on a listing. The seller itself is not part
/// of the draft, so no write path can reassign ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub category_id: i64,
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
}

impl ProductDraft {
    pub fn normalize(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.images = self.images.iter().map(|i| i.trim().to_string()).collect();
        self.video = trim_optional(self.video);
        self.location.address = self.location.address.trim().to_string();
        self.location.city = self.location.city.trim().to_string();
        self.location.state = self.location.state.trim().to_string();

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().map(|t| t.trim()) {
            if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();

        v.check(!is_blank(&self.title), "Product title is required");
        v.check(
            char_len(&self.title) <= MAX_TITLE_LEN,
            format!("Title cannot exceed {MAX_TITLE_LEN} characters"),
        );
        v.check(!is_blank(&self.description), "Product description is required");
        v.check(
            char_len(&self.description) <= MAX_DESCRIPTION_LEN,
            format!("Description cannot exceed {MAX_DESCRIPTION_LEN} characters"),
        );

        v.check(
            (1..=MAX_IMAGES).contains(&self.images.len()),
            format!("Product must have between 1 and {MAX_IMAGES} images"),
        );
        v.check(
            self.images.iter().all(|i| !is_blank(i)),
            "Image URLs cannot be empty",
        );

        if self.price.is_finite() {
            v.check(self.price >= 0.0, "Price cannot be negative");
        } else {
            v.push("Price must be a number");
        }
        v.check(self.quantity_available >= 0, "Quantity cannot be negative");

        v.check(!is_blank(&self.location.address), "Location address is required");
        v.check(!is_blank(&self.location.city), "Location city is required");
        v.check(!is_blank(&self.location.state), "Location state is required");
        if let Some(c) = self.location.coordinates {
            v.check(
                (-90.0..=90.0).contains(&c.latitude),
                "Latitude must be between -90 and 90",
            );
            v.check(
                (-180.0..=180.0).contains(&c.longitude),
                "Longitude must be between -180 and 180",
            );
        }

        v.check(
            self.tags.len() <= MAX_TAGS,
            format!("A product cannot have more than {MAX_TAGS} tags"),
        );

        v.finish()
    }
}

/// Allow-listed product update. Fields absent from the request stay `None`
/// and keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub images: Option<Vec<String>>,
    pub video: Option<Option<String>>,
    pub price: Option<f64>,
    pub unit: Option<Unit>,
    pub quantity_available: Option<i64>,
    pub location: Option<Location>,
    pub is_organic: Option<bool>,
    pub harvest_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ProductStatus>,
    pub tags: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn apply(self, mut draft: ProductDraft) -> ProductDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(category_id) = self.category_id {
            draft.category_id = category_id;
        }
        if let Some(images) = self.images {
            draft.images = images;
        }
        if let Some(video) = self.video {
            draft.video = video;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(unit) = self.unit {
            draft.unit = unit;
        }
        if let Some(quantity) = self.quantity_available {
            draft.quantity_available = quantity;
        }
        if let Some(location) = self.location {
            draft.location = location;
        }
        if let Some(is_organic) = self.is_organic {
            draft.is_organic = is_organic;
        }
        if let Some(harvest_date) = self.harvest_date {
            draft.harvest_date = harvest_date;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(tags) = self.tags {
            draft.tags = tags;
        }
        draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSortField {
    #[default]
    CreatedAt,
    Price,
    Title,
    Views,
    Buys,
    Rating,
}

impl FromStr for ProductSortField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "title" => Ok(Self::Title),
            "views" => Ok(Self::Views),
            "buys" => Ok(Self::Buys),
            "rating" => Ok(Self::Rating),
            other => Err(UnknownVariant::new("sort field", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub seller_id: Option<Uuid>,
    pub category_id: Option<i64>,
    /// Inclusive lower bound.
    pub min_price: Option<f64>,
    /// Inclusive upper bound.
    pub max_price: Option<f64>,
    pub is_organic: Option<bool>,
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
    pub sort_by: ProductSortField,
    pub sort_order: SortOrder,
}

impl ProductFilter {
    /// Lowercased search terms; a product matches when any term occurs in its
    /// title, description or tags.
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }

    pub fn matches(&self, p: &Product) -> bool {
        self.seller_id.is_none_or(|s| p.seller_id == s)
            && self.category_id.is_none_or(|c| p.category_id == c)
            && self.min_price.is_none_or(|m| p.price >= m)
            && self.max_price.is_none_or(|m| p.price <= m)
            && self.is_organic.is_none_or(|o| p.is_organic == o)
            && self.status.is_none_or(|s| p.status == s)
            && self.matches_search(p)
    }

    fn matches_search(&self, p: &Product) -> bool {
        let terms = self.search_terms();
        if terms.is_empty() {
            return true;
        }
        let title = p.title.to_lowercase();
        let description = p.description.to_lowercase();
        let tags = p.tags.join(" ").to_lowercase();
        terms
            .iter()
            .any(|t| title.contains(t) || description.contains(t) || tags.contains(t))
    }

    /// Ordering used for listing; ties fall back to the id.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ord = match self.sort_by {
            ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            ProductSortField::Price => a.price.total_cmp(&b.price),
            ProductSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            ProductSortField::Views => a.views.cmp(&b.views),
            ProductSortField::Buys => a.buys.cmp(&b.buys),
            ProductSortField::Rating => a.rating.average.total_cmp(&b.rating.average),
        }
        .then(a.id.cmp(&b.id));

        match self.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn draft() -> ProductDraft {
        ProductDraft {
            title: "Heirloom tomatoes".into(),
            description: "Vine ripened, picked this morning".into(),
            category_id: 1,
            images: vec!["https://img.example/tomato.jpg".into()],
            video: None,
            price: 4.5,
            unit: Unit::Kg,
            quantity_available: 30,
            location: Location {
                address: "12 Orchard Lane".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                coordinates: None,
            },
            is_organic: true,
            harvest_date: None,
            status: ProductStatus::Available,
            tags: vec!["tomato".into()],
        }
    }

    fn product(id: i64, price: f64) -> Product {
        let d = draft();
        Product {
            id,
            seller_id: Uuid::nil(),
            title: d.title,
            description: d.description,
            category_id: d.category_id,
            images: d.images,
            video: None,
            price,
            unit: d.unit,
            quantity_available: d.quantity_available,
            location: d.location,
            is_organic: d.is_organic,
            harvest_date: None,
            status: ProductStatus::Available,
            tags: d.tags,
            views: 0,
            buys: 0,
            rating: Rating::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().normalize().validate().is_ok());
    }

    #[test]
    fn image_count_and_price_bounds() {
        let mut d = draft();
        d.images.clear();
        d.price = -1.0;
        let err = d.validate().unwrap_err();
        assert!(err.messages().contains(&"Product must have between 1 and 10 images".to_string()));
        assert!(err.messages().contains(&"Price cannot be negative".to_string()));

        let mut d = draft();
        d.images = vec!["x".into(); MAX_IMAGES + 1];
        assert!(d.validate().is_err());
    }

    #[test]
    fn normalize_drops_blank_and_duplicate_tags() {
        let mut d = draft();
        d.tags = vec![" Fresh ".into(), "".into(), "fresh".into(), "local".into()];
        assert_eq!(d.normalize().tags, vec!["Fresh".to_string(), "local".to_string()]);
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let patch = ProductPatch {
            price: Some(6.0),
            video: Some(Some("https://v.example/1".into())),
            ..Default::default()
        };
        let updated = patch.apply(draft());
        assert_eq!(updated.price, 6.0);
        assert_eq!(updated.title, draft().title);
        assert_eq!(updated.video.as_deref(), Some("https://v.example/1"));
    }

    #[test]
    fn price_range_is_inclusive() {
        let filter = ProductFilter {
            min_price: Some(10.0),
            max_price: Some(20.0),
            ..Default::default()
        };
        assert!(filter.matches(&product(1, 10.0)));
        assert!(filter.matches(&product(2, 20.0)));
        assert!(!filter.matches(&product(3, 9.99)));
        assert!(!filter.matches(&product(4, 20.01)));
    }

    #[test]
    fn search_matches_any_term_in_tags() {
        let filter = ProductFilter {
            search: Some("kale TOMATO".into()),
            ..Default::default()
        };
        assert!(filter.matches(&product(1, 1.0)));

        let filter = ProductFilter {
            search: Some("kale".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&product(1, 1.0)));
    }

    #[test]
    fn price_sort_orders_and_breaks_ties_by_id() {
        let filter = ProductFilter {
            sort_by: ProductSortField::Price,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let mut items = vec![product(3, 5.0), product(1, 5.0), product(2, 1.0)];
        items.sort_by(|a, b| filter.compare(a, b));
        let ids: Vec<i64> = items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn rating_average_rounds_to_two_decimals() {
        let r = Rating::from_scores([5, 4, 4]);
        assert_eq!(r.count, 3);
        assert_eq!(r.average, 4.33);
        assert_eq!(Rating::from_scores([]), Rating::default());
    }

    #[test]
    fn unit_and_status_parse() {
        assert_eq!("dozen".parse::<Unit>().unwrap(), Unit::Dozen);
        assert!("ton".parse::<Unit>().is_err());
        assert_eq!(
            "out-of-stock".parse::<ProductStatus>().unwrap(),
            ProductStatus::OutOfStock
        );
    }
}
