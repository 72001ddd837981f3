use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::dto::double_option;
use crate::api::extractors::public_id::PublicCategoryId;
use crate::domain::category::{Category, CategoryDraft, CategoryEntry, CategoryPatch};
use crate::error::AppError;
use crate::services::id_codec::IdCodec;

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_category: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateCategoryRequest {
    pub fn into_draft(self, codec: &IdCodec) -> Result<CategoryDraft, AppError> {
        let parent_id = self
            .parent_category
            .as_deref()
            .map(|p| PublicCategoryId::decode(codec, p))
            .transpose()?;

        Ok(CategoryDraft {
            name: self.name,
            description: self.description,
            image: self.image,
            parent_id,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Fields outside this list are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_category: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateCategoryRequest {
    pub fn into_patch(self, codec: &IdCodec) -> Result<CategoryPatch, AppError> {
        let parent_id = match self.parent_category {
            None => None,
            Some(None) => Some(None),
            Some(Some(p)) => Some(Some(PublicCategoryId::decode(codec, &p)?)),
        };

        Ok(CategoryPatch {
            name: self.name,
            description: self.description,
            image: self.image,
            parent_id,
            is_active: self.is_active,
        })
    }
}

/// The short form of a category embedded in other resources.
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategorySummary {
    pub fn name_only(codec: &IdCodec, c: &Category) -> Result<Self, AppError> {
        Ok(Self {
            id: codec.encode(c.id)?,
            name: c.name.clone(),
            description: None,
        })
    }

    pub fn with_description(codec: &IdCodec, c: &Category) -> Result<Self, AppError> {
        Ok(Self {
            description: c.description.clone(),
            ..Self::name_only(codec, c)?
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_category: Option<CategorySummary>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponse {
    pub fn from_entry(codec: &IdCodec, entry: CategoryEntry) -> Result<Self, AppError> {
        let CategoryEntry { category: c, parent } = entry;
        Ok(Self {
            id: codec.encode(c.id)?,
            name: c.name,
            description: c.description,
            image: c.image,
            parent_category: parent
                .as_ref()
                .map(|p| CategorySummary::name_only(codec, p))
                .transpose()?,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryData {
    pub category: CategoryResponse,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryResponse>,
}

impl CategoryList {
    pub fn from_entries(codec: &IdCodec, entries: Vec<CategoryEntry>) -> Result<Self, AppError> {
        let categories = entries
            .into_iter()
            .map(|e| CategoryResponse::from_entry(codec, e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { categories })
    }
}
