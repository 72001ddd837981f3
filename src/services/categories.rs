use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::domain::category::{
    Category, CategoryDraft, CategoryEntry, CategoryPatch, DEFAULT_CATEGORIES,
};
use crate::error::{AppError, AppResult};
use crate::repos::category_repo::CategoryRepo;
use crate::repos::error::RepoError;

/// Parent chains longer than this are treated as cycles.
const MAX_DEPTH: usize = 32;

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepo>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepo>) -> Self {
        Self { categories }
    }

    pub async fn list(&self, active: Option<bool>) -> AppResult<Vec<CategoryEntry>> {
        let categories = self.categories.list(active).await?;
        self.with_parents(categories).await
    }

    pub async fn get(&self, id: i64) -> AppResult<CategoryEntry> {
        let category = self.find(id).await?;
        self.with_parent(category).await
    }

    pub async fn create(&self, draft: CategoryDraft) -> AppResult<CategoryEntry> {
        let draft = draft.normalize();
        draft.validate()?;
        self.check_parent(None, draft.parent_id).await?;

        let category = self.categories.create(draft).await?;
        info!(category_id = category.id, name = %category.name, "category created");
        self.with_parent(category).await
    }

    pub async fn update(&self, id: i64, patch: CategoryPatch) -> AppResult<CategoryEntry> {
        let current = self.find(id).await?;
        let draft = patch.apply(current.draft()).normalize();
        draft.validate()?;
        if draft.parent_id != current.parent_id {
            self.check_parent(Some(id), draft.parent_id).await?;
        }

        let updated = self
            .categories
            .update(id, draft)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))?;
        self.with_parent(updated).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        match self.categories.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::not_found("Category")),
            Err(RepoError::InUse) => Err(AppError::conflict(
                "Category still has products and cannot be deleted",
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates whichever default categories are missing and returns them.
    pub async fn seed(&self) -> AppResult<Vec<CategoryEntry>> {
        let mut created = Vec::new();
        for (name, description) in DEFAULT_CATEGORIES {
            if self.categories.find_by_name(name).await?.is_some() {
                continue;
            }
            match self.categories.create(CategoryDraft::named(name, description)).await {
                Ok(category) => created.push(category),
                // created concurrently by another seed call
                Err(RepoError::Conflict { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(created = created.len(), "default categories seeded");
        self.with_parents(created).await
    }

    async fn find(&self, id: i64) -> AppResult<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))
    }

    async fn with_parents(&self, categories: Vec<Category>) -> AppResult<Vec<CategoryEntry>> {
        let mut parent_ids: Vec<i64> = categories.iter().filter_map(|c| c.parent_id).collect();
        parent_ids.sort_unstable();
        parent_ids.dedup();
        let parents: HashMap<_, _> = self
            .categories
            .find_many(&parent_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(categories
            .into_iter()
            .map(|category| CategoryEntry {
                parent: category.parent_id.and_then(|p| parents.get(&p).cloned()),
                category,
            })
            .collect())
    }

    async fn with_parent(&self, category: Category) -> AppResult<CategoryEntry> {
        let parent = match category.parent_id {
            Some(p) => self.categories.find_by_id(p).await?,
            None => None,
        };
        Ok(CategoryEntry { category, parent })
    }

    /// The parent must exist and must not be `id` itself or one of its
    /// descendants.
    async fn check_parent(&self, id: Option<i64>, parent_id: Option<i64>) -> AppResult<()> {
        let mut cursor = parent_id;
        let mut depth = 0;
        while let Some(ancestor) = cursor {
            if Some(ancestor) == id || depth > MAX_DEPTH {
                return Err(AppError::validation(
                    "A category cannot be its own parent or descendant",
                ));
            }
            let Some(found) = self.categories.find_by_id(ancestor).await? else {
                return Err(AppError::validation("Parent category not found"));
            };
            cursor = found.parent_id;
            depth += 1;
        }
        Ok(())
    }
}
