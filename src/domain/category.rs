use chrono::{DateTime, Utc};

use crate::domain::validation::{ValidationError, Violations, char_len, is_blank, trim_optional};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Categories created by the seed operation when missing.
pub const DEFAULT_CATEGORIES: [(&str, &str); 10] = [
    ("Vegetables", "Fresh vegetables from local farms"),
    ("Fruits", "Seasonal fruits and berries"),
    ("Grains", "Rice, wheat, and other grains"),
    ("Dairy", "Milk, cheese, and dairy products"),
    ("Meat", "Fresh meat and poultry"),
    ("Eggs", "Farm-fresh eggs"),
    ("Honey", "Natural honey and bee products"),
    ("Herbs", "Fresh and dried herbs"),
    ("Nuts", "Various nuts and seeds"),
    ("Organic", "Certified organic products"),
];

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn draft(&self) -> CategoryDraft {
        CategoryDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            parent_id: self.parent_id,
            is_active: self.is_active,
        }
    }
}

/// A category with its parent resolved for display. `parent` is `None` for
/// top-level categories and for parents removed in the meantime.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    pub category: Category,
    pub parent: Option<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<i64>,
    pub is_active: bool,
}

impl CategoryDraft {
    pub fn named(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            image: None,
            parent_id: None,
            is_active: true,
        }
    }

    pub fn normalize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: trim_optional(self.description),
            image: trim_optional(self.image),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.check(!is_blank(&self.name), "Category name is required");
        v.check(
            char_len(&self.name) <= MAX_NAME_LEN,
            format!("Category name cannot exceed {MAX_NAME_LEN} characters"),
        );
        if let Some(description) = &self.description {
            v.check(
                char_len(description) <= MAX_DESCRIPTION_LEN,
                format!("Description cannot exceed {MAX_DESCRIPTION_LEN} characters"),
            );
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub parent_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    pub fn apply(self, mut draft: CategoryDraft) -> CategoryDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(image) = self.image {
            draft.image = image;
        }
        if let Some(parent_id) = self.parent_id {
            draft.parent_id = parent_id;
        }
        if let Some(is_active) = self.is_active {
            draft.is_active = is_active;
        }
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let draft = CategoryDraft::named("   ", "x").normalize();
        assert_eq!(
            draft.validate().unwrap_err().to_string(),
            "Category name is required"
        );
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let draft = CategoryDraft::named("Fruits", "Seasonal");
        let patch = CategoryPatch {
            description: Some(None),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = patch.apply(draft);
        assert_eq!(updated.name, "Fruits");
        assert_eq!(updated.description, None);
        assert!(!updated.is_active);
    }

    #[test]
    fn seed_names_are_unique() {
        let mut names: Vec<String> = DEFAULT_CATEGORIES
            .iter()
            .map(|(n, _)| n.to_lowercase())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_CATEGORIES.len());
    }
}
