use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ownership::Owned;
use crate::domain::validation::{ValidationError, Violations, char_len, is_blank, trim_optional};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MAX_COMMENT_LEN: usize = 1000;
pub const MAX_IMAGES: usize = 5;
pub const MAX_RESPONSE_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerResponse {
    pub text: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Review {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub response: Option<SellerResponse>,
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn content(&self) -> ReviewContent {
        ReviewContent {
            rating: self.rating,
            comment: self.comment.clone(),
            images: self.images.clone(),
        }
    }
}

/// The reviewer owns the review. Responding is the reviewee's right and is
/// checked against `reviewee_id` instead.
impl Owned for Review {
    const RESOURCE: &'static str = "review";

    fn owner_id(&self) -> Uuid {
        self.reviewer_id
    }
}

/// The reviewer-editable part of a review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewContent {
    pub rating: i32,
    pub comment: Option<String>,
    pub images: Vec<String>,
}

impl ReviewContent {
    pub fn normalize(self) -> Self {
        Self {
            rating: self.rating,
            comment: trim_optional(self.comment),
            images: self.images.iter().map(|i| i.trim().to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.check(
            (MIN_RATING..=MAX_RATING).contains(&self.rating),
            format!("Rating must be between {MIN_RATING} and {MAX_RATING}"),
        );
        if let Some(comment) = &self.comment {
            v.check(
                char_len(comment) <= MAX_COMMENT_LEN,
                format!("Comment cannot exceed {MAX_COMMENT_LEN} characters"),
            );
        }
        v.check(
            self.images.len() <= MAX_IMAGES,
            format!("A review cannot have more than {MAX_IMAGES} images"),
        );
        v.check(
            self.images.iter().all(|i| !is_blank(i)),
            "Image URLs cannot be empty",
        );
        v.finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub order_id: i64,
    pub product_id: i64,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub content: ReviewContent,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub rating: Option<i32>,
    pub comment: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl ReviewPatch {
    pub fn apply(self, mut content: ReviewContent) -> ReviewContent {
        if let Some(rating) = self.rating {
            content.rating = rating;
        }
        if let Some(comment) = self.comment {
            content.comment = comment;
        }
        if let Some(images) = self.images {
            content.images = images;
        }
        content
    }
}

pub fn validate_response(text: &str) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    v.check(!is_blank(text), "Response text is required");
    v.check(
        char_len(text) <= MAX_RESPONSE_LEN,
        format!("Response cannot exceed {MAX_RESPONSE_LEN} characters"),
    );
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(rating: i32) -> ReviewContent {
        ReviewContent {
            rating,
            comment: Some("  Sweet and crisp ".into()),
            images: vec![],
        }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(content(1).validate().is_ok());
        assert!(content(5).validate().is_ok());
        assert!(content(0).validate().is_err());
        assert!(content(6).validate().is_err());
    }

    #[test]
    fn too_many_images() {
        let mut c = content(4);
        c.images = vec!["https://img.example/a.jpg".into(); MAX_IMAGES + 1];
        let err = c.validate().unwrap_err();
        assert_eq!(err.to_string(), "A review cannot have more than 5 images");
    }

    #[test]
    fn patch_clears_comment_and_keeps_rating() {
        let patch = ReviewPatch {
            comment: Some(None),
            ..Default::default()
        };
        let updated = patch.apply(content(3).normalize());
        assert_eq!(updated.rating, 3);
        assert_eq!(updated.comment, None);
    }

    #[test]
    fn blank_response_is_rejected() {
        assert!(validate_response("   ").is_err());
        assert!(validate_response("Thanks!").is_ok());
    }
}
