use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::validation::{ValidationError, Violations, char_len, is_blank};

pub const MAX_NAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_PHONE_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    /// Ids of the products this user listed, oldest first.
    pub products_listed: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
}

/// Registration input before the password is hashed.
#[derive(Debug, Clone)]
pub struct Signup {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

impl Signup {
    pub fn normalize(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            phone_number: crate::domain::validation::trim_optional(self.phone_number),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();

        v.check(!is_blank(&self.first_name), "First name is required");
        v.check(
            char_len(&self.first_name) <= MAX_NAME_LEN,
            format!("First name cannot exceed {MAX_NAME_LEN} characters"),
        );
        v.check(!is_blank(&self.last_name), "Last name is required");
        v.check(
            char_len(&self.last_name) <= MAX_NAME_LEN,
            format!("Last name cannot exceed {MAX_NAME_LEN} characters"),
        );

        if is_blank(&self.email) {
            v.push("Email is required");
        } else {
            v.check(is_valid_email(&self.email), "Please provide a valid email");
        }

        let password_len = char_len(&self.password);
        v.check(
            (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len),
            format!("Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"),
        );

        if let Some(phone) = &self.phone_number {
            v.check(
                char_len(phone) <= MAX_PHONE_LEN,
                format!("Phone number cannot exceed {MAX_PHONE_LEN} characters"),
            );
        }

        v.finish()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Shape check only: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
