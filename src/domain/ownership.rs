//! Ownership guard for user-owned resources.
//!
//! Every owned record reports the user recorded as its owner at creation.
//! Mutations compare that owner against the authenticated identity and fail
//! with [`OwnershipError`] on mismatch.
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("You are not authorized to {action} this {resource}")]
pub struct OwnershipError {
    pub resource: &'static str,
    pub action: &'static str,
}

/// Succeeds only when `actor` is `owner`.
pub fn ensure_owner(
    actor: Uuid,
    owner: Uuid,
    resource: &'static str,
    action: &'static str,
) -> Result<(), OwnershipError> {
    if actor == owner {
        Ok(())
    } else {
        Err(OwnershipError { resource, action })
    }
}

pub trait Owned {
    const RESOURCE: &'static str;

    fn owner_id(&self) -> Uuid;

    fn is_owned_by(&self, actor: Uuid) -> bool {
        self.owner_id() == actor
    }

    fn ensure_owned_by(&self, actor: Uuid, action: &'static str) -> Result<(), OwnershipError> {
        ensure_owner(actor, self.owner_id(), Self::RESOURCE, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        author: Uuid,
    }

    impl Owned for Note {
        const RESOURCE: &'static str = "note";

        fn owner_id(&self) -> Uuid {
            self.author
        }
    }

    #[test]
    fn owner_passes() {
        let author = Uuid::new_v4();
        let note = Note { author };
        assert!(note.ensure_owned_by(author, "update").is_ok());
    }

    #[test]
    fn anyone_else_is_forbidden() {
        let note = Note {
            author: Uuid::new_v4(),
        };
        let err = note.ensure_owned_by(Uuid::new_v4(), "delete").unwrap_err();
        assert_eq!(err.to_string(), "You are not authorized to delete this note");
    }
}
