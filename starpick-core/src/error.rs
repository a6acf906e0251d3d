//! Error types for storage operations

use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("star with name '{name}' already exists")]
    DuplicateName { name: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("storage backend error: {reason}")]
    Backend { reason: String },

    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        StoreError::DuplicateName { name: name.into() }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        StoreError::Backend {
            reason: reason.into(),
        }
    }
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let id = Uuid::nil();
        let err = StoreError::not_found("star", id);
        assert!(err.to_string().contains("star"));
        assert!(err.to_string().contains(&id.to_string()));

        let err = StoreError::duplicate_name("Vega");
        assert!(err.to_string().contains("Vega"));
    }
}
