use std::fmt;

use serde::Serialize;

/// Entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEntity {
    Product,
    Profile,
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntity::Product => f.write_str("product"),
            MissingEntity::Profile => f.write_str("profile"),
        }
    }
}

/// Failure categories surfaced by compatibility operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompatibilityError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: MissingEntity, id: String },
    #[error("upstream temporarily unavailable: {0}")]
    Transient(String),
    #[error("internal failure: {0}")]
    Fatal(String),
}

impl CompatibilityError {
    pub fn product_not_found(code: impl Into<String>) -> Self {
        Self::NotFound {
            entity: MissingEntity::Product,
            id: code.into(),
        }
    }

    pub fn profile_not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: MissingEntity::Profile,
            id: user_id.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
