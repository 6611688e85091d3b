use std::fmt;

use thiserror::Error;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    OwnerId,
    Name,
    Description,
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenField::OwnerId => f.write_str("owner_id"),
            TokenField::Name => f.write_str("name"),
            TokenField::Description => f.write_str("description"),
        }
    }
}

/// Errors returned by the token lifecycle service.
///
/// Validation, duplicate and not-found cases are ordinary outcomes for the
/// caller to render; only `Store` and `Entropy` indicate a broken collaborator.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{reason}")]
    Validation { field: TokenField, reason: String },

    #[error("Token with name '{name}' already exist.")]
    Duplicate { name: String },

    #[error("The token with name '{name}' was not found.")]
    NotFound { name: String },

    #[error("token store failure: {0}")]
    Store(#[source] RepoError),

    #[error("secure random source unavailable: {0}")]
    Entropy(String),
}

impl TokenError {
    pub fn validation(field: TokenField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate { name: name.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}
