//! Service Layer Error Types
//!
//! This module defines the error type returned by the storage adapter, the
//! children loader and every lifecycle operation.

use crate::db::DatabaseError;
use thiserror::Error;

/// Page store errors
///
/// Configuration and precondition errors indicate programmer or operator
/// mistakes and are never retried. Database errors abort the enclosing
/// operation.
#[derive(Error, Debug)]
pub enum PageStoreError {
    /// Missing database registration or missing model declaration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid state transition
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Another sibling already uses the slug
    #[error("A page with the slug '{slug}' already exists in '{parent}'")]
    DuplicateSlug { slug: String, parent: String },

    /// Non-forced delete of a page that still has children or drafts
    #[error("The page '{id}' has children and cannot be deleted without force")]
    HasChildren { id: String },

    /// Language code that is not configured
    #[error("Unknown language: {code}")]
    UnknownLanguage { code: String },

    /// Operation that relational storage does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Backing store rejected a statement on a constraint
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Any other backing store failure
    #[error("Database operation failed: {0}")]
    Database(DatabaseError),

    /// Row or field value could not be converted
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Attachment or media removal failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DatabaseError> for PageStoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConstraintViolation { context } => Self::ConstraintViolation(context),
            DatabaseError::InvalidIdentifier { name } => {
                Self::Configuration(format!("'{}' is not a valid table or column name", name))
            }
            other => Self::Database(other),
        }
    }
}

impl PageStoreError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a duplicate slug error
    pub fn duplicate_slug(slug: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::DuplicateSlug {
            slug: slug.into(),
            parent: parent.into(),
        }
    }

    /// Create a has-children error
    pub fn has_children(id: impl Into<String>) -> Self {
        Self::HasChildren { id: id.into() }
    }

    /// Create an unknown language error
    pub fn unknown_language(code: impl Into<String>) -> Self {
        Self::UnknownLanguage { code: code.into() }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Precondition failures, including the specific rule violations
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_)
                | Self::DuplicateSlug { .. }
                | Self::HasChildren { .. }
                | Self::UnknownLanguage { .. }
        )
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}
