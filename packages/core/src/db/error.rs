//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, statement, and constraint failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection setup and statement execution. Constraint failures
/// reported by the backing store are classified separately so the service
/// layer can surface them as constraint violations instead of generic
/// statement failures.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// UNIQUE / NOT NULL / CHECK constraint rejected a statement
    #[error("Constraint violation: {context}")]
    ConstraintViolation { context: String },

    /// Table or column name that cannot be used as an SQL identifier
    #[error("Invalid SQL identifier: '{name}'")]
    InvalidIdentifier { name: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier { name: name.into() }
    }

    /// Classify a failed statement
    ///
    /// SQLite reports constraint failures as `"<KIND> constraint failed: ..."`,
    /// which is the only stable marker libsql exposes for them.
    pub fn statement(context: &str, source: libsql::Error) -> Self {
        let message = source.to_string();
        if message.contains("constraint failed") {
            Self::ConstraintViolation {
                context: format!("{}: {}", context, message),
            }
        } else {
            Self::SqlExecutionError {
                context: format!("{}: {}", context, message),
            }
        }
    }

    /// Whether the backing store rejected the statement on a constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}
