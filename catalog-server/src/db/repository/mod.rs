//! Repository Module
//!
//! CRUD operations over the SQLite pool. Free functions per table,
//! taking `&SqlitePool` (or a transaction connection for multi-step
//! mutations) and returning [`RepoResult`].

pub mod category;
pub mod order;
pub mod product;

use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A parent change that would make a category its own ancestor
    #[error("Hierarchy cycle: {0}")]
    Cycle(String),

    /// Deleting a category that still has child categories
    #[error("Has children: {0}")]
    HasChildren(String),

    /// Order number generation exhausted its retry budget
    #[error("Number exhausted: {0}")]
    NumberExhausted(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Validation(msg) => AppError::with_message(ErrorCode::ValidationFailed, msg),
            RepoError::Cycle(msg) => AppError::with_message(ErrorCode::CategoryCycle, msg),
            RepoError::HasChildren(msg) => {
                AppError::with_message(ErrorCode::CategoryHasChildren, msg)
            }
            RepoError::NumberExhausted(msg) => {
                AppError::with_message(ErrorCode::OrderNumberExhausted, msg)
            }
            RepoError::Database(msg) => AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
