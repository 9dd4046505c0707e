//! Shared domain types for the catalog backend
//!
//! Everything the server and its clients agree on lives here:
//!
//! - **Models** (`models`): Category, Product, Order and their payloads
//! - **Errors** (`error`): unified error codes, [`AppError`], [`ApiResponse`]
//! - **Utilities** (`util`): timestamps and snowflake ID generation
//!
//! Database derives (`sqlx::FromRow`) are behind the `db` feature so
//! non-server consumers stay free of sqlx.

pub mod error;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
