//! Data models
//!
//! Shared between catalog-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod category;
pub mod order;
pub mod product;

// Re-exports
pub use category::*;
pub use order::*;
pub use product::*;
