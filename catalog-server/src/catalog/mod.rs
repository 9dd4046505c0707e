//! Catalog core
//!
//! The three pieces with real invariants behind the CRUD surface:
//!
//! - [`tree`]: flat parent-pointer rows -> nested tree, descendant sets
//! - [`position`]: dense per-scope `sort_order` maintenance (shift-based
//!   insert/move/delete semantics, transactional)
//! - [`query`]: descendant-aware product listing and count roll-up

pub mod position;
pub mod query;
pub mod tree;

pub use position::PositionTable;
pub use query::ProductListParams;
