//! Category Model

use serde::{Deserialize, Serialize};

/// Category entity
///
/// Categories form a forest: `parent_id = None` means root. `sort_order`
/// is unique among siblings of the same parent (maintained by the reorder
/// engine, not by a DB constraint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Parent category (None = root)
    pub parent_id: Option<i64>,
    /// Position among siblings under the same parent
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub parent_id: Option<i64>,
    /// Explicit position; end of sibling list when omitted
    pub sort_order: Option<i32>,
}

/// Update category payload
///
/// `parent_id` is a double Option so a PATCH can distinguish
/// "leave unchanged" (absent) from "move to root" (null).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<i64>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Result of deleting a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDeleteResult {
    pub deleted: Category,
    /// Products reparented (or un-categorized) by the delete
    pub moved_product_count: u64,
}

/// A category with its children attached, for tree responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    /// Product count including all descendants (present when requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}
