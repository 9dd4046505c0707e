//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Category reference (None = uncategorized)
    pub category_id: Option<i64>,
    /// Position within the category
    pub sort_order: i32,
    /// Price in cents
    pub price: i64,
    pub is_active: bool,
    /// Units sold (bumped when an order is confirmed)
    pub sales_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub category_id: Option<i64>,
    /// Explicit position; end of category list when omitted
    pub sort_order: Option<i32>,
    /// Price in cents
    pub price: i64,
}

/// Update product payload
///
/// `category_id` is a double Option: absent = unchanged, null = uncategorize.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<i64>>,
    pub sort_order: Option<i32>,
    pub price: Option<i64>,
    pub is_active: Option<bool>,
}

/// A page of products plus the unpaginated total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
}
