//! Catalog query service
//!
//! Composes the tree resolver with product queries: category-scoped
//! listings include every descendant category's products, and per-node
//! product counts roll descendant counts up into their ancestors.

use super::tree::{build_tree, descendant_ids};
use crate::db::repository::{RepoResult, category};
use serde::Deserialize;
use shared::models::{CategoryNode, Product, ProductPage};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 200;

const PRODUCT_COLUMNS: &str = "id, name, category_id, sort_order, price, is_active, \
                               sales_count, created_at, updated_at";

/// Product listing parameters (query string of GET /api/products)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    /// Restrict to this category and all its descendants
    pub category_id: Option<i64>,
    /// Substring match on name
    pub q: Option<String>,
    pub include_inactive: Option<bool>,
    /// 1-based page number
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/// Resolve the ORDER BY clause from caller-selected key and direction.
///
/// Keys are whitelisted; everything falls back to the stable default
/// `sort_order DESC, created_at DESC`. `id DESC` is always the final
/// tiebreak so ties in the primary key never reorder between requests.
fn order_clause(sort_by: Option<&str>, sort_dir: Option<&str>) -> String {
    let dir = match sort_dir {
        Some(d) if d.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    };
    let key = match sort_by {
        Some("name") => "name",
        Some("price") => "price",
        Some("sales_count") => "sales_count",
        Some("created_at") => "created_at",
        Some("sort_order") => "sort_order",
        _ => return "sort_order DESC, created_at DESC, id DESC".to_string(),
    };
    format!("{key} {dir}, sort_order DESC, created_at DESC, id DESC")
}

/// List products with filters, pagination and a stable sort.
///
/// When `category_id` is set, the filter covers that category plus all
/// its descendants; an unknown category matches nothing.
pub async fn list_products(pool: &SqlitePool, params: &ProductListParams) -> RepoResult<ProductPage> {
    let page = params.page.unwrap_or(1).max(1);
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    // Resolve the descendant set before touching products
    let category_ids: Option<Vec<i64>> = match params.category_id {
        Some(root) => {
            let rows = category::find_all_rows(pool).await?;
            let set = descendant_ids(&rows, root);
            if set.is_empty() {
                return Ok(ProductPage { items: vec![], total: 0 });
            }
            Some(set.into_iter().collect())
        }
        None => None,
    };

    let push_filters = |qb: &mut QueryBuilder<'_, Sqlite>| {
        if !params.include_inactive.unwrap_or(false) {
            qb.push(" AND is_active = 1");
        }
        if let Some(ids) = &category_ids {
            qb.push(" AND category_id IN (");
            let mut sep = qb.separated(", ");
            for id in ids {
                sep.push_bind(*id);
            }
            qb.push(")");
        }
        if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
            qb.push(" AND name LIKE ");
            qb.push_bind(format!("%{q}%"));
        }
    };

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM product WHERE 1=1");
    push_filters(&mut count_qb);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE 1=1"));
    push_filters(&mut qb);
    qb.push(format!(
        " ORDER BY {}",
        order_clause(params.sort_by.as_deref(), params.sort_dir.as_deref())
    ));
    qb.push(" LIMIT ");
    qb.push_bind(size as i64);
    qb.push(" OFFSET ");
    // i64 math: a huge page parameter must not overflow u32
    qb.push_bind((page as i64 - 1) * size as i64);

    let items: Vec<Product> = qb.build_query_as().fetch_all(pool).await?;
    Ok(ProductPage { items, total })
}

/// Direct (non-rolled-up) active-product count per category.
///
/// One aggregate query; uncategorized products are not represented.
pub async fn count_by_category(pool: &SqlitePool) -> RepoResult<HashMap<i64, i64>> {
    let rows: Vec<(Option<i64>, i64)> = sqlx::query_as(
        "SELECT category_id, COUNT(*) FROM product \
         WHERE is_active = 1 GROUP BY category_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(cat, count)| cat.map(|c| (c, count)))
        .collect())
}

/// The full category tree, optionally with rolled-up product counts.
pub async fn category_tree(pool: &SqlitePool, include_counts: bool) -> RepoResult<Vec<CategoryNode>> {
    let rows = category::find_all(pool).await?;
    let mut tree = build_tree(&rows);
    if include_counts {
        let direct = count_by_category(pool).await?;
        rollup_counts(&mut tree, &direct);
    }
    Ok(tree)
}

/// Fill `product_count` on every node: own direct count plus the sum of
/// every descendant's.
pub fn rollup_counts(nodes: &mut [CategoryNode], direct: &HashMap<i64, i64>) {
    for node in nodes {
        rollup_node(node, direct);
    }
}

fn rollup_node(node: &mut CategoryNode, direct: &HashMap<i64, i64>) -> i64 {
    let mut sum = direct.get(&node.category.id).copied().unwrap_or(0);
    for child in &mut node.children {
        sum += rollup_node(child, direct);
    }
    node.product_count = Some(sum);
    sum
}
