//! Category Repository
//!
//! All mutations run inside a single transaction: the reorder engine's
//! shifts and the row update commit together or not at all.

use super::{RepoError, RepoResult};
use crate::catalog::position::{self, PositionTable};
use crate::catalog::tree::descendant_ids;
use shared::models::{Category, CategoryCreate, CategoryDeleteResult, CategoryUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, name, parent_id, sort_order, is_active, created_at, updated_at";

/// Find all active categories, siblings in position order
pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM category WHERE is_active = 1 ORDER BY parent_id, sort_order"
    );
    let rows = sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Find all categories including inactive ones (descendant resolution
/// must see the whole forest)
pub async fn find_all_rows(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category ORDER BY parent_id, sort_order");
    let rows = sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Find category by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category WHERE id = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Category> {
    let sql = format!("SELECT {COLUMNS} FROM category WHERE id = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
}

async fn fetch_all(conn: &mut SqliteConnection) -> RepoResult<Vec<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category");
    let rows = sqlx::query_as::<_, Category>(&sql).fetch_all(conn).await?;
    Ok(rows)
}

async fn name_exists(
    conn: &mut SqliteConnection,
    name: &str,
    exclude_id: Option<i64>,
) -> RepoResult<bool> {
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM category WHERE name = ? AND id IS NOT ? LIMIT 1")
            .bind(name)
            .bind(exclude_id)
            .fetch_optional(conn)
            .await?;
    Ok(exists.is_some())
}

/// Create a new category, appended to its sibling list unless an
/// explicit position is given (siblings at that position and later
/// shift up to make room).
pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(RepoError::Validation("Category name is required".into()));
    }

    let mut tx = pool.begin().await?;

    if name_exists(&mut tx, &name, None).await? {
        return Err(RepoError::Duplicate(format!("Category '{name}' already exists")));
    }
    if let Some(parent) = data.parent_id {
        fetch_by_id(&mut tx, parent).await?;
    }

    let sort_order = match data.sort_order {
        None => position::next_position(&mut tx, PositionTable::Category, data.parent_id).await?,
        Some(p) => {
            let end = position::next_position(&mut tx, PositionTable::Category, data.parent_id).await?;
            let p = p.min(end);
            position::make_room(&mut tx, PositionTable::Category, data.parent_id, p).await?;
            p
        }
    };

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO category (id, name, parent_id, sort_order, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&name)
    .bind(data.parent_id)
    .bind(sort_order)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let created = fetch_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(created)
}

/// Update a category
///
/// A `parent_id` change is a cross-scope move and is rejected when the
/// new parent is the category itself or one of its descendants. A bare
/// `sort_order` change is a within-scope move.
pub async fn update(pool: &SqlitePool, id: i64, data: CategoryUpdate) -> RepoResult<Category> {
    let mut tx = pool.begin().await?;
    let existing = fetch_by_id(&mut tx, id).await?;

    if let Some(ref new_name) = data.name {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(RepoError::Validation("Category name is required".into()));
        }
        if new_name != existing.name && name_exists(&mut tx, new_name, Some(id)).await? {
            return Err(RepoError::Duplicate(format!(
                "Category '{new_name}' already exists"
            )));
        }
    }

    match data.parent_id {
        Some(new_parent) if new_parent != existing.parent_id => {
            if let Some(parent) = new_parent {
                fetch_by_id(&mut tx, parent).await?;
                let rows = fetch_all(&mut tx).await?;
                // Includes `id` itself, so self-parenting is caught here too
                if descendant_ids(&rows, id).contains(&parent) {
                    return Err(RepoError::Cycle(format!(
                        "Category {id} cannot be moved under its own descendant {parent}"
                    )));
                }
            }
            position::move_across_scope(
                &mut tx,
                PositionTable::Category,
                existing.parent_id,
                new_parent,
                id,
                existing.sort_order,
                data.sort_order,
            )
            .await?;
        }
        _ => {
            if let Some(new_pos) = data.sort_order
                && new_pos != existing.sort_order
            {
                let end =
                    position::next_position(&mut tx, PositionTable::Category, existing.parent_id)
                        .await?;
                let new_pos = new_pos.min(end - 1);
                position::move_within_scope(
                    &mut tx,
                    PositionTable::Category,
                    existing.parent_id,
                    id,
                    existing.sort_order,
                    new_pos,
                )
                .await?;
            }
        }
    }

    let now = now_millis();
    sqlx::query(
        "UPDATE category SET name = COALESCE(?1, name), is_active = COALESCE(?2, is_active), \
         updated_at = ?3 WHERE id = ?4",
    )
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete a category
///
/// Refuses while child categories exist. Products under the category
/// are appended to the target category's list (relative order kept) or
/// un-categorized when no target is given — never dropped.
pub async fn delete(
    pool: &SqlitePool,
    id: i64,
    reparent_products_to: Option<i64>,
) -> RepoResult<CategoryDeleteResult> {
    let mut tx = pool.begin().await?;
    let existing = fetch_by_id(&mut tx, id).await?;

    let child_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM category WHERE parent_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if child_count > 0 {
        return Err(RepoError::HasChildren(format!(
            "Category {id} has {child_count} child categories"
        )));
    }

    if let Some(target) = reparent_products_to {
        if target == id {
            return Err(RepoError::Validation(
                "Cannot reparent products to the category being deleted".into(),
            ));
        }
        fetch_by_id(&mut tx, target).await?;
    }

    let moved: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE category_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if moved > 0 {
        // Shift by the target scope's max so old positions (unique, in
        // order) stay unique after landing
        let base =
            position::next_position(&mut tx, PositionTable::Product, reparent_products_to).await? - 1;
        sqlx::query(
            "UPDATE product SET category_id = ?, sort_order = sort_order + ? WHERE category_id = ?",
        )
        .bind(reparent_products_to)
        .bind(base)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM category WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(CategoryDeleteResult {
        deleted: existing,
        moved_product_count: moved as u64,
    })
}
