//! Product Repository
//!
//! Same transactional move semantics as categories, scoped by
//! `category_id` instead of `parent_id`. Listing lives in
//! `catalog::query` (it needs the tree resolver).

use super::{RepoError, RepoResult};
use crate::catalog::position::{self, PositionTable};
use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, name, category_id, sort_order, price, is_active, sales_count, \
                       created_at, updated_at";

/// Find product by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Product> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id = ?");
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

async fn category_exists(conn: &mut SqliteConnection, id: i64) -> RepoResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM category WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    if exists.is_none() {
        return Err(RepoError::NotFound(format!("Category {id} not found")));
    }
    Ok(())
}

/// Create a new product, appended to its category list unless an
/// explicit position is given.
pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(RepoError::Validation("Product name is required".into()));
    }
    if data.price < 0 {
        return Err(RepoError::Validation(format!(
            "Price must be non-negative, got {}",
            data.price
        )));
    }

    let mut tx = pool.begin().await?;

    if let Some(category) = data.category_id {
        category_exists(&mut tx, category).await?;
    }

    let sort_order = match data.sort_order {
        None => position::next_position(&mut tx, PositionTable::Product, data.category_id).await?,
        Some(p) => {
            let end =
                position::next_position(&mut tx, PositionTable::Product, data.category_id).await?;
            let p = p.min(end);
            position::make_room(&mut tx, PositionTable::Product, data.category_id, p).await?;
            p
        }
    };

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO product (id, name, category_id, sort_order, price, is_active, sales_count, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, 0, ?, ?)",
    )
    .bind(id)
    .bind(&name)
    .bind(data.category_id)
    .bind(sort_order)
    .bind(data.price)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let created = fetch_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(created)
}

/// Update a product
///
/// A `category_id` change is a cross-scope move; a bare `sort_order`
/// change is a within-scope move. Both commit atomically with the
/// field patch.
pub async fn update(pool: &SqlitePool, id: i64, data: ProductUpdate) -> RepoResult<Product> {
    if let Some(price) = data.price
        && price < 0
    {
        return Err(RepoError::Validation(format!(
            "Price must be non-negative, got {price}"
        )));
    }

    let mut tx = pool.begin().await?;
    let existing = fetch_by_id(&mut tx, id).await?;

    match data.category_id {
        Some(new_category) if new_category != existing.category_id => {
            if let Some(category) = new_category {
                category_exists(&mut tx, category).await?;
            }
            position::move_across_scope(
                &mut tx,
                PositionTable::Product,
                existing.category_id,
                new_category,
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
                    position::next_position(&mut tx, PositionTable::Product, existing.category_id)
                        .await?;
                let new_pos = new_pos.min(end - 1);
                position::move_within_scope(
                    &mut tx,
                    PositionTable::Product,
                    existing.category_id,
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
        "UPDATE product SET name = COALESCE(?1, name), price = COALESCE(?2, price), \
         is_active = COALESCE(?3, is_active), updated_at = ?4 WHERE id = ?5",
    )
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.price)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Hard delete a product. Sibling positions are not compacted; the gap
/// is tolerated and the next end-append still uses max + 1.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    Ok(true)
}

/// Bump the sales counter (first confirmation of an order)
pub async fn add_sales(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> RepoResult<()> {
    sqlx::query("UPDATE product SET sales_count = sales_count + ? WHERE id = ?")
        .bind(quantity)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use shared::models::{CategoryCreate, ProductCreate};
    use std::collections::HashSet;

    async fn make_category(pool: &SqlitePool, name: &str) -> i64 {
        super::super::category::create(
            pool,
            CategoryCreate { name: name.into(), parent_id: None, sort_order: None },
        )
        .await
        .unwrap()
        .id
    }

    fn payload(name: &str, category_id: Option<i64>) -> ProductCreate {
        ProductCreate { name: name.into(), category_id, sort_order: None, price: 1999 }
    }

    #[tokio::test]
    async fn create_appends_per_category() {
        let pool = test_pool().await;
        let cat = make_category(&pool, "Drinks").await;
        let p1 = create(&pool, payload("Tea", Some(cat))).await.unwrap();
        let p2 = create(&pool, payload("Coffee", Some(cat))).await.unwrap();
        let loose = create(&pool, payload("Mystery", None)).await.unwrap();

        assert_eq!(p1.sort_order, 1);
        assert_eq!(p2.sort_order, 2);
        // NULL scope counts separately
        assert_eq!(loose.sort_order, 1);
    }

    #[tokio::test]
    async fn negative_price_rejected() {
        let pool = test_pool().await;
        let mut data = payload("Tea", None);
        data.price = -5;
        let err = create(&pool, data).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_category_rejected() {
        let pool = test_pool().await;
        let err = create(&pool, payload("Tea", Some(404))).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn category_reassignment_keeps_positions_unique() {
        let pool = test_pool().await;
        let a = make_category(&pool, "A").await;
        let b = make_category(&pool, "B").await;
        let moved = create(&pool, payload("m", Some(a))).await.unwrap();
        create(&pool, payload("a2", Some(a))).await.unwrap();
        create(&pool, payload("b1", Some(b))).await.unwrap();

        let patch = ProductUpdate { category_id: Some(Some(b)), ..Default::default() };
        let updated = update(&pool, moved.id, patch).await.unwrap();
        assert_eq!(updated.category_id, Some(b));
        assert_eq!(updated.sort_order, 2);

        for scope in [a, b] {
            let positions: Vec<i32> =
                sqlx::query_scalar("SELECT sort_order FROM product WHERE category_id = ?")
                    .bind(scope)
                    .fetch_all(&pool)
                    .await
                    .unwrap();
            let unique: HashSet<i32> = positions.iter().copied().collect();
            assert_eq!(unique.len(), positions.len());
        }
    }

    #[tokio::test]
    async fn uncategorize_via_null_patch() {
        let pool = test_pool().await;
        let a = make_category(&pool, "A").await;
        let p = create(&pool, payload("m", Some(a))).await.unwrap();

        let patch = ProductUpdate { category_id: Some(None), ..Default::default() };
        let updated = update(&pool, p.id, patch).await.unwrap();
        assert_eq!(updated.category_id, None);
        assert_eq!(updated.sort_order, 1);
    }

    #[tokio::test]
    async fn delete_leaves_gap_and_next_insert_appends() {
        let pool = test_pool().await;
        let cat = make_category(&pool, "A").await;
        create(&pool, payload("p1", Some(cat))).await.unwrap();
        let p2 = create(&pool, payload("p2", Some(cat))).await.unwrap();
        create(&pool, payload("p3", Some(cat))).await.unwrap();

        delete(&pool, p2.id).await.unwrap();
        let p4 = create(&pool, payload("p4", Some(cat))).await.unwrap();
        assert_eq!(p4.sort_order, 4);
    }

    #[tokio::test]
    async fn delete_missing_product_errors() {
        let pool = test_pool().await;
        let err = delete(&pool, 42).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
