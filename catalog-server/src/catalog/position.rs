//! Positional reorder engine
//!
//! Maintains a dense, collision-free `sort_order` per item within a
//! scope: the category for products, the parent category for
//! categories. A scope of `None` is the NULL scope (uncategorized
//! products, root categories) and is a scope like any other.
//!
//! Every operation here runs against a connection borrowed from a
//! caller-owned transaction — the caller commits or the whole move rolls
//! back. SQLite's single-writer transactions serialize the
//! read-max-then-shift sequences, so two concurrent moves on one scope
//! cannot interleave.
//!
//! Positions are 1-based. Gaps left by deletes are tolerated at rest;
//! shifts reason about relative order, not contiguity.

use crate::db::repository::{RepoError, RepoResult};
use sqlx::SqliteConnection;

/// Tables carrying a scoped `sort_order`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionTable {
    /// `product`, scoped by `category_id`
    Product,
    /// `category`, scoped by `parent_id`
    Category,
}

impl PositionTable {
    const fn table(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
        }
    }

    const fn scope_col(self) -> &'static str {
        match self {
            Self::Product => "category_id",
            Self::Category => "parent_id",
        }
    }
}

/// Next free position at the end of `scope`: max + 1, or 1 when empty.
pub async fn next_position(
    conn: &mut SqliteConnection,
    table: PositionTable,
    scope: Option<i64>,
) -> RepoResult<i32> {
    // `IS ?` is SQLite's null-safe equality, so one statement covers
    // both the NULL scope and a concrete one
    let sql = format!(
        "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM {} WHERE {} IS ?",
        table.table(),
        table.scope_col()
    );
    let next: i32 = sqlx::query_scalar(&sql).bind(scope).fetch_one(conn).await?;
    Ok(next)
}

/// Shift every item in `scope` at `position` or later up by one,
/// opening a slot for an insert at `position`.
pub async fn make_room(
    conn: &mut SqliteConnection,
    table: PositionTable,
    scope: Option<i64>,
    position: i32,
) -> RepoResult<()> {
    if position < 1 {
        return Err(RepoError::Validation(format!(
            "Position must be a positive integer, got {position}"
        )));
    }
    let sql = format!(
        "UPDATE {} SET sort_order = sort_order + 1 WHERE {} IS ? AND sort_order >= ?",
        table.table(),
        table.scope_col()
    );
    sqlx::query(&sql)
        .bind(scope)
        .bind(position)
        .execute(conn)
        .await?;
    Ok(())
}

/// Move one item to a new position within its scope.
///
/// Classic shift-the-gap: moving forward decrements every other item in
/// `(old, new]`; moving backward increments every other item in
/// `[new, old)`; then the item itself lands on `new`. Equal positions
/// are a no-op and must not disturb siblings.
pub async fn move_within_scope(
    conn: &mut SqliteConnection,
    table: PositionTable,
    scope: Option<i64>,
    item_id: i64,
    old_position: i32,
    new_position: i32,
) -> RepoResult<()> {
    if new_position < 1 {
        return Err(RepoError::Validation(format!(
            "Position must be a positive integer, got {new_position}"
        )));
    }
    if new_position == old_position {
        return Ok(());
    }

    let shift_sql = if new_position > old_position {
        format!(
            "UPDATE {} SET sort_order = sort_order - 1 \
             WHERE {} IS ? AND sort_order > ? AND sort_order <= ? AND id != ?",
            table.table(),
            table.scope_col()
        )
    } else {
        format!(
            "UPDATE {} SET sort_order = sort_order + 1 \
             WHERE {} IS ? AND sort_order >= ? AND sort_order < ? AND id != ?",
            table.table(),
            table.scope_col()
        )
    };
    let (lo, hi) = if new_position > old_position {
        (old_position, new_position)
    } else {
        (new_position, old_position)
    };
    sqlx::query(&shift_sql)
        .bind(scope)
        .bind(lo)
        .bind(hi)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    let sql = format!("UPDATE {} SET sort_order = ? WHERE id = ?", table.table());
    let result = sqlx::query(&sql)
        .bind(new_position)
        .bind(item_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "{} {item_id} not found",
            table.table()
        )));
    }
    Ok(())
}

/// Move one item into a different scope.
///
/// Vacates the old scope first (everything past the old position shifts
/// down one), then either appends at the end of the new scope or makes
/// room at the requested position. Both phases run on the same
/// transaction connection, so a failure between them rolls back cleanly.
/// Returns the item's position in the new scope.
pub async fn move_across_scope(
    conn: &mut SqliteConnection,
    table: PositionTable,
    old_scope: Option<i64>,
    new_scope: Option<i64>,
    item_id: i64,
    old_position: i32,
    desired_position: Option<i32>,
) -> RepoResult<i32> {
    // Close the gap left behind
    let vacate_sql = format!(
        "UPDATE {} SET sort_order = sort_order - 1 WHERE {} IS ? AND sort_order > ? AND id != ?",
        table.table(),
        table.scope_col()
    );
    sqlx::query(&vacate_sql)
        .bind(old_scope)
        .bind(old_position)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    let position = match desired_position {
        None => next_position(&mut *conn, table, new_scope).await?,
        Some(p) => {
            let end = next_position(&mut *conn, table, new_scope).await?;
            let p = p.min(end);
            make_room(&mut *conn, table, new_scope, p).await?;
            p
        }
    };

    let sql = format!(
        "UPDATE {} SET {} = ?, sort_order = ? WHERE id = ?",
        table.table(),
        table.scope_col()
    );
    let result = sqlx::query(&sql)
        .bind(new_scope)
        .bind(position)
        .bind(item_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "{} {item_id} not found",
            table.table()
        )));
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use sqlx::SqlitePool;
    use std::collections::HashSet;

    async fn seed_products(pool: &SqlitePool, scope: Option<i64>, count: i32) -> Vec<i64> {
        if let Some(cat) = scope {
            sqlx::query(
                "INSERT OR IGNORE INTO category (id, name, sort_order, created_at, updated_at) \
                 VALUES (?, ?, 1, 0, 0)",
            )
            .bind(cat)
            .bind(format!("cat-{cat}"))
            .execute(pool)
            .await
            .unwrap();
        }
        let mut ids = Vec::new();
        for i in 1..=count {
            let id = shared::util::snowflake_id();
            sqlx::query(
                "INSERT INTO product (id, name, category_id, sort_order, price, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 100, 0, 0)",
            )
            .bind(id)
            .bind(format!("p{i}"))
            .bind(scope)
            .bind(i)
            .execute(pool)
            .await
            .unwrap();
            ids.push(id);
        }
        ids
    }

    async fn positions_of(pool: &SqlitePool, ids: &[i64]) -> Vec<i32> {
        let mut out = Vec::new();
        for id in ids {
            let pos: i32 = sqlx::query_scalar("SELECT sort_order FROM product WHERE id = ?")
                .bind(id)
                .fetch_one(pool)
                .await
                .unwrap();
            out.push(pos);
        }
        out
    }

    async fn assert_unique_positions(pool: &SqlitePool, scope: Option<i64>) {
        let positions: Vec<i32> =
            sqlx::query_scalar("SELECT sort_order FROM product WHERE category_id IS ?")
                .bind(scope)
                .fetch_all(pool)
                .await
                .unwrap();
        let unique: HashSet<i32> = positions.iter().copied().collect();
        assert_eq!(unique.len(), positions.len(), "positions collide: {positions:?}");
    }

    #[tokio::test]
    async fn next_position_is_one_for_empty_scope() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let pos = next_position(&mut tx, PositionTable::Product, None).await.unwrap();
        assert_eq!(pos, 1);
    }

    #[tokio::test]
    async fn next_position_is_max_plus_one() {
        let pool = test_pool().await;
        seed_products(&pool, Some(10), 3).await;
        let mut tx = pool.begin().await.unwrap();
        let pos = next_position(&mut tx, PositionTable::Product, Some(10)).await.unwrap();
        assert_eq!(pos, 4);
    }

    #[tokio::test]
    async fn move_to_same_position_is_a_noop() {
        let pool = test_pool().await;
        let ids = seed_products(&pool, Some(10), 5).await;

        let mut tx = pool.begin().await.unwrap();
        move_within_scope(&mut tx, PositionTable::Product, Some(10), ids[2], 3, 3)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(positions_of(&pool, &ids).await, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn forward_move_shifts_the_gap() {
        let pool = test_pool().await;
        let ids = seed_products(&pool, Some(10), 5).await;

        // Items at [1,2,3,4,5]; move the item at 2 to 4
        let mut tx = pool.begin().await.unwrap();
        move_within_scope(&mut tx, PositionTable::Product, Some(10), ids[1], 2, 4)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Pinned fixture: positions become [1,4,2,3,5]
        assert_eq!(positions_of(&pool, &ids).await, vec![1, 4, 2, 3, 5]);

        // Re-reading sorted by position gives order p1, p3, p4, p2, p5
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM product WHERE category_id = 10 ORDER BY sort_order",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(names, vec!["p1", "p3", "p4", "p2", "p5"]);
        assert_unique_positions(&pool, Some(10)).await;
    }

    #[tokio::test]
    async fn backward_move_shifts_the_gap() {
        let pool = test_pool().await;
        let ids = seed_products(&pool, Some(10), 5).await;

        // Move the item at 4 to 2
        let mut tx = pool.begin().await.unwrap();
        move_within_scope(&mut tx, PositionTable::Product, Some(10), ids[3], 4, 2)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(positions_of(&pool, &ids).await, vec![1, 3, 4, 2, 5]);
        assert_unique_positions(&pool, Some(10)).await;
    }

    #[tokio::test]
    async fn cross_scope_move_conserves_both_scopes() {
        let pool = test_pool().await;
        let a = seed_products(&pool, Some(1), 4).await;
        let b = seed_products(&pool, Some(2), 3).await;

        // Move A's second item to the end of B
        let mut tx = pool.begin().await.unwrap();
        let pos = move_across_scope(
            &mut tx,
            PositionTable::Product,
            Some(1),
            Some(2),
            a[1],
            2,
            None,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(pos, 4);

        // Old scope closed its gap: remaining three are dense 1..3
        let remaining: Vec<i32> = sqlx::query_scalar(
            "SELECT sort_order FROM product WHERE category_id = 1 ORDER BY sort_order",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(remaining, vec![1, 2, 3]);

        // New scope grew by one, moved item within [1, m+1]
        let b_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE category_id = 2")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(b_count, 4);
        assert!(pos >= 1 && pos <= 4);
        assert_unique_positions(&pool, Some(2)).await;
        let _ = b;
    }

    #[tokio::test]
    async fn cross_scope_move_with_explicit_position_makes_room() {
        let pool = test_pool().await;
        let a = seed_products(&pool, Some(1), 3).await;
        let b = seed_products(&pool, Some(2), 3).await;

        let mut tx = pool.begin().await.unwrap();
        let pos = move_across_scope(
            &mut tx,
            PositionTable::Product,
            Some(1),
            Some(2),
            a[0],
            1,
            Some(2),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(pos, 2);

        // B's old items at 2 and 3 shifted to 3 and 4
        assert_eq!(positions_of(&pool, &b).await, vec![1, 3, 4]);
        assert_unique_positions(&pool, Some(2)).await;
    }

    #[tokio::test]
    async fn move_into_null_scope() {
        let pool = test_pool().await;
        let a = seed_products(&pool, Some(1), 2).await;
        seed_products(&pool, None, 2).await;

        let mut tx = pool.begin().await.unwrap();
        let pos = move_across_scope(&mut tx, PositionTable::Product, Some(1), None, a[0], 1, None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(pos, 3);
        assert_unique_positions(&pool, None).await;
    }

    #[tokio::test]
    async fn gaps_from_delete_are_tolerated() {
        let pool = test_pool().await;
        let ids = seed_products(&pool, Some(10), 4).await;

        // Delete the item at position 2, no compaction
        sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(ids[1])
            .execute(&pool)
            .await
            .unwrap();

        // InsertAtEnd still uses max + 1
        let mut tx = pool.begin().await.unwrap();
        let pos = next_position(&mut tx, PositionTable::Product, Some(10)).await.unwrap();
        assert_eq!(pos, 5);

        // A move across the gap still lands correctly
        move_within_scope(&mut tx, PositionTable::Product, Some(10), ids[0], 1, 3)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_unique_positions(&pool, Some(10)).await;
    }

    #[tokio::test]
    async fn rejects_non_positive_positions() {
        let pool = test_pool().await;
        let ids = seed_products(&pool, Some(10), 2).await;
        let mut tx = pool.begin().await.unwrap();
        let err = move_within_scope(&mut tx, PositionTable::Product, Some(10), ids[0], 1, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
