//! Order Repository
//!
//! Orders and their line items are created atomically: number
//! generation, the order row and every item row share one transaction.
//! Totals are computed from the submitted prices at creation time and
//! never recomputed from current product prices.

use super::{RepoError, RepoResult, product};
use crate::orders::order_number;
use shared::models::{
    Order, OrderCreate, OrderDetail, OrderItem, OrderPage, OrderStatus, OrderStatusUpdate,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, order_number, customer_name, customer_phone, customer_email, \
                       shipping_address, status, total, confirmed_at, shipped_at, delivered_at, \
                       created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, item_no, product_id, name, model, price, quantity, subtotal";

/// Create an order with its line items
pub async fn create(pool: &SqlitePool, data: OrderCreate) -> RepoResult<OrderDetail> {
    if data.customer_name.trim().is_empty() {
        return Err(RepoError::Validation("Customer name is required".into()));
    }
    if data.items.is_empty() {
        return Err(RepoError::Validation("Order must have at least one item".into()));
    }
    for item in &data.items {
        if item.quantity <= 0 {
            return Err(RepoError::Validation(format!(
                "Quantity must be positive, got {} for '{}'",
                item.quantity, item.name
            )));
        }
        if item.price < 0 {
            return Err(RepoError::Validation(format!(
                "Price must be non-negative, got {} for '{}'",
                item.price, item.name
            )));
        }
    }

    let mut tx = pool.begin().await?;

    let number = order_number::generate(&mut tx).await?;
    let order_id = snowflake_id();
    let now = now_millis();

    // Total is the sum of submitted subtotals, pinned at creation
    let total: i64 = data
        .items
        .iter()
        .map(|i| i.price * i.quantity as i64)
        .sum();

    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_name, customer_phone, customer_email, \
         shipping_address, status, total, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)",
    )
    .bind(order_id)
    .bind(&number)
    .bind(data.customer_name.trim())
    .bind(&data.customer_phone)
    .bind(&data.customer_email)
    .bind(&data.shipping_address)
    .bind(total)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (index, item) in data.items.iter().enumerate() {
        let subtotal = item.price * item.quantity as i64;
        sqlx::query(
            "INSERT INTO order_item (id, order_id, item_no, product_id, name, model, price, quantity, subtotal) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(snowflake_id())
        .bind(order_id)
        .bind(index as i32 + 1)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(&item.model)
        .bind(item.price)
        .bind(item.quantity)
        .bind(subtotal)
        .execute(&mut *tx)
        .await?;
    }

    let order = fetch_by_id(&mut tx, order_id).await?;
    let items = fetch_items(&mut tx, order_id).await?;
    tx.commit().await?;
    Ok(OrderDetail { order, items })
}

/// Find order by id, with its line items
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderDetail>> {
    let sql = format!("SELECT {COLUMNS} FROM orders WHERE id = ?");
    let Some(order) = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = ? ORDER BY item_no");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(id)
        .fetch_all(pool)
        .await?;
    Ok(Some(OrderDetail { order, items }))
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Order> {
    let sql = format!("SELECT {COLUMNS} FROM orders WHERE id = ?");
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = ? ORDER BY item_no");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// List orders, newest first
pub async fn list(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
    page: u32,
    size: u32,
) -> RepoResult<OrderPage> {
    let page = page.max(1);
    let size = size.clamp(1, 200);

    let (total, items) = match status {
        Some(status) => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await?;
            let sql = format!(
                "SELECT {COLUMNS} FROM orders WHERE status = ? \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            );
            let items = sqlx::query_as::<_, Order>(&sql)
                .bind(status)
                .bind(size as i64)
                .bind((page as i64 - 1) * size as i64)
                .fetch_all(pool)
                .await?;
            (total, items)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
                .fetch_one(pool)
                .await?;
            let sql = format!(
                "SELECT {COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            );
            let items = sqlx::query_as::<_, Order>(&sql)
                .bind(size as i64)
                .bind((page as i64 - 1) * size as i64)
                .fetch_all(pool)
                .await?;
            (total, items)
        }
    };

    Ok(OrderPage { items, total })
}

/// Update order status
///
/// Transitions are not restricted; the side effects are:
/// - confirmed_at / shipped_at / delivered_at stamped on the FIRST
///   entry into the matching status, then left alone
/// - product sales counters bumped on the first confirmation only
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    data: OrderStatusUpdate,
) -> RepoResult<Order> {
    let mut tx = pool.begin().await?;
    let existing = fetch_by_id(&mut tx, id).await?;

    let first_confirmation =
        data.status == OrderStatus::Confirmed && existing.confirmed_at.is_none();

    let now = now_millis();
    sqlx::query(
        "UPDATE orders SET status = ?1, updated_at = ?2, \
         confirmed_at = CASE WHEN ?1 = 'confirmed' THEN COALESCE(confirmed_at, ?2) ELSE confirmed_at END, \
         shipped_at   = CASE WHEN ?1 = 'shipped'   THEN COALESCE(shipped_at, ?2)   ELSE shipped_at   END, \
         delivered_at = CASE WHEN ?1 = 'delivered' THEN COALESCE(delivered_at, ?2) ELSE delivered_at END \
         WHERE id = ?3",
    )
    .bind(data.status)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if first_confirmation {
        let items = fetch_items(&mut tx, id).await?;
        for item in items {
            if let Some(product_id) = item.product_id {
                product::add_sales(&mut tx, product_id, item.quantity as i64).await?;
            }
        }
    }

    let updated = fetch_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use shared::models::{OrderItemCreate, ProductCreate};

    fn payload(items: Vec<OrderItemCreate>) -> OrderCreate {
        OrderCreate {
            customer_name: "Ada".into(),
            customer_phone: None,
            customer_email: Some("ada@example.com".into()),
            shipping_address: Some("1 Main St".into()),
            items,
        }
    }

    fn item(name: &str, price: i64, quantity: i32) -> OrderItemCreate {
        OrderItemCreate {
            product_id: None,
            name: name.into(),
            model: None,
            price,
            quantity,
        }
    }

    #[tokio::test]
    async fn create_computes_total_from_submitted_prices() {
        let pool = test_pool().await;
        let detail = create(&pool, payload(vec![item("Tea", 250, 2), item("Mug", 1200, 1)]))
            .await
            .unwrap();

        assert_eq!(detail.order.total, 250 * 2 + 1200);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].name, "Tea");
        assert_eq!(detail.items[0].subtotal, 500);
        assert_eq!(detail.items[1].name, "Mug");
        assert_eq!(detail.items[1].subtotal, 1200);
        assert!(detail.order.order_number.starts_with("SO"));
    }

    #[tokio::test]
    async fn items_keep_submission_order() {
        // All item rows are minted within the same millisecond; the
        // persisted sequence, not the id, must carry insertion order
        let pool = test_pool().await;
        let names: Vec<String> = (1..=8).map(|i| format!("item-{i}")).collect();
        let items = names.iter().map(|n| item(n, 100, 1)).collect();
        let created = create(&pool, payload(items)).await.unwrap();

        let fetched = find_by_id(&pool, created.order.id).await.unwrap().unwrap();
        for detail in [&created, &fetched] {
            let got: Vec<String> = detail.items.iter().map(|i| i.name.clone()).collect();
            assert_eq!(got, names);
        }
        let seq: Vec<i32> = fetched.items.iter().map(|i| i.item_no).collect();
        assert_eq!(seq, (1..=8).collect::<Vec<i32>>());
    }

    #[tokio::test]
    async fn empty_or_invalid_items_rejected() {
        let pool = test_pool().await;
        let err = create(&pool, payload(vec![])).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let err = create(&pool, payload(vec![item("Tea", 250, 0)])).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let err = create(&pool, payload(vec![item("Tea", -1, 1)])).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        // Nothing was persisted by the rejected attempts
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn status_timestamps_stamp_once() {
        let pool = test_pool().await;
        let detail = create(&pool, payload(vec![item("Tea", 250, 1)])).await.unwrap();
        let id = detail.order.id;

        let confirmed = update_status(
            &pool,
            id,
            OrderStatusUpdate { status: OrderStatus::Confirmed },
        )
        .await
        .unwrap();
        let first_stamp = confirmed.confirmed_at.unwrap();

        // Bounce away and back; the stamp must not change
        update_status(&pool, id, OrderStatusUpdate { status: OrderStatus::Pending })
            .await
            .unwrap();
        let again = update_status(
            &pool,
            id,
            OrderStatusUpdate { status: OrderStatus::Confirmed },
        )
        .await
        .unwrap();
        assert_eq!(again.confirmed_at, Some(first_stamp));

        let shipped = update_status(
            &pool,
            id,
            OrderStatusUpdate { status: OrderStatus::Shipped },
        )
        .await
        .unwrap();
        assert!(shipped.shipped_at.is_some());
        assert_eq!(shipped.confirmed_at, Some(first_stamp));
        assert!(shipped.delivered_at.is_none());
    }

    #[tokio::test]
    async fn first_confirmation_bumps_sales_once() {
        let pool = test_pool().await;
        let product = product::create(
            &pool,
            ProductCreate { name: "Tea".into(), category_id: None, sort_order: None, price: 250 },
        )
        .await
        .unwrap();

        let detail = create(
            &pool,
            payload(vec![OrderItemCreate {
                product_id: Some(product.id),
                name: "Tea".into(),
                model: None,
                price: 250,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();

        for _ in 0..2 {
            update_status(
                &pool,
                detail.order.id,
                OrderStatusUpdate { status: OrderStatus::Confirmed },
            )
            .await
            .unwrap();
        }

        let sales: i64 = sqlx::query_scalar("SELECT sales_count FROM product WHERE id = ?")
            .bind(product.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sales, 3);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_pages() {
        let pool = test_pool().await;
        for i in 0..5 {
            let detail = create(&pool, payload(vec![item(&format!("p{i}"), 100, 1)]))
                .await
                .unwrap();
            if i < 2 {
                update_status(
                    &pool,
                    detail.order.id,
                    OrderStatusUpdate { status: OrderStatus::Cancelled },
                )
                .await
                .unwrap();
            }
        }

        let all = list(&pool, None, 1, 10).await.unwrap();
        assert_eq!(all.total, 5);

        let cancelled = list(&pool, Some(OrderStatus::Cancelled), 1, 10).await.unwrap();
        assert_eq!(cancelled.total, 2);
        assert!(cancelled.items.iter().all(|o| o.status == OrderStatus::Cancelled));

        let page2 = list(&pool, None, 2, 2).await.unwrap();
        assert_eq!(page2.items.len(), 2);

        // A huge page number is empty, not an overflow
        let far = list(&pool, None, u32::MAX, 200).await.unwrap();
        assert_eq!(far.total, 5);
        assert!(far.items.is_empty());
    }
}
