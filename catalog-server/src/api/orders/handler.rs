//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::order;
use crate::utils::{AppError, AppResult};
use shared::ErrorCode;
use shared::models::{Order, OrderCreate, OrderDetail, OrderPage, OrderStatus, OrderStatusUpdate};

#[derive(Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// GET /api/orders - 订单列表 (按创建时间倒序, 可按状态过滤)
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<OrderListParams>,
) -> AppResult<Json<OrderPage>> {
    let status = match params.status.as_deref() {
        Some(s) => Some(s.parse::<OrderStatus>().map_err(|_| {
            AppError::with_message(
                ErrorCode::InvalidOrderStatus,
                format!("Unknown order status '{s}'"),
            )
        })?),
        None => None,
    };
    let page = order::list(
        state.pool(),
        status,
        params.page.unwrap_or(1),
        params.size.unwrap_or(20),
    )
    .await?;
    Ok(Json(page))
}

/// GET /api/orders/:id - 订单详情 (含明细行)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let found = order::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    Ok(Json(found))
}

/// POST /api/orders - 创建订单 (单号生成与明细写入同一事务)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<OrderDetail>> {
    let created = order::create(state.pool(), payload).await?;
    tracing::info!(
        id = created.order.id,
        order_number = %created.order.order_number,
        total = created.order.total,
        "Order created"
    );
    Ok(Json(created))
}

/// PUT /api/orders/:id/status - 更新订单状态
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let updated = order::update_status(state.pool(), id, payload).await?;
    tracing::info!(id, status = %updated.status, "Order status updated");
    Ok(Json(updated))
}
