//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::catalog::query::{self, ProductListParams};
use crate::core::ServerState;
use crate::db::repository::product;
use crate::utils::{AppError, AppResult};
use shared::models::{Product, ProductCreate, ProductPage, ProductUpdate};

/// GET /api/products - 商品列表
///
/// `category_id` 过滤包含该分类的所有后代分类; 支持关键字、分页、
/// 白名单排序键。
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<ProductListParams>,
) -> AppResult<Json<ProductPage>> {
    let page = query::list_products(state.pool(), &params).await?;
    Ok(Json(page))
}

/// GET /api/products/:id - 获取单个商品
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    let found = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;
    Ok(Json(found))
}

/// POST /api/products - 创建商品
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    let created = product::create(state.pool(), payload).await?;
    tracing::info!(id = created.id, name = %created.name, "Product created");
    Ok(Json(created))
}

/// PUT /api/products/:id - 更新商品 (改分类/改位置走重排引擎)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    let updated = product::update(state.pool(), id, payload).await?;
    Ok(Json(updated))
}

/// DELETE /api/products/:id - 删除商品 (硬删除, 位置不回填)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let result = product::delete(state.pool(), id).await?;
    tracing::info!(id, "Product deleted");
    Ok(Json(result))
}
