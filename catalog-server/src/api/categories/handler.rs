//! Category API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::catalog;
use crate::core::ServerState;
use crate::db::repository::category;
use crate::utils::{AppError, AppResult};
use shared::models::{Category, CategoryCreate, CategoryDeleteResult, CategoryNode, CategoryUpdate};

/// GET /api/categories - 获取所有分类 (扁平列表, 兄弟按位置排序)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    let categories = category::find_all(state.pool()).await?;
    Ok(Json(categories))
}

#[derive(Deserialize)]
pub struct TreeParams {
    #[serde(default)]
    pub include_counts: bool,
}

/// GET /api/categories/tree - 分类树 (可选商品计数汇总)
pub async fn tree(
    State(state): State<ServerState>,
    Query(params): Query<TreeParams>,
) -> AppResult<Json<Vec<CategoryNode>>> {
    let tree = catalog::query::category_tree(state.pool(), params.include_counts).await?;
    Ok(Json(tree))
}

/// GET /api/categories/:id - 获取单个分类
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Category>> {
    let found = category::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category {id} not found")))?;
    Ok(Json(found))
}

/// POST /api/categories - 创建分类
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    let created = category::create(state.pool(), payload).await?;
    tracing::info!(id = created.id, name = %created.name, "Category created");
    Ok(Json(created))
}

/// PUT /api/categories/:id - 更新分类 (移动/重排在同一事务内)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<Category>> {
    let updated = category::update(state.pool(), id, payload).await?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct DeleteParams {
    /// 被删分类下的商品转移到的目标分类; 缺省则转为未分类
    pub reparent_to: Option<i64>,
}

/// DELETE /api/categories/:id - 删除分类
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> AppResult<Json<CategoryDeleteResult>> {
    let result = category::delete(state.pool(), id, params.reparent_to).await?;
    tracing::info!(
        id,
        moved_products = result.moved_product_count,
        "Category deleted"
    );
    Ok(Json(result))
}
