//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`categories`] - 分类管理接口 (树/重排/删除转移)
//! - [`products`] - 商品管理接口 (列表/分页/排序)
//! - [`orders`] - 订单管理接口 (创建/状态流转)

pub mod categories;
pub mod health;
pub mod orders;
pub mod products;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
