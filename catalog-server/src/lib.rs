//! Catalog Server - 电商目录管理后端
//!
//! # 架构概述
//!
//! - **分类树** (`catalog::tree`): 内存中的父子树解析, 容忍孤儿和环
//! - **重排引擎** (`catalog::position`): 同域/跨域位置移动, 事务内位移
//! - **查询服务** (`catalog::query`): 含后代的商品列表与计数汇总
//! - **订单** (`orders`): 有界重试的唯一单号生成
//! - **数据库** (`db`): SQLite (WAL) 连接池、迁移与仓储层
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! catalog-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── api/           # HTTP 路由和处理器
//! ├── catalog/       # 树解析、重排引擎、查询服务
//! ├── orders/        # 订单单号生成
//! ├── db/            # 连接池、迁移、仓储
//! └── utils/         # 日志、统一错误
//! ```

pub mod api;
pub mod catalog;
pub mod core;
pub mod db;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
///
/// 必须在读取 [`Config`] 之前调用, 否则 .env 中的变量不生效
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在不是错误
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}
