//! 工具模块
//!
//! 统一错误类型 re-export 自 shared，保证边缘服务和客户端共用同一套
//! 错误码。

pub mod logger;

pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
