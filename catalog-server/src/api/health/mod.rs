//! Health API 模块

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    database: &'static str,
    timestamp: i64,
}

/// GET /api/health - 健康检查 (含数据库探活)
async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthStatus>> {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!("Health check database probe failed: {e}");
            "unavailable"
        }
    };
    Ok(Json(HealthStatus {
        status: "ok",
        database,
        timestamp: shared::util::now_millis(),
    }))
}
