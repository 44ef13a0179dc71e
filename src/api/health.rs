use axum::{extract::State, response::IntoResponse};

use super::error::{ApiError, ApiResult};
use super::response::{success, HealthReport};
use super::AppState;

/// 健康检查端点
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    // 检查缓存存储是否可用
    let cached_entries = state.pipeline.cache().entry_count().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::Internal("Cache store unavailable".to_string())
    })?;

    Ok(success(HealthReport {
        status: "ok",
        cached_entries,
    }))
}
