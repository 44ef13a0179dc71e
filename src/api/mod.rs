pub mod error;
pub mod health;
pub mod resize;
pub mod response;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ResizerConfig;
use crate::services::ResizePipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResizePipeline>,
    pub config: Arc<ResizerConfig>,
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(resize::resize_image))
        .route("/resize", get(resize::resize_image))
        .route("/health", get(health::health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
