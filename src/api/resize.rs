use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::services::RequestContext;

/// 缩放请求参数
///
/// 宽高按字符串接收，解析失败由处理函数统一返回 500
#[derive(Debug, Deserialize)]
pub struct ResizeParams {
    pub url: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
}

/// 图片缩放 - 抓取（或读取缓存）源图片并缩放到 w x h
pub async fn resize_image(
    State(state): State<AppState>,
    Query(params): Query<ResizeParams>,
) -> ApiResult<Response> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidParams("missing url".to_string()))?;
    let width = parse_dimension("w", params.w.as_deref())?;
    let height = parse_dimension("h", params.h.as_deref())?;

    // 请求被丢弃（客户端断开）时取消源站抓取
    let cancel = CancellationToken::new();
    let _cancel_guard = cancel.clone().drop_guard();
    let ctx = RequestContext::new(state.config.fetch_timeout).with_cancellation(cancel);

    let span = tracing::info_span!(
        "resize",
        request_id = %Uuid::new_v4(),
        url = %url,
        width,
        height
    );

    let image = state
        .pipeline
        .fetch_resize(&ctx, &url, width, height)
        .instrument(span)
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.content_type)
        .header(header::CACHE_CONTROL, state.config.cache_control())
        .body(Body::from(image.bytes))
        .map_err(|e| ApiError::Internal(format!("Cannot build response: {}", e)))
}

/// 解析正整数尺寸
fn parse_dimension(name: &str, raw: Option<&str>) -> ApiResult<u32> {
    let raw = raw.ok_or_else(|| ApiError::InvalidParams(format!("missing {}", name)))?;

    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ApiError::InvalidParams(format!("{} must be positive", name))),
        Ok(value) => Ok(value),
        Err(e) => Err(ApiError::InvalidParams(format!("{}: {}", name, e))),
    }
}
