use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::services::resizer::{ResizeError, TransformError};

/// 统一的API错误类型
///
/// 所有错误都返回 500，响应体只包含错误类别，内部细节只写日志
#[derive(Debug)]
pub enum ApiError {
    /// 请求参数无法解析
    InvalidParams(String),
    /// 无法获取源图片
    Fetch,
    /// 缩放失败
    Resize(String),
    /// 内部服务器错误
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidParams(msg) => write!(f, "Invalid params: {}", msg),
            ApiError::Fetch => write!(f, "Cannot fetch source image"),
            ApiError::Resize(msg) => write!(f, "Resize error: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// 从ResizeError转换
impl From<ResizeError> for ApiError {
    fn from(err: ResizeError) -> Self {
        match err {
            ResizeError::InvalidDimensions { .. } => ApiError::InvalidParams(err.to_string()),
            ResizeError::CannotFetch => ApiError::Fetch,
            ResizeError::Transform(TransformError::InvalidSourceImage(msg)) => {
                ApiError::Resize(format!("invalid source image: {}", msg))
            }
            ResizeError::Transform(TransformError::TransformFailed(msg)) => ApiError::Resize(msg),
        }
    }
}

/// 实现IntoResponse，将错误转换为HTTP响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);

        let (error_type, message) = match self {
            ApiError::InvalidParams(_) => ("invalid_params", "Cannot parse request"),
            ApiError::Fetch => ("fetch_failed", "Cannot fetch source image"),
            ApiError::Resize(_) => ("resize_failed", "Cannot resize image"),
            ApiError::Internal(_) => ("internal_error", "An internal server error occurred"),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;
