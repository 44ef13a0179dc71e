// 缩放模块错误类型定义
//
// 定义了抓取、缓存、转换过程中可能出现的各种错误类型

use thiserror::Error;

/// 缩放流水线的统一错误类型
///
/// 对外只区分"无法获取源图片"和"转换失败"，底层细节只写入日志
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("无效的目标尺寸: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("无法获取源图片")]
    CannotFetch,

    #[error("转换错误: {0}")]
    Transform(#[from] TransformError),
}

/// 源站抓取相关错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("源站响应异常: 状态码 {0}")]
    BadResponse(u16),

    #[error("网络错误: {0}")]
    CannotFetch(String),

    #[error("抓取超时")]
    Timeout,

    #[error("请求已取消")]
    Cancelled,
}

/// 图片转换相关错误
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("源图片解码失败: {0}")]
    InvalidSourceImage(String),

    #[error("转换失败: {0}")]
    TransformFailed(String),
}

/// 持久化存储相关错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("打开存储失败: {0}")]
    Open(String),
}

// 实现从 reqwest::Error 到 FetchError 的转换
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_status() {
            if let Some(status) = err.status() {
                FetchError::BadResponse(status.as_u16())
            } else {
                FetchError::CannotFetch(err.to_string())
            }
        } else {
            FetchError::CannotFetch(err.to_string())
        }
    }
}
