// 图片缩放代理库
//
// 本库提供按需缩放远程图片的核心功能，包括：
// - API 路由
// - 源图片持久化缓存
// - 源站抓取
// - 按 content-type 分派的缩放策略

pub mod api;
pub mod config;
pub mod services;

pub use config::ResizerConfig;
pub use services::resizer::{
    ContentCache, ContentTypeResizer, HttpFetcher, RequestContext, ResizeError, ResizePipeline,
    ResizedImage,
};
