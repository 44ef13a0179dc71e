// 缩放模块 - 按需缩放远程图片
//
// 本模块提供图片缩放代理的核心流程，包括：
// - 按 URL 摘要寻址的持久化缓存
// - 未命中时从源站抓取并回填缓存
// - 按 content-type 分派的缩放策略
// - 可复用的源图片缓冲

pub mod buffer_pool;
pub mod cache_key;
pub mod content_cache;
pub mod dispatcher;
pub mod error;
pub mod origin;
pub mod pipeline;
pub mod transform;

pub use buffer_pool::{BufferPool, PooledBuffer, BUFFER_POOL};
pub use cache_key::CacheKey;
pub use content_cache::{CacheEntry, ContentCache};
pub use dispatcher::ContentTypeResizer;
pub use error::{FetchError, ResizeError, StoreError, TransformError};
pub use origin::{HttpFetcher, OriginFetcher, RequestContext};
pub use pipeline::{ResizePipeline, ResizedImage};
pub use transform::{JpegResizer, PassthroughResizer, Resizer};
