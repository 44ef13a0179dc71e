// 缩放流水线 - 协调缓存、抓取和转换
//
// 处理流程：缓存查找 -> 未命中时抓取源站 -> 回填缓存 -> 分派缩放

use crate::services::resizer::buffer_pool::{BufferPool, PooledBuffer, BUFFER_POOL};
use crate::services::resizer::cache_key::CacheKey;
use crate::services::resizer::content_cache::ContentCache;
use crate::services::resizer::error::{FetchError, ResizeError, TransformError};
use crate::services::resizer::origin::{OriginFetcher, RequestContext};
use crate::services::resizer::transform::Resizer;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, warn};

/// 默认允许的最大边长（像素）
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// 缩放结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    /// 源图片的 content-type
    pub content_type: String,
    /// 缩放后的字节
    pub bytes: Vec<u8>,
}

/// 缩放流水线
///
/// 可以在多个请求之间共享，内部没有按请求的可变状态。
pub struct ResizePipeline {
    cache: ContentCache,
    fetcher: Arc<dyn OriginFetcher>,
    resizer: Arc<dyn Resizer>,
    buffers: Arc<BufferPool>,
    max_dimension: u32,
}

impl ResizePipeline {
    /// 创建流水线，使用进程级缓冲池
    pub fn new(
        cache: ContentCache,
        fetcher: Arc<dyn OriginFetcher>,
        resizer: Arc<dyn Resizer>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            resizer,
            buffers: Arc::clone(&*BUFFER_POOL),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// 设置允许的最大边长，超出的请求在查缓存之前被拒绝
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// 替换缓冲池
    pub fn with_buffer_pool(mut self, buffers: Arc<BufferPool>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// 获取源图片并缩放到 `width` x `height`
    ///
    /// # 返回
    /// - `Ok(ResizedImage)`: 源图片的 content-type 和缩放结果
    /// - `Err(ResizeError::InvalidDimensions)`: 宽或高为 0，或超过最大边长
    /// - `Err(ResizeError::CannotFetch)`: 缓存未命中且源站抓取失败
    /// - `Err(ResizeError::Transform)`: 解码或编码失败
    ///
    /// # 行为
    /// - 缓存按 URL 建键，与目标尺寸无关
    /// - 缓存写入失败只记录日志，不影响本次响应
    pub async fn fetch_resize(
        &self,
        ctx: &RequestContext,
        url: &str,
        width: u32,
        height: u32,
    ) -> Result<ResizedImage, ResizeError> {
        if width == 0 || height == 0 || width > self.max_dimension || height > self.max_dimension
        {
            return Err(ResizeError::InvalidDimensions { width, height });
        }

        let key = CacheKey::from_url(url);
        let mut source = self.buffers.acquire();

        let content_type = match self.load_source(ctx, url, &key, &mut source).await {
            Ok(content_type) => content_type,
            Err(e) => {
                warn!("获取源图片失败: {} - 错误: {}", url, e);
                return Err(ResizeError::CannotFetch);
            }
        };

        let bytes = self.transform(content_type.clone(), source, width, height).await?;

        Ok(ResizedImage {
            content_type,
            bytes,
        })
    }

    /// 把源图片读入 `buf`：先查缓存，未命中再抓取并回填
    async fn load_source(
        &self,
        ctx: &RequestContext,
        url: &str,
        key: &CacheKey,
        buf: &mut PooledBuffer,
    ) -> Result<String, FetchError> {
        match self.cache.lookup(key).await {
            Ok(Some(entry)) => {
                debug!("缓存命中: {} ({})", url, key);
                buf.extend_from_slice(&entry.payload);
                return Ok(entry.content_type);
            }
            Ok(None) => debug!("缓存未命中: {} ({})", url, key),
            Err(e) => warn!("缓存查找失败，回退到源站: {} - 错误: {}", url, e),
        }

        let content_type = self.fetcher.fetch(ctx, url, buf).await?;

        self.fill_cache(*key, &content_type, &buf[..]).await;

        Ok(content_type)
    }

    /// 回填缓存（尽力而为）
    ///
    /// 写入在独立任务中执行，请求被取消时写入仍会完成。
    async fn fill_cache(&self, key: CacheKey, content_type: &str, payload: &[u8]) {
        let cache = self.cache.clone();
        let content_type = content_type.to_string();
        let payload = payload.to_vec();

        let handle = tokio::spawn(async move {
            cache.store(&key, &content_type, &payload).await
        });

        match handle.await {
            Ok(Ok(())) => info!("缓存已回填: {}", key),
            Ok(Err(e)) => warn!("缓存写入失败: {} - 错误: {}", key, e),
            Err(e) => warn!("缓存写入任务执行失败: {} - 错误: {}", key, e),
        }
    }

    /// 在阻塞线程池中执行缩放
    ///
    /// 源缓冲随闭包移动，结束（包括 panic）时归还缓冲池。
    async fn transform(
        &self,
        content_type: String,
        source: PooledBuffer,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ResizeError> {
        let resizer = Arc::clone(&self.resizer);

        let result = task::spawn_blocking(move || {
            let mut output = Vec::new();
            resizer
                .resize(&content_type, &source, &mut output, width, height)
                .map(|_| output)
        })
        .await
        .map_err(|e| TransformError::TransformFailed(format!("任务执行失败: {}", e)))?;

        Ok(result?)
    }
}
