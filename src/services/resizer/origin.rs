// 源站抓取器 - 从远程 URL 获取原始图片
//
// 本模块提供单次 GET 抓取，包括：
// - 调用方传入的取消令牌和截止时间
// - 非 2xx 响应报错并排空响应体
// - 响应体按块写入调用方的缓冲
//
// content-type 直接取自响应头，未经校验，不做字节嗅探。

use crate::services::resizer::error::FetchError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 单个请求的上下文：取消令牌 + 截止时间
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// 创建在 `timeout` 后到期的上下文
    pub fn new(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// 没有截止时间的上下文
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// 使用外部的取消令牌
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 源站抓取接口
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// 抓取 `url`，响应体追加写入 `buf`，返回小写的 content-type
    async fn fetch(
        &self,
        ctx: &RequestContext,
        url: &str,
        buf: &mut Vec<u8>,
    ) -> Result<String, FetchError>;
}

/// 基于 reqwest 的 HTTP 抓取器
///
/// 只尝试一次，是否重试由调用方决定。
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// 创建抓取器
    ///
    /// # 参数
    /// - `timeout`: 客户端级别的总超时，作为请求上下文之外的兜底
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| FetchError::CannotFetch(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client })
    }

    /// 使用已有的客户端
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// 执行一次抓取（不含取消和截止时间处理）
    async fn fetch_once(&self, url: &str, buf: &mut Vec<u8>) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            drain(&mut response).await;
            return Err(FetchError::BadResponse(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        while let Some(chunk) = response.chunk().await? {
            buf.extend_from_slice(&chunk);
        }

        debug!("源站抓取完成: {} ({} 字节, {})", url, buf.len(), content_type);
        Ok(content_type)
    }
}

#[async_trait]
impl OriginFetcher for HttpFetcher {
    async fn fetch(
        &self,
        ctx: &RequestContext,
        url: &str,
        buf: &mut Vec<u8>,
    ) -> Result<String, FetchError> {
        if ctx.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let fetch = self.fetch_once(url, buf);
        let bounded = async {
            match ctx.deadline() {
                Some(deadline) => tokio::time::timeout_at(deadline, fetch)
                    .await
                    .unwrap_or(Err(FetchError::Timeout)),
                None => fetch.await,
            }
        };

        // 取消或超时时 future 被丢弃，响应和连接随之释放
        tokio::select! {
            result = bounded => result,
            _ = ctx.cancellation().cancelled() => Err(FetchError::Cancelled),
        }
    }
}

/// 读完剩余的响应体，让连接可以回到连接池
async fn drain(response: &mut Response) {
    loop {
        match response.chunk().await {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!("排空响应体失败: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_lowercases_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img.jpg")
            .with_status(200)
            .with_header("content-type", "Image/JPEG")
            .with_body(b"jpeg bytes")
            .expect(1)
            .create_async()
            .await;

        let fetcher = create_test_fetcher();
        let mut buf = Vec::new();
        let content_type = fetcher
            .fetch(
                &RequestContext::new(Duration::from_secs(5)),
                &format!("{}/img.jpg", server.url()),
                &mut buf,
            )
            .await
            .unwrap();

        assert_eq!(content_type, "image/jpeg");
        assert_eq!(buf, b"jpeg bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_missing_content_type() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/raw")
            .with_status(200)
            .with_body("raw")
            .create_async()
            .await;

        let mut buf = Vec::new();
        let content_type = create_test_fetcher()
            .fetch(
                &RequestContext::background(),
                &format!("{}/raw", server.url()),
                &mut buf,
            )
            .await
            .unwrap();

        assert_eq!(content_type, "");
        assert_eq!(buf, b"raw");
    }

    #[tokio::test]
    async fn test_fetch_bad_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let mut buf = Vec::new();
        let result = create_test_fetcher()
            .fetch(
                &RequestContext::new(Duration::from_secs(5)),
                &format!("{}/missing.jpg", server.url()),
                &mut buf,
            )
            .await;

        assert!(matches!(result, Err(FetchError::BadResponse(404))));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let mut buf = Vec::new();
        let fetcher = create_test_fetcher();
        let ctx = RequestContext::new(Duration::from_secs(1));

        let result = fetcher.fetch(&ctx, "not a url", &mut buf).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));

        let result = fetcher.fetch(&ctx, "ftp://example.com/a.jpg", &mut buf).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // 绑定后立即释放端口，保证没有服务在监听
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut buf = Vec::new();
        let result = create_test_fetcher()
            .fetch(
                &RequestContext::new(Duration::from_secs(5)),
                &format!("http://{}/img.jpg", addr),
                &mut buf,
            )
            .await;

        assert!(matches!(result, Err(FetchError::CannotFetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_already_cancelled() {
        let ctx = RequestContext::new(Duration::from_secs(5));
        ctx.cancellation().cancel();

        let mut buf = Vec::new();
        let result = create_test_fetcher()
            .fetch(&ctx, "http://127.0.0.1:1/img.jpg", &mut buf)
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_while_waiting() {
        // 接受连接但从不响应的服务器
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let token = CancellationToken::new();
        let ctx = RequestContext::new(Duration::from_secs(30)).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let mut buf = Vec::new();
        let start = std::time::Instant::now();
        let result = create_test_fetcher()
            .fetch(&ctx, &format!("http://{}/slow.jpg", addr), &mut buf)
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(5));

        canceller.await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn test_fetch_deadline_exceeded() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let ctx = RequestContext::new(Duration::from_millis(100));
        let mut buf = Vec::new();
        let result = create_test_fetcher()
            .fetch(&ctx, &format!("http://{}/slow.jpg", addr), &mut buf)
            .await;

        assert!(matches!(result, Err(FetchError::Timeout)));
        server.abort();
    }
}
