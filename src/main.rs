use std::sync::Arc;

use media_resizer::api::{self, AppState};
use media_resizer::{ContentCache, ContentTypeResizer, HttpFetcher, ResizePipeline, ResizerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = ResizerConfig::from_env();
    tracing::info!("Starting with config: {:?}", config);

    // 缓存存储打不开或键值空间创建失败都直接退出
    let cache = ContentCache::open(
        &config.db_path,
        config.store_open_timeout,
        config.store_max_connections,
    )
    .await?;

    let fetcher = HttpFetcher::new(config.fetch_timeout)?;
    let resizer = ContentTypeResizer::with_defaults();
    tracing::info!("Registered {} content types", resizer.registered_count());

    let pipeline = ResizePipeline::new(cache, Arc::new(fetcher), Arc::new(resizer))
        .with_max_dimension(config.max_dimension);

    let addr = config.socket_addr()?;
    let app = api::router(AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    });

    tracing::info!("🚀 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
