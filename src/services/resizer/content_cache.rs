// 内容缓存 - 持久化保存抓取到的源图片
//
// 本模块基于单个 SQLite 文件提供只写一次的缓存，包括：
// - 两个键值空间：content-type 和原始字节
// - 查找时两半都存在才算命中
// - 写入失败由调用方记录日志，不影响当前请求

use crate::services::resizer::cache_key::CacheKey;
use crate::services::resizer::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// content-type 键值空间
const CONTENT_TYPE_SPACE: &str = "content_types";

/// 原始字节键值空间
const PAYLOAD_SPACE: &str = "payloads";

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content_type: String,
    pub payload: Vec<u8>,
}

/// 内容缓存
///
/// 句柄可以克隆，并发查找和并发写入不同键都不需要调用方加锁。
/// 同一个键的并发写入谁最后提交谁生效。
#[derive(Debug, Clone)]
pub struct ContentCache {
    pool: Pool<Sqlite>,
}

impl ContentCache {
    /// 打开缓存文件并确保两个键值空间存在
    ///
    /// # 参数
    /// - `path`: SQLite 文件路径，不存在时自动创建
    /// - `open_timeout`: 获取连接和等待锁的超时时间
    /// - `max_connections`: 连接池大小
    ///
    /// # 返回
    /// - `Err(StoreError)`: 打开失败或键值空间创建失败，属于启动期致命错误
    pub async fn open(
        path: impl AsRef<Path>,
        open_timeout: Duration,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("打开缓存存储: {}", path.display());

        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(open_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(open_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Open(format!("{}: {}", path.display(), e)))?;

        ensure_spaces(&pool).await?;

        Ok(Self { pool })
    }

    /// 查找缓存条目
    ///
    /// 只有 content-type 和字节都存在才返回 `Some`，只有一半视为未命中。
    /// 未找到不是错误。
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let content_type = sqlx::query_scalar::<_, String>(
            "SELECT content_type FROM content_types WHERE key = ?",
        )
        .bind(key.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        let Some(content_type) = content_type else {
            return Ok(None);
        };

        let payload =
            sqlx::query_scalar::<_, Vec<u8>>("SELECT payload FROM payloads WHERE key = ?")
                .bind(key.as_bytes())
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(payload) => Ok(Some(CacheEntry {
                content_type,
                payload,
            })),
            None => {
                debug!("缓存条目不完整，视为未命中: {}", key);
                Ok(None)
            }
        }
    }

    /// 写入缓存条目（同一事务内写两个键值空间）
    pub async fn store(
        &self,
        key: &CacheKey,
        content_type: &str,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR REPLACE INTO content_types (key, content_type) VALUES (?, ?)")
            .bind(key.as_bytes())
            .bind(content_type)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT OR REPLACE INTO payloads (key, payload) VALUES (?, ?)")
            .bind(key.as_bytes())
            .bind(payload)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("缓存已写入: {} ({} 字节)", key, payload.len());
        Ok(())
    }

    /// 完整条目数量
    pub async fn entry_count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM content_types c INNER JOIN payloads p ON c.key = p.key",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

/// 创建并校验两个键值空间（幂等）
async fn ensure_spaces(pool: &Pool<Sqlite>) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS content_types (
            key BLOB PRIMARY KEY NOT NULL,
            content_type TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::Open(format!("创建 {} 失败: {}", CONTENT_TYPE_SPACE, e)))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS payloads (
            key BLOB PRIMARY KEY NOT NULL,
            payload BLOB NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::Open(format!("创建 {} 失败: {}", PAYLOAD_SPACE, e)))?;

    for space in [CONTENT_TYPE_SPACE, PAYLOAD_SPACE] {
        let exists = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
            .bind(space)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            return Err(StoreError::Open(format!("键值空间 '{}' 不存在", space)));
        }
    }

    Ok(())
}
