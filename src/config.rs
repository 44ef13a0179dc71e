// 服务配置
//
// 所有配置都从环境变量读取（支持 .env 文件），无法解析时回退到默认值

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::resizer::pipeline::DEFAULT_MAX_DIMENSION;

/// 缩放服务配置
#[derive(Debug, Clone, PartialEq)]
pub struct ResizerConfig {
    /// 监听地址
    pub host: String,

    /// 监听端口
    pub port: u16,

    /// 缓存数据库文件
    pub db_path: PathBuf,

    /// 源站抓取超时
    pub fetch_timeout: Duration,

    /// 打开缓存存储的超时
    pub store_open_timeout: Duration,

    /// 缓存存储连接池大小
    pub store_max_connections: u32,

    /// 响应的 Cache-Control max-age（秒）
    pub cache_max_age: u32,

    /// 允许的最大目标边长（像素）
    pub max_dimension: u32,
}

impl Default for ResizerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            db_path: PathBuf::from("resizer.db"),
            fetch_timeout: Duration::from_millis(1000),
            store_open_timeout: Duration::from_millis(1000),
            store_max_connections: 4,
            cache_max_age: 3600,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl ResizerConfig {
    /// 从进程环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            db_path: lookup("RESIZER_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            fetch_timeout: Duration::from_millis(parse_or(
                &lookup,
                "RESIZER_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )),
            store_open_timeout: Duration::from_millis(parse_or(
                &lookup,
                "RESIZER_STORE_OPEN_TIMEOUT_MS",
                defaults.store_open_timeout.as_millis() as u64,
            )),
            store_max_connections: parse_or(
                &lookup,
                "RESIZER_STORE_MAX_CONNECTIONS",
                defaults.store_max_connections,
            ),
            cache_max_age: parse_or(&lookup, "RESIZER_CACHE_MAX_AGE", defaults.cache_max_age),
            max_dimension: parse_or(&lookup, "RESIZER_MAX_DIMENSION", defaults.max_dimension),
        }
    }

    /// 监听的 socket 地址
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Cache-Control 响应头的值
    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.cache_max_age)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}
