// 缓存键 - 由源图片 URL 派生的内容寻址键

use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fmt;

/// 缓存键：URL 的 SHA-256 摘要
///
/// 相同 URL 必然得到相同的键；碰撞概率可以忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(Output<Sha256>);

impl CacheKey {
    /// 从源图片 URL 生成缓存键（忽略首尾空白）
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.trim().as_bytes());
        Self(hasher.finalize())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}
