// 字节缓冲池 - 复用源图片缓冲，避免每个请求重新分配

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// 最多保留的空闲缓冲数量
const DEFAULT_MAX_IDLE: usize = 64;

/// 超过该容量的缓冲归还时直接丢弃（16 MB）
const DEFAULT_MAX_RETAINED_CAPACITY: usize = 16 * 1024 * 1024;

lazy_static::lazy_static! {
    /// 进程级共享缓冲池
    pub static ref BUFFER_POOL: Arc<BufferPool> = Arc::new(BufferPool::default());
}

/// 可复用的字节缓冲池
///
/// 取出的缓冲总是清空的；归还发生在 [`PooledBuffer`] 析构时，
/// 所以提前返回、出错甚至 panic 时缓冲也会回到池中。
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    max_retained_capacity: usize,
}

impl BufferPool {
    pub fn new(max_idle: usize, max_retained_capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            max_retained_capacity,
        }
    }

    /// 取出一个已清空的缓冲
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let mut buf = self
            .buffers
            .lock()
            .ok()
            .and_then(|mut buffers| buffers.pop())
            .unwrap_or_default();
        buf.clear();

        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    /// 当前空闲缓冲数量
    pub fn idle_count(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_retained_capacity {
            return;
        }
        buf.clear();

        if let Ok(mut buffers) = self.buffers.lock() {
            if buffers.len() < self.max_idle {
                buffers.push(buf);
            }
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE, DEFAULT_MAX_RETAINED_CAPACITY)
    }
}

/// 从池中借出的缓冲，析构时自动归还
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.release(buf);
    }
}
