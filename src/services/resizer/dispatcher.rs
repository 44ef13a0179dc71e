// 按 content-type 分派缩放策略

use crate::services::resizer::error::TransformError;
use crate::services::resizer::transform::{JpegResizer, PassthroughResizer, Resizer};
use std::collections::HashMap;
use std::sync::Arc;

/// 按 content-type 选择缩放器
///
/// 映射表在构建完成后只读，找不到精确匹配时使用默认缩放器。
/// 不做前缀或通配符匹配。
pub struct ContentTypeResizer {
    mapping: HashMap<String, Arc<dyn Resizer>>,
    default_resizer: Arc<dyn Resizer>,
}

impl ContentTypeResizer {
    /// 创建只有默认缩放器的分派器
    pub fn new(default_resizer: Arc<dyn Resizer>) -> Self {
        Self {
            mapping: HashMap::new(),
            default_resizer,
        }
    }

    /// 注册 content-type 对应的缩放器（键统一转小写）
    pub fn register(mut self, content_type: &str, resizer: Arc<dyn Resizer>) -> Self {
        self.mapping.insert(content_type.to_lowercase(), resizer);
        self
    }

    /// 默认注册表：JPEG 走缩放，其他格式原样透传
    pub fn with_defaults() -> Self {
        let jpeg: Arc<dyn Resizer> = Arc::new(JpegResizer);
        Self::new(Arc::new(PassthroughResizer))
            .register("image/jpeg", jpeg.clone())
            .register("image/jpg", jpeg)
    }

    /// 选择 content-type 对应的缩放器
    fn select(&self, content_type: &str) -> &Arc<dyn Resizer> {
        self.mapping
            .get(content_type)
            .unwrap_or(&self.default_resizer)
    }

    /// 已注册的 content-type 数量
    pub fn registered_count(&self) -> usize {
        self.mapping.len()
    }
}

impl Resizer for ContentTypeResizer {
    fn resize(
        &self,
        content_type: &str,
        input: &[u8],
        output: &mut Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<(), TransformError> {
        self.select(content_type)
            .resize(content_type, input, output, width, height)
    }
}
