// 图片转换策略
//
// 本模块定义统一的缩放接口，包括：
// - Resizer trait（所有策略共用同一签名）
// - JPEG 缩放（解码、Lanczos 缩放、重新编码）
// - 透传（原样复制，用于不认识的格式）

use crate::services::resizer::error::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ColorType;

/// JPEG 重新编码质量
pub const JPEG_QUALITY: u8 = 95;

/// 缩放策略
///
/// 实现者不能持有单次调用的可变状态，同一实例会被并发调用。
pub trait Resizer: Send + Sync {
    /// 将 `input` 缩放到 `width` x `height`，结果追加写入 `output`
    fn resize(
        &self,
        content_type: &str,
        input: &[u8],
        output: &mut Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<(), TransformError>;
}

/// JPEG 缩放器
///
/// 精确缩放到目标尺寸，不保持宽高比。尺寸不在这里校验。
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegResizer;

impl Resizer for JpegResizer {
    fn resize(
        &self,
        _content_type: &str,
        input: &[u8],
        output: &mut Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<(), TransformError> {
        // 格式由字节内容识别，不依赖声明的 content-type
        let img = image::load_from_memory(input)
            .map_err(|e| TransformError::InvalidSourceImage(e.to_string()))?;

        let resized = img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8();

        let mut encoder = JpegEncoder::new_with_quality(output, JPEG_QUALITY);
        encoder
            .encode(
                resized.as_raw(),
                resized.width(),
                resized.height(),
                ColorType::Rgb8,
            )
            .map_err(|e| TransformError::TransformFailed(format!("JPEG 编码失败: {}", e)))?;

        Ok(())
    }
}

/// 透传缩放器：原样复制输入
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResizer;

impl Resizer for PassthroughResizer {
    fn resize(
        &self,
        _content_type: &str,
        input: &[u8],
        output: &mut Vec<u8>,
        _width: u32,
        _height: u32,
    ) -> Result<(), TransformError> {
        output.extend_from_slice(input);
        Ok(())
    }
}
