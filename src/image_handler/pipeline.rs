//! # 解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做签名与尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 通过文件签名（magic bytes）识别真实格式，必须命中 PNG / JPEG 白名单
//! 2. 读取 header 尺寸，按像素上限快速拒绝
//! 3. 按识别出的格式完整解码
//! 4. 转换 RGBA

use image::{GenericImageView, ImageFormat};
use std::io::Cursor;

use super::source::{DecodedImage, RawImageData};
use super::{ImageConfig, ImageError, ImageHandler};

impl ImageHandler {
    /// 将原始字节解码为单帧内使用的 RGBA 位图。
    pub(crate) fn decode_bitmap(
        &self,
        raw: RawImageData,
        config: &ImageConfig,
    ) -> Result<DecodedImage, ImageError> {
        let format = Self::sniff_format(&raw.bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions(&raw.bytes, format)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory_with_format(&raw.bytes, format)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::Decode("图片尺寸为 0".to_string()));
        }

        log::debug!(
            "✅ 图片解码成功 - 来源: {} 格式: {:?} 尺寸: {}x{}",
            raw.source_label,
            format,
            width,
            height
        );

        Ok(DecodedImage::new(raw.source_label, decoded.to_rgba8()))
    }

    /// 通过文件签名识别格式，不信任任何声明类型。
    fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        match kind.mime_type() {
            "image/png" => Ok(ImageFormat::Png),
            "image/jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(ImageError::Decode(format!(
                "文件签名不在支持列表内：{}",
                other
            ))),
        }
    }

    /// 仅通过图片头信息读取宽高。
    fn inspect_dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), ImageError> {
        image::ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::{create_jpeg_bytes, create_png_bytes};
    use bytes::Bytes;

    fn raw(bytes: Vec<u8>) -> RawImageData {
        RawImageData {
            bytes: Bytes::from(bytes),
            source_label: "test".to_string(),
        }
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let config = ImageConfig::default();

        let png = handler
            .decode_bitmap(raw(create_png_bytes(7, 5)), &config)
            .expect("png should decode");
        assert_eq!((png.width(), png.height()), (7, 5));

        let jpeg = handler
            .decode_bitmap(raw(create_jpeg_bytes(16, 8)), &config)
            .expect("jpeg should decode");
        assert_eq!((jpeg.width(), jpeg.height()), (16, 8));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let mut png = create_png_bytes(32, 32);
        png.truncate(png.len() / 2);

        let result = handler.decode_bitmap(raw(png), &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn html_body_is_a_decode_error() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let result = handler.decode_bitmap(
            raw(b"<html><body>not an image</body></html>".to_vec()),
            &ImageConfig::default(),
        );

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn gif_signature_is_outside_whitelist() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();

        let result = handler.decode_bitmap(raw(gif), &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::Decode(ref msg)) if msg.contains("image/gif")));
    }

    #[test]
    fn rejects_too_many_pixels_before_decode() {
        let config = ImageConfig {
            max_decoded_pixels: 1_000,
            ..ImageConfig::default()
        };
        let handler = ImageHandler::new(config.clone()).expect("handler init failed");

        let result = handler.decode_bitmap(raw(create_png_bytes(100, 100)), &config);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }
}
