//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（上传分片 / URL）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 上传：Content-Type 存在性 → 白名单 → 体积校验。只信任声明类型做准入，
//!   解码阶段仍会按文件签名识别真实格式。
//! - URL：协议校验 → 单次 GET（不重试）→ 状态码 → 流式下载 + 体积上限。
//!   服务端声明的 Content-Type 不参与判断，交给解码阶段按签名识别。
//! - 网络错误统一映射到 `ImageError::Fetch`，便于上层按来源跳过。

use bytes::Bytes;

use super::source::RawImageData;
use super::{ImageConfig, ImageError, ImageHandler};

/// 允许摄取的图片 MIME 类型白名单。
pub(crate) const SUPPORTED_MIME_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

impl ImageHandler {
    /// 从表单上传分片加载图片原始字节。
    pub(super) fn load_from_upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        log::debug!(
            "📎 读取上传图片 - 文件: {} 类型: {:?} 大小: {} bytes",
            file_name,
            content_type,
            bytes.len()
        );

        let declared = content_type
            .map(Self::normalize_content_type)
            .filter(|ct| !ct.is_empty())
            .ok_or_else(|| ImageError::MissingContentType(file_name.to_string()))?;

        if !Self::is_supported_mime(&declared) {
            return Err(ImageError::UnsupportedFormat(declared));
        }

        if bytes.len() as u64 > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "上传文件过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(RawImageData {
            bytes,
            source_label: format!("upload:{}", file_name),
        })
    }

    /// 从 URL 加载图片原始字节。
    ///
    /// 单次尝试，失败即返回；调用方负责跳过空 URL。
    pub(super) async fn load_from_url(
        &self,
        url: &str,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        let redacted = Self::redact_url_for_log(url);
        log::info!("🌐 开始下载图片 - URL: {}", redacted);

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ImageError::Fetch(format!("URL 格式错误：{}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ImageError::Fetch(format!(
                "仅支持 HTTP/HTTPS：{}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "image/png,image/jpeg,image/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e, url))?;

        if !response.status().is_success() {
            return Err(ImageError::Fetch(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                Self::status_message(response.status().as_u16())
            )));
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            if size > config.max_file_size {
                return Err(ImageError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    config.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let initial_capacity = total_len
            .map(|len| len.min(config.max_file_size).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut response = response;
        let mut total: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ImageError::Fetch(format!("下载失败：{}", self.sanitize(&e, url))))?
        {
            total = total.saturating_add(chunk.len() as u64);
            if total > config.max_file_size {
                return Err(ImageError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes - URL: {}", total, redacted);

        Ok(RawImageData {
            bytes: Bytes::from(buffer),
            source_label: format!("url:{}", redacted),
        })
    }

    /// 去掉参数与大小写差异，得到 MIME 主类型。
    pub(crate) fn normalize_content_type(content_type: &str) -> String {
        content_type
            .split(';')
            .next()
            .map(|base| base.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub(crate) fn is_supported_mime(mime: &str) -> bool {
        SUPPORTED_MIME_TYPES.contains(&mime)
    }

    /// 日志用 URL：去掉 query 与 fragment，避免泄露令牌。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = parsed.path();

        format!("{}://{}{}{}", parsed.scheme(), host, port, path)
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str) -> ImageError {
        let err_msg = self.sanitize(&e, url);

        if e.is_timeout() {
            ImageError::Fetch(format!("下载超时：{}", err_msg))
        } else if e.is_connect() {
            ImageError::Fetch(format!("无法连接：{}", err_msg))
        } else {
            ImageError::Fetch(format!("请求失败：{}", err_msg))
        }
    }

    fn sanitize(&self, e: &reqwest::Error, url: &str) -> String {
        e.to_string().replace(url, &Self::redact_url_for_log(url))
    }

    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::{create_png_bytes, serve_once};

    fn handler() -> ImageHandler {
        ImageHandler::new(ImageConfig::default()).expect("handler init failed")
    }

    #[test]
    fn upload_without_content_type_is_rejected() {
        let handler = handler();
        let config = ImageConfig::default();

        let result =
            handler.load_from_upload("a.png", None, Bytes::from_static(b"x"), &config);

        assert!(matches!(result, Err(ImageError::MissingContentType(_))));
    }

    #[test]
    fn upload_with_unlisted_type_is_rejected_before_decode() {
        let handler = handler();
        let config = ImageConfig::default();

        let result = handler.load_from_upload(
            "a.gif",
            Some("image/gif"),
            Bytes::from_static(b"GIF89a"),
            &config,
        );

        assert!(matches!(result, Err(ImageError::UnsupportedFormat(ref ct)) if ct == "image/gif"));
    }

    #[test]
    fn upload_content_type_ignores_params_and_case() {
        let handler = handler();
        let config = ImageConfig::default();

        let result = handler.load_from_upload(
            "a.jpg",
            Some("IMAGE/JPEG; q=1"),
            Bytes::from_static(b"whatever"),
            &config,
        );

        assert!(result.is_ok());
    }

    #[test]
    fn oversized_upload_hits_resource_limit() {
        let handler = handler();
        let config = ImageConfig {
            max_file_size: 4,
            ..ImageConfig::default()
        };

        let result = handler.load_from_upload(
            "a.png",
            Some("image/png"),
            Bytes::from_static(b"0123456789"),
            &config,
        );

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted = ImageHandler::redact_url_for_log(
            "https://example.com:8443/path/img.png?token=abc123#hash",
        );

        assert_eq!(redacted, "https://example.com:8443/path/img.png");
    }

    #[tokio::test]
    async fn not_found_is_a_fetch_error() {
        let (addr, server) = serve_once("404 Not Found", "text/plain", b"nope".to_vec());
        let handler = handler();

        let url = format!("http://{}/missing.png", addr);
        let result = handler.load_from_url(&url, &ImageConfig::default()).await;

        server.join().expect("server thread failed");
        assert!(matches!(result, Err(ImageError::Fetch(ref msg)) if msg.contains("404")));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_a_fetch_error() {
        let handler = handler();

        let result = handler
            .load_from_url("ftp://example.com/a.png", &ImageConfig::default())
            .await;

        assert!(matches!(result, Err(ImageError::Fetch(_))));
    }

    #[tokio::test]
    async fn successful_download_returns_body() {
        let png = create_png_bytes(4, 3);
        let (addr, server) = serve_once("200 OK", "application/octet-stream", png.clone());
        let handler = handler();

        let url = format!("http://{}/a.png?sig=secret", addr);
        let raw = handler
            .load_from_url(&url, &ImageConfig::default())
            .await
            .expect("download should succeed");

        server.join().expect("server thread failed");
        assert_eq!(raw.bytes.as_ref(), png.as_slice());
        assert!(!raw.source_label.contains("secret"));
    }

    #[tokio::test]
    async fn download_larger_than_limit_is_rejected() {
        let (addr, server) = serve_once("200 OK", "image/png", vec![0u8; 64]);
        let handler = handler();
        let config = ImageConfig {
            max_file_size: 16,
            ..ImageConfig::default()
        };

        let url = format!("http://{}/big.png", addr);
        let result = handler.load_from_url(&url, &config).await;

        server.join().expect("server thread failed");
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }
}
