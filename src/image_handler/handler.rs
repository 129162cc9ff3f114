//! # 摄取编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排，不关心来源从哪里被解析出来，也不关心渲染。
//! 单个来源的处理链路固定为：
//! 1. 跳过空 URL（不尝试、不报错）
//! 2. 按来源加载原始字节
//! 3. 按签名识别格式并解码
//!
//! ## 实现思路
//!
//! - 每个来源的失败都被记录并累积到 `IngestReport`，绝不中断整批处理。
//! - 输出顺序与输入顺序一致，后续网格布局依赖这一点。
//! - 记录 `load/decode/total` 阶段耗时，便于性能诊断。

use std::time::{Duration, Instant};

use super::source::{DecodedImage, RawImageData};
use super::{ImageConfig, ImageError, ImageSource};

/// 单个来源的失败记录。
#[derive(Debug)]
pub struct SourceFailure {
    /// 来源描述（URL 已脱敏）。
    pub source: String,
    pub error: ImageError,
}

/// 一批来源的摄取结果。
#[derive(Debug, Default)]
pub struct IngestReport {
    /// 成功解码的图片，保持输入顺序。
    pub images: Vec<DecodedImage>,
    pub failures: Vec<SourceFailure>,
    /// 被静默跳过的空 URL 数量。
    pub skipped: usize,
}

impl IngestReport {
    /// 指定错误代码的失败次数。
    pub fn failure_count(&self, code: &str) -> usize {
        self.failures
            .iter()
            .filter(|failure| failure.error.code() == code)
            .count()
    }
}

/// 图片摄取处理器。
///
/// 封装了配置与复用型 HTTP 客户端，并编排各子模块实现完整流程。
pub struct ImageHandler {
    pub(super) config: ImageConfig,
    pub(super) client: reqwest::Client,
}

impl ImageHandler {
    /// 根据配置创建处理器。
    ///
    /// 这里同时构建复用型 HTTP 客户端，减少每次请求的初始化开销。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use pi_chart::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), pi_chart::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.download_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ImageError::Fetch(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self { config, client })
    }

    /// 处理主入口：依次摄取所有来源。
    ///
    /// 逐个串行处理，单次尝试，无重试。
    pub async fn ingest_all(&self, sources: Vec<ImageSource>) -> IngestReport {
        let total_start = Instant::now();
        let source_count = sources.len();
        let mut report = IngestReport::default();

        for source in sources {
            if let ImageSource::Url(url) = &source {
                if url.trim().is_empty() {
                    report.skipped += 1;
                    continue;
                }
            }

            let label = source.label();
            match self.ingest_one(source).await {
                Ok(image) => report.images.push(image),
                Err(error) => {
                    log::warn!("⚠️ 跳过图片来源 {} [{}]：{}", label, error.code(), error);
                    report.failures.push(SourceFailure {
                        source: label,
                        error,
                    });
                }
            }
        }

        log::info!(
            "🖼️ 摄取完成 - 来源: {} 成功: {} 失败: {} 跳过: {} total={}ms",
            source_count,
            report.images.len(),
            report.failures.len(),
            report.skipped,
            total_start.elapsed().as_millis()
        );

        report
    }

    /// 处理单个来源：加载 → 解码。
    pub async fn ingest_one(&self, source: ImageSource) -> Result<DecodedImage, ImageError> {
        let config = &self.config;

        let load_start = Instant::now();
        let raw: RawImageData = match source {
            ImageSource::Upload {
                file_name,
                content_type,
                bytes,
            } => self.load_from_upload(&file_name, content_type.as_deref(), bytes, config)?,
            ImageSource::Url(url) => self.load_from_url(url.trim(), config).await?,
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let image = self.decode_bitmap(raw, config)?;
        let decode_elapsed = decode_start.elapsed();

        log::debug!(
            "✅ 图片就绪 - {} load={}ms decode={}ms",
            image.label,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis()
        );

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::{create_png_bytes, serve_once, upload};

    #[tokio::test]
    async fn empty_url_is_skipped_without_fetch_error() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let report = handler
            .ingest_all(vec![ImageSource::Url(String::new()), ImageSource::Url("  ".into())])
            .await;

        assert_eq!(report.skipped, 2);
        assert!(report.images.is_empty());
        assert_eq!(report.failure_count("FetchError"), 0);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn bad_sources_do_not_stop_the_batch() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let report = handler
            .ingest_all(vec![
                upload("a.png", Some("image/png"), create_png_bytes(2, 2)),
                upload("b.bmp", Some("image/bmp"), vec![1, 2, 3]),
                upload("c.png", None, create_png_bytes(2, 2)),
                upload("d.png", Some("image/png"), b"garbage".to_vec()),
                upload("e.png", Some("image/png"), create_png_bytes(3, 1)),
            ])
            .await;

        let sizes: Vec<(u32, u32)> = report
            .images
            .iter()
            .map(|img| (img.width(), img.height()))
            .collect();
        assert_eq!(sizes, vec![(2, 2), (3, 1)]);
        assert_eq!(report.failure_count("UnsupportedFormat"), 1);
        assert_eq!(report.failure_count("MissingContentType"), 1);
        assert_eq!(report.failure_count("DecodeError"), 1);
    }

    #[tokio::test]
    async fn url_body_is_sniffed_not_trusted() {
        let png = create_png_bytes(5, 4);
        let (addr, server) = serve_once("200 OK", "text/plain", png);
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let report = handler
            .ingest_all(vec![ImageSource::Url(format!("http://{}/chart", addr))])
            .await;

        server.join().expect("server thread failed");
        assert_eq!(report.images.len(), 1);
        assert_eq!(report.images[0].width(), 5);
    }

    #[tokio::test]
    async fn url_with_non_image_body_is_a_decode_error() {
        let (addr, server) = serve_once("200 OK", "image/png", b"hello world".to_vec());
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let report = handler
            .ingest_all(vec![ImageSource::Url(format!("http://{}/fake.png", addr))])
            .await;

        server.join().expect("server thread failed");
        assert!(report.images.is_empty());
        assert_eq!(report.failure_count("DecodeError"), 1);
    }
}
