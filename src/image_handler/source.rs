//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义（上传分片 / URL）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `DecodedImage` 表示可直接交给渲染器的 RGBA 位图

use bytes::Bytes;
use image::RgbaImage;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 表单上传的文件分片。
    Upload {
        /// 分片声明的文件名（仅用于日志）。
        file_name: String,
        /// 分片声明的 MIME 类型；缺失时为 `None`。
        content_type: Option<String>,
        bytes: Bytes,
    },
    /// 网络地址来源。空字符串会被静默跳过。
    Url(String),
}

impl ImageSource {
    /// 日志中使用的来源描述。
    pub fn label(&self) -> String {
        match self {
            Self::Upload { file_name, .. } => format!("upload:{}", file_name),
            Self::Url(url) => format!("url:{}", super::ImageHandler::redact_url_for_log(url)),
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Bytes,
    /// 来源描述（用于日志与诊断）。
    pub(crate) source_label: String,
}

/// 解码阶段输出：单帧内使用的位图。
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub label: String,
    pub bitmap: RgbaImage,
}

impl DecodedImage {
    pub fn new(label: impl Into<String>, bitmap: RgbaImage) -> Self {
        Self {
            label: label.into(),
            bitmap,
        }
    }

    /// 图像宽度（像素）。
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// 图像高度（像素）。
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}
