//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载单个图片来源在摄取链路中的所有失败原因，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 所有分支都是“单来源级别”的失败：调用方记录日志后跳过该来源，继续处理其余来源，
//! 永远不会因为一张坏图中断整帧。

/// 图片摄取统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// 上传分片声明的 MIME 类型不在白名单内，未尝试解码。
    #[error("不支持的图片格式：{0}")]
    UnsupportedFormat(String),

    /// 上传分片缺少 Content-Type 元数据。
    #[error("上传分片缺少 Content-Type：{0}")]
    MissingContentType(String),

    #[error("解码错误：{0}")]
    Decode(String),

    /// 网络失败或非 2xx 响应。
    #[error("下载错误：{0}")]
    Fetch(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    /// 稳定的错误代码，用于日志检索与帧报告。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::MissingContentType(_) => "MissingContentType",
            Self::Decode(_) => "DecodeError",
            Self::Fetch(_) => "FetchError",
            Self::ResourceLimit(_) => "ResourceLimit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(ImageError::Fetch("x".into()).code(), "FetchError");
        assert_eq!(ImageError::Decode("x".into()).code(), "DecodeError");
        assert_eq!(
            ImageError::MissingContentType("x".into()).code(),
            "MissingContentType"
        );
    }
}
