//! # 配置模块
//!
//! ## 设计思路
//!
//! 将摄取阶段所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//!
//! ## 实现思路
//!
//! - `Default` 提供与历史行为一致的配置：不设超时、不重试。
//! - 超时字段为 `Option`，留空即无截止时间；需要加固时在配置文件中填写。
//! - `validate` 在启动时执行一次，拒绝明显无效的组合。

use serde::{Deserialize, Serialize};

use super::ImageError;

/// 图片摄取配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 单个来源允许的最大字节数（上传分片与下载响应体共用）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 建立连接超时时间（秒），`None` 表示不限制。
    pub connect_timeout_secs: Option<u64>,
    /// 整体下载超时时间（秒），`None` 表示不限制。
    pub download_timeout_secs: Option<u64>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            connect_timeout_secs: None,
            download_timeout_secs: None,
        }
    }
}

impl ImageConfig {
    pub(crate) fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::ResourceLimit("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ImageError::ResourceLimit(
                "max_decoded_pixels 不能为 0".to_string(),
            ));
        }
        if matches!(self.connect_timeout_secs, Some(0))
            || matches!(self.download_timeout_secs, Some(0))
        {
            return Err(ImageError::ResourceLimit(
                "超时时间必须大于 0 秒（不限制请留空）".to_string(),
            ));
        }
        Ok(())
    }
}
