//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 单帧内的错误（图片、布局、请求、绘制）都在各自模块内就地消化，只写日志；
//! 能走到 `AppError` 的只有启动期错误，它们会让进程以非零状态退出。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为各层错误提供 `From` 转换，`main` 中直接使用 `?`。

use std::path::PathBuf;

use crate::image_handler::ImageError;
use crate::render::{PipelineError, RenderError};

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 提交页面缺失或不可读
    #[error("静态页面不可用 {}: {source}", path.display())]
    StartupAssetMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件或环境变量无效
    #[error("配置无效: {0}")]
    Settings(String),

    /// 图片摄取组件初始化失败
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 渲染线程启动失败
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Render(#[from] RenderError),

    /// 监听端口或其他 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}
