//! # 渲染能力抽象
//!
//! ## 设计思路
//!
//! 底层 2D 绘制上下文不是线程安全的，只能由渲染线程独占使用。
//! `Renderer` 不要求 `Send`：实例在渲染线程内部构建，整个生命周期不离开该线程。
//!
//! 一帧的调用顺序固定为 `begin_frame → clear → draw_image* → end_frame`，
//! `end_frame` 之前外部观察者不保证能看到部分画面。

use std::sync::{Arc, Mutex, PoisonError};

use image::Rgba;

use crate::image_handler::DecodedImage;
use crate::layout::{CellAssignment, PixelRect};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("文件系统错误：{0}")]
    Io(#[from] std::io::Error),

    #[error("画面编码失败：{0}")]
    Encode(#[from] image::ImageError),

    #[error("缩放失败：{0}")]
    Resize(String),

    /// 调用顺序不符合帧协议。
    #[error("帧状态错误：{0}")]
    FrameState(&'static str),
}

/// 渲染线程独占的绘制能力。
pub trait Renderer {
    /// 画布像素尺寸 `(width, height)`。
    fn canvas_size(&self) -> (u32, u32);

    fn begin_frame(&mut self) -> Result<(), RenderError>;

    fn clear(&mut self, background: Rgba<u8>) -> Result<(), RenderError>;

    /// 按放置结果绘制一张图片；矩形使用左下角原点坐标。
    fn draw_image(
        &mut self,
        image: &DecodedImage,
        assignment: &CellAssignment,
    ) -> Result<(), RenderError>;

    /// 提交整帧。
    fn end_frame(&mut self) -> Result<(), RenderError>;
}

/// `RecordingRenderer` 记录下的一次调用。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    BeginFrame,
    Clear(Rgba<u8>),
    DrawImage {
        label: String,
        row: u32,
        col: u32,
        rect: PixelRect,
        scale_x: f32,
        scale_y: f32,
    },
    EndFrame,
}

/// 与渲染线程共享的调用记录。
#[derive(Debug, Clone, Default)]
pub struct DrawLog(Arc<Mutex<Vec<DrawCall>>>);

impl DrawLog {
    fn push(&self, call: DrawCall) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    /// 当前记录快照。
    pub fn calls(&self) -> Vec<DrawCall> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn image_draws(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DrawCall::DrawImage { .. }))
            .count()
    }
}

/// 只记录调用、不产生画面的渲染器，用于测试与无显示环境排障。
pub struct RecordingRenderer {
    width: u32,
    height: u32,
    log: DrawLog,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32, log: DrawLog) -> Self {
        Self { width, height, log }
    }
}

impl Renderer for RecordingRenderer {
    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.log.push(DrawCall::BeginFrame);
        Ok(())
    }

    fn clear(&mut self, background: Rgba<u8>) -> Result<(), RenderError> {
        self.log.push(DrawCall::Clear(background));
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &DecodedImage,
        assignment: &CellAssignment,
    ) -> Result<(), RenderError> {
        self.log.push(DrawCall::DrawImage {
            label: image.label.clone(),
            row: assignment.row,
            col: assignment.col,
            rect: assignment.rect,
            scale_x: assignment.scale_x,
            scale_y: assignment.scale_y,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.log.push(DrawCall::EndFrame);
        Ok(())
    }
}
