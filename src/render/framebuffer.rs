//! # 软件画布渲染器
//!
//! ## 设计思路
//!
//! 在内存中的 RGBA 画布上完成整帧绘制，`end_frame` 时一次性提交到输出文件，
//! 外部显示进程（或人）读取到的永远是完整的一帧。
//!
//! ## 实现思路
//!
//! - 缩放使用 `fast_image_resize`，失败时回退 `image::imageops::resize`。
//! - 绘制矩形来自左下角坐标系，落笔前换算为画布的左上角坐标；越界部分自动裁剪。
//! - 提交时先写临时文件再 `rename`，避免读到半写入的 PNG。

use std::path::PathBuf;

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};

use super::{RenderError, Renderer};
use crate::image_handler::DecodedImage;
use crate::layout::CellAssignment;

pub struct FramebufferRenderer {
    canvas: RgbaImage,
    output: PathBuf,
    in_frame: bool,
    resizer: fr::Resizer,
}

impl FramebufferRenderer {
    pub fn new(width: u32, height: u32, output: impl Into<PathBuf>) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::FrameState("画布尺寸不能为 0"));
        }

        let output = output.into();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        log::info!(
            "🖥️ 软件画布初始化 - {}x{} 输出: {}",
            width,
            height,
            output.display()
        );

        Ok(Self {
            canvas: RgbaImage::new(width, height),
            output,
            in_frame: false,
            resizer: fr::Resizer::new(),
        })
    }

    /// 当前画布内容（最近一次提交或正在绘制的帧）。
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    fn scaled_size(image: &DecodedImage, assignment: &CellAssignment) -> (u32, u32) {
        let width = (image.width() as f32 * assignment.scale_x).round().max(0.0) as u32;
        let height = (image.height() as f32 * assignment.scale_y).round().max(0.0) as u32;
        (width, height)
    }

    fn resize(
        &mut self,
        image: &RgbaImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<RgbaImage, RenderError> {
        let src_image = fr::images::Image::from_vec_u8(
            image.width(),
            image.height(),
            image.as_raw().clone(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| RenderError::Resize(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

        self.resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| RenderError::Resize(format!("fast_image_resize 执行失败：{}", e)))?;

        ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| RenderError::Resize("fast_image_resize 输出缓冲长度异常".to_string()))
    }
}

impl Renderer for FramebufferRenderer {
    fn canvas_size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.in_frame {
            return Err(RenderError::FrameState("上一帧尚未提交"));
        }
        self.in_frame = true;
        Ok(())
    }

    fn clear(&mut self, background: Rgba<u8>) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::FrameState("clear 必须在 begin_frame 之后调用"));
        }
        for pixel in self.canvas.pixels_mut() {
            *pixel = background;
        }
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &DecodedImage,
        assignment: &CellAssignment,
    ) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::FrameState("draw_image 必须在 begin_frame 之后调用"));
        }

        let (width, height) = Self::scaled_size(image, assignment);
        if width == 0 || height == 0 {
            log::debug!("跳过零尺寸绘制：{}", image.label);
            return Ok(());
        }

        let scaled = if (width, height) == (image.width(), image.height()) {
            image.bitmap.clone()
        } else {
            match self.resize(&image.bitmap, width, height) {
                Ok(resized) => resized,
                Err(err) => {
                    log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize：{}", err);
                    image::imageops::resize(&image.bitmap, width, height, FilterType::Triangle)
                }
            }
        };

        let top = self.canvas.height() as i64 - assignment.rect.y - height as i64;
        image::imageops::overlay(&mut self.canvas, &scaled, assignment.rect.x, top);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::FrameState("end_frame 必须在 begin_frame 之后调用"));
        }
        self.in_frame = false;

        let mut staging = self.output.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        self.canvas.save_with_format(&staging, ImageFormat::Png)?;
        std::fs::rename(&staging, &self.output)?;
        log::debug!("🖥️ 帧已提交：{}", self.output.display());
        Ok(())
    }
}
