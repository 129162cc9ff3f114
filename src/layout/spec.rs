//! # 声明式布局模型
//!
//! JSON 字段名沿用提交表单约定的 PascalCase；所有字段可缺省，缺省取零值。
//! 逐图放置信息目前只解析、不参与排布（见 `layout` 模块说明）。

use serde::{Deserialize, Serialize};

/// 图片适配目标区域的缩放策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// 两个方向独立缩放，不保持宽高比。
    #[default]
    Stretch,
    /// 保持宽高比并铺满目标区域（可能溢出）。
    Zoom,
    /// 保持宽高比并完整放入目标区域（可能留边）。
    Shrink,
}

impl ScaleMode {
    /// 计算 `(scale_x, scale_y)`。
    pub fn factors(
        self,
        image_width: u32,
        image_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> (f32, f32) {
        let sx = target_width as f32 / image_width as f32;
        let sy = target_height as f32 / image_height as f32;
        match self {
            Self::Stretch => (sx, sy),
            Self::Zoom => {
                let s = sx.max(sy);
                (s, s)
            }
            Self::Shrink => {
                let s = sx.min(sy);
                (s, s)
            }
        }
    }
}

/// 单张图片的声明式放置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImagePlacement {
    pub file_name: String,
    pub scale: ScaleMode,
    pub left: i32,
    pub right: i32,
    /// 以网格单元计的宽度。
    pub width: i32,
    /// 以网格单元计的高度。
    pub height: i32,
}

/// 图表数据条目。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GraphEntry {
    pub data: Vec<f64>,
    pub left: i32,
    pub right: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LayoutSpec {
    pub rows: i32,
    pub cols: i32,
    pub images: Vec<ImagePlacement>,
    pub graphs: Vec<GraphEntry>,
}
