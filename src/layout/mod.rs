//! # 布局模块（layout）
//!
//! ## 设计思路
//!
//! - `resolver`：解析可选的声明式布局描述
//! - `grid`：自动方形网格（默认策略）
//! - `scan_line`：按原始尺寸逐行排布（可选策略）
//! - `spec`：声明式布局数据模型
//!
//! ## 已知限制
//!
//! 声明式布局中的逐图放置条目只解析、不参与排布：自动网格与声明式矩形之间的优先级
//! 尚未定义，排布始终走 `PlacementStrategy` 选定的自动策略。

mod grid;
mod resolver;
mod scan_line;
mod spec;

use serde::{Deserialize, Serialize};

pub use grid::{place_square_grid, square_dimension, CellAssignment, Grid, ImageSize, PixelRect};
pub use resolver::resolve;
pub use scan_line::place_scan_line;
pub use spec::{GraphEntry, ImagePlacement, LayoutSpec, ScaleMode};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("布局描述解析失败：{0}")]
    Parse(#[from] serde_json::Error),

    #[error("网格行列数必须大于 0：{rows}x{cols}")]
    EmptyGrid { rows: u32, cols: u32 },
}

/// 自动排布策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// 方形网格，每张图片拉伸铺满一个单元。
    #[default]
    Grid,
    /// 原始尺寸逐行排布，放不下的图片被丢弃。
    ScanLine,
}

/// 一帧的排布结果。
#[derive(Debug, Clone, Default)]
pub struct PlacementPlan {
    /// 仅网格策略且至少有一张图片时存在。
    pub grid: Option<Grid>,
    /// 按绘制顺序排列。
    pub assignments: Vec<CellAssignment>,
    pub dropped: usize,
}

impl PlacementStrategy {
    pub fn place(self, sizes: &[ImageSize], canvas_width: u32, canvas_height: u32) -> PlacementPlan {
        match self {
            Self::Grid => {
                let (grid, assignments) = place_square_grid(sizes, canvas_width, canvas_height);
                PlacementPlan {
                    grid,
                    assignments,
                    dropped: 0,
                }
            }
            Self::ScanLine => {
                let (assignments, dropped) = place_scan_line(sizes, canvas_width, canvas_height);
                PlacementPlan {
                    grid: None,
                    assignments,
                    dropped,
                }
            }
        }
    }
}
