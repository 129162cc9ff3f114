//! # 网格排布引擎
//!
//! ## 设计思路
//!
//! 自动布局把 `n` 张图片放进 `dim x dim` 的方形网格，`dim = ceil(sqrt(n))`，
//! 按摄取顺序行优先填充，每张图片拉伸铺满一个单元。
//!
//! ## 实现思路
//!
//! - 单元尺寸使用整数向下取整：`cell_width = canvas_width / cols`，
//!   `cell_height = canvas_height / rows`，除不尽的余量直接丢弃。
//! - 列计数严格在 `col == dim` 时回卷，不会越过最后一列。
//! - 渲染原语的原点在左下角，行号需换算为 `y = canvas_height - 行偏移 - 图片高度`。

use super::{LayoutError, ScaleMode};

/// 图片原始像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 渲染坐标系（左下角原点）中的像素矩形。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    /// 矩形底边到画布底边的距离。
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// 换算为左上角原点坐标系下的顶边位置。
    pub fn top(&self, canvas_height: u32) -> i64 {
        canvas_height as i64 - self.y - self.height as i64
    }
}

/// 单张图片的放置结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellAssignment {
    /// 在摄取结果中的下标。
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub rect: PixelRect,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// 帧内几何信息，构建后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    rows: u32,
    cols: u32,
    cell_width: u32,
    cell_height: u32,
    canvas_height: u32,
}

impl Grid {
    pub fn new(
        rows: u32,
        cols: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<Self, LayoutError> {
        if rows == 0 || cols == 0 {
            return Err(LayoutError::EmptyGrid { rows, cols });
        }

        Ok(Self {
            rows,
            cols,
            cell_width: canvas_width / cols,
            cell_height: canvas_height / rows,
            canvas_height,
        })
    }

    /// 容纳 `image_count` 张图片的方形网格；没有图片时返回 `None`。
    pub fn square(image_count: usize, canvas_width: u32, canvas_height: u32) -> Option<Self> {
        let dim = square_dimension(image_count);
        Self::new(dim, dim, canvas_width, canvas_height).ok()
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// 单元 `(row, col)` 在左下角坐标系中的矩形，行号从画布顶部开始计。
    pub fn cell_rect(&self, row: u32, col: u32) -> PixelRect {
        let row_offset = row as i64 * self.cell_height as i64;
        PixelRect {
            x: col as i64 * self.cell_width as i64,
            y: self.canvas_height as i64 - row_offset - self.cell_height as i64,
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}

/// `ceil(sqrt(n))`，全程整数运算。
pub fn square_dimension(image_count: usize) -> u32 {
    let n = image_count as u64;
    let mut dim = (n as f64).sqrt() as u64;
    while dim * dim < n {
        dim += 1;
    }
    while dim > 0 && (dim - 1) * (dim - 1) >= n {
        dim -= 1;
    }
    dim as u32
}

/// 自动方形网格排布。
pub fn place_square_grid(
    sizes: &[ImageSize],
    canvas_width: u32,
    canvas_height: u32,
) -> (Option<Grid>, Vec<CellAssignment>) {
    let Some(grid) = Grid::square(sizes.len(), canvas_width, canvas_height) else {
        return (None, Vec::new());
    };

    let dim = grid.cols();
    let mut assignments = Vec::with_capacity(sizes.len());
    let (mut row, mut col) = (0u32, 0u32);

    for (index, size) in sizes.iter().enumerate() {
        let rect = grid.cell_rect(row, col);
        let (scale_x, scale_y) =
            ScaleMode::Stretch.factors(size.width, size.height, rect.width, rect.height);

        assignments.push(CellAssignment {
            index,
            row,
            col,
            rect,
            scale_x,
            scale_y,
        });

        col += 1;
        if col == dim {
            col = 0;
            row += 1;
        }
    }

    (Some(grid), assignments)
}
