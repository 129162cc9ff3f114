//! # 布局解析
//!
//! 空输入表示“使用自动布局”，不是错误；非空但无法解析时返回 `LayoutError::Parse`，
//! 由调用方记录日志并回退到自动布局。

use super::{LayoutError, LayoutSpec};

/// 解析可选的声明式布局描述。
///
/// 仅含空白的输入按“未提供”处理。
pub fn resolve(
    raw: Option<&str>,
    image_count: usize,
    canvas_width: u32,
    canvas_height: u32,
) -> Result<Option<LayoutSpec>, LayoutError> {
    let Some(text) = raw.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };

    let spec: LayoutSpec = serde_json::from_str(text)?;

    log::debug!(
        "📐 声明式布局 {}x{}（图片条目 {}，图表条目 {}）- 本帧图片 {} 画布 {}x{}",
        spec.rows,
        spec.cols,
        spec.images.len(),
        spec.graphs.len(),
        image_count,
        canvas_width,
        canvas_height
    );

    Ok(Some(spec))
}
