//! # 扫描线排布
//!
//! 图片按原始尺寸从左到右排成一行，放不下时换行；新行的顶边 = 上一行顶边 + 上一行最高图片。
//! 新行顶边到达画布底部后，剩余图片全部丢弃（容量不足，不是错误）。

use super::grid::{CellAssignment, ImageSize, PixelRect};

/// 扫描线排布结果：放置列表与被丢弃的图片数量。
pub fn place_scan_line(
    sizes: &[ImageSize],
    canvas_width: u32,
    canvas_height: u32,
) -> (Vec<CellAssignment>, usize) {
    let mut assignments = Vec::with_capacity(sizes.len());
    let (mut row, mut col) = (0u32, 0u32);
    let mut x: u64 = 0;
    let mut row_top: u64 = 0;
    let mut row_height: u64 = 0;

    for (index, size) in sizes.iter().enumerate() {
        let width = size.width as u64;
        let height = size.height as u64;

        // 行首图片即使比画布宽也直接放下，避免空行死循环
        if x > 0 && x + width > canvas_width as u64 {
            row_top += row_height;
            row += 1;
            col = 0;
            x = 0;
            row_height = 0;

            if row_top >= canvas_height as u64 {
                let dropped = sizes.len() - index;
                log::info!("📏 画布空间不足，丢弃剩余 {} 张图片", dropped);
                return (assignments, dropped);
            }
        }

        assignments.push(CellAssignment {
            index,
            row,
            col,
            rect: PixelRect {
                x: x as i64,
                y: canvas_height as i64 - row_top as i64 - height as i64,
                width: size.width,
                height: size.height,
            },
            scale_x: 1.0,
            scale_y: 1.0,
        });

        x += width;
        col += 1;
        row_height = row_height.max(height);
    }

    (assignments, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_when_row_would_overflow() {
        let sizes = [
            ImageSize::new(300, 100),
            ImageSize::new(300, 150),
            ImageSize::new(300, 80),
        ];

        let (assignments, dropped) = place_scan_line(&sizes, 800, 480);

        assert_eq!(dropped, 0);
        let origins: Vec<(u32, u32, i64, i64)> = assignments
            .iter()
            .map(|a| (a.row, a.col, a.rect.x, a.rect.y))
            .collect();
        assert_eq!(
            origins,
            vec![(0, 0, 0, 380), (0, 1, 300, 330), (1, 0, 0, 250)]
        );
    }

    #[test]
    fn drops_images_once_canvas_is_full() {
        let sizes = vec![ImageSize::new(500, 300); 4];

        let (assignments, dropped) = place_scan_line(&sizes, 800, 480);

        // 第二行从 300 开始，第三行从 600 开始（已超出 480）
        assert_eq!(assignments.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(assignments[1].rect.top(480), 300);
    }

    #[test]
    fn oversized_first_image_is_still_placed() {
        let (assignments, dropped) = place_scan_line(&[ImageSize::new(1000, 10)], 800, 480);
        assert_eq!(assignments.len(), 1);
        assert_eq!(dropped, 0);
        assert_eq!((assignments[0].scale_x, assignments[0].scale_y), (1.0, 1.0));
    }

    #[test]
    fn empty_input_places_nothing() {
        assert_eq!(place_scan_line(&[], 800, 480), (Vec::new(), 0));
    }
}
