//! # 图片摄取模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“来源识别 → 加载校验 → 签名识别与解码”按职责拆分为多个子模块，
//! 避免单文件膨胀与耦合。整个模块不依赖 HTTP 服务层与渲染层。
//!
//! - `handler`：编排整批来源的摄取，累积失败
//! - `loader`：负责上传分片 / URL 加载与准入校验
//! - `pipeline`：负责签名识别、像素限制、解码
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! render::pipeline（Ingesting 阶段）
//!    ↓
//! handler.rs（逐个来源 + 阶段耗时日志）
//!    ├─ loader.rs（上传准入 / 单次下载）
//!    └─ pipeline.rs（签名识别 + 像素限制 + 解码）
//!    ↓
//! IngestReport { images, failures, skipped }
//! ```

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::ImageConfig;
pub use error::ImageError;
pub use handler::{ImageHandler, IngestReport, SourceFailure};
pub use source::{DecodedImage, ImageSource};

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread::{self, JoinHandle};

    use bytes::Bytes;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    use super::ImageSource;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    pub(crate) fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ImageFormat::Png)
    }

    pub(crate) fn create_jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ImageFormat::Jpeg)
    }

    pub(crate) fn upload(name: &str, content_type: Option<&str>, bytes: Vec<u8>) -> ImageSource {
        ImageSource::Upload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from(bytes),
        }
    }

    /// 单连接 HTTP 假服务：返回固定状态码与响应体后关闭。
    pub(crate) fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> (SocketAddr, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");

            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                content_type,
                body.len()
            );

            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        });

        (addr, server)
    }
}
