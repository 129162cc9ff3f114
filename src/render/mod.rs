//! # 渲染模块（render）
//!
//! ## 设计思路
//!
//! - `renderer`：`Renderer` 能力抽象与记录型实现
//! - `framebuffer`：内存画布 + PNG 输出的默认渲染器
//! - `pipeline`：单一渲染线程与交接点，串起摄取 → 布局 → 绘制

mod framebuffer;
mod pipeline;
mod renderer;

pub use framebuffer::FramebufferRenderer;
pub use pipeline::{
    process_frame, FrameReport, FrameState, PipelineContext, PipelineError, RenderHandle,
    RenderPipeline, RenderRequest, RequestError, LAYOUT_FIELD, URL_FIELDS,
};
pub use renderer::{DrawCall, DrawLog, RecordingRenderer, RenderError, Renderer};
