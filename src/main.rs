//! # pi-chart — 应用入口
//!
//! 本文件只负责初始化顺序：设置 → 静态页面 → 渲染线程 → 监听端口。
//! 任何一步失败都直接退出，业务逻辑见 `lib.rs` 架构文档。

use std::process::ExitCode;

use pi_chart::error::AppError;
use pi_chart::render::{FramebufferRenderer, RenderPipeline};
use pi_chart::server::{self, AppState};
use pi_chart::settings::AppSettings;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("启动失败: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let settings = AppSettings::load()?;
    log::info!("setup: settings loaded");

    // 页面缺失时不启动渲染线程
    let submit_page = server::load_submit_page(&settings.submit_page)?;

    let context = settings.pipeline_context()?;
    let (width, height) = (settings.canvas_width, settings.canvas_height);
    let output = settings.output.clone();
    let pipeline =
        RenderPipeline::spawn(context, move || FramebufferRenderer::new(width, height, output))?;
    log::info!("setup: render pipeline ready");

    let listener = tokio::net::TcpListener::bind(settings.socket_addr()).await?;
    server::serve(
        listener,
        AppState {
            submit_page,
            pipeline,
            max_request_bytes: settings.max_request_bytes,
        },
    )
    .await
}
