//! # HTTP 接入层
//!
//! ## 设计思路
//!
//! 只有一个入口 `/`（其余路径同样落到这里）：
//! - `POST` / `PUT`：把请求体交给渲染线程，等待该帧画完后返回提交页面；
//! - 其他方法：直接返回提交页面。
//!
//! 无论帧内发生什么错误，响应始终是 200 + 同一份静态页面，差异只体现在日志里。
//!
//! ## 实现思路
//!
//! - 页面在启动时读入 `Bytes`，各请求共享、无需加锁。
//! - 请求体按流读取，最多读入 `max_request_bytes + 1` 字节后停止；
//!   多出的 1 字节让 Parsing 阶段识别出超限并标记 `PayloadTooLarge`，其余内容不会进入内存。

use std::path::Path;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, header};
use http_body_util::BodyExt;
use axum::response::Html;
use axum::routing::any;
use tokio::net::TcpListener;

use crate::error::AppError;
use crate::render::{RenderHandle, RenderRequest};

#[derive(Clone)]
pub struct AppState {
    pub submit_page: Bytes,
    pub pipeline: RenderHandle,
    /// 请求体读取上限，与渲染线程的解析上限一致。
    pub max_request_bytes: u64,
}

/// 读取提交页面；缺失即为启动失败。
pub fn load_submit_page(path: &Path) -> Result<Bytes, AppError> {
    let page = std::fs::read(path).map_err(|source| AppError::StartupAssetMissing {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("📄 提交页面已加载: {} ({} 字节)", path.display(), page.len());
    Ok(Bytes::from(page))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handle))
        .fallback(handle)
        .with_state(state)
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Html<Bytes> {
    if method == Method::POST || method == Method::PUT {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_bounded(body, state.max_request_bytes).await;
        log::info!("📥 收到显示请求 {} - {} 字节", method, body.len());

        match state.pipeline.submit(RenderRequest { content_type, body }).await {
            Ok(report) => {
                if let Some(err) = &report.request_error {
                    log::warn!("⚠️ 请求不完整：{}", err);
                }
                for failure in &report.failures {
                    log::debug!("  {} [{}] {}", failure.source, failure.error.code(), failure.error);
                }
                log::info!(
                    "📤 帧已完成 - 绘制 {} 张，失败 {} 个来源",
                    report.placed,
                    report.failures.len()
                );
            }
            Err(err) => log::error!("❌ 渲染请求未完成：{}", err),
        }
    }

    Html(state.submit_page.clone())
}

/// 按流读取请求体，最多保留 `limit + 1` 字节。
///
/// 超出部分不再读取；读取中断时返回已收到的前缀，由解析阶段报告格式错误。
pub(crate) async fn read_bounded(mut body: Body, limit: u64) -> Bytes {
    let cap = usize::try_from(limit.saturating_add(1)).unwrap_or(usize::MAX);
    let mut buffer: Vec<u8> = Vec::new();

    while buffer.len() < cap {
        match body.frame().await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    buffer.extend_from_slice(&data);
                }
            }
            Some(Err(err)) => {
                log::warn!("⚠️ 读取请求体中断：{}", err);
                break;
            }
            None => break,
        }
    }

    if buffer.len() >= cap {
        buffer.truncate(cap);
        log::warn!("⚠️ 请求体超过上限 {} 字节，停止读取", limit);
    }

    Bytes::from(buffer)
}

/// 在给定监听器上运行服务，直到进程退出。
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("🌐 监听 http://{}", addr);
    }
    axum::serve(listener, router(state)).await?;
    Ok(())
}
