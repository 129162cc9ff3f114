//! # 渲染流水线
//!
//! ## 设计思路
//!
//! 唯一的渲染线程独占 `Renderer`，所有 HTTP 处理者只能通过交接点（handoff）把请求交给它。
//! 交接点是容量为 0 的同步通道：提交方阻塞到渲染线程空闲并真正取走请求为止，
//! 这是系统唯一的背压手段，不存在超过一个在途帧的排队。
//!
//! 每帧状态固定流转：
//!
//! ```text
//! Idle → Parsing → Ingesting → LayingOut → Drawing → Idle
//! ```
//!
//! ## 实现思路
//!
//! - 渲染线程内部持有一个 current-thread tokio 运行时，用于执行 multipart 解析与 URL 下载。
//! - 提交方在 blocking 线程池上完成交接，再等待 oneshot 完成通知，帧画完后才返回。
//! - 单帧内任何错误都不会终止进程，只写日志并汇总到 `FrameReport`。
//! - 没有超时与取消：一个挂起的 URL 会阻塞整条流水线及所有等待中的客户端。

use std::fmt;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use image::Rgba;
use tokio::sync::oneshot;

use super::{RenderError, Renderer};
use crate::image_handler::{DecodedImage, ImageHandler, ImageSource, SourceFailure};
use crate::layout::{self, Grid, ImageSize, LayoutError, PlacementPlan, PlacementStrategy};

/// 表单中承载 URL 的字段名。
pub const URL_FIELDS: [&str; 2] = ["urls", "url"];
/// 表单中承载布局描述的字段名。
pub const LAYOUT_FIELD: &str = "layout";

/// 一次显示请求：原始请求体与 Content-Type，在 Parsing 阶段才拆解。
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// 请求级错误，不会中断帧。
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("请求体超过上限 {limit} 字节")]
    PayloadTooLarge { limit: u64 },

    #[error("请求不是 multipart 表单：{0}")]
    NotMultipart(String),

    #[error("multipart 表单格式错误：{0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("无法启动渲染线程：{0}")]
    Spawn(std::io::Error),

    #[error("无法创建渲染线程运行时：{0}")]
    Runtime(std::io::Error),

    #[error("渲染器初始化失败：{0}")]
    RendererInit(RenderError),

    #[error("渲染线程已退出")]
    WorkerGone,

    #[error("交接失败：{0}")]
    Handoff(String),
}

/// 帧状态，仅用于日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Parsing,
    Ingesting,
    LayingOut,
    Drawing,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::Ingesting => "ingesting",
            Self::LayingOut => "laying-out",
            Self::Drawing => "drawing",
        };
        f.write_str(name)
    }
}

/// 渲染线程独占的帧处理上下文，启动时构建一次。
pub struct PipelineContext {
    pub images: ImageHandler,
    pub background: Rgba<u8>,
    pub strategy: PlacementStrategy,
    pub max_request_bytes: u64,
}

/// 单帧处理汇总。
#[derive(Debug, Default)]
pub struct FrameReport {
    pub decoded: usize,
    pub failures: Vec<SourceFailure>,
    /// 被静默跳过的空来源数量（空 URL、未选择文件的上传字段）。
    pub skipped_sources: usize,
    pub request_error: Option<RequestError>,
    pub layout_error: Option<LayoutError>,
    /// 帧是否被跳过（请求无法解析且没有任何可用内容）。
    pub frame_skipped: bool,
    pub grid: Option<Grid>,
    /// 成功发出的图片绘制调用数。
    pub placed: usize,
    /// 因画布空间不足被丢弃的图片数。
    pub dropped: usize,
    pub render_error: Option<RenderError>,
}

impl FrameReport {
    pub fn failure_count(&self, code: &str) -> usize {
        self.failures
            .iter()
            .filter(|failure| failure.error.code() == code)
            .count()
    }
}

struct FrameJob {
    request: RenderRequest,
    done: oneshot::Sender<FrameReport>,
}

/// 提交端句柄，可被任意多个 HTTP 处理者克隆持有。
#[derive(Clone)]
pub struct RenderHandle {
    jobs: SyncSender<FrameJob>,
}

impl RenderHandle {
    /// 交接请求并等待该帧绘制完成。
    ///
    /// 渲染线程正忙时会一直等待，没有超时。
    pub async fn submit(&self, request: RenderRequest) -> Result<FrameReport, PipelineError> {
        let (done_tx, done_rx) = oneshot::channel();
        let jobs = self.jobs.clone();
        let job = FrameJob {
            request,
            done: done_tx,
        };

        tokio::task::spawn_blocking(move || jobs.send(job))
            .await
            .map_err(|e| PipelineError::Handoff(e.to_string()))?
            .map_err(|_| PipelineError::WorkerGone)?;

        done_rx.await.map_err(|_| PipelineError::WorkerGone)
    }
}

pub struct RenderPipeline;

impl RenderPipeline {
    /// 启动渲染线程。
    ///
    /// `make_renderer` 在渲染线程内执行，渲染器从创建到销毁都不会跨线程。
    /// 渲染器初始化失败会直接返回错误，由调用方决定是否退出进程。
    pub fn spawn<R, F>(context: PipelineContext, make_renderer: F) -> Result<RenderHandle, PipelineError>
    where
        R: Renderer + 'static,
        F: FnOnce() -> Result<R, RenderError> + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::sync_channel::<FrameJob>(0);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u32), PipelineError>>();

        thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(PipelineError::Runtime(err)));
                        return;
                    }
                };

                let mut renderer = match make_renderer() {
                    Ok(renderer) => renderer,
                    Err(err) => {
                        let _ = ready_tx.send(Err(PipelineError::RendererInit(err)));
                        return;
                    }
                };

                let _ = ready_tx.send(Ok(renderer.canvas_size()));
                run_loop(&runtime, &context, &mut renderer, job_rx);
            })
            .map_err(PipelineError::Spawn)?;

        let (width, height) = ready_rx.recv().map_err(|_| PipelineError::WorkerGone)??;
        log::info!("🎬 渲染线程就绪 - 画布 {}x{}", width, height);

        Ok(RenderHandle { jobs: job_tx })
    }
}

fn run_loop<R: Renderer>(
    runtime: &tokio::runtime::Runtime,
    context: &PipelineContext,
    renderer: &mut R,
    jobs: Receiver<FrameJob>,
) {
    loop {
        log::debug!("[{}] 渲染线程等待请求...", FrameState::Idle);
        let Ok(job) = jobs.recv() else {
            log::info!("所有提交端已关闭，渲染线程退出");
            break;
        };

        let report = runtime.block_on(process_frame(context, renderer, job.request));
        if job.done.send(report).is_err() {
            log::debug!("提交方已不再等待本帧结果");
        }
    }
}

/// 处理一帧：解析 → 摄取 → 布局 → 绘制。
pub async fn process_frame<R: Renderer>(
    context: &PipelineContext,
    renderer: &mut R,
    request: RenderRequest,
) -> FrameReport {
    let total_start = Instant::now();
    let mut report = FrameReport::default();

    log::debug!("[{}] 拆解请求", FrameState::Parsing);
    let parse_start = Instant::now();
    let (parsed, request_error) = parse_request(request, context.max_request_bytes).await;
    let parse_elapsed = parse_start.elapsed();

    if let Some(err) = request_error {
        log::warn!("⚠️ 请求解析不完整：{}", err);
        let nothing_parsed = parsed.is_empty();
        report.request_error = Some(err);
        if nothing_parsed {
            log::warn!("⚠️ 请求中没有任何可用内容，跳过本帧");
            report.frame_skipped = true;
            return report;
        }
    }

    log::debug!("[{}] {} 个图片来源", FrameState::Ingesting, parsed.sources.len());
    let ingest_start = Instant::now();
    let ingest = context.images.ingest_all(parsed.sources).await;
    let ingest_elapsed = ingest_start.elapsed();

    report.decoded = ingest.images.len();
    report.failures = ingest.failures;
    report.skipped_sources = ingest.skipped + parsed.blank_uploads;

    log::debug!("[{}]", FrameState::LayingOut);
    let layout_start = Instant::now();
    let (canvas_width, canvas_height) = renderer.canvas_size();
    match layout::resolve(
        parsed.layout.as_deref(),
        ingest.images.len(),
        canvas_width,
        canvas_height,
    ) {
        Ok(Some(_spec)) => {
            log::info!("📐 已解析声明式布局，逐图放置暂不生效，使用自动布局");
        }
        Ok(None) => {}
        Err(err) => {
            log::warn!("⚠️ 布局描述无效，回退自动布局：{}", err);
            report.layout_error = Some(err);
        }
    }

    let sizes: Vec<ImageSize> = ingest
        .images
        .iter()
        .map(|image| ImageSize::new(image.width(), image.height()))
        .collect();
    let plan = context.strategy.place(&sizes, canvas_width, canvas_height);
    let layout_elapsed = layout_start.elapsed();

    report.grid = plan.grid;
    report.dropped = plan.dropped;

    log::debug!("[{}] {} 次图片绘制", FrameState::Drawing, plan.assignments.len());
    let draw_start = Instant::now();
    match draw_frame(renderer, context.background, &ingest.images, &plan) {
        Ok(placed) => report.placed = placed,
        Err(err) => {
            log::error!("❌ 帧绘制失败：{}", err);
            report.render_error = Some(err);
        }
    }
    let draw_elapsed = draw_start.elapsed();

    log::info!(
        "✅ 帧完成 - 图片 {}/{} 失败 {} 丢弃 {} parse={}ms ingest={}ms layout={}ms draw={}ms total={}ms",
        report.placed,
        report.decoded,
        report.failures.len(),
        report.dropped,
        parse_elapsed.as_millis(),
        ingest_elapsed.as_millis(),
        layout_elapsed.as_millis(),
        draw_elapsed.as_millis(),
        total_start.elapsed().as_millis()
    );

    report
}

/// 发出一帧的全部绘制调用，返回成功绘制的图片数。
///
/// 单张图片绘制失败只记录日志；帧开始/清屏/提交失败则返回错误。
/// `begin_frame` 成功后无论清屏是否失败都会调用 `end_frame`，渲染器不会停留在帧内。
fn draw_frame<R: Renderer>(
    renderer: &mut R,
    background: Rgba<u8>,
    images: &[DecodedImage],
    plan: &PlacementPlan,
) -> Result<usize, RenderError> {
    renderer.begin_frame()?;
    let drawn = draw_contents(renderer, background, images, plan);
    let ended = renderer.end_frame();

    let placed = drawn?;
    ended?;
    Ok(placed)
}

fn draw_contents<R: Renderer>(
    renderer: &mut R,
    background: Rgba<u8>,
    images: &[DecodedImage],
    plan: &PlacementPlan,
) -> Result<usize, RenderError> {
    renderer.clear(background)?;

    let mut placed = 0;
    for assignment in &plan.assignments {
        let Some(image) = images.get(assignment.index) else {
            continue;
        };
        match renderer.draw_image(image, assignment) {
            Ok(()) => placed += 1,
            Err(err) => log::warn!("⚠️ 绘制 {} 失败：{}", image.label, err),
        }
    }

    Ok(placed)
}

/// Parsing 阶段产物。
#[derive(Debug, Default)]
pub(crate) struct ParsedRequest {
    pub(crate) sources: Vec<ImageSource>,
    pub(crate) layout: Option<String>,
    /// 文件名与内容都为空的上传字段（浏览器未选择文件时提交的占位）。
    pub(crate) blank_uploads: usize,
}

impl ParsedRequest {
    fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.layout.is_none()
    }
}

/// 拆解 multipart 请求体。
///
/// 超过 `limit` 的部分不会被读取：只解析前 `limit` 字节内完整的字段，
/// 并返回 `PayloadTooLarge`。
pub(crate) async fn parse_request(
    request: RenderRequest,
    limit: u64,
) -> (ParsedRequest, Option<RequestError>) {
    let mut parsed = ParsedRequest::default();

    let Some(content_type) = request.content_type.as_deref() else {
        return (
            parsed,
            Some(RequestError::NotMultipart("缺少 Content-Type".to_string())),
        );
    };

    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(err) => return (parsed, Some(RequestError::NotMultipart(err.to_string()))),
    };

    let truncated = request.body.len() as u64 > limit;
    let visible = if truncated {
        request.body.slice(..limit as usize)
    } else {
        request.body
    };

    let mut multipart = multer::Multipart::with_reader(Cursor::new(visible), boundary);
    let mut error = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                error = Some(err);
                break;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                error = Some(err);
                break;
            }
        };

        if let Some(file_name) = file_name {
            if file_name.is_empty() && bytes.is_empty() {
                log::debug!("跳过未选择文件的上传字段：{}", name);
                parsed.blank_uploads += 1;
                continue;
            }
            parsed.sources.push(ImageSource::Upload {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let text = String::from_utf8_lossy(&bytes);
        if name == LAYOUT_FIELD {
            if parsed.layout.is_none() {
                parsed.layout = Some(text.into_owned());
            } else {
                log::debug!("忽略重复的布局字段");
            }
        } else if URL_FIELDS.contains(&name.as_str()) {
            parsed
                .sources
                .extend(text.split('\n').map(|line| ImageSource::Url(line.trim().to_string())));
        } else {
            log::debug!("忽略未知表单字段：{}", name);
        }
    }

    let request_error = match (truncated, error) {
        (true, _) => Some(RequestError::PayloadTooLarge { limit }),
        (false, Some(err)) => Some(RequestError::Malformed(err.to_string())),
        (false, None) => None,
    };

    (parsed, request_error)
}
