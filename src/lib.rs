//! # pi-chart 远程显示服务 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP 客户端（浏览器表单 / curl）                         │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ POST/PUT multipart  →  200 + 提交页面
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  server ─── axum 处理者（任意多个并发）                   │
//! │       │                                                  │
//! │       ↓ 交接点（容量 0 的同步通道，一次只放行一个请求）   │
//! │                                                          │
//! │  render::pipeline ── 唯一渲染线程                         │
//! │   ├─ Parsing    multipart 拆解（multer）                  │
//! │   ├─ Ingesting  image_handler：上传/URL → 解码位图        │
//! │   ├─ LayingOut  layout：声明式描述 + 自动网格             │
//! │   └─ Drawing    Renderer：begin → clear → draw* → end     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 启动期统一错误类型 `AppError` |
//! | [`settings`] | 配置文件 + 环境变量覆盖 |
//! | [`image_handler`] | 上传/URL 加载、格式识别、解码 |
//! | [`layout`] | 布局描述解析、方形网格与扫描线排布 |
//! | [`render`] | `Renderer` 抽象、软件画布、渲染线程与交接点 |
//! | [`server`] | axum 路由与静态页面 |

pub mod error;
pub mod image_handler;
pub mod layout;
pub mod render;
pub mod server;
pub mod settings;
