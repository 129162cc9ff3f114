//! # 应用设置
//!
//! 启动时加载一次：先读 `PI_CHART_CONFIG` 指向的 JSON 文件（可选），
//! 再用少量环境变量覆盖常改的字段。缺省字段全部取默认值。

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{ImageConfig, ImageHandler};
use crate::layout::PlacementStrategy;
use crate::render::PipelineContext;

pub const CONFIG_ENV: &str = "PI_CHART_CONFIG";
pub const PORT_ENV: &str = "PI_CHART_PORT";
pub const BIND_ENV: &str = "PI_CHART_BIND";
pub const SUBMIT_PAGE_ENV: &str = "PI_CHART_SUBMIT_PAGE";
pub const OUTPUT_ENV: &str = "PI_CHART_OUTPUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub bind: IpAddr,
    pub port: u16,
    /// 提交表单页面，启动时读入内存。
    pub submit_page: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// 每帧提交的 PNG 输出位置。
    pub output: PathBuf,
    /// 背景色 RGBA。
    pub background: [u8; 4],
    pub placement: PlacementStrategy,
    pub max_request_bytes: u64,
    pub image: ImageConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8787,
            submit_page: PathBuf::from("static/submit.html"),
            canvas_width: 800,
            canvas_height: 480,
            output: PathBuf::from("frame.png"),
            background: [0, 0, 0, 255],
            placement: PlacementStrategy::Grid,
            max_request_bytes: 10 * 1024 * 1024,
            image: ImageConfig::default(),
        }
    }
}

impl AppSettings {
    /// 从进程环境加载设置。
    pub fn load() -> Result<Self, AppError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// 以给定的变量查找函数加载设置，便于在测试中替换进程环境。
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        settings.apply_overrides(&lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Settings(format!("读取 {} 失败: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("解析 {} 失败: {}", path.display(), e)))
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| AppError::Settings(format!("{PORT_ENV}={port} 无效: {e}")))?;
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind = bind
                .trim()
                .parse()
                .map_err(|e| AppError::Settings(format!("{BIND_ENV}={bind} 无效: {e}")))?;
        }
        if let Some(page) = lookup(SUBMIT_PAGE_ENV) {
            self.submit_page = PathBuf::from(page);
        }
        if let Some(output) = lookup(OUTPUT_ENV) {
            self.output = PathBuf::from(output);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(AppError::Settings(format!(
                "画布尺寸必须大于 0: {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.max_request_bytes == 0 {
            return Err(AppError::Settings("max_request_bytes 不能为 0".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn background(&self) -> Rgba<u8> {
        Rgba(self.background)
    }

    /// 构建渲染线程使用的帧上下文（含 HTTP 客户端）。
    pub fn pipeline_context(&self) -> Result<PipelineContext, AppError> {
        Ok(PipelineContext {
            images: ImageHandler::new(self.image.clone())?,
            background: self.background(),
            strategy: self.placement,
            max_request_bytes: self.max_request_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = AppSettings::load_with(env(&[])).expect("defaults are valid");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.socket_addr().port(), 8787);
        assert_eq!((settings.canvas_width, settings.canvas_height), (800, 480));
    }

    #[test]
    fn environment_overrides_port_and_paths() {
        let settings = AppSettings::load_with(env(&[
            (PORT_ENV, "9000"),
            (BIND_ENV, "127.0.0.1"),
            (SUBMIT_PAGE_ENV, "/srv/form.html"),
            (OUTPUT_ENV, "/tmp/out.png"),
        ]))
        .expect("overrides are valid");

        assert_eq!(settings.socket_addr(), "127.0.0.1:9000".parse().expect("addr"));
        assert_eq!(settings.submit_page, PathBuf::from("/srv/form.html"));
        assert_eq!(settings.output, PathBuf::from("/tmp/out.png"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = AppSettings::load_with(env(&[(PORT_ENV, "eighty")]));
        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[test]
    fn config_file_is_merged_with_defaults() {
        let dir = std::env::temp_dir().join(format!("pi-chart-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{"canvas_width": 1024, "placement": "scan_line", "image": {"download_timeout_secs": 5}}"#,
        )
        .expect("write config");

        let path_str = path.to_string_lossy().into_owned();
        let settings =
            AppSettings::load_with(env(&[(CONFIG_ENV, &path_str)])).expect("config is valid");

        assert_eq!(settings.canvas_width, 1024);
        assert_eq!(settings.canvas_height, 480);
        assert_eq!(settings.placement, PlacementStrategy::ScanLine);
        assert_eq!(settings.image.download_timeout_secs, Some(5));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn zero_canvas_is_rejected() {
        let settings = AppSettings {
            canvas_height: 0,
            ..AppSettings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Settings(_))));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let result = AppSettings::load_with(env(&[(CONFIG_ENV, "/nonexistent/pi-chart.json")]));
        assert!(matches!(result, Err(AppError::Settings(_))));
    }
}
