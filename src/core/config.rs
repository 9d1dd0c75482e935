//! 配置管理模块
//!
//! 提供子系统配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [graphics]
//! backend = "recording"   # 或 "d3d11"（仅 Windows）
//! max_anisotropy = 4
//! upload_viewport = false
//!
//! [model]
//! hash = "C325BB80"
//! fixture_dir = "data/C325BB80"
//! frames = 3
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 子系统配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 模型配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 采样器的最大各向异性等级
    #[serde(default = "default_max_anisotropy")]
    pub max_anisotropy: u32,

    /// 是否在每帧额外写入视口尺寸
    ///
    /// 默认关闭：每帧只写入视图矩阵和相机位置两个区域。
    #[serde(default)]
    pub upload_viewport: bool,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// 无窗口的记录后端，记录所有命令
    Recording,
    /// Direct3D 11 后端（仅 Windows）
    D3d11,
}

/// 模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模型哈希（8 位十六进制）
    #[serde(default = "default_model_hash")]
    pub hash: String,

    /// 开发期数据目录（可选）
    #[serde(default)]
    pub fixture_dir: Option<String>,

    /// 渲染的帧数
    #[serde(default = "default_frames")]
    pub frames: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_backend() -> GraphicsBackend { GraphicsBackend::Recording }
fn default_max_anisotropy() -> u32 { 4 }
fn default_model_hash() -> String { "C325BB80".to_string() }
fn default_frames() -> u32 { 3 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "atlas_render.log".to_string() }

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_anisotropy: default_max_anisotropy(),
            upload_viewport: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hash: default_model_hash(),
            fixture_dir: None,
            frames: default_frames(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--d3d11`: 使用 Direct3D 11 后端
    /// - `--recording`: 使用记录后端
    /// - `--frames <value>`: 设置渲染帧数
    /// - `--fixture <dir>`: 设置开发期数据目录
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--d3d11") {
            self.graphics.backend = GraphicsBackend::D3d11;
        }

        if args.iter().any(|a| a == "--recording") {
            self.graphics.backend = GraphicsBackend::Recording;
        }

        if let Some(idx) = args.iter().position(|a| a == "--frames") {
            if let Some(frames) = args.get(idx + 1).and_then(|s| s.parse().ok()) {
                self.model.frames = frames;
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--fixture") {
            if let Some(dir) = args.get(idx + 1) {
                self.model.fixture_dir = Some(dir.clone());
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.graphics.max_anisotropy) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.max_anisotropy".to_string(),
                reason: "Anisotropy must be between 1 and 16".to_string(),
            }
            .into());
        }

        if self.model.hash.parse::<crate::renderer::MeshHash>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "model.hash".to_string(),
                reason: "Model hash must be 8 hexadecimal digits".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl GraphicsBackend {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::Recording => "Recording",
            GraphicsBackend::D3d11 => "Direct3D 11",
        }
    }
}
