//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//!
//! 资源创建步骤记录为 `debug`，网格级别的里程碑记录为 `info`，
//! 逐帧渲染只在 `trace` 级别输出，避免每帧刷屏。
//!
//! # 使用示例
//!
//! ```no_run
//! use atlas_render::core::log::init_logger;
//! use atlas_render::core::config::LogLevel;
//!
//! init_logger(LogLevel::Info, false, None);
//! tracing::info!(parts = 3, "Mesh ready");
//! ```

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::LogLevel;

/// 初始化日志系统
///
/// 必须在程序开始时调用一次。`RUST_LOG` 环境变量存在时优先使用它。
///
/// # 参数
///
/// * `level` - 日志级别
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "atlas_render.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(true);

    if file_output {
        let log_path = log_file_path.unwrap_or("atlas_render.log");
        let path = Path::new(log_path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("atlas_render.log");

        // 每天滚动一次
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .init();
    }
}

impl LogLevel {
    /// 对应的 `EnvFilter` 指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 子系统日志 - Info 级别
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "atlas_render::engine", $($arg)*)
    };
}

/// 子系统日志 - Error 级别
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "atlas_render::engine", $($arg)*)
    };
}
