//! 核心功能模块
//!
//! 本模块提供子系统的基础设施：日志、配置和错误处理。
//! 这些模块独立于具体的图形 API。
//!
//! - `log`：日志系统，基于 `tracing`
//! - `config`：配置管理，从 TOML 文件加载
//! - `error`：错误处理，定义统一的错误类型

pub mod config;
pub mod error;
pub mod log;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use error::{
    ConfigError, DeviceError, ObjectKind, PreconditionError, RenderError, ResourceError, Result,
};
