//! 错误处理模块
//!
//! 定义了渲染子系统中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - **设备创建失败**：任何 GPU 对象分配调用失败（资源不足、描述无效）
//! - **前置条件失败**：渲染时所需的管线对象或几何缓冲区缺失
//! - **资源未找到**：开发期数据源（文件）无法打开
//!
//! 所有组件在遇到第一个错误时立即停止，并将该错误原样返回给调用者，
//! 不做包装，也不做部分恢复。

use std::fmt;
use std::path::PathBuf;

/// 子系统统一的 Result 类型
pub type Result<T> = std::result::Result<T, RenderError>;

/// 渲染子系统的错误类型
#[derive(Debug)]
pub enum RenderError {
    /// 配置错误
    Config(ConfigError),

    /// 设备对象创建失败
    Device(DeviceError),

    /// 前置条件不满足
    Precondition(PreconditionError),

    /// 外部数据源错误（仅开发期数据路径）
    Resource(ResourceError),

    /// IO 错误
    Io(std::io::Error),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// GPU 对象种类
///
/// 用于在创建失败时指明是哪一类对象出错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    VertexBuffer,
    IndexBuffer,
    ConstantBuffer,
    /// 不绑定到任何着色器阶段的视图源缓冲区
    ViewSourceBuffer,
    VertexProgram,
    PixelProgram,
    InputLayout,
    TextureView,
    Sampler,
}

impl ObjectKind {
    /// 获取对象种类名称
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::VertexBuffer => "vertex buffer",
            ObjectKind::IndexBuffer => "index buffer",
            ObjectKind::ConstantBuffer => "constant buffer",
            ObjectKind::ViewSourceBuffer => "view source buffer",
            ObjectKind::VertexProgram => "vertex program",
            ObjectKind::PixelProgram => "pixel program",
            ObjectKind::InputLayout => "input layout",
            ObjectKind::TextureView => "texture view",
            ObjectKind::Sampler => "sampler",
        }
    }
}

/// 设备对象创建相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// 创建调用失败
    ///
    /// `code` 为底层图形 API 返回的原始状态码（若有）。
    Creation {
        kind: ObjectKind,
        code: Option<i32>,
        reason: String,
    },

    /// 设备本身创建失败
    DeviceCreation(String),
}

impl DeviceError {
    /// 创建一个不带状态码的创建失败错误
    pub fn creation(kind: ObjectKind, reason: impl Into<String>) -> Self {
        DeviceError::Creation {
            kind,
            code: None,
            reason: reason.into(),
        }
    }

    /// 失败的对象种类
    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            DeviceError::Creation { kind, .. } => Some(*kind),
            DeviceError::DeviceCreation(_) => None,
        }
    }
}

/// 前置条件相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// 网格尚未关联设备
    MeshNotInitialized,

    /// 网格缺少顶点缓冲区或索引缓冲区
    MissingGeometry,

    /// Part 缺少顶点程序、像素程序或输入布局
    MissingPipeline { part: usize },

    /// 视图源缓冲区不足以容纳逐帧写入的字节范围
    ViewBufferTooSmall { size: u32, required: u32 },
}

/// 外部数据源相关的错误
#[derive(Debug)]
pub enum ResourceError {
    /// 文件不存在或无法打开
    NotFound(PathBuf),

    /// 图像解码失败
    Decode { path: PathBuf, reason: String },

    /// 纹理文件的槽位编号不连续或重复
    TextureSlot {
        path: PathBuf,
        slot: u32,
        expected: u32,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Config(e) => write!(f, "Configuration error: {}", e),
            RenderError::Device(e) => write!(f, "Device error: {}", e),
            RenderError::Precondition(e) => write!(f, "Precondition failed: {}", e),
            RenderError::Resource(e) => write!(f, "Resource error: {}", e),
            RenderError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Creation { kind, code: Some(code), reason } => write!(
                f,
                "Failed to create {} (0x{:08X}): {}",
                kind.name(),
                code,
                reason
            ),
            DeviceError::Creation { kind, code: None, reason } => {
                write!(f, "Failed to create {}: {}", kind.name(), reason)
            }
            DeviceError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
        }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::MeshNotInitialized => write!(f, "Mesh has no device"),
            PreconditionError::MissingGeometry => {
                write!(f, "Mesh has no vertex or index buffers")
            }
            PreconditionError::MissingPipeline { part } => write!(
                f,
                "Part {} is missing its vertex program, pixel program or input layout",
                part
            ),
            PreconditionError::ViewBufferTooSmall { size, required } => write!(
                f,
                "View buffer is {} bytes, at least {} required",
                size, required
            ),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(path) => write!(f, "Cannot open file: {}", path.display()),
            ResourceError::Decode { path, reason } => {
                write!(f, "Failed to decode {}: {}", path.display(), reason)
            }
            ResourceError::TextureSlot { path, slot, expected } => write!(
                f,
                "Texture {} uses slot {}, expected slot {}",
                path.display(),
                slot,
                expected
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for PreconditionError {}
impl std::error::Error for ResourceError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        RenderError::Config(err)
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        RenderError::Device(err)
    }
}

impl From<PreconditionError> for RenderError {
    fn from(err: PreconditionError) -> Self {
        RenderError::Precondition(err)
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_error_names_object_kind() {
        let err: RenderError = DeviceError::creation(ObjectKind::IndexBuffer, "out of memory").into();
        assert_eq!(
            err.to_string(),
            "Device error: Failed to create index buffer: out of memory"
        );

        let coded = DeviceError::Creation {
            kind: ObjectKind::Sampler,
            code: Some(0x8007000Eu32 as i32),
            reason: "E_OUTOFMEMORY".to_string(),
        };
        assert!(coded.to_string().contains("0x8007000E"));
        assert_eq!(coded.kind(), Some(ObjectKind::Sampler));
    }

    #[test]
    fn test_precondition_display() {
        let err = PreconditionError::MissingPipeline { part: 2 };
        assert!(err.to_string().starts_with("Part 2"));
    }
}
