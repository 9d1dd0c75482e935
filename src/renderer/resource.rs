//! 资源句柄与 GPU 缓冲区工厂
//!
//! - [`Resource`]：绑定槽位 + 一个独占的 GPU 对象（常量缓冲区、采样器）
//! - `create_*_buffer`：把调用者的字节复制进新建的设备缓冲区
//!
//! # 所有权
//!
//! 工厂在调用设备之前先对输入字节做一份快照，返回后调用者可以立即释放或复用源数据。
//! 缓冲区大小严格等于源数据大小，不做填充或截断。

use tracing::debug;

use super::blob::{Blob, VERTEX_STREAM_COUNT};
use crate::core::error::{DeviceError, ObjectKind, Result};
use crate::gfx::device::{BindFlags, BufferDesc, Device};

/// 槽位与其 GPU 对象的绑定关系
///
/// 槽位必须与着色器声明的寄存器一致，绑定代码无条件信任这一对应关系。
#[derive(Debug)]
pub struct Resource<T> {
    slot: u32,
    object: T,
}

impl<T> Resource<T> {
    pub fn new(slot: u32, object: T) -> Self {
        Self { slot, object }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn get(&self) -> &T {
        &self.object
    }
}

/// 缓冲区用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Constant,
    /// 不绑定到着色器阶段的复制源
    ViewSource,
}

impl BufferUsage {
    fn bind_flags(self) -> BindFlags {
        match self {
            BufferUsage::Vertex => BindFlags::Vertex,
            BufferUsage::Index => BindFlags::Index,
            BufferUsage::Constant => BindFlags::Constant,
            BufferUsage::ViewSource => BindFlags::None,
        }
    }

    pub fn kind(self) -> ObjectKind {
        match self {
            BufferUsage::Vertex => ObjectKind::VertexBuffer,
            BufferUsage::Index => ObjectKind::IndexBuffer,
            BufferUsage::Constant => ObjectKind::ConstantBuffer,
            BufferUsage::ViewSource => ObjectKind::ViewSourceBuffer,
        }
    }
}

/// 用 `blob` 的内容创建一个指定用途的缓冲区
pub fn create_buffer<D: Device>(device: &D, blob: Blob<'_>, usage: BufferUsage) -> Result<D::Buffer> {
    let kind = usage.kind();
    if blob.is_empty() {
        return Err(DeviceError::creation(kind, "source data is empty").into());
    }
    let byte_width = u32::try_from(blob.len())
        .map_err(|_| DeviceError::creation(kind, format!("{} bytes exceeds u32", blob.len())))?;

    let snapshot = blob.data().to_vec();
    let desc = BufferDesc {
        byte_width,
        bind: usage.bind_flags(),
    };
    let buffer = device.create_buffer(&desc, &snapshot)?;
    debug!(kind = kind.name(), bytes = byte_width, "Buffer uploaded");
    Ok(buffer)
}

/// 依次创建一组顶点流缓冲区，遇到第一个失败即停止
pub fn create_vertex_buffers<D: Device>(
    device: &D,
    blobs: &[Blob<'_>; VERTEX_STREAM_COUNT],
) -> Result<Vec<D::Buffer>> {
    blobs
        .iter()
        .map(|blob| create_buffer(device, *blob, BufferUsage::Vertex))
        .collect()
}

pub fn create_index_buffer<D: Device>(device: &D, blob: Blob<'_>) -> Result<D::Buffer> {
    create_buffer(device, blob, BufferUsage::Index)
}

/// 创建常量缓冲区并与槽位关联
pub fn create_constant_buffer<D: Device>(
    device: &D,
    slot: u32,
    blob: Blob<'_>,
) -> Result<Resource<D::Buffer>> {
    let buffer = create_buffer(device, blob, BufferUsage::Constant)?;
    Ok(Resource::new(slot, buffer))
}
