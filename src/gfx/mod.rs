//! 图形后端模块
//!
//! 本模块定义设备/上下文边界，并提供两个实现：
//! - 记录后端：无窗口，记录所有命令，任何平台可用
//! - Direct3D 11：Windows 平台的原生实现
//!
//! 上层的网格与 Part 代码只依赖 `Device` 与 `DeviceContext` 两个 trait。

pub mod device;
pub mod recording;
#[cfg(target_os = "windows")]
pub mod d3d11;

pub use device::{
    AddressMode, BindFlags, BufferDesc, BufferRegion, Device, DeviceContext, ElementFormat,
    GpuBuffer, IndexFormat, InputElementDesc, PrimitiveTopology, SamplerDesc,
    ShaderStage, TextureDesc, TextureFormat,
};
pub use recording::{Command, RecordingContext, RecordingDevice};
#[cfg(target_os = "windows")]
pub use d3d11::{D3D11Context, D3D11Device};
