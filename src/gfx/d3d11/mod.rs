//! Direct3D 11 图形后端（仅 Windows）
//!
//! - `device`：设备对象创建
//! - `context`：立即上下文命令

pub mod context;
pub mod device;

pub use context::D3D11Context;
pub use device::{D3D11Buffer, D3D11Device};
