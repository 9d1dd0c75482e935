//! 组件模块
//!
//! - `Camera`：逐帧渲染所需的相机状态

pub mod camera;

pub use camera::Camera;
