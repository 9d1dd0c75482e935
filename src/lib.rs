//! Atlas Render - 静态网格 GPU 资源绑定
//!
//! 把已经加载好的模型描述（着色器字节码、缓冲区内容、顶点语义）转换为设备对象，
//! 并在每一帧以最少的数据传输完成视图常量更新和绘制提交。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理）
//! - `math`: 数学类型与常量布局辅助函数
//! - `component`: 相机组件
//! - `gfx`: 设备/上下文边界及其后端（记录后端、Direct3D 11）
//! - `renderer`: 网格、Part、缓冲区工厂和逐帧视图数据
//!
//! # 使用示例
//!
//! ```no_run
//! use atlas_render::component::Camera;
//! use atlas_render::gfx::{RecordingContext, RecordingDevice};
//! use atlas_render::renderer::{MeshHash, StaticMesh};
//!
//! let mut mesh = StaticMesh::new("C325BB80".parse::<MeshHash>().unwrap());
//! mesh.initialize(RecordingDevice::new());
//!
//! // 添加几何数据和 Part 之后，每帧调用一次
//! let mut context = RecordingContext::new();
//! let _ = mesh.render(&mut context, &Camera::main_camera(), 1.0 / 60.0);
//! ```

pub mod component;
pub mod core;
pub mod gfx;
pub mod math;
pub mod renderer;
