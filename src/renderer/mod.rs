//! 渲染器模块
//!
//! 把 GPU 状态描述（着色器字节码、缓冲区内容、顶点语义、逐帧相机数据）
//! 转换为正确大小、正确绑定的设备对象，并按固定协议提交绘制。
//!
//! # 架构设计
//!
//! - `StaticMesh`：持有共享几何缓冲区和有序的 Part 列表
//! - `Part`：一个可绘制单元，持有自己的管线状态
//! - `FrameViewBlock`：逐帧视图数据，局部写入后复制到每个 Part 的槽位 12
//! - 缓冲区工厂与 `Resource<T>`：槽位 + GPU 对象
//!
//! 所有设备调用都经过 `gfx::Device` / `gfx::DeviceContext`，与具体图形 API 无关。

pub mod blob;
pub mod fixture;
pub mod hash;
pub mod input_layout;
pub mod material;
pub mod part;
pub mod resource;
pub mod static_mesh;
pub mod texture;
pub mod view;

pub use blob::{Blob, BufferGroup, VERTEX_STREAM_COUNT};
pub use fixture::{MaterialFixture, PartLayout};
pub use hash::MeshHash;
pub use input_layout::{
    build_input_elements, signatures_from_slice, InputSemantic, InputSignature, InputSignatures,
    MAX_INPUT_SIGNATURES,
};
pub use material::{MaterialInfo, PartInfo, SamplerInfo, VIEW_SLOT};
pub use part::{Part, PartOptions};
pub use resource::{BufferUsage, Resource};
pub use static_mesh::{StaticMesh, VERTEX_STRIDES};
pub use texture::{ImageFileLoader, TextureLoader};
pub use view::{FrameViewBlock, ViewConstants};
