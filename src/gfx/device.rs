//! 图形设备的统一抽象接口
//!
//! 本模块定义两条边界：
//!
//! - [`Device`]：设备对象创建边界。每个创建调用返回成功/失败，
//!   成功时返回一个不透明的 GPU 对象句柄。句柄在 drop 时释放对底层对象的引用，
//!   对象内存本身由图形设备管理。
//! - [`DeviceContext`]：命令边界，对应一个立即模式的设备上下文。
//!   上下文调用与原生 API 一样不返回错误。
//!
//! 绑定状态属于上下文，是全局、可被调用者观察的：每次绑定都会覆盖之前的绑定，
//! 不做任何保存/恢复。渲染顺序因此是有意义的。

use serde::Deserialize;

use crate::core::error::Result;

/// 缓冲区绑定用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindFlags {
    /// 顶点缓冲区
    Vertex,
    /// 索引缓冲区
    Index,
    /// 常量缓冲区
    Constant,
    /// 不绑定到任何管线阶段（仅作为复制源/目标）
    None,
}

/// 缓冲区描述信息
///
/// 所有缓冲区都使用默认用途：仅 GPU 读写，CPU 不可访问。
/// 内容只能通过 `update_subresource` 与 `copy_resource` 修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// 缓冲区大小（字节）
    pub byte_width: u32,
    /// 绑定用途
    pub bind: BindFlags,
}

impl BufferDesc {
    /// 初始数据必须非空且与缓冲区大小完全一致
    ///
    /// 原生 API 按 `byte_width` 读取初始数据，不知道切片的实际长度。
    pub fn check_initial_data(&self, data: &[u8]) -> std::result::Result<(), String> {
        if self.byte_width == 0 {
            return Err("byte width is zero".to_string());
        }
        if data.len() != self.byte_width as usize {
            return Err(format!(
                "initial data is {} bytes, buffer is {}",
                data.len(),
                self.byte_width
            ));
        }
        Ok(())
    }
}

/// 缓冲区句柄需要暴露的信息
pub trait GpuBuffer {
    /// 缓冲区大小（字节）
    fn byte_width(&self) -> u32;
}

/// 缓冲区内的字节范围 [left, right)
///
/// 对应原生 API 中一维缓冲区的 box（top/front = 0，bottom/back = 1）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegion {
    pub left: u32,
    pub right: u32,
}

impl BufferRegion {
    /// 从偏移量和长度构造
    pub const fn new(offset: u32, len: u32) -> Self {
        Self {
            left: offset,
            right: offset + len,
        }
    }

    pub const fn len(&self) -> u32 {
        self.right - self.left
    }

    pub const fn is_empty(&self) -> bool {
        self.right <= self.left
    }

    /// 两个范围是否有重叠
    pub const fn overlaps(&self, other: &BufferRegion) -> bool {
        self.left < other.right && other.left < self.right
    }

    /// 一次更新写入的字节范围，`None` 表示整个缓冲区
    ///
    /// 范围越界或与数据长度不符时返回 `None`，此时不能发出更新。
    pub fn resolve(region: Option<BufferRegion>, byte_width: u32, data_len: usize) -> Option<(usize, usize)> {
        let (left, right) = match region {
            Some(region) => (region.left, region.right),
            None => (0, byte_width),
        };
        if right > byte_width || left > right || (right - left) as usize != data_len {
            return None;
        }
        Some((left as usize, right as usize))
    }
}

/// 顶点元素格式（DXGI 格式编码）
///
/// 资产描述中直接携带 DXGI 格式值，这里保留原始编码，
/// 只为常见格式提供常量和字节大小。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ElementFormat(pub u32);

impl ElementFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R32G32B32A32_FLOAT: Self = Self(2);
    pub const R32G32B32_FLOAT: Self = Self(6);
    pub const R16G16B16A16_FLOAT: Self = Self(10);
    pub const R16G16B16A16_SNORM: Self = Self(13);
    pub const R16G16B16A16_SINT: Self = Self(14);
    pub const R32G32_FLOAT: Self = Self(16);
    pub const R10G10B10A2_UNORM: Self = Self(24);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UINT: Self = Self(30);
    pub const R16G16_FLOAT: Self = Self(34);
    pub const R16G16_SNORM: Self = Self(37);
    pub const R16G16_SINT: Self = Self(38);
    pub const R32_FLOAT: Self = Self(41);

    /// 每个元素占用的字节数，未知格式返回 `None`
    pub fn byte_size(&self) -> Option<u32> {
        match *self {
            Self::R32G32B32A32_FLOAT => Some(16),
            Self::R32G32B32_FLOAT => Some(12),
            Self::R16G16B16A16_FLOAT
            | Self::R16G16B16A16_SNORM
            | Self::R16G16B16A16_SINT
            | Self::R32G32_FLOAT => Some(8),
            Self::R10G10B10A2_UNORM
            | Self::R8G8B8A8_UNORM
            | Self::R8G8B8A8_UINT
            | Self::R16G16_FLOAT
            | Self::R16G16_SNORM
            | Self::R16G16_SINT
            | Self::R32_FLOAT => Some(4),
            _ => None,
        }
    }
}

/// 输入布局中的一个元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElementDesc {
    /// 语义名称（如 "POSITION"）
    pub semantic_name: &'static str,
    pub semantic_index: u32,
    pub format: ElementFormat,
    /// 源顶点缓冲区槽位，元素紧接在同一槽位的上一个元素之后
    pub input_slot: u32,
}

/// 纹理像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// RGBA 8位无符号归一化
    Rgba8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
        }
    }
}

/// 二维纹理描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    /// 每行字节数
    pub fn row_pitch(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    /// 像素数据必须恰好覆盖 `row_pitch * height` 字节
    pub fn check_pixels(&self, pixels: &[u8]) -> std::result::Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("texture has zero extent".to_string());
        }
        let expected = self.row_pitch() as usize * self.height as usize;
        if pixels.len() != expected {
            return Err(format!("pixel data is {} bytes, expected {}", pixels.len(), expected));
        }
        Ok(())
    }
}

/// 纹理寻址模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Clamp,
}

/// 采样器描述
///
/// 过滤方式固定为各向异性过滤，比较函数固定为 Never。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub max_anisotropy: u32,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl SamplerDesc {
    /// 三个方向使用同一寻址模式的各向异性采样器
    pub fn anisotropic(address: AddressMode, max_anisotropy: u32) -> Self {
        Self {
            address_u: address,
            address_v: address,
            address_w: address,
            max_anisotropy,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
        }
    }
}

/// 索引格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
}

/// 图元拓扑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
}

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// 设备对象创建边界
///
/// 所有具体后端都必须实现此 trait。句柄类型由后端决定，
/// 上层代码只持有并在作用域结束时释放它们。
pub trait Device {
    type Buffer: GpuBuffer;
    type VertexProgram;
    type PixelProgram;
    type InputLayout;
    type TextureView;
    type Sampler;

    /// 创建缓冲区，初始内容为 `initial_data`
    ///
    /// `initial_data` 的长度必须等于 `desc.byte_width`。
    fn create_buffer(&self, desc: &BufferDesc, initial_data: &[u8]) -> Result<Self::Buffer>;

    /// 从字节码创建顶点程序
    fn create_vertex_program(&self, bytecode: &[u8]) -> Result<Self::VertexProgram>;

    /// 从字节码创建像素程序
    fn create_pixel_program(&self, bytecode: &[u8]) -> Result<Self::PixelProgram>;

    /// 创建输入布局，并根据顶点程序字节码的输入签名进行校验
    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        vs_bytecode: &[u8],
    ) -> Result<Self::InputLayout>;

    /// 创建二维纹理并返回其着色器资源视图
    fn create_texture_view(&self, desc: &TextureDesc, pixels: &[u8]) -> Result<Self::TextureView>;

    /// 创建采样器状态
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Self::Sampler>;
}

/// 命令边界（立即模式设备上下文）
///
/// 所有调用按发出顺序生效：对同一缓冲区先写入再复制时，复制一定能观察到写入。
pub trait DeviceContext<D: Device> {
    /// 绑定顶点缓冲区，`buffers`、`strides`、`offsets` 长度一致
    fn set_vertex_buffers(
        &mut self,
        start_slot: u32,
        buffers: &[&D::Buffer],
        strides: &[u32],
        offsets: &[u32],
    );

    fn set_index_buffer(&mut self, buffer: &D::Buffer, format: IndexFormat, offset: u32);

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);

    fn set_input_layout(&mut self, layout: &D::InputLayout);

    fn set_vertex_program(&mut self, program: &D::VertexProgram);

    fn set_pixel_program(&mut self, program: &D::PixelProgram);

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: &D::Buffer);

    fn set_shader_resource(&mut self, stage: ShaderStage, slot: u32, view: &D::TextureView);

    fn set_sampler(&mut self, stage: ShaderStage, slot: u32, sampler: &D::Sampler);

    /// 局部更新缓冲区内容
    ///
    /// `region` 为 `None` 时整块替换；否则只写入该字节范围，`data.len()` 等于范围长度。
    fn update_subresource(&mut self, buffer: &D::Buffer, region: Option<BufferRegion>, data: &[u8]);

    /// 设备端整块复制，两个缓冲区大小必须一致
    fn copy_resource(&mut self, dst: &D::Buffer, src: &D::Buffer);

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);
}
