//! 材质与 Part 描述
//!
//! 这些类型只借用调用者的字节，不持有任何 GPU 对象。
//! Part 在初始化时从中创建自己的管线状态。

use super::blob::Blob;
use super::input_layout::InputSignatures;
use crate::gfx::device::AddressMode;

/// 常量缓冲区槽位数量（与着色器寄存器 b0..b15 对应）
pub const CONSTANT_BUFFER_SLOTS: usize = 16;

/// 顶点阶段逐对象数据槽位
pub const VS_OBJECT_SLOT: u32 = 1;
/// 像素阶段材质常量槽位
pub const PS_MATERIAL_SLOT: u32 = 0;
/// 两个阶段共享的视图数据槽位
pub const VIEW_SLOT: u32 = 12;

/// 顶点阶段创建的常量缓冲区槽位，按创建顺序
pub const VS_CONSTANT_SLOTS: [u32; 2] = [VS_OBJECT_SLOT, VIEW_SLOT];
/// 像素阶段创建的常量缓冲区槽位，按创建顺序
pub const PS_CONSTANT_SLOTS: [u32; 2] = [PS_MATERIAL_SLOT, VIEW_SLOT];

/// 采样器描述：槽位 + 寻址模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerInfo {
    pub slot: u32,
    pub address: AddressMode,
}

impl SamplerInfo {
    pub const fn new(slot: u32, address: AddressMode) -> Self {
        Self { slot, address }
    }

    /// 默认采样器组：槽位 1/2/3，寻址模式 wrap/clamp/wrap
    pub fn standard_set() -> Vec<SamplerInfo> {
        vec![
            SamplerInfo::new(1, AddressMode::Wrap),
            SamplerInfo::new(2, AddressMode::Clamp),
            SamplerInfo::new(3, AddressMode::Wrap),
        ]
    }
}

/// 材质描述
#[derive(Debug, Clone)]
pub struct MaterialInfo<'a> {
    pub vs_bytecode: Blob<'a>,
    pub ps_bytecode: Blob<'a>,
    pub input_signatures: InputSignatures,
    /// 按槽位索引的顶点阶段常量数据
    pub vs_constants: [Blob<'a>; CONSTANT_BUFFER_SLOTS],
    /// 按槽位索引的像素阶段常量数据
    pub ps_constants: [Blob<'a>; CONSTANT_BUFFER_SLOTS],
    /// 像素阶段纹理标识，顺序即槽位
    pub textures: &'a [String],
    pub samplers: Vec<SamplerInfo>,
}

impl<'a> MaterialInfo<'a> {
    /// 只有着色器和签名的材质，常量槽位为空，使用默认采样器组
    pub fn new(vs_bytecode: Blob<'a>, ps_bytecode: Blob<'a>, input_signatures: InputSignatures) -> Self {
        Self {
            vs_bytecode,
            ps_bytecode,
            input_signatures,
            vs_constants: [Blob::empty(); CONSTANT_BUFFER_SLOTS],
            ps_constants: [Blob::empty(); CONSTANT_BUFFER_SLOTS],
            textures: &[],
            samplers: SamplerInfo::standard_set(),
        }
    }

    pub fn with_vs_constants(mut self, slot: u32, blob: Blob<'a>) -> Self {
        if let Some(entry) = self.vs_constants.get_mut(slot as usize) {
            *entry = blob;
        }
        self
    }

    pub fn with_ps_constants(mut self, slot: u32, blob: Blob<'a>) -> Self {
        if let Some(entry) = self.ps_constants.get_mut(slot as usize) {
            *entry = blob;
        }
        self
    }

    pub fn with_textures(mut self, textures: &'a [String]) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_samplers(mut self, samplers: Vec<SamplerInfo>) -> Self {
        self.samplers = samplers;
        self
    }

    pub fn vs_constant(&self, slot: u32) -> Blob<'a> {
        self.vs_constants.get(slot as usize).copied().unwrap_or_default()
    }

    pub fn ps_constant(&self, slot: u32) -> Blob<'a> {
        self.ps_constants.get(slot as usize).copied().unwrap_or_default()
    }
}

/// Part 描述：材质 + 共享索引缓冲区中的绘制范围
#[derive(Debug, Clone)]
pub struct PartInfo<'a> {
    pub material: MaterialInfo<'a>,
    pub index_count: u32,
    pub index_offset: u32,
}

impl<'a> PartInfo<'a> {
    pub fn new(material: MaterialInfo<'a>, index_count: u32, index_offset: u32) -> Self {
        Self {
            material,
            index_count,
            index_offset,
        }
    }
}
