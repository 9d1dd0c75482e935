//! 顶点输入签名
//!
//! 一个 Part 的顶点布局由最多 [`MAX_INPUT_SIGNATURES`] 个签名描述。
//! 语义为 [`InputSemantic::None`] 的条目表示空槽位，构建布局时直接跳过，
//! 不占用任何布局元素。

use serde::Deserialize;

use crate::gfx::device::{ElementFormat, InputElementDesc};

/// 每个 Part 的签名数组容量
pub const MAX_INPUT_SIGNATURES: usize = 8;

/// 顶点元素语义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSemantic {
    Position,
    Normal,
    Tangent,
    Colour,
    Texcoord,
    BlendIndices,
    BlendWeight,
    /// 未使用
    #[default]
    None,
}

impl InputSemantic {
    /// 着色器输入签名中使用的语义名称，`None` 没有名称
    pub fn semantic_name(&self) -> Option<&'static str> {
        match self {
            InputSemantic::Position => Some("POSITION"),
            InputSemantic::Normal => Some("NORMAL"),
            InputSemantic::Tangent => Some("TANGENT"),
            InputSemantic::Colour => Some("COLOR"),
            InputSemantic::Texcoord => Some("TEXCOORD"),
            InputSemantic::BlendIndices => Some("BLENDINDICES"),
            InputSemantic::BlendWeight => Some("BLENDWEIGHT"),
            InputSemantic::None => None,
        }
    }
}

/// 一个顶点输入元素的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InputSignature {
    pub semantic: InputSemantic,
    #[serde(default)]
    pub semantic_index: u32,
    pub format: ElementFormat,
    /// 源顶点流
    #[serde(default)]
    pub buffer_index: u32,
}

impl InputSignature {
    pub const UNUSED: InputSignature = InputSignature {
        semantic: InputSemantic::None,
        semantic_index: 0,
        format: ElementFormat::UNKNOWN,
        buffer_index: 0,
    };

    pub fn new(semantic: InputSemantic, semantic_index: u32, format: ElementFormat, buffer_index: u32) -> Self {
        Self {
            semantic,
            semantic_index,
            format,
            buffer_index,
        }
    }

    pub fn is_used(&self) -> bool {
        self.semantic != InputSemantic::None
    }
}

impl Default for InputSignature {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// 定长签名数组
pub type InputSignatures = [InputSignature; MAX_INPUT_SIGNATURES];

/// 从签名列表构造定长数组，多余的槽位填充为未使用
///
/// 超过容量的条目被丢弃。
pub fn signatures_from_slice(signatures: &[InputSignature]) -> InputSignatures {
    let mut out = [InputSignature::UNUSED; MAX_INPUT_SIGNATURES];
    for (slot, signature) in out.iter_mut().zip(signatures) {
        *slot = *signature;
    }
    out
}

/// 把签名数组转换为布局元素
///
/// 元素在各自的顶点流内紧密排列。
pub fn build_input_elements(signatures: &InputSignatures) -> Vec<InputElementDesc> {
    signatures
        .iter()
        .filter_map(|signature| {
            let semantic_name = signature.semantic.semantic_name()?;
            Some(InputElementDesc {
                semantic_name,
                semantic_index: signature.semantic_index,
                format: signature.format,
                input_slot: signature.buffer_index,
            })
        })
        .collect()
}
