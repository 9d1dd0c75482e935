//! 开发期数据目录
//!
//! 生产数据以内存中的 [`Blob`] 形式由资产加载器提供。开发期可以把一个 Part 的材质
//! 数据导出为目录，由本模块读入并持有这些字节，[`PartInfo`] 再从中借用：
//!
//! ```text
//! <dir>/
//!   vs.bin          顶点程序字节码
//!   ps.bin          像素程序字节码
//!   VS_cb1.bin      顶点阶段槽位 1
//!   VS_cb12.bin     顶点阶段槽位 12（视图源缓冲区的初始内容）
//!   PS_cb0.bin      像素阶段槽位 0
//!   PS_cb12.bin     像素阶段槽位 12
//!   PS_<n>_*.dds    纹理，<n> 从 0 开始连续编号，即绑定槽位
//!   part.toml       可选：输入签名与绘制范围
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use super::blob::Blob;
use super::input_layout::{InputSignature, InputSignatures};
use super::material::{MaterialInfo, PS_MATERIAL_SLOT, VIEW_SLOT, VS_OBJECT_SLOT};
use super::view::ViewConstants;
use crate::component::Camera;
use crate::core::error::{ConfigError, ResourceError, Result};

/// 一个 Part 的材质数据（持有字节）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialFixture {
    pub vs_bytecode: Vec<u8>,
    pub ps_bytecode: Vec<u8>,
    pub vs_object_constants: Vec<u8>,
    pub vs_view_constants: Vec<u8>,
    pub ps_material_constants: Vec<u8>,
    pub ps_view_constants: Vec<u8>,
    /// 纹理文件的完整路径，顺序即槽位
    pub textures: Vec<String>,
}

/// `part.toml` 的内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartLayout {
    #[serde(default, rename = "signature")]
    pub signatures: Vec<InputSignature>,
    pub index_count: u32,
    #[serde(default)]
    pub index_offset: u32,
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(ResourceError::NotFound(path.to_path_buf()).into());
    }
    Ok(fs::read(path)?)
}

/// 从 `PS_<n>_xxx.dds` 中取出 `<n>`
fn texture_slot(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix("PS_")?;
    if !rest.to_ascii_lowercase().ends_with(".dds") {
        return None;
    }
    let (slot, _) = rest.split_once('_')?;
    slot.parse().ok()
}

impl MaterialFixture {
    /// 读取一个材质目录
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ResourceError::NotFound(dir.to_path_buf()).into());
        }

        let fixture = Self {
            vs_bytecode: read_file(&dir.join("vs.bin"))?,
            ps_bytecode: read_file(&dir.join("ps.bin"))?,
            vs_object_constants: read_file(&dir.join("VS_cb1.bin"))?,
            vs_view_constants: read_file(&dir.join("VS_cb12.bin"))?,
            ps_material_constants: read_file(&dir.join("PS_cb0.bin"))?,
            ps_view_constants: read_file(&dir.join("PS_cb12.bin"))?,
            textures: Self::find_textures(dir)?,
        };

        info!(
            dir = %dir.display(),
            vs_bytes = fixture.vs_bytecode.len(),
            ps_bytes = fixture.ps_bytecode.len(),
            textures = fixture.textures.len(),
            "Material fixture loaded"
        );
        Ok(fixture)
    }

    fn find_textures(dir: &Path) -> Result<Vec<String>> {
        let mut textures: Vec<(u32, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let slot = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(texture_slot);
            if let Some(slot) = slot {
                debug!(slot, path = %path.display(), "Texture found");
                textures.push((slot, path));
            }
        }
        textures.sort();

        // 纹理按列表下标绑定，编号必须与下标一致
        textures
            .into_iter()
            .zip(0u32..)
            .map(|((slot, path), expected)| -> Result<String> {
                if slot != expected {
                    return Err(ResourceError::TextureSlot { path, slot, expected }.into());
                }
                Ok(path.to_string_lossy().into_owned())
            })
            .collect()
    }

    /// 读取可选的 `part.toml`，不存在时返回 `None`
    pub fn load_layout(dir: impl AsRef<Path>) -> Result<Option<PartLayout>> {
        let path = dir.as_ref().join("part.toml");
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let layout = toml::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(layout))
    }

    /// 无着色器编译器时使用的占位材质
    ///
    /// 字节码只是非空的占位字节，只能用于记录后端。视图常量用 `camera` 初始化。
    pub fn placeholder(camera: &Camera) -> Self {
        let view = ViewConstants::from_camera(camera);
        Self {
            vs_bytecode: b"DXBC\0placeholder-vs".to_vec(),
            ps_bytecode: b"DXBC\0placeholder-ps".to_vec(),
            vs_object_constants: vec![0; 64],
            vs_view_constants: view.as_bytes().to_vec(),
            ps_material_constants: vec![0; 16],
            ps_view_constants: view.as_bytes().to_vec(),
            textures: Vec::new(),
        }
    }

    /// 借用本数据构造材质描述，使用默认采样器组
    pub fn material_info(&self, signatures: InputSignatures) -> MaterialInfo<'_> {
        MaterialInfo::new(
            Blob::from(&self.vs_bytecode),
            Blob::from(&self.ps_bytecode),
            signatures,
        )
        .with_vs_constants(VS_OBJECT_SLOT, Blob::from(&self.vs_object_constants))
        .with_vs_constants(VIEW_SLOT, Blob::from(&self.vs_view_constants))
        .with_ps_constants(PS_MATERIAL_SLOT, Blob::from(&self.ps_material_constants))
        .with_ps_constants(VIEW_SLOT, Blob::from(&self.ps_view_constants))
        .with_textures(&self.textures)
    }
}
