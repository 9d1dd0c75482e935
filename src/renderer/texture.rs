//! 纹理加载
//!
//! Part 通过 [`TextureLoader`] 把一组图像标识转换成着色器资源视图，
//! 结果与输入一一对应、顺序相同。默认实现 [`ImageFileLoader`] 把标识当作文件路径，
//! 用 `image` crate 解码为 RGBA8。

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{ResourceError, Result};
use crate::gfx::device::{Device, TextureDesc, TextureFormat};

/// 图像解码协作者
pub trait TextureLoader<D: Device> {
    /// 为每个标识创建一个纹理视图，遇到第一个失败即停止
    fn load_views(&self, device: &D, identifiers: &[String]) -> Result<Vec<D::TextureView>>;
}

/// 从文件系统加载图像
#[derive(Debug, Clone, Default)]
pub struct ImageFileLoader {
    /// 相对标识的根目录
    root: Option<PathBuf>,
}

impl ImageFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, identifier: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(identifier),
            None => PathBuf::from(identifier),
        }
    }

    /// 解码一张图像为 RGBA8 像素
    pub fn decode(path: &Path) -> Result<(TextureDesc, Vec<u8>)> {
        if !path.is_file() {
            return Err(ResourceError::NotFound(path.to_path_buf()).into());
        }
        let image = image::open(path).map_err(|e| ResourceError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgba = image.to_rgba8();
        let desc = TextureDesc {
            width: rgba.width(),
            height: rgba.height(),
            format: TextureFormat::Rgba8Unorm,
        };
        Ok((desc, rgba.into_raw()))
    }
}

impl<D: Device> TextureLoader<D> for ImageFileLoader {
    fn load_views(&self, device: &D, identifiers: &[String]) -> Result<Vec<D::TextureView>> {
        identifiers
            .iter()
            .map(|identifier| {
                let path = self.resolve(identifier);
                let (desc, pixels) = Self::decode(&path)?;
                let view = device.create_texture_view(&desc, &pixels)?;
                debug!(path = %path.display(), width = desc.width, height = desc.height, "Texture loaded");
                Ok(view)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RenderError;
    use crate::gfx::recording::RecordingDevice;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_loads_views_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 2);
        write_png(dir.path(), "b.png", 8, 8);

        let device = RecordingDevice::new();
        let loader = ImageFileLoader::with_root(dir.path());
        let views = loader
            .load_views(&device, &["a.png".to_string(), "b.png".to_string()])
            .unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].desc().width, 4);
        assert_eq!(views[1].desc().height, 8);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let device = RecordingDevice::new();
        let loader = ImageFileLoader::with_root(dir.path());
        let err = loader
            .load_views(&device, &["missing.png".to_string()])
            .unwrap_err();
        assert!(matches!(err, RenderError::Resource(ResourceError::NotFound(_))));
        assert!(device.attempts().is_empty());
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not an image").unwrap();
        let err = ImageFileLoader::decode(&dir.path().join("bad.png")).unwrap_err();
        assert!(matches!(err, RenderError::Resource(ResourceError::Decode { .. })));
    }
}
