//! 逐帧视图数据
//!
//! 视图常量缓冲区（槽位 12）的字节布局由着色器固定：
//!
//! | 偏移 | 大小 | 内容 |
//! |------|------|------|
//! | 0    | 64   | 视图矩阵（行向量约定） |
//! | 64   | 32   | 保留 |
//! | 96   | 16   | 相机朝向取反 |
//! | 112  | 16   | 相机位置 |
//! | 128  | 16   | 视口 (w, h, 1/w, 1/h) |
//! | 144  | 16   | 相机位置（第二份） |
//!
//! 每帧只写入前三行矩阵 [0,48) 与相机位置 [112,128)，其余字节保持材质初始内容。
//! 视图矩阵的打包方式：每行第 3 列放相机朝向分量，第 2 列清零。

use bytemuck::{Pod, Zeroable};

use crate::component::Camera;
use crate::gfx::device::{BufferRegion, Device, DeviceContext};
use crate::math::{point4, to_row_vector_rows};

/// 视图矩阵写入范围：3 行 × 16 字节
pub const VIEW_MATRIX_REGION: BufferRegion = BufferRegion::new(0, 48);
/// 相机位置写入范围
pub const CAMERA_POSITION_REGION: BufferRegion = BufferRegion::new(112, 16);
/// 视口写入范围（可选）
pub const VIEWPORT_REGION: BufferRegion = BufferRegion::new(128, 16);

/// 视图源缓冲区的最小大小
pub const MIN_VIEW_BUFFER_SIZE: u32 = CAMERA_POSITION_REGION.right;

/// 视图常量缓冲区的完整布局
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ViewConstants {
    pub view: [[f32; 4]; 4],
    pub reserved: [[f32; 4]; 2],
    pub negative_direction: [f32; 4],
    pub camera_position: [f32; 4],
    pub viewport: [f32; 4],
    pub camera_position2: [f32; 4],
}

impl ViewConstants {
    /// 用当前相机填充整个布局，作为视图常量的初始内容
    pub fn from_camera(camera: &Camera) -> Self {
        let block = FrameViewBlock::from_camera(camera);
        let direction = camera.direction();
        Self {
            view: block.view,
            reserved: [[0.0; 4]; 2],
            negative_direction: [-direction.x, -direction.y, -direction.z, 0.0],
            camera_position: block.camera_position,
            viewport: block.viewport,
            camera_position2: block.camera_position,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// 视图源缓冲区需要的最小大小
pub fn required_view_buffer_size(upload_viewport: bool) -> u32 {
    if upload_viewport {
        VIEWPORT_REGION.right
    } else {
        MIN_VIEW_BUFFER_SIZE
    }
}

/// 一帧的视图数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameViewBlock {
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub viewport: [f32; 4],
}

impl FrameViewBlock {
    pub fn from_camera(camera: &Camera) -> Self {
        let mut view = to_row_vector_rows(&camera.view_matrix());
        let direction = camera.direction();
        for (row, component) in view.iter_mut().take(3).zip(direction.iter()) {
            row[3] = *component;
            row[2] = 0.0;
        }

        let (width, height) = camera.viewport();
        let reciprocal = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };

        Self {
            view,
            camera_position: point4(&camera.position()),
            viewport: [width, height, reciprocal(width), reciprocal(height)],
        }
    }

    /// 视图矩阵前三行的字节
    pub fn view_rows_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.view[..3])
    }

    pub fn camera_position_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.camera_position)
    }

    pub fn viewport_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.viewport)
    }

    /// 以局部写入的方式把本帧数据写进视图源缓冲区
    ///
    /// 写入的字节范围互不重叠。调用者在此之后才能复制该缓冲区。
    pub fn upload<D, C>(&self, context: &mut C, target: &D::Buffer, upload_viewport: bool)
    where
        D: Device,
        C: DeviceContext<D>,
    {
        context.update_subresource(target, Some(VIEW_MATRIX_REGION), self.view_rows_bytes());
        context.update_subresource(target, Some(CAMERA_POSITION_REGION), self.camera_position_bytes());
        if upload_viewport {
            context.update_subresource(target, Some(VIEWPORT_REGION), self.viewport_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;
    use crate::gfx::device::{BindFlags, BufferDesc};
    use crate::gfx::recording::{Command, RecordingContext, RecordingDevice};
    use crate::math::Vector3;

    fn test_camera() -> Camera {
        let mut camera = Camera::new("test");
        camera.look_at(
            Vector3::new(1.0, 2.0, -5.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        camera.set_viewport(800.0, 600.0);
        camera
    }

    #[test]
    fn test_layout_offsets() {
        assert_eq!(size_of::<ViewConstants>(), 160);
        assert_eq!(offset_of!(ViewConstants, negative_direction), 96);
        assert_eq!(offset_of!(ViewConstants, camera_position), CAMERA_POSITION_REGION.left as usize);
        assert_eq!(offset_of!(ViewConstants, viewport), VIEWPORT_REGION.left as usize);
        assert_eq!(offset_of!(ViewConstants, camera_position2), 144);
        assert!(!VIEW_MATRIX_REGION.overlaps(&CAMERA_POSITION_REGION));
        assert!(!CAMERA_POSITION_REGION.overlaps(&VIEWPORT_REGION));
    }

    #[test]
    fn test_view_packing() {
        let camera = test_camera();
        let block = FrameViewBlock::from_camera(&camera);
        let rows = to_row_vector_rows(&camera.view_matrix());
        let direction = camera.direction();

        for i in 0..3 {
            assert_eq!(block.view[i][0], rows[i][0]);
            assert_eq!(block.view[i][1], rows[i][1]);
            assert_eq!(block.view[i][2], 0.0);
            assert_eq!(block.view[i][3], direction[i]);
        }
        assert_eq!(block.view[3], rows[3]);
        assert_eq!(block.camera_position, [1.0, 2.0, -5.0, 1.0]);
        assert_eq!(block.viewport, [800.0, 600.0, 1.0 / 800.0, 1.0 / 600.0]);
        assert_eq!(block.view_rows_bytes().len(), 48);
    }

    #[test]
    fn test_zero_viewport_has_no_reciprocal() {
        let mut camera = test_camera();
        camera.set_viewport(0.0, 0.0);
        let block = FrameViewBlock::from_camera(&camera);
        assert_eq!(block.viewport, [0.0; 4]);
    }

    #[test]
    fn test_upload_writes_two_disjoint_regions() {
        let device = RecordingDevice::new();
        let initial = [0xFFu8; 160];
        let buffer = device
            .create_buffer(&BufferDesc { byte_width: 160, bind: BindFlags::None }, &initial)
            .unwrap();
        let block = FrameViewBlock::from_camera(&test_camera());

        let mut context = RecordingContext::new();
        block.upload::<RecordingDevice, _>(&mut context, &buffer, false);

        let regions: Vec<_> = context
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::UpdateSubresource { region, .. } => *region,
                _ => None,
            })
            .collect();
        assert_eq!(regions, vec![VIEW_MATRIX_REGION, CAMERA_POSITION_REGION]);

        let contents = buffer.contents();
        assert_eq!(&contents[..48], block.view_rows_bytes());
        assert_eq!(&contents[112..128], block.camera_position_bytes());
        // 未写入的字节保持原样
        assert!(contents[48..112].iter().all(|b| *b == 0xFF));
        assert!(contents[128..].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_required_size() {
        assert_eq!(required_view_buffer_size(false), 128);
        assert_eq!(required_view_buffer_size(true), 144);
        let constants = ViewConstants::from_camera(&test_camera());
        assert_eq!(constants.as_bytes().len(), 160);
    }
}
