//! 静态网格
//!
//! 网格持有共享的顶点/索引缓冲区和一个有序的 Part 列表：
//!
//! - `add_buffer_group`：创建三个顶点流和一个索引流
//! - `add_part`：创建并初始化 Part，仅在成功时追加
//! - `render`：绑定共享几何数据一次，然后按插入顺序渲染每个 Part
//!
//! 绘制时的几何布局是固定的：两个顶点流（步长 16 和 4 字节）、16 位索引、三角形列表。
//! 网格被 drop 时，所有缓冲区和 Part 的资源随之释放。

use tracing::{debug, error, info, trace, warn};

use super::blob::BufferGroup;
use super::hash::MeshHash;
use super::material::PartInfo;
use super::part::{Part, PartOptions};
use super::resource::{create_index_buffer, create_vertex_buffers};
use super::texture::{ImageFileLoader, TextureLoader};
use crate::component::Camera;
use crate::core::error::{PreconditionError, Result};
use crate::gfx::device::{Device, DeviceContext, GpuBuffer, IndexFormat, PrimitiveTopology};

/// 绘制时绑定的顶点流步长
pub const VERTEX_STRIDES: [u32; 2] = [16, 4];

/// 一组已创建的共享几何缓冲区
struct GeometryBuffers<D: Device> {
    vertex_buffers: Vec<D::Buffer>,
    index_buffer: D::Buffer,
}

/// 静态网格
pub struct StaticMesh<D: Device> {
    hash: MeshHash,
    device: Option<D>,
    texture_loader: Box<dyn TextureLoader<D>>,
    options: PartOptions,
    geometry: Vec<GeometryBuffers<D>>,
    parts: Vec<Part<D>>,
}

impl<D: Device> StaticMesh<D> {
    /// 创建一个空网格
    ///
    /// 无效哈希只记录警告，不阻止创建。
    pub fn new(hash: MeshHash) -> Self {
        if !hash.is_valid() {
            warn!(hash = %hash, "Static mesh created with an invalid hash");
        }
        Self {
            hash,
            device: None,
            texture_loader: Box::new(ImageFileLoader::new()),
            options: PartOptions::default(),
            geometry: Vec::new(),
            parts: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: PartOptions) -> Self {
        self.options = options;
        self
    }

    /// 替换纹理加载器
    pub fn with_texture_loader(mut self, loader: impl TextureLoader<D> + 'static) -> Self {
        self.texture_loader = Box::new(loader);
        self
    }

    /// 关联设备，之后才能添加几何数据和 Part
    pub fn initialize(&mut self, device: D) {
        debug!(hash = %self.hash, "Static mesh initialized");
        self.device = Some(device);
    }

    fn device(&self) -> Result<&D> {
        self.device
            .as_ref()
            .ok_or_else(|| PreconditionError::MeshNotInitialized.into())
    }

    /// 创建一组共享几何缓冲区：先三个顶点流，再索引流
    ///
    /// 任何一步失败都原样返回，本组已创建的缓冲区随之释放，网格不保留这组数据。
    pub fn add_buffer_group(&mut self, group: &BufferGroup<'_>) -> Result<()> {
        let device = self.device()?;

        let buffers = create_vertex_buffers(device, &group.vertex_buffers)
            .and_then(|vertex_buffers| {
                let index_buffer = create_index_buffer(device, group.index_buffer)?;
                Ok(GeometryBuffers::<D> {
                    vertex_buffers,
                    index_buffer,
                })
            })
            .inspect_err(|e| error!(hash = %self.hash, error = %e, "Failed to create mesh geometry"))?;

        info!(
            hash = %self.hash,
            vertex_bytes = group.vertex_bytes(),
            index_bytes = buffers.index_buffer.byte_width(),
            "Mesh geometry created"
        );
        self.geometry.push(buffers);
        Ok(())
    }

    /// 创建并初始化一个 Part，成功后追加到列表末尾
    pub fn add_part(&mut self, info: &PartInfo<'_>) -> Result<()> {
        let device = self.device()?;
        let mut part = Part::new(self.parts.len(), self.options);
        part.initialize(device, info, self.texture_loader.as_ref())?;

        info!(
            hash = %self.hash,
            part = part.index(),
            index_count = part.index_count(),
            index_offset = part.index_offset(),
            "Part added"
        );
        self.parts.push(part);
        Ok(())
    }

    pub fn hash(&self) -> MeshHash {
        self.hash
    }

    pub fn options(&self) -> PartOptions {
        self.options
    }

    /// 当前绑定的顶点流缓冲区，没有几何数据时为空
    pub fn vertex_buffers(&self) -> &[D::Buffer] {
        self.geometry
            .first()
            .map_or(&[], |g| g.vertex_buffers.as_slice())
    }

    pub fn index_buffer(&self) -> Option<&D::Buffer> {
        self.geometry.first().map(|g| &g.index_buffer)
    }

    /// 已创建的几何数据组数
    pub fn buffer_group_count(&self) -> usize {
        self.geometry.len()
    }

    pub fn parts(&self) -> &[Part<D>] {
        &self.parts
    }

    /// 绑定共享几何数据并依次渲染每个 Part
    ///
    /// 缺少几何数据时不发出任何命令。某个 Part 失败时立即返回，后续 Part 不再渲染。
    pub fn render<C: DeviceContext<D>>(&self, context: &mut C, camera: &Camera, delta_time: f32) -> Result<()> {
        let geometry = self.geometry.first().ok_or(PreconditionError::MissingGeometry)?;
        let [position_stream, attribute_stream, ..] = geometry.vertex_buffers.as_slice() else {
            return Err(PreconditionError::MissingGeometry.into());
        };

        context.set_vertex_buffers(0, &[position_stream, attribute_stream], &VERTEX_STRIDES, &[0, 0]);
        context.set_index_buffer(&geometry.index_buffer, IndexFormat::Uint16, 0);
        context.set_primitive_topology(PrimitiveTopology::TriangleList);

        for part in &self.parts {
            part.render(context, camera, delta_time)?;
        }

        trace!(hash = %self.hash, parts = self.parts.len(), "Mesh rendered");
        Ok(())
    }
}

impl<D: Device> Drop for StaticMesh<D> {
    fn drop(&mut self) {
        debug!(hash = %self.hash, parts = self.parts.len(), "Static mesh released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ObjectKind, RenderError};
    use crate::gfx::device::{ElementFormat, ShaderStage};
    use crate::gfx::recording::{Command, RecordingContext, RecordingDevice};
    use crate::renderer::blob::Blob;
    use crate::renderer::fixture::MaterialFixture;
    use crate::renderer::input_layout::{
        signatures_from_slice, InputSemantic, InputSignature, InputSignatures,
    };
    use crate::renderer::view::{FrameViewBlock, CAMERA_POSITION_REGION, VIEWPORT_REGION, VIEW_MATRIX_REGION};

    struct Geometry {
        streams: [Vec<u8>; 3],
        indices: Vec<u8>,
    }

    impl Geometry {
        fn quad() -> Self {
            let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];
            Self {
                streams: [vec![0; 4 * 16], vec![0; 4 * 4], vec![0; 4 * 4]],
                indices: bytemuck::cast_slice(&indices).to_vec(),
            }
        }

        fn group(&self) -> BufferGroup<'_> {
            BufferGroup::new(
                [
                    Blob::from(&self.streams[0]),
                    Blob::from(&self.streams[1]),
                    Blob::from(&self.streams[2]),
                ],
                Blob::from(&self.indices),
            )
        }
    }

    fn signatures() -> InputSignatures {
        signatures_from_slice(&[
            InputSignature::new(InputSemantic::Position, 0, ElementFormat::R32G32B32A32_FLOAT, 0),
            InputSignature::UNUSED,
            InputSignature::new(InputSemantic::Texcoord, 0, ElementFormat::R16G16_SNORM, 1),
            InputSignature::UNUSED,
            InputSignature::new(InputSemantic::Colour, 0, ElementFormat::R8G8B8A8_UNORM, 2),
            InputSignature::UNUSED,
        ])
    }

    fn mesh_with_geometry(device: &RecordingDevice) -> StaticMesh<RecordingDevice> {
        let mut mesh = StaticMesh::new("C325BB80".parse().unwrap());
        mesh.initialize(device.clone());
        mesh.add_buffer_group(&Geometry::quad().group()).unwrap();
        mesh
    }

    fn add_parts(mesh: &mut StaticMesh<RecordingDevice>, ranges: &[(u32, u32)]) {
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        for &(count, offset) in ranges {
            let info = PartInfo::new(fixture.material_info(signatures()), count, offset);
            mesh.add_part(&info).unwrap();
        }
    }

    #[test]
    fn test_buffer_sizes_equal_blob_sizes() {
        let device = RecordingDevice::new();
        let mesh = mesh_with_geometry(&device);

        let sizes: Vec<u32> = mesh.vertex_buffers().iter().map(|b| b.byte_width()).collect();
        assert_eq!(sizes, vec![64, 16, 16]);
        assert_eq!(mesh.index_buffer().unwrap().byte_width(), 12);
        assert_eq!(mesh.buffer_group_count(), 1);
    }

    #[test]
    fn test_buffer_group_failure_keeps_no_geometry() {
        let device = RecordingDevice::new();
        device.fail_kind(ObjectKind::IndexBuffer);
        let mut mesh = StaticMesh::new(MeshHash::from_raw(1));
        mesh.initialize(device.clone());

        let geometry = Geometry::quad();
        let err = mesh.add_buffer_group(&geometry.group()).unwrap_err();
        assert!(matches!(err, RenderError::Device(_)));
        assert!(mesh.vertex_buffers().is_empty());
        assert!(mesh.index_buffer().is_none());
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_uninitialized_mesh_rejects_data() {
        let mut mesh: StaticMesh<RecordingDevice> = StaticMesh::new(MeshHash::from_raw(1));
        let err = mesh.add_buffer_group(&Geometry::quad().group()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Precondition(PreconditionError::MeshNotInitialized)
        ));
    }

    #[test]
    fn test_invalid_hash_is_accepted() {
        let mesh: StaticMesh<RecordingDevice> = StaticMesh::new(MeshHash::INVALID);
        assert!(!mesh.hash().is_valid());
    }

    #[test]
    fn test_part_exposes_pipeline() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        add_parts(&mut mesh, &[(6, 0)]);

        let part = &mesh.parts()[0];
        assert!(part.vertex_program().is_some());
        assert!(part.pixel_program().is_some());
        // 8 个签名中有 3 个被使用
        assert_eq!(part.input_layout().unwrap().element_count(), 3);
    }

    #[test]
    fn test_failed_part_is_not_added() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        device.fail_kind(ObjectKind::PixelProgram);

        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let info = PartInfo::new(fixture.material_info(signatures()), 6, 0);
        assert!(mesh.add_part(&info).is_err());
        assert!(mesh.parts().is_empty());
        // 输入布局从未尝试创建
        assert!(!device.attempts().contains(&ObjectKind::InputLayout));
    }

    #[test]
    fn test_render_without_geometry_issues_nothing() {
        let device = RecordingDevice::new();
        let mut mesh = StaticMesh::new(MeshHash::from_raw(1));
        mesh.initialize(device);

        let mut context = RecordingContext::new();
        let err = mesh.render(&mut context, &Camera::main_camera(), 0.016).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Precondition(PreconditionError::MissingGeometry)
        ));
        assert!(context.commands().is_empty());
    }

    #[test]
    fn test_render_binds_shared_geometry_once() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        add_parts(&mut mesh, &[(3, 0), (3, 3)]);

        let mut context = RecordingContext::new();
        mesh.render(&mut context, &Camera::main_camera(), 0.016).unwrap();

        let vb: Vec<u32> = mesh.vertex_buffers().iter().map(|b| b.id()).collect();
        let commands = context.commands();
        assert_eq!(
            commands[0],
            Command::SetVertexBuffers {
                start_slot: 0,
                buffers: vec![vb[0], vb[1]],
                strides: vec![16, 4],
                offsets: vec![0, 0],
            }
        );
        assert_eq!(
            commands[1],
            Command::SetIndexBuffer {
                buffer: mesh.index_buffer().unwrap().id(),
                format: IndexFormat::Uint16,
                offset: 0,
            }
        );
        assert_eq!(commands[2], Command::SetPrimitiveTopology(PrimitiveTopology::TriangleList));
        let geometry_binds = commands
            .iter()
            .filter(|c| matches!(c, Command::SetVertexBuffers { .. } | Command::SetIndexBuffer { .. }))
            .count();
        assert_eq!(geometry_binds, 2);
    }

    #[test]
    fn test_k_parts_issue_k_draws_in_order() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        let ranges = [(1116, 0), (36, 1116), (6, 1152), (300, 1158)];
        add_parts(&mut mesh, &ranges);

        let mut context = RecordingContext::new();
        mesh.render(&mut context, &Camera::main_camera(), 0.016).unwrap();

        let expected: Vec<(u32, u32, i32)> = ranges.iter().map(|&(c, o)| (c, o, 0)).collect();
        assert_eq!(context.draw_calls(), expected);
    }

    #[test]
    fn test_view_writes_precede_copy_for_every_part() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        add_parts(&mut mesh, &[(3, 0), (3, 3), (6, 6)]);

        let camera = {
            let mut camera = Camera::main_camera();
            camera.set_position(crate::math::Vector3::new(-2.0, 1.5, 10.0));
            camera
        };
        let mut context = RecordingContext::new();
        mesh.render(&mut context, &camera, 0.016).unwrap();
        let commands = context.commands();

        for part in mesh.parts() {
            let view = part.view_buffer().unwrap().id();
            let cb12 = part.vs_constant_buffers()[1].get().id();

            let writes: Vec<(usize, _)> = commands
                .iter()
                .enumerate()
                .filter_map(|(i, c)| match c {
                    Command::UpdateSubresource { buffer, region } if *buffer == view => Some((i, *region)),
                    _ => None,
                })
                .collect();
            assert_eq!(
                writes.iter().map(|(_, r)| *r).collect::<Vec<_>>(),
                vec![Some(VIEW_MATRIX_REGION), Some(CAMERA_POSITION_REGION)]
            );

            let copy = commands
                .iter()
                .position(|c| *c == Command::CopyResource { dst: cb12, src: view })
                .unwrap();
            let bind = commands
                .iter()
                .position(|c| {
                    *c == Command::SetConstantBuffer { stage: ShaderStage::Vertex, slot: 12, buffer: cb12 }
                })
                .unwrap();
            assert!(writes.iter().all(|(i, _)| *i < copy));
            assert!(copy < bind);

            let block = FrameViewBlock::from_camera(&camera);
            let contents = part.vs_constant_buffers()[1].get().contents();
            assert_eq!(&contents[..48], block.view_rows_bytes());
            assert_eq!(&contents[112..128], block.camera_position_bytes());
        }
    }

    #[test]
    fn test_upload_viewport_adds_third_write() {
        let device = RecordingDevice::new();
        let mut mesh = StaticMesh::new(MeshHash::from_raw(1)).with_options(PartOptions {
            max_anisotropy: 4,
            upload_viewport: true,
        });
        mesh.initialize(device.clone());
        mesh.add_buffer_group(&Geometry::quad().group()).unwrap();
        add_parts(&mut mesh, &[(6, 0)]);

        let mut context = RecordingContext::new();
        mesh.render(&mut context, &Camera::main_camera(), 0.016).unwrap();
        let regions: Vec<_> = context
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::UpdateSubresource { region, .. } => *region,
                _ => None,
            })
            .collect();
        assert_eq!(regions, vec![VIEW_MATRIX_REGION, CAMERA_POSITION_REGION, VIEWPORT_REGION]);
    }

    #[test]
    fn test_textures_bind_by_list_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut textures = Vec::new();
        for name in ["diffuse.png", "normal.png"] {
            let path = dir.path().join(name);
            image::RgbaImage::new(2, 2).save(&path).unwrap();
            textures.push(path.to_string_lossy().into_owned());
        }

        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let info = PartInfo::new(
            fixture.material_info(signatures()).with_textures(&textures),
            6,
            0,
        );
        mesh.add_part(&info).unwrap();

        let mut context = RecordingContext::new();
        mesh.render(&mut context, &Camera::main_camera(), 0.016).unwrap();

        let views: Vec<u32> = mesh.parts()[0].textures().iter().map(|v| v.id()).collect();
        let bound: Vec<(u32, u32)> = context
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SetShaderResource { stage: ShaderStage::Pixel, slot, view } => Some((*slot, *view)),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec![(0, views[0]), (1, views[1])]);
    }

    #[test]
    fn test_drop_releases_all_objects() {
        let device = RecordingDevice::new();
        let mut mesh = mesh_with_geometry(&device);
        add_parts(&mut mesh, &[(3, 0), (3, 3)]);
        assert!(device.live_objects() > 0);

        drop(mesh);
        assert_eq!(device.live_objects(), 0);
    }
}
