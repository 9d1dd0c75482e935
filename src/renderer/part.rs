//! Part：一个可绘制的管线状态单元
//!
//! 每个 Part 独占自己的顶点/像素程序、输入布局、常量缓冲区、纹理和采样器，
//! 并在网格共享的索引缓冲区中绘制一段固定范围。
//!
//! # 初始化顺序
//!
//! 1. 顶点程序
//! 2. 像素程序
//! 3. 输入布局（按顶点程序的输入签名校验）
//! 4. 常量缓冲区（顶点阶段 1、12，视图源缓冲区，像素阶段 0、12）
//! 5. 纹理视图
//! 6. 采样器
//!
//! 任何一步失败都立即返回该步的错误，后续步骤不会执行，已创建的对象随之释放。
//!
//! # 逐帧渲染
//!
//! 绑定状态属于设备上下文，每个 Part 覆盖之前的绑定，不做保存和恢复。
//! 视图数据先以局部写入的方式写进视图源缓冲区，再在绑定前整块复制到
//! 顶点阶段槽位 12 的常量缓冲区；像素阶段的常量缓冲区直接绑定。

use tracing::{debug, error, trace};

use super::input_layout::build_input_elements;
use super::material::{PartInfo, PS_CONSTANT_SLOTS, VIEW_SLOT, VS_CONSTANT_SLOTS};
use super::resource::{create_buffer, create_constant_buffer, BufferUsage, Resource};
use super::texture::TextureLoader;
use super::view::{required_view_buffer_size, FrameViewBlock};
use crate::component::Camera;
use crate::core::config::GraphicsConfig;
use crate::core::error::{PreconditionError, Result};
use crate::gfx::device::{Device, DeviceContext, SamplerDesc, ShaderStage};

/// 影响 Part 创建与渲染的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartOptions {
    /// 采样器最大各向异性
    pub max_anisotropy: u32,
    /// 是否每帧额外写入视口尺寸
    pub upload_viewport: bool,
}

impl Default for PartOptions {
    fn default() -> Self {
        Self {
            max_anisotropy: 4,
            upload_viewport: false,
        }
    }
}

impl From<&GraphicsConfig> for PartOptions {
    fn from(config: &GraphicsConfig) -> Self {
        Self {
            max_anisotropy: config.max_anisotropy,
            upload_viewport: config.upload_viewport,
        }
    }
}

/// 初始化成功后的管线对象
struct Pipeline<D: Device> {
    vertex_program: D::VertexProgram,
    pixel_program: D::PixelProgram,
    input_layout: D::InputLayout,
    vs_constant_buffers: Vec<Resource<D::Buffer>>,
    ps_constant_buffers: Vec<Resource<D::Buffer>>,
    view_buffer: D::Buffer,
    textures: Vec<D::TextureView>,
    samplers: Vec<Resource<D::Sampler>>,
}

/// 可绘制单元
pub struct Part<D: Device> {
    index: usize,
    index_count: u32,
    index_offset: u32,
    options: PartOptions,
    pipeline: Option<Pipeline<D>>,
}

impl<D: Device> Part<D> {
    /// 构造一个空 Part，此时还没有任何 GPU 对象，绘制范围为空
    ///
    /// `index` 是 Part 在网格中的位置，仅用于错误报告和日志。
    pub fn new(index: usize, options: PartOptions) -> Self {
        Self {
            index,
            index_count: 0,
            index_offset: 0,
            options,
            pipeline: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    /// 在设备上创建全部管线对象，并记录 `info` 中的绘制范围
    ///
    /// 失败时 Part 保持未初始化状态，绘制范围不变。
    pub fn initialize(
        &mut self,
        device: &D,
        info: &PartInfo<'_>,
        textures: &dyn TextureLoader<D>,
    ) -> Result<()> {
        match self.build_pipeline(device, info, textures) {
            Ok(pipeline) => {
                debug!(
                    part = self.index,
                    constant_buffers = pipeline.vs_constant_buffers.len() + pipeline.ps_constant_buffers.len(),
                    textures = pipeline.textures.len(),
                    samplers = pipeline.samplers.len(),
                    "Part initialized"
                );
                self.index_count = info.index_count;
                self.index_offset = info.index_offset;
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Err(e) => {
                error!(part = self.index, error = %e, "Part initialization failed");
                Err(e)
            }
        }
    }

    fn build_pipeline(
        &self,
        device: &D,
        info: &PartInfo<'_>,
        textures: &dyn TextureLoader<D>,
    ) -> Result<Pipeline<D>> {
        let material = &info.material;

        let vertex_program = device.create_vertex_program(material.vs_bytecode.data())?;
        let pixel_program = device.create_pixel_program(material.ps_bytecode.data())?;

        let elements = build_input_elements(&material.input_signatures);
        let input_layout = device.create_input_layout(&elements, material.vs_bytecode.data())?;
        debug!(part = self.index, elements = elements.len(), "Input layout created");

        let view_source = material.vs_constant(VIEW_SLOT);
        let required = required_view_buffer_size(self.options.upload_viewport);
        if view_source.len() < required as usize {
            return Err(PreconditionError::ViewBufferTooSmall {
                size: u32::try_from(view_source.len()).unwrap_or(u32::MAX),
                required,
            }
            .into());
        }

        let mut vs_constant_buffers = Vec::with_capacity(VS_CONSTANT_SLOTS.len());
        for slot in VS_CONSTANT_SLOTS {
            vs_constant_buffers.push(create_constant_buffer(device, slot, material.vs_constant(slot))?);
        }
        let view_buffer = create_buffer(device, view_source, BufferUsage::ViewSource)?;
        let mut ps_constant_buffers = Vec::with_capacity(PS_CONSTANT_SLOTS.len());
        for slot in PS_CONSTANT_SLOTS {
            ps_constant_buffers.push(create_constant_buffer(device, slot, material.ps_constant(slot))?);
        }

        let textures = textures.load_views(device, material.textures)?;

        let samplers = material
            .samplers
            .iter()
            .map(|info| {
                let desc = SamplerDesc::anisotropic(info.address, self.options.max_anisotropy);
                device
                    .create_sampler(&desc)
                    .map(|sampler| Resource::new(info.slot, sampler))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Pipeline {
            vertex_program,
            pixel_program,
            input_layout,
            vs_constant_buffers,
            ps_constant_buffers,
            view_buffer,
            textures,
            samplers,
        })
    }

    // ========== 管线对象访问 ==========

    pub fn vertex_program(&self) -> Option<&D::VertexProgram> {
        self.pipeline.as_ref().map(|p| &p.vertex_program)
    }

    pub fn pixel_program(&self) -> Option<&D::PixelProgram> {
        self.pipeline.as_ref().map(|p| &p.pixel_program)
    }

    pub fn input_layout(&self) -> Option<&D::InputLayout> {
        self.pipeline.as_ref().map(|p| &p.input_layout)
    }

    pub fn vs_constant_buffers(&self) -> &[Resource<D::Buffer>] {
        self.pipeline
            .as_ref()
            .map_or(&[], |p| p.vs_constant_buffers.as_slice())
    }

    pub fn ps_constant_buffers(&self) -> &[Resource<D::Buffer>] {
        self.pipeline
            .as_ref()
            .map_or(&[], |p| p.ps_constant_buffers.as_slice())
    }

    /// 视图源缓冲区（不绑定到任何着色器阶段）
    pub fn view_buffer(&self) -> Option<&D::Buffer> {
        self.pipeline.as_ref().map(|p| &p.view_buffer)
    }

    pub fn textures(&self) -> &[D::TextureView] {
        self.pipeline.as_ref().map_or(&[], |p| p.textures.as_slice())
    }

    pub fn samplers(&self) -> &[Resource<D::Sampler>] {
        self.pipeline.as_ref().map_or(&[], |p| p.samplers.as_slice())
    }

    /// 绑定本 Part 的全部状态并发出一次索引绘制
    ///
    /// 未初始化时返回 [`PreconditionError::MissingPipeline`]，不发出任何命令。
    pub fn render<C: DeviceContext<D>>(&self, context: &mut C, camera: &Camera, delta_time: f32) -> Result<()> {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(PreconditionError::MissingPipeline { part: self.index }.into());
        };

        context.set_vertex_program(&pipeline.vertex_program);
        context.set_pixel_program(&pipeline.pixel_program);
        context.set_input_layout(&pipeline.input_layout);

        // 两次写入必须在任何复制之前完成
        let block = FrameViewBlock::from_camera(camera);
        block.upload::<D, C>(context, &pipeline.view_buffer, self.options.upload_viewport);

        for buffer in &pipeline.vs_constant_buffers {
            if buffer.slot() == VIEW_SLOT {
                context.copy_resource(buffer.get(), &pipeline.view_buffer);
            }
            context.set_constant_buffer(ShaderStage::Vertex, buffer.slot(), buffer.get());
        }
        for buffer in &pipeline.ps_constant_buffers {
            context.set_constant_buffer(ShaderStage::Pixel, buffer.slot(), buffer.get());
        }

        for (slot, view) in pipeline.textures.iter().enumerate() {
            context.set_shader_resource(ShaderStage::Pixel, slot as u32, view);
        }
        for sampler in &pipeline.samplers {
            context.set_sampler(ShaderStage::Pixel, sampler.slot(), sampler.get());
        }

        context.draw_indexed(self.index_count, self.index_offset, 0);
        trace!(
            part = self.index,
            index_count = self.index_count,
            index_offset = self.index_offset,
            delta_time,
            "Part drawn"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ObjectKind, RenderError, ResourceError};
    use crate::gfx::device::GpuBuffer;
    use crate::gfx::recording::{Command, RecordingContext, RecordingDevice};
    use crate::renderer::fixture::MaterialFixture;
    use crate::renderer::input_layout::{signatures_from_slice, InputSemantic, InputSignature};
    use crate::renderer::material::SamplerInfo;
    use crate::renderer::texture::ImageFileLoader;
    use crate::renderer::view::{CAMERA_POSITION_REGION, VIEW_MATRIX_REGION};
    use crate::gfx::device::{AddressMode, ElementFormat};

    fn signatures() -> crate::renderer::input_layout::InputSignatures {
        signatures_from_slice(&[
            InputSignature::new(InputSemantic::Position, 0, ElementFormat::R32G32B32A32_FLOAT, 0),
            InputSignature::UNUSED,
            InputSignature::new(InputSemantic::Texcoord, 0, ElementFormat::R16G16_SNORM, 1),
            InputSignature::UNUSED,
            InputSignature::new(InputSemantic::Colour, 0, ElementFormat::R8G8B8A8_UNORM, 2),
        ])
    }

    fn initialized_part(device: &RecordingDevice, fixture: &MaterialFixture) -> Result<Part<RecordingDevice>> {
        let info = PartInfo::new(fixture.material_info(signatures()), 36, 12);
        let mut part = Part::new(0, PartOptions::default());
        part.initialize(device, &info, &ImageFileLoader::new())?;
        Ok(part)
    }

    #[test]
    fn test_initialize_creates_objects_in_order() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let part = initialized_part(&device, &fixture).unwrap();

        assert!(part.vertex_program().is_some());
        assert!(part.pixel_program().is_some());
        assert_eq!(part.input_layout().unwrap().element_count(), 3);
        assert_eq!(
            device.attempts(),
            vec![
                ObjectKind::VertexProgram,
                ObjectKind::PixelProgram,
                ObjectKind::InputLayout,
                ObjectKind::ConstantBuffer,
                ObjectKind::ConstantBuffer,
                ObjectKind::ViewSourceBuffer,
                ObjectKind::ConstantBuffer,
                ObjectKind::ConstantBuffer,
                ObjectKind::Sampler,
                ObjectKind::Sampler,
                ObjectKind::Sampler,
            ]
        );

        let vs_slots: Vec<u32> = part.vs_constant_buffers().iter().map(Resource::slot).collect();
        let ps_slots: Vec<u32> = part.ps_constant_buffers().iter().map(Resource::slot).collect();
        assert_eq!(vs_slots, vec![1, 12]);
        assert_eq!(ps_slots, vec![0, 12]);
        assert_eq!(
            part.view_buffer().unwrap().byte_width(),
            part.vs_constant_buffers()[1].get().byte_width()
        );
    }

    #[test]
    fn test_initialize_stops_at_first_failure() {
        let steps = [
            (ObjectKind::VertexProgram, 1),
            (ObjectKind::PixelProgram, 2),
            (ObjectKind::InputLayout, 3),
            (ObjectKind::ConstantBuffer, 4),
            (ObjectKind::ViewSourceBuffer, 6),
            (ObjectKind::Sampler, 9),
        ];
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());

        for (kind, attempts) in steps {
            let device = RecordingDevice::new();
            device.fail_kind(kind);
            let err = initialized_part(&device, &fixture).err().unwrap();
            match err {
                RenderError::Device(e) => assert_eq!(e.kind(), Some(kind)),
                other => panic!("unexpected error: {}", other),
            }
            assert_eq!(device.attempts().len(), attempts, "failing {:?}", kind);
            assert_eq!(device.live_objects(), 0);
        }
    }

    #[test]
    fn test_missing_texture_stops_before_samplers() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let textures = vec!["does/not/exist.png".to_string()];
        let info = PartInfo::new(fixture.material_info(signatures()).with_textures(&textures), 6, 0);

        let mut part = Part::new(0, PartOptions::default());
        let err = part.initialize(&device, &info, &ImageFileLoader::new()).unwrap_err();
        assert!(matches!(err, RenderError::Resource(ResourceError::NotFound(_))));
        assert!(device.attempts().contains(&ObjectKind::ConstantBuffer));
        assert!(!device.attempts().contains(&ObjectKind::Sampler));
        assert_eq!(device.live_objects(), 0);
        assert!(!part.is_initialized());
    }

    #[test]
    fn test_draw_range_is_taken_at_initialize() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let mut part = Part::new(0, PartOptions::default());
        assert_eq!((part.index_count(), part.index_offset()), (0, 0));

        device.fail_kind(ObjectKind::Sampler);
        let failed = PartInfo::new(fixture.material_info(signatures()), 9, 3);
        assert!(part.initialize(&device, &failed, &ImageFileLoader::new()).is_err());
        assert_eq!((part.index_count(), part.index_offset()), (0, 0));

        let device = RecordingDevice::new();
        let info = PartInfo::new(fixture.material_info(signatures()), 36, 12);
        part.initialize(&device, &info, &ImageFileLoader::new()).unwrap();
        assert_eq!((part.index_count(), part.index_offset()), (36, 12));

        let mut context = RecordingContext::new();
        part.render(&mut context, &Camera::main_camera(), 0.016).unwrap();
        assert_eq!(context.draw_calls(), vec![(36, 12, 0)]);
    }

    #[test]
    fn test_small_view_buffer_is_rejected() {
        let device = RecordingDevice::new();
        let mut fixture = MaterialFixture::placeholder(&Camera::main_camera());
        fixture.vs_view_constants.truncate(64);

        let err = initialized_part(&device, &fixture).err().unwrap();
        assert!(matches!(
            err,
            RenderError::Precondition(PreconditionError::ViewBufferTooSmall { size: 64, required: 128 })
        ));
        // 检查发生在创建常量缓冲区之前
        assert!(!device.attempts().contains(&ObjectKind::ConstantBuffer));
    }

    #[test]
    fn test_uninitialized_part_renders_nothing() {
        let part: Part<RecordingDevice> = Part::new(4, PartOptions::default());

        let mut context = RecordingContext::new();
        let err = part.render(&mut context, &Camera::main_camera(), 0.016).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Precondition(PreconditionError::MissingPipeline { part: 4 })
        ));
        assert!(context.commands().is_empty());
    }

    #[test]
    fn test_render_command_sequence() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let part = initialized_part(&device, &fixture).unwrap();

        let view = part.view_buffer().unwrap().id();
        let vs_cb1 = part.vs_constant_buffers()[0].get().id();
        let vs_cb12 = part.vs_constant_buffers()[1].get().id();
        let ps_cb0 = part.ps_constant_buffers()[0].get().id();
        let ps_cb12 = part.ps_constant_buffers()[1].get().id();

        let mut context = RecordingContext::new();
        part.render(&mut context, &Camera::main_camera(), 0.016).unwrap();

        let commands = context.take_commands();
        assert_eq!(
            commands,
            vec![
                Command::SetVertexProgram(part.vertex_program().unwrap().id()),
                Command::SetPixelProgram(part.pixel_program().unwrap().id()),
                Command::SetInputLayout(part.input_layout().unwrap().id()),
                Command::UpdateSubresource { buffer: view, region: Some(VIEW_MATRIX_REGION) },
                Command::UpdateSubresource { buffer: view, region: Some(CAMERA_POSITION_REGION) },
                Command::SetConstantBuffer { stage: ShaderStage::Vertex, slot: 1, buffer: vs_cb1 },
                Command::CopyResource { dst: vs_cb12, src: view },
                Command::SetConstantBuffer { stage: ShaderStage::Vertex, slot: 12, buffer: vs_cb12 },
                Command::SetConstantBuffer { stage: ShaderStage::Pixel, slot: 0, buffer: ps_cb0 },
                Command::SetConstantBuffer { stage: ShaderStage::Pixel, slot: 12, buffer: ps_cb12 },
                Command::SetSampler { stage: ShaderStage::Pixel, slot: 1, sampler: part.samplers()[0].get().id() },
                Command::SetSampler { stage: ShaderStage::Pixel, slot: 2, sampler: part.samplers()[1].get().id() },
                Command::SetSampler { stage: ShaderStage::Pixel, slot: 3, sampler: part.samplers()[2].get().id() },
                Command::DrawIndexed { index_count: 36, start_index: 12, base_vertex: 0 },
            ]
        );
    }

    #[test]
    fn test_render_copies_frame_view_into_slot_12() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let part = initialized_part(&device, &fixture).unwrap();

        let mut camera = Camera::main_camera();
        camera.set_position(crate::math::Vector3::new(3.0, 4.0, 5.0));
        let mut context = RecordingContext::new();
        part.render(&mut context, &camera, 0.0).unwrap();

        let block = FrameViewBlock::from_camera(&camera);
        let cb12 = part.vs_constant_buffers()[1].get().contents();
        assert_eq!(&cb12[..48], block.view_rows_bytes());
        assert_eq!(&cb12[112..128], block.camera_position_bytes());
        // 像素阶段的槽位 12 不参与复制
        let ps_cb12 = part.ps_constant_buffers()[1].get().contents();
        assert_eq!(ps_cb12, fixture.ps_view_constants);
    }

    #[test]
    fn test_sampler_configuration() {
        let device = RecordingDevice::new();
        let fixture = MaterialFixture::placeholder(&Camera::main_camera());
        let info = PartInfo::new(
            fixture
                .material_info(signatures())
                .with_samplers(vec![SamplerInfo::new(5, AddressMode::Clamp)]),
            3,
            0,
        );
        let options = PartOptions {
            max_anisotropy: 8,
            upload_viewport: false,
        };
        let mut part = Part::new(0, options);
        part.initialize(&device, &info, &ImageFileLoader::new()).unwrap();

        assert_eq!(part.samplers().len(), 1);
        assert_eq!(part.samplers()[0].slot(), 5);
        let desc = part.samplers()[0].get().desc();
        assert_eq!(desc.max_anisotropy, 8);
        assert_eq!(desc.address_u, AddressMode::Clamp);
    }
}
