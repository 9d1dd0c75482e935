//! 记录后端
//!
//! 不依赖任何图形 API 的后端：设备为每个对象分配编号，并在 CPU 侧保存缓冲区内容；
//! 上下文按顺序记录每一条命令，同时把写入和复制真正作用到缓冲区内容上。
//!
//! 用途：
//! - 无窗口环境下运行整个绑定流程（可执行程序的默认后端）
//! - 测试中检查命令顺序、绘制调用和缓冲区字节
//!
//! 设备还支持故障注入，用于验证创建流程遇到第一个错误即停止。

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::warn;

use super::device::{
    BindFlags, BufferDesc, BufferRegion, Device, DeviceContext, ElementFormat,
    GpuBuffer, IndexFormat, InputElementDesc, PrimitiveTopology, SamplerDesc, ShaderStage,
    TextureDesc,
};
use crate::core::error::{DeviceError, ObjectKind, Result};

/// 存活对象计数，句柄 drop 时减一
#[derive(Debug)]
struct LiveToken(Rc<Cell<usize>>);

impl LiveToken {
    fn new(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self(Rc::clone(counter))
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    next_id: u32,
    /// 所有创建尝试（包括失败的）
    attempts: Vec<ObjectKind>,
    /// 总是失败的对象种类
    failing_kinds: HashSet<ObjectKind>,
    /// 成功创建这么多对象之后，后续创建全部失败
    fail_after: Option<usize>,
    succeeded: usize,
}

/// 记录设备
///
/// 克隆出的设备共享同一份状态，便于测试在设备被网格持有后继续检查它。
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    state: Rc<RefCell<DeviceState>>,
    live: Rc<Cell<usize>>,
}

/// 记录设备创建的缓冲区
#[derive(Debug)]
pub struct RecordedBuffer {
    id: u32,
    desc: BufferDesc,
    contents: RefCell<Vec<u8>>,
    _live: LiveToken,
}

impl RecordedBuffer {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn bind(&self) -> BindFlags {
        self.desc.bind
    }

    /// 当前内容的拷贝
    pub fn contents(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }
}

impl GpuBuffer for RecordedBuffer {
    fn byte_width(&self) -> u32 {
        self.desc.byte_width
    }
}

/// 记录设备创建的着色器程序
#[derive(Debug)]
pub struct RecordedProgram {
    id: u32,
    stage: ShaderStage,
    bytecode_len: usize,
    _live: LiveToken,
}

impl RecordedProgram {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn bytecode_len(&self) -> usize {
        self.bytecode_len
    }
}

/// 偏移量已解析的输入元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub semantic_name: &'static str,
    pub semantic_index: u32,
    pub format: ElementFormat,
    pub input_slot: u32,
    pub byte_offset: u32,
}

/// 记录设备创建的输入布局
#[derive(Debug)]
pub struct RecordedInputLayout {
    id: u32,
    elements: Vec<ResolvedElement>,
    _live: LiveToken,
}

impl RecordedInputLayout {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn elements(&self) -> &[ResolvedElement] {
        &self.elements
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

/// 记录设备创建的纹理视图
#[derive(Debug)]
pub struct RecordedTextureView {
    id: u32,
    desc: TextureDesc,
    _live: LiveToken,
}

impl RecordedTextureView {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

/// 记录设备创建的采样器
#[derive(Debug)]
pub struct RecordedSampler {
    id: u32,
    desc: SamplerDesc,
    _live: LiveToken,
}

impl RecordedSampler {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让某一类对象的创建总是失败
    pub fn fail_kind(&self, kind: ObjectKind) {
        self.state.borrow_mut().failing_kinds.insert(kind);
    }

    /// 成功创建 `count` 个对象后，后续创建全部失败
    pub fn fail_after(&self, count: usize) {
        self.state.borrow_mut().fail_after = Some(count);
    }

    /// 清除所有故障注入
    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failing_kinds.clear();
        state.fail_after = None;
    }

    /// 所有创建尝试，按发生顺序
    pub fn attempts(&self) -> Vec<ObjectKind> {
        self.state.borrow().attempts.clone()
    }

    /// 当前仍存活（未被 drop）的对象数量
    pub fn live_objects(&self) -> usize {
        self.live.get()
    }

    /// 记录一次创建尝试，返回新对象编号
    fn allocate(&self, kind: ObjectKind) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        state.attempts.push(kind);

        let exhausted = state.fail_after.is_some_and(|limit| state.succeeded >= limit);
        if exhausted || state.failing_kinds.contains(&kind) {
            return Err(DeviceError::Creation {
                kind,
                code: Some(E_OUTOFMEMORY),
                reason: "injected failure".to_string(),
            }
            .into());
        }

        state.succeeded += 1;
        state.next_id += 1;
        Ok(state.next_id)
    }
}

/// 与原生 API 相同的状态码，便于日志比对
const E_OUTOFMEMORY: i32 = 0x8007000Eu32 as i32;
const E_INVALIDARG: i32 = 0x80070057u32 as i32;

fn invalid(kind: ObjectKind, reason: impl Into<String>) -> crate::core::error::RenderError {
    DeviceError::Creation {
        kind,
        code: Some(E_INVALIDARG),
        reason: reason.into(),
    }
    .into()
}

fn buffer_kind(bind: BindFlags) -> ObjectKind {
    match bind {
        BindFlags::Vertex => ObjectKind::VertexBuffer,
        BindFlags::Index => ObjectKind::IndexBuffer,
        BindFlags::Constant => ObjectKind::ConstantBuffer,
        BindFlags::None => ObjectKind::ViewSourceBuffer,
    }
}

impl Device for RecordingDevice {
    type Buffer = RecordedBuffer;
    type VertexProgram = RecordedProgram;
    type PixelProgram = RecordedProgram;
    type InputLayout = RecordedInputLayout;
    type TextureView = RecordedTextureView;
    type Sampler = RecordedSampler;

    fn create_buffer(&self, desc: &BufferDesc, initial_data: &[u8]) -> Result<RecordedBuffer> {
        let kind = buffer_kind(desc.bind);
        desc.check_initial_data(initial_data)
            .map_err(|reason| invalid(kind, reason))?;

        let id = self.allocate(kind)?;
        Ok(RecordedBuffer {
            id,
            desc: *desc,
            contents: RefCell::new(initial_data.to_vec()),
            _live: LiveToken::new(&self.live),
        })
    }

    fn create_vertex_program(&self, bytecode: &[u8]) -> Result<RecordedProgram> {
        if bytecode.is_empty() {
            return Err(invalid(ObjectKind::VertexProgram, "empty bytecode"));
        }
        let id = self.allocate(ObjectKind::VertexProgram)?;
        Ok(RecordedProgram {
            id,
            stage: ShaderStage::Vertex,
            bytecode_len: bytecode.len(),
            _live: LiveToken::new(&self.live),
        })
    }

    fn create_pixel_program(&self, bytecode: &[u8]) -> Result<RecordedProgram> {
        if bytecode.is_empty() {
            return Err(invalid(ObjectKind::PixelProgram, "empty bytecode"));
        }
        let id = self.allocate(ObjectKind::PixelProgram)?;
        Ok(RecordedProgram {
            id,
            stage: ShaderStage::Pixel,
            bytecode_len: bytecode.len(),
            _live: LiveToken::new(&self.live),
        })
    }

    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        vs_bytecode: &[u8],
    ) -> Result<RecordedInputLayout> {
        if vs_bytecode.is_empty() {
            return Err(invalid(ObjectKind::InputLayout, "empty vertex program bytecode"));
        }

        // 每个输入槽独立累计偏移
        let mut slot_offsets: Vec<(u32, u32)> = Vec::new();
        let mut resolved = Vec::with_capacity(elements.len());
        for element in elements {
            let size = element.format.byte_size().ok_or_else(|| {
                invalid(
                    ObjectKind::InputLayout,
                    format!("unsupported format {} for {}", element.format.0, element.semantic_name),
                )
            })?;

            let index = match slot_offsets.iter().position(|(slot, _)| *slot == element.input_slot) {
                Some(index) => index,
                None => {
                    slot_offsets.push((element.input_slot, 0));
                    slot_offsets.len() - 1
                }
            };
            let cursor = &mut slot_offsets[index].1;

            let byte_offset = *cursor;
            *cursor = byte_offset + size;

            resolved.push(ResolvedElement {
                semantic_name: element.semantic_name,
                semantic_index: element.semantic_index,
                format: element.format,
                input_slot: element.input_slot,
                byte_offset,
            });
        }

        let id = self.allocate(ObjectKind::InputLayout)?;
        Ok(RecordedInputLayout {
            id,
            elements: resolved,
            _live: LiveToken::new(&self.live),
        })
    }

    fn create_texture_view(&self, desc: &TextureDesc, pixels: &[u8]) -> Result<RecordedTextureView> {
        desc.check_pixels(pixels)
            .map_err(|reason| invalid(ObjectKind::TextureView, reason))?;

        let id = self.allocate(ObjectKind::TextureView)?;
        Ok(RecordedTextureView {
            id,
            desc: *desc,
            _live: LiveToken::new(&self.live),
        })
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<RecordedSampler> {
        if !(1..=16).contains(&desc.max_anisotropy) {
            return Err(invalid(
                ObjectKind::Sampler,
                format!("max anisotropy {} out of range", desc.max_anisotropy),
            ));
        }
        let id = self.allocate(ObjectKind::Sampler)?;
        Ok(RecordedSampler {
            id,
            desc: *desc,
            _live: LiveToken::new(&self.live),
        })
    }
}

/// 上下文记录的命令，引用对象时使用对象编号
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetVertexBuffers {
        start_slot: u32,
        buffers: Vec<u32>,
        strides: Vec<u32>,
        offsets: Vec<u32>,
    },
    SetIndexBuffer {
        buffer: u32,
        format: IndexFormat,
        offset: u32,
    },
    SetPrimitiveTopology(PrimitiveTopology),
    SetInputLayout(u32),
    SetVertexProgram(u32),
    SetPixelProgram(u32),
    SetConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: u32,
    },
    SetShaderResource {
        stage: ShaderStage,
        slot: u32,
        view: u32,
    },
    SetSampler {
        stage: ShaderStage,
        slot: u32,
        sampler: u32,
    },
    UpdateSubresource {
        buffer: u32,
        region: Option<BufferRegion>,
    },
    CopyResource {
        dst: u32,
        src: u32,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
}

/// 记录上下文
#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: Vec<Command>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的命令
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// 取出并清空已记录的命令
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// 所有绘制调用 (index_count, start_index, base_vertex)
    pub fn draw_calls(&self) -> Vec<(u32, u32, i32)> {
        self.commands
            .iter()
            .filter_map(|command| match *command {
                Command::DrawIndexed {
                    index_count,
                    start_index,
                    base_vertex,
                } => Some((index_count, start_index, base_vertex)),
                _ => None,
            })
            .collect()
    }
}

impl DeviceContext<RecordingDevice> for RecordingContext {
    fn set_vertex_buffers(
        &mut self,
        start_slot: u32,
        buffers: &[&RecordedBuffer],
        strides: &[u32],
        offsets: &[u32],
    ) {
        self.commands.push(Command::SetVertexBuffers {
            start_slot,
            buffers: buffers.iter().map(|b| b.id).collect(),
            strides: strides.to_vec(),
            offsets: offsets.to_vec(),
        });
    }

    fn set_index_buffer(&mut self, buffer: &RecordedBuffer, format: IndexFormat, offset: u32) {
        self.commands.push(Command::SetIndexBuffer {
            buffer: buffer.id,
            format,
            offset,
        });
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.commands.push(Command::SetPrimitiveTopology(topology));
    }

    fn set_input_layout(&mut self, layout: &RecordedInputLayout) {
        self.commands.push(Command::SetInputLayout(layout.id));
    }

    fn set_vertex_program(&mut self, program: &RecordedProgram) {
        self.commands.push(Command::SetVertexProgram(program.id));
    }

    fn set_pixel_program(&mut self, program: &RecordedProgram) {
        self.commands.push(Command::SetPixelProgram(program.id));
    }

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: &RecordedBuffer) {
        self.commands.push(Command::SetConstantBuffer {
            stage,
            slot,
            buffer: buffer.id,
        });
    }

    fn set_shader_resource(&mut self, stage: ShaderStage, slot: u32, view: &RecordedTextureView) {
        self.commands.push(Command::SetShaderResource {
            stage,
            slot,
            view: view.id,
        });
    }

    fn set_sampler(&mut self, stage: ShaderStage, slot: u32, sampler: &RecordedSampler) {
        self.commands.push(Command::SetSampler {
            stage,
            slot,
            sampler: sampler.id,
        });
    }

    fn update_subresource(
        &mut self,
        buffer: &RecordedBuffer,
        region: Option<BufferRegion>,
        data: &[u8],
    ) {
        self.commands.push(Command::UpdateSubresource {
            buffer: buffer.id,
            region,
        });

        // 原生 API 对越界写入不做任何事
        let Some((left, right)) = BufferRegion::resolve(region, buffer.desc.byte_width, data.len()) else {
            warn!(buffer = buffer.id, ?region, len = data.len(), "Ignoring out-of-range update");
            return;
        };
        buffer.contents.borrow_mut()[left..right].copy_from_slice(data);
    }

    fn copy_resource(&mut self, dst: &RecordedBuffer, src: &RecordedBuffer) {
        self.commands.push(Command::CopyResource {
            dst: dst.id,
            src: src.id,
        });

        if dst.id == src.id || dst.desc.byte_width != src.desc.byte_width {
            warn!(dst = dst.id, src = src.id, "Ignoring copy between mismatched buffers");
            return;
        }
        let source = src.contents.borrow();
        dst.contents.borrow_mut().copy_from_slice(&source);
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.commands.push(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
    }
}
