//! Direct3D 11 设备
//!
//! 实现 [`Device`] trait。所有缓冲区使用 `D3D11_USAGE_DEFAULT`，不开放 CPU 访问，
//! 这样逐帧的 `UpdateSubresource` 和 `CopyResource` 都可以作用在它们上面。

use std::ffi::{c_void, CString};

use tracing::{debug, info};
use windows::core::PCSTR;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::IDXGIAdapter;

use super::context::D3D11Context;
use crate::core::error::{DeviceError, ObjectKind, RenderError, Result};
use crate::gfx::device::{
    AddressMode, BindFlags, BufferDesc, Device, GpuBuffer, InputElementDesc,
    SamplerDesc, TextureDesc, TextureFormat,
};

/// 将 `windows` 错误转换为指明对象种类的创建错误
pub(crate) fn creation_error(kind: ObjectKind, err: windows::core::Error) -> RenderError {
    DeviceError::Creation {
        kind,
        code: Some(err.code().0),
        reason: err.message().to_string(),
    }
    .into()
}

/// 创建调用返回成功但没有写出对象
fn missing_output(kind: ObjectKind) -> RenderError {
    DeviceError::creation(kind, "device returned no object").into()
}

/// Direct3D 11 缓冲区句柄
#[derive(Debug, Clone)]
pub struct D3D11Buffer {
    pub(crate) buffer: ID3D11Buffer,
    byte_width: u32,
}

impl D3D11Buffer {
    pub fn raw(&self) -> &ID3D11Buffer {
        &self.buffer
    }
}

impl GpuBuffer for D3D11Buffer {
    fn byte_width(&self) -> u32 {
        self.byte_width
    }
}

/// Direct3D 11 设备
#[derive(Debug, Clone)]
pub struct D3D11Device {
    device: ID3D11Device,
}

impl D3D11Device {
    /// 包装一个已有的设备（例如由交换链初始化代码创建）
    pub fn from_raw(device: ID3D11Device) -> Self {
        Self { device }
    }

    pub fn raw(&self) -> &ID3D11Device {
        &self.device
    }

    /// 在默认硬件适配器上创建设备和立即上下文
    ///
    /// # 参数
    ///
    /// * `debug` - 是否启用调试层
    pub fn create_hardware(debug: bool) -> Result<(Self, D3D11Context)> {
        let flags = if debug {
            D3D11_CREATE_DEVICE_DEBUG
        } else {
            D3D11_CREATE_DEVICE_FLAG(0)
        };
        let feature_levels = [D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_11_0];

        let mut device = None;
        let mut context = None;
        let mut feature_level = D3D_FEATURE_LEVEL_11_0;
        unsafe {
            D3D11CreateDevice(
                None::<&IDXGIAdapter>,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                flags,
                Some(&feature_levels),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut feature_level),
                Some(&mut context),
            )
        }
        .map_err(|e| DeviceError::DeviceCreation(e.message().to_string()))?;

        let device = device
            .ok_or_else(|| DeviceError::DeviceCreation("no device returned".to_string()))?;
        let context = context
            .ok_or_else(|| DeviceError::DeviceCreation("no context returned".to_string()))?;

        info!(feature_level = feature_level.0, debug, "Direct3D 11 device created");
        Ok((Self { device }, D3D11Context::from_raw(context)))
    }
}

fn bind_flags(bind: BindFlags) -> (u32, ObjectKind) {
    match bind {
        BindFlags::Vertex => (D3D11_BIND_VERTEX_BUFFER.0 as u32, ObjectKind::VertexBuffer),
        BindFlags::Index => (D3D11_BIND_INDEX_BUFFER.0 as u32, ObjectKind::IndexBuffer),
        BindFlags::Constant => (D3D11_BIND_CONSTANT_BUFFER.0 as u32, ObjectKind::ConstantBuffer),
        BindFlags::None => (0, ObjectKind::ViewSourceBuffer),
    }
}

fn address_mode(mode: AddressMode) -> D3D11_TEXTURE_ADDRESS_MODE {
    match mode {
        AddressMode::Wrap => D3D11_TEXTURE_ADDRESS_WRAP,
        AddressMode::Clamp => D3D11_TEXTURE_ADDRESS_CLAMP,
    }
}

fn texture_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
    }
}

impl Device for D3D11Device {
    type Buffer = D3D11Buffer;
    type VertexProgram = ID3D11VertexShader;
    type PixelProgram = ID3D11PixelShader;
    type InputLayout = ID3D11InputLayout;
    type TextureView = ID3D11ShaderResourceView;
    type Sampler = ID3D11SamplerState;

    fn create_buffer(&self, desc: &BufferDesc, initial_data: &[u8]) -> Result<D3D11Buffer> {
        let (bind, kind) = bind_flags(desc.bind);
        desc.check_initial_data(initial_data)
            .map_err(|reason| DeviceError::creation(kind, reason))?;
        let buffer_desc = D3D11_BUFFER_DESC {
            ByteWidth: desc.byte_width,
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind,
            CPUAccessFlags: 0,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let init = D3D11_SUBRESOURCE_DATA {
            pSysMem: initial_data.as_ptr() as *const c_void,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        };

        let mut buffer = None;
        unsafe { self.device.CreateBuffer(&buffer_desc, Some(&init), Some(&mut buffer)) }
            .map_err(|e| creation_error(kind, e))?;
        let buffer = buffer.ok_or_else(|| missing_output(kind))?;

        debug!(kind = kind.name(), bytes = desc.byte_width, "Buffer created");
        Ok(D3D11Buffer {
            buffer,
            byte_width: desc.byte_width,
        })
    }

    fn create_vertex_program(&self, bytecode: &[u8]) -> Result<ID3D11VertexShader> {
        let mut shader = None;
        unsafe {
            self.device
                .CreateVertexShader(bytecode, None::<&ID3D11ClassLinkage>, Some(&mut shader))
        }
        .map_err(|e| creation_error(ObjectKind::VertexProgram, e))?;
        shader.ok_or_else(|| missing_output(ObjectKind::VertexProgram))
    }

    fn create_pixel_program(&self, bytecode: &[u8]) -> Result<ID3D11PixelShader> {
        let mut shader = None;
        unsafe {
            self.device
                .CreatePixelShader(bytecode, None::<&ID3D11ClassLinkage>, Some(&mut shader))
        }
        .map_err(|e| creation_error(ObjectKind::PixelProgram, e))?;
        shader.ok_or_else(|| missing_output(ObjectKind::PixelProgram))
    }

    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        vs_bytecode: &[u8],
    ) -> Result<ID3D11InputLayout> {
        // 语义名称需要以 NUL 结尾，且在调用期间保持有效
        let names = elements
            .iter()
            .map(|e| CString::new(e.semantic_name))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DeviceError::creation(ObjectKind::InputLayout, e.to_string()))?;

        let descs: Vec<D3D11_INPUT_ELEMENT_DESC> = elements
            .iter()
            .zip(&names)
            .map(|(element, name)| D3D11_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(name.as_ptr() as *const u8),
                SemanticIndex: element.semantic_index,
                Format: DXGI_FORMAT(element.format.0 as i32),
                InputSlot: element.input_slot,
                AlignedByteOffset: D3D11_APPEND_ALIGNED_ELEMENT,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut layout = None;
        unsafe {
            self.device
                .CreateInputLayout(&descs, vs_bytecode, Some(&mut layout))
        }
        .map_err(|e| creation_error(ObjectKind::InputLayout, e))?;
        layout.ok_or_else(|| missing_output(ObjectKind::InputLayout))
    }

    fn create_texture_view(
        &self,
        desc: &TextureDesc,
        pixels: &[u8],
    ) -> Result<ID3D11ShaderResourceView> {
        desc.check_pixels(pixels)
            .map_err(|reason| DeviceError::creation(ObjectKind::TextureView, reason))?;
        let texture_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: texture_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_IMMUTABLE,
            BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let init = D3D11_SUBRESOURCE_DATA {
            pSysMem: pixels.as_ptr() as *const c_void,
            SysMemPitch: desc.row_pitch(),
            SysMemSlicePitch: 0,
        };

        let mut texture = None;
        unsafe {
            self.device
                .CreateTexture2D(&texture_desc, Some(&init), Some(&mut texture))
        }
        .map_err(|e| creation_error(ObjectKind::TextureView, e))?;
        let texture: ID3D11Texture2D =
            texture.ok_or_else(|| missing_output(ObjectKind::TextureView))?;

        let mut view = None;
        unsafe {
            self.device
                .CreateShaderResourceView(&texture, None, Some(&mut view))
        }
        .map_err(|e| creation_error(ObjectKind::TextureView, e))?;
        view.ok_or_else(|| missing_output(ObjectKind::TextureView))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<ID3D11SamplerState> {
        let sampler_desc = D3D11_SAMPLER_DESC {
            Filter: D3D11_FILTER_ANISOTROPIC,
            AddressU: address_mode(desc.address_u),
            AddressV: address_mode(desc.address_v),
            AddressW: address_mode(desc.address_w),
            MipLODBias: desc.mip_lod_bias,
            MaxAnisotropy: desc.max_anisotropy,
            ComparisonFunc: D3D11_COMPARISON_NEVER,
            BorderColor: [0.0; 4],
            MinLOD: desc.min_lod,
            MaxLOD: desc.max_lod,
        };

        let mut sampler = None;
        unsafe { self.device.CreateSamplerState(&sampler_desc, Some(&mut sampler)) }
            .map_err(|e| creation_error(ObjectKind::Sampler, e))?;
        sampler.ok_or_else(|| missing_output(ObjectKind::Sampler))
    }
}
