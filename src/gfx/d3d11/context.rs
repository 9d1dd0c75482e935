//! Direct3D 11 立即上下文
//!
//! 直接转发到 `ID3D11DeviceContext`，不缓存任何绑定状态。

use std::ffi::c_void;

use tracing::warn;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::device::{D3D11Buffer, D3D11Device};
use crate::gfx::device::{BufferRegion, DeviceContext, GpuBuffer, IndexFormat, PrimitiveTopology, ShaderStage};

/// Direct3D 11 立即上下文
#[derive(Debug, Clone)]
pub struct D3D11Context {
    context: ID3D11DeviceContext,
}

impl D3D11Context {
    pub fn from_raw(context: ID3D11DeviceContext) -> Self {
        Self { context }
    }

    pub fn raw(&self) -> &ID3D11DeviceContext {
        &self.context
    }
}

impl DeviceContext<D3D11Device> for D3D11Context {
    fn set_vertex_buffers(
        &mut self,
        start_slot: u32,
        buffers: &[&D3D11Buffer],
        strides: &[u32],
        offsets: &[u32],
    ) {
        let raw: Vec<Option<ID3D11Buffer>> =
            buffers.iter().map(|b| Some(b.buffer.clone())).collect();
        unsafe {
            self.context.IASetVertexBuffers(
                start_slot,
                raw.len() as u32,
                Some(raw.as_ptr()),
                Some(strides.as_ptr()),
                Some(offsets.as_ptr()),
            );
        }
    }

    fn set_index_buffer(&mut self, buffer: &D3D11Buffer, format: IndexFormat, offset: u32) {
        let format = match format {
            IndexFormat::Uint16 => DXGI_FORMAT_R16_UINT,
        };
        unsafe { self.context.IASetIndexBuffer(&buffer.buffer, format, offset) };
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        let topology = match topology {
            PrimitiveTopology::TriangleList => D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        };
        unsafe { self.context.IASetPrimitiveTopology(topology) };
    }

    fn set_input_layout(&mut self, layout: &ID3D11InputLayout) {
        unsafe { self.context.IASetInputLayout(layout) };
    }

    fn set_vertex_program(&mut self, program: &ID3D11VertexShader) {
        unsafe { self.context.VSSetShader(program, None) };
    }

    fn set_pixel_program(&mut self, program: &ID3D11PixelShader) {
        unsafe { self.context.PSSetShader(program, None) };
    }

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: &D3D11Buffer) {
        let buffers = [Some(buffer.buffer.clone())];
        unsafe {
            match stage {
                ShaderStage::Vertex => self.context.VSSetConstantBuffers(slot, Some(&buffers)),
                ShaderStage::Pixel => self.context.PSSetConstantBuffers(slot, Some(&buffers)),
            }
        }
    }

    fn set_shader_resource(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        view: &ID3D11ShaderResourceView,
    ) {
        let views = [Some(view.clone())];
        unsafe {
            match stage {
                ShaderStage::Vertex => self.context.VSSetShaderResources(slot, Some(&views)),
                ShaderStage::Pixel => self.context.PSSetShaderResources(slot, Some(&views)),
            }
        }
    }

    fn set_sampler(&mut self, stage: ShaderStage, slot: u32, sampler: &ID3D11SamplerState) {
        let samplers = [Some(sampler.clone())];
        unsafe {
            match stage {
                ShaderStage::Vertex => self.context.VSSetSamplers(slot, Some(&samplers)),
                ShaderStage::Pixel => self.context.PSSetSamplers(slot, Some(&samplers)),
            }
        }
    }

    fn update_subresource(
        &mut self,
        buffer: &D3D11Buffer,
        region: Option<BufferRegion>,
        data: &[u8],
    ) {
        // 驱动按目标区域大小读取源数据
        if BufferRegion::resolve(region, buffer.byte_width(), data.len()).is_none() {
            warn!(?region, len = data.len(), "Ignoring out-of-range update");
            return;
        }
        let dst_box = region.map(|region| D3D11_BOX {
            left: region.left,
            top: 0,
            front: 0,
            right: region.right,
            bottom: 1,
            back: 1,
        });
        unsafe {
            self.context.UpdateSubresource(
                &buffer.buffer,
                0,
                dst_box.as_ref().map(|b| b as *const D3D11_BOX),
                data.as_ptr() as *const c_void,
                0,
                0,
            );
        }
    }

    fn copy_resource(&mut self, dst: &D3D11Buffer, src: &D3D11Buffer) {
        unsafe { self.context.CopyResource(&dst.buffer, &src.buffer) };
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        unsafe { self.context.DrawIndexed(index_count, start_index, base_vertex) };
    }
}
