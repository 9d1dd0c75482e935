//! Atlas Render - 无窗口运行器
//!
//! 构建一个静态网格并渲染若干帧，用于在没有窗口和交换链的环境下检查绑定流程。
//!
//! # 使用方法
//!
//! ```bash
//! # 记录后端 + 内置四边形
//! cargo run
//!
//! # 使用开发期数据目录
//! cargo run -- --fixture data/C325BB80 --frames 10
//!
//! # Direct3D 11（仅 Windows，需要编译好的着色器）
//! cargo run -- --d3d11 --fixture data/C325BB80
//! ```
//!
//! # 命令行参数
//!
//! - `--d3d11` / `--recording`: 选择图形后端
//! - `--frames <value>`: 渲染帧数
//! - `--fixture <dir>`: 开发期数据目录（材质字节码、常量、纹理、可选 part.toml）

use anyhow::{Context, Result};
use tracing::{debug, info};

use atlas_render::component::Camera;
use atlas_render::core::config::{Config, GraphicsBackend};
use atlas_render::core::log;
use atlas_render::gfx::device::{Device, DeviceContext, ElementFormat};
use atlas_render::gfx::{RecordingContext, RecordingDevice};
use atlas_render::math::Vector3;
use atlas_render::renderer::{
    signatures_from_slice, Blob, BufferGroup, InputSemantic, InputSignature, MaterialFixture,
    MeshHash, PartInfo, PartLayout, PartOptions, StaticMesh,
};
use atlas_render::{engine_error, engine_info};

/// 内置四边形：三个顶点流 + 16 位索引
struct QuadGeometry {
    positions: Vec<u8>,
    texcoords: Vec<u8>,
    colours: Vec<u8>,
    indices: Vec<u8>,
}

impl QuadGeometry {
    const INDEX_COUNT: u32 = 6;

    fn new() -> Self {
        let positions: [[f32; 4]; 4] = [
            [-1.0, -1.0, 0.0, 1.0],
            [1.0, -1.0, 0.0, 1.0],
            [-1.0, 1.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 1.0],
        ];
        let texcoords: [[i16; 2]; 4] = [[0, i16::MAX], [i16::MAX, i16::MAX], [0, 0], [i16::MAX, 0]];
        let colours: [[u8; 4]; 4] = [[255; 4]; 4];
        let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];

        Self {
            positions: bytemuck::cast_slice(&positions).to_vec(),
            texcoords: bytemuck::cast_slice(&texcoords).to_vec(),
            colours: bytemuck::cast_slice(&colours).to_vec(),
            indices: bytemuck::cast_slice(&indices).to_vec(),
        }
    }

    fn buffer_group(&self) -> BufferGroup<'_> {
        BufferGroup::new(
            [
                Blob::from(&self.positions),
                Blob::from(&self.texcoords),
                Blob::from(&self.colours),
            ],
            Blob::from(&self.indices),
        )
    }

    /// 只引用绘制时绑定的两个顶点流
    fn signatures() -> Vec<InputSignature> {
        vec![
            InputSignature::new(InputSemantic::Position, 0, ElementFormat::R32G32B32A32_FLOAT, 0),
            InputSignature::new(InputSemantic::Texcoord, 0, ElementFormat::R16G16_SNORM, 1),
        ]
    }
}

/// 创建网格并添加几何数据与 Part
///
/// 有 `part.toml` 时按其描述添加一个 Part，否则把四边形拆成两个三角形 Part。
fn build_mesh<D: Device>(
    device: D,
    config: &Config,
    geometry: &QuadGeometry,
    material: &MaterialFixture,
    layout: Option<&PartLayout>,
) -> Result<StaticMesh<D>> {
    let hash: MeshHash = config.model.hash.parse()?;
    let mut mesh = StaticMesh::new(hash).with_options(PartOptions::from(&config.graphics));
    mesh.initialize(device);
    mesh.add_buffer_group(&geometry.buffer_group())
        .context("Failed to create mesh geometry")?;

    match layout {
        Some(layout) => {
            let signatures = signatures_from_slice(&layout.signatures);
            let info = PartInfo::new(material.material_info(signatures), layout.index_count, layout.index_offset);
            mesh.add_part(&info).context("Failed to add part")?;
        }
        None => {
            let signatures = signatures_from_slice(&QuadGeometry::signatures());
            let half = QuadGeometry::INDEX_COUNT / 2;
            for offset in [0, half] {
                let info = PartInfo::new(material.material_info(signatures), half, offset);
                mesh.add_part(&info).context("Failed to add part")?;
            }
        }
    }

    engine_info!(hash = %mesh.hash(), parts = mesh.parts().len(), "Mesh ready");
    Ok(mesh)
}

/// 相机绕原点旋转，每帧渲染一次
fn render_frames<D, C>(mesh: &StaticMesh<D>, context: &mut C, camera: &mut Camera, frames: u32) -> Result<()>
where
    D: Device,
    C: DeviceContext<D>,
{
    const DELTA_TIME: f32 = 1.0 / 60.0;
    for frame in 0..frames {
        let angle = frame as f32 * 0.25;
        camera.look_at(
            Vector3::new(5.0 * angle.sin(), 2.0, -5.0 * angle.cos()),
            Vector3::zeros(),
            Vector3::new(0.0, 1.0, 0.0),
        );

        if let Err(e) = mesh.render(context, camera, DELTA_TIME) {
            engine_error!(frame, error = %e, "Frame failed");
            return Err(e).context(format!("Failed to render frame {}", frame));
        }
        debug!(frame, "Frame rendered");
    }
    Ok(())
}

fn run_recording(
    config: &Config,
    camera: &mut Camera,
    geometry: &QuadGeometry,
    material: &MaterialFixture,
    layout: Option<&PartLayout>,
) -> Result<()> {
    let device = RecordingDevice::new();
    let mut context = RecordingContext::new();

    let mesh = build_mesh(device.clone(), config, geometry, material, layout)?;
    render_frames(&mesh, &mut context, camera, config.model.frames)?;

    engine_info!(
        frames = config.model.frames,
        draw_calls = context.draw_calls().len(),
        commands = context.commands().len(),
        live_objects = device.live_objects(),
        "Recording finished"
    );
    Ok(())
}

#[cfg(target_os = "windows")]
fn run_d3d11(
    config: &Config,
    camera: &mut Camera,
    geometry: &QuadGeometry,
    material: &MaterialFixture,
    layout: Option<&PartLayout>,
) -> Result<()> {
    use atlas_render::gfx::D3D11Device;

    if config.model.fixture_dir.is_none() {
        anyhow::bail!("The Direct3D 11 backend needs compiled shaders, pass --fixture <dir>");
    }

    let (device, mut context) = D3D11Device::create_hardware(cfg!(debug_assertions))?;
    let mesh = build_mesh(device, config, geometry, material, layout)?;
    render_frames(&mesh, &mut context, camera, config.model.frames)?;

    engine_info!(frames = config.model.frames, "Direct3D 11 frames submitted");
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run_d3d11(
    _config: &Config,
    _camera: &mut Camera,
    _geometry: &QuadGeometry,
    _material: &MaterialFixture,
    _layout: Option<&PartLayout>,
) -> Result<()> {
    anyhow::bail!("The Direct3D 11 backend is only available on Windows")
}

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）并应用命令行参数
/// 2. 初始化日志系统
/// 3. 读取材质数据（开发期目录或占位材质）
/// 4. 创建设备和网格，渲染指定帧数
fn main() -> Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args());
    config.validate().context("Invalid configuration")?;

    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "Atlas Render starting...");
    info!(
        backend = config.graphics.backend.name(),
        max_anisotropy = config.graphics.max_anisotropy,
        upload_viewport = config.graphics.upload_viewport,
        model = %config.model.hash,
        frames = config.model.frames,
        "Configuration"
    );

    let mut camera = Camera::main_camera();
    camera.look_at(Vector3::new(0.0, 2.0, -5.0), Vector3::zeros(), Vector3::new(0.0, 1.0, 0.0));

    let (material, layout) = match &config.model.fixture_dir {
        Some(dir) => (
            MaterialFixture::load(dir).with_context(|| format!("Failed to load fixture {}", dir))?,
            MaterialFixture::load_layout(dir)?,
        ),
        None => (MaterialFixture::placeholder(&camera), None),
    };
    let geometry = QuadGeometry::new();

    match config.graphics.backend {
        GraphicsBackend::Recording => {
            run_recording(&config, &mut camera, &geometry, &material, layout.as_ref())
        }
        GraphicsBackend::D3d11 => run_d3d11(&config, &mut camera, &geometry, &material, layout.as_ref()),
    }
}
