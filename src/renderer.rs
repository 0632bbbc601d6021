// Renderer module for the hero viewport

use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::asset::LoadedModel;
use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::lights::Light;
use crate::scene::{Scene, SceneObject};
use crate::surface::LogicalSize;

pub const MAX_LIGHTS: usize = 8;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;

/// What the viewport session needs from a renderer.
pub trait SceneRenderer {
    /// Physical pixels per logical pixel for the output buffer.
    fn set_pixel_ratio(&mut self, ratio: f64);
    /// Resize the output buffer, in logical pixels.
    fn set_size(&mut self, size: LogicalSize);
    fn set_clear_color(&mut self, rgba: [f64; 4]);
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera);
    /// Release GPU resources. Later calls to `render` do nothing.
    fn dispose(&mut self);
}

// Define Vertex struct for vertex data
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub params: [f32; 4],
}

/// Per-frame uniforms shared by every draw.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub counts: [u32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl Globals {
    /// Pack the camera and every world-space light in `scene`. Ambient lights
    /// are summed; lights past [`MAX_LIGHTS`] are dropped.
    pub fn from_scene(scene: &Scene, camera: &PerspectiveCamera) -> Self {
        let mut globals: Globals = bytemuck::Zeroable::zeroed();
        globals.view_proj = camera.view_projection().to_cols_array_2d();
        globals.camera_pos = camera.position.extend(1.0).to_array();

        let mut ambient = Vec3::ZERO;
        let mut count = 0usize;
        for light in scene.world_lights() {
            let packed = match light {
                Light::Ambient { color, intensity } => {
                    ambient += color * intensity;
                    continue;
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => GpuLight {
                    position: position.normalize_or_zero().extend(0.0).to_array(),
                    color: color.extend(intensity).to_array(),
                    params: [0.0; 4],
                },
                Light::Point {
                    color,
                    intensity,
                    position,
                    range,
                } => GpuLight {
                    position: position.extend(1.0).to_array(),
                    color: color.extend(intensity).to_array(),
                    params: [range, 0.0, 0.0, 0.0],
                },
            };
            if count == MAX_LIGHTS {
                debug!("dropping light beyond the first {MAX_LIGHTS}");
                continue;
            }
            globals.lights[count] = packed;
            count += 1;
        }

        globals.ambient = ambient.extend(1.0).to_array();
        globals.counts = [count as u32, 0, 0, 0];
        globals
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl ModelUniform {
    fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Output buffer size in physical pixels.
pub fn physical_size(size: LogicalSize, pixel_ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * pixel_ratio).round() as u32).max(1);
    (scale(size.width), scale(size.height))
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuModel {
    source: Arc<LoadedModel>,
    meshes: Vec<GpuMesh>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    sample_count: u32,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    model: Option<GpuModel>,
}

/// wgpu renderer drawing into a winit window.
pub struct WgpuRenderer {
    gpu: Option<Gpu>,
    size: LogicalSize,
    pixel_ratio: f64,
    clear_color: wgpu::Color,
}

impl WgpuRenderer {
    /// Bind a renderer to `window` with a transparent, antialiased surface.
    pub async fn new(window: Arc<Window>, size: LogicalSize) -> Result<Self, RenderError> {
        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Hero Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| surface_caps.alpha_modes.contains(mode))
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

        let (width, height) = physical_size(size, 1.0);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Load shader
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Hero Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let vertex_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4],
        };

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[uniform_entry(wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[uniform_entry(wgpu::ShaderStages::VERTEX)],
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Hero Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Hero Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[vertex_buffer_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // models are not guaranteed to be closed
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[<Globals as bytemuck::Zeroable>::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let (depth_view, msaa_view) = create_targets(&device, &config, sample_count);

        info!(
            "renderer ready: {:?} {}x{}, {}x MSAA, {:?}",
            surface_format, width, height, sample_count, alpha_mode
        );

        Ok(Self {
            gpu: Some(Gpu {
                device,
                queue,
                surface,
                config,
                pipeline,
                globals_buffer,
                globals_bind_group,
                model_layout,
                sample_count,
                depth_view,
                msaa_view,
                model: None,
            }),
            size,
            pixel_ratio: 1.0,
            clear_color: wgpu::Color::TRANSPARENT,
        })
    }

    fn reconfigure(&mut self) {
        let (width, height) = physical_size(self.size, self.pixel_ratio);
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if gpu.config.width == width && gpu.config.height == height {
            return;
        }
        gpu.config.width = width;
        gpu.config.height = height;
        gpu.surface.configure(&gpu.device, &gpu.config);
        let (depth_view, msaa_view) = create_targets(&gpu.device, &gpu.config, gpu.sample_count);
        gpu.depth_view = depth_view;
        gpu.msaa_view = msaa_view;
        debug!("surface reconfigured to {width}x{height}");
    }
}

impl SceneRenderer for WgpuRenderer {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn set_size(&mut self, size: LogicalSize) {
        self.size = size;
        self.reconfigure();
    }

    fn set_clear_color(&mut self, rgba: [f64; 4]) {
        let [r, g, b, a] = rgba;
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return;
            }
        };

        let globals = Globals::from_scene(scene, camera);
        gpu.queue
            .write_buffer(&gpu.globals_buffer, 0, bytemuck::cast_slice(&[globals]));

        let model_object = scene.models().next();
        sync_model(gpu, model_object);

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (color_view, resolve_target) = match gpu.msaa_view.as_ref() {
            Some(msaa) => (msaa, Some(&view)),
            None => (&view, None),
        };

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Hero Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Hero Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(model) = gpu.model.as_ref() {
                render_pass.set_pipeline(&gpu.pipeline);
                render_pass.set_bind_group(0, &gpu.globals_bind_group, &[]);
                render_pass.set_bind_group(1, &model.bind_group, &[]);
                for mesh in &model.meshes {
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn dispose(&mut self) {
        if self.gpu.take().is_some() {
            info!("renderer disposed");
        }
    }
}

fn uniform_entry(visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_targets(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };
    let target = |label, format, sample_count| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };

    let depth = target("Depth Target", DEPTH_FORMAT, sample_count);
    let msaa = (sample_count > 1).then(|| target("MSAA Target", config.format, sample_count));
    (depth, msaa)
}

/// Upload the scene's model if it changed and refresh its transform.
fn sync_model(gpu: &mut Gpu, object: Option<&SceneObject>) {
    let Some((object, node)) = object.and_then(|o| o.as_model().map(|n| (o, n))) else {
        gpu.model = None;
        return;
    };

    let stale = gpu
        .model
        .as_ref()
        .map_or(true, |cached| !Arc::ptr_eq(&cached.source, &node.model));
    if stale {
        gpu.model = Some(upload_model(&gpu.device, &gpu.model_layout, &node.model));
    }

    if let Some(model) = gpu.model.as_ref() {
        let uniform = ModelUniform::new(object.transform.matrix());
        gpu.queue
            .write_buffer(&model.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

fn upload_model(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, source: &Arc<LoadedModel>) -> GpuModel {
    let meshes = source
        .meshes
        .iter()
        .map(|mesh| {
            let vertices: Vec<Vertex> = mesh
                .positions
                .iter()
                .enumerate()
                .map(|(i, &position)| Vertex {
                    position,
                    normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    color: mesh.colors.get(i).copied().unwrap_or([1.0; 4]),
                })
                .collect();

            GpuMesh {
                vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Model Vertex Buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Model Index Buffer"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
            }
        })
        .collect();

    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Model Uniform Buffer"),
        contents: bytemuck::cast_slice(&[ModelUniform::new(Mat4::IDENTITY)]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Model Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    debug!("uploaded {} meshes to the GPU", source.meshes.len());
    GpuModel {
        source: Arc::clone(source),
        meshes,
        uniform_buffer,
        bind_group,
    }
}
