mod camera;
mod capture;
pub mod mesh;
mod shaders;
mod surface;

pub use camera::{OrbitController, OrbitOptions};
pub use surface::PixelRatio;

use crate::scene::color::{linear_from_hex, Rgb};
use crate::scene::{Material, SpotLight, VaultScene};
use glam::{Mat4, Vec3};
use mesh::{tessellate, MeshResource, MeshVertex};
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;
use surface::{SceneTargets, DEPTH_FORMAT, SCENE_FORMAT};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create render surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to open graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface is not supported by the adapter")]
    UnsupportedSurface,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("capture readback failed: {0}")]
    CaptureMap(wgpu::BufferAsyncError),
    #[error("capture readback was abandoned by the device")]
    CaptureAborted,
    #[error("failed to encode screenshot: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write screenshot: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Errors after which the context cannot keep drawing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Surface(wgpu::SurfaceError::OutOfMemory))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub pixel_ratio: PixelRatio,
    pub msaa_samples: u32,
    /// Linear clear color.
    pub background: Rgb,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            pixel_ratio: PixelRatio::default(),
            msaa_samples: 4,
            background: linear_from_hex("#050716"),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SpotUniform {
    position: [f32; 4],
    direction: [f32; 4],
    color: [f32; 4],
    params: [f32; 4],
}

impl SpotUniform {
    fn from_light(light: &SpotLight) -> Self {
        let position = Vec3::from(light.position);
        let direction = (Vec3::from(light.target) - position).normalize_or_zero();
        let penumbra = light.penumbra.clamp(0.0, 1.0);
        Self {
            position: position.extend(light.intensity).to_array(),
            direction: direction.extend(light.angle.cos()).to_array(),
            color: [light.color[0], light.color[1], light.color[2], light.decay],
            params: [(light.angle * (1.0 - penumbra)).cos(), 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    sky: [f32; 4],
    ground: [f32; 4],
    viewport: [f32; 4],
    spots: [SpotUniform; 2],
}

impl FrameUniform {
    fn from_scene(scene: &VaultScene, target_size: [u32; 2]) -> Self {
        let aspect = target_size[0] as f32 / target_size[1].max(1) as f32;
        let ambient = scaled(scene.ambient.color, scene.ambient.intensity);
        let env = scene.environment;
        Self {
            view_proj: scene.camera.view_projection(aspect).to_cols_array_2d(),
            camera_pos: scene.camera.eye().extend(1.0).to_array(),
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
            sky: rgba(scaled(env.sky, env.intensity), 1.0),
            ground: rgba(scaled(env.ground, env.intensity), 1.0),
            viewport: [target_size[0] as f32, target_size[1] as f32, 0.0, 0.0],
            spots: [
                SpotUniform::from_light(&scene.spots[0]),
                SpotUniform::from_light(&scene.spots[1]),
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
    surface: [f32; 4],
}

impl ObjectUniform {
    fn for_material(model: Mat4, material: &Material) -> Self {
        let normal_matrix = model.inverse().transpose();
        let (base_color, emissive, surface) = match *material {
            Material::Standard {
                color,
                metalness,
                roughness,
                emissive,
                emissive_intensity,
                ..
            } => (
                rgba(color, 1.0),
                rgba(scaled(emissive, emissive_intensity), 0.0),
                [metalness, roughness, 0.0, 0.0],
            ),
            Material::Basic { color, opacity, .. } => {
                (rgba(color, opacity), [0.0; 4], [0.0, 1.0, 1.0, 0.0])
            }
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            base_color,
            emissive,
            surface,
        }
    }

    fn for_points(model: Mat4, size: f32, opacity: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            base_color: [1.0, 1.0, 1.0, opacity],
            emissive: [0.0; 4],
            surface: [0.0, 0.0, 1.0, size],
        }
    }
}

fn scaled(color: Rgb, factor: f32) -> Rgb {
    [color[0] * factor, color[1] * factor, color[2] * factor]
}

fn rgba(color: Rgb, alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], alpha]
}

fn align_to(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

/// Largest supported sample count not above `requested`, falling back to 1.
fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    [16, 8, 4, 2]
        .into_iter()
        .find(|count| *count <= requested && supported(*count))
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshPass {
    Opaque,
    OpaqueDoubleSided,
    Translucent,
}

impl MeshPass {
    fn for_material(material: &Material) -> Self {
        if material.is_transparent() {
            MeshPass::Translucent
        } else if material.is_double_sided() {
            MeshPass::OpaqueDoubleSided
        } else {
            MeshPass::Opaque
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawStep {
    Mesh(usize),
    Points,
}

/// Opaque meshes first, then the additive points, then translucent meshes,
/// so the points stay visible through the halo.
fn draw_order(passes: &[MeshPass], has_points: bool) -> Vec<DrawStep> {
    let mut order: Vec<DrawStep> = passes
        .iter()
        .enumerate()
        .filter(|(_, pass)| **pass != MeshPass::Translucent)
        .map(|(slot, _)| DrawStep::Mesh(slot))
        .collect();
    if has_points {
        order.push(DrawStep::Points);
    }
    order.extend(
        passes
            .iter()
            .enumerate()
            .filter(|(_, pass)| **pass == MeshPass::Translucent)
            .map(|(slot, _)| DrawStep::Mesh(slot)),
    );
    order
}

struct MeshDraw {
    element: usize,
    part: usize,
    pass: MeshPass,
    mesh: MeshResource,
}

struct ParticleDraw {
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
    count: u32,
}

struct Pipelines {
    opaque: wgpu::RenderPipeline,
    opaque_double_sided: wgpu::RenderPipeline,
    translucent: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    blit: wgpu::RenderPipeline,
}

impl Pipelines {
    fn mesh(&self, pass: MeshPass) -> &wgpu::RenderPipeline {
        match pass {
            MeshPass::Opaque => &self.opaque,
            MeshPass::OpaqueDoubleSided => &self.opaque_double_sided,
            MeshPass::Translucent => &self.translucent,
        }
    }
}

/// GPU state for one mounted vault: surface, pipelines and the scene's
/// uploaded geometry. Everything is released when the context is dropped.
pub struct RenderContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    settings: RenderSettings,
    scale_factor: f64,
    max_texture_dimension: u32,
    targets: SceneTargets,
    pipelines: Pipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: u64,
    object_staging: Vec<u8>,
    blit_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    blit_bind_group: wgpu::BindGroup,
    meshes: Vec<MeshDraw>,
    particles: Option<ParticleDraw>,
    draw_order: Vec<DrawStep>,
}

impl RenderContext {
    pub fn new(
        window: Arc<Window>,
        scene: &VaultScene,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        let window_size = window.inner_size();
        let scale_factor = window.scale_factor();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Graphics adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vault.device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            },
            None,
        ))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let format_features = adapter.get_texture_format_features(SCENE_FORMAT);
        let sample_count = pick_sample_count(settings.msaa_samples, |count| {
            format_features.flags.sample_count_supported(count)
        });
        if sample_count != settings.msaa_samples {
            log::warn!(
                "MSAA x{} unavailable, rendering with x{}",
                settings.msaa_samples,
                sample_count
            );
        }

        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        let target_size = clamp_target(
            settings.pixel_ratio.target_size(window_size, scale_factor),
            max_texture_dimension,
        );
        let targets = SceneTargets::new(&device, target_size, sample_count);

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vault.frame.layout"),
            entries: &[uniform_entry(false, std::mem::size_of::<FrameUniform>())],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vault.object.layout"),
            entries: &[uniform_entry(true, std::mem::size_of::<ObjectUniform>())],
        });
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vault.blit.layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipelines = build_pipelines(
            &device,
            &frame_layout,
            &object_layout,
            &blit_layout,
            sample_count,
            format,
        );

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vault.frame.uniforms"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vault.frame.bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let meshes = upload_meshes(&device, scene);
        let particles = upload_particles(&device, scene);
        let passes: Vec<MeshPass> = meshes.iter().map(|draw| draw.pass).collect();
        let draw_order = draw_order(&passes, particles.is_some());

        // One slot per mesh part plus one for the particle field.
        let object_stride = align_to(
            std::mem::size_of::<ObjectUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let slots = meshes.len() as u64 + 1;
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vault.object.uniforms"),
            size: object_stride * slots,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vault.object.bind_group"),
            layout: &object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &object_buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
        });

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vault.blit.sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let blit_bind_group = create_blit_bind_group(&device, &blit_layout, &targets, &blit_sampler);

        log::info!(
            "Render targets {}x{} (msaa x{}), surface {}x{} {:?}",
            targets.size[0],
            targets.size[1],
            sample_count,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            settings,
            scale_factor,
            max_texture_dimension,
            targets,
            pipelines,
            frame_buffer,
            frame_bind_group,
            object_buffer,
            object_bind_group,
            object_stride,
            object_staging: vec![0; (object_stride * slots) as usize],
            blit_layout,
            blit_sampler,
            blit_bind_group,
            meshes,
            particles,
            draw_order,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        self.scale_factor = scale_factor;
        self.config.width = new_size.width.max(1);
        self.config.height = new_size.height.max(1);
        self.surface.configure(&self.device, &self.config);

        let target_size = clamp_target(
            self.settings.pixel_ratio.target_size(new_size, scale_factor),
            self.max_texture_dimension,
        );
        if target_size != self.targets.size {
            self.targets = SceneTargets::new(&self.device, target_size, self.targets.sample_count);
            self.blit_bind_group = create_blit_bind_group(
                &self.device,
                &self.blit_layout,
                &self.targets,
                &self.blit_sampler,
            );
        }
    }

    fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        self.resize(size, self.scale_factor);
    }

    pub fn render(&mut self, scene: &VaultScene) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.write_uniforms(scene);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vault.frame.encoder"),
            });
        self.encode_scene_pass(&mut encoder);

        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vault.blit.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(0, &self.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn write_uniforms(&mut self, scene: &VaultScene) {
        let frame = FrameUniform::from_scene(scene, self.targets.size);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let elements = scene.mesh_elements();
        let stride = self.object_stride as usize;
        for (slot, draw) in self.meshes.iter().enumerate() {
            let element = elements[draw.element];
            let part = &element.parts[draw.part];
            let uniform = ObjectUniform::for_material(element.part_matrix(part), &part.material);
            let bytes = bytemuck::bytes_of(&uniform);
            self.object_staging[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        }
        let field = &scene.particles;
        let uniform = ObjectUniform::for_points(
            field.transform.matrix(),
            field.style.size,
            field.style.opacity,
        );
        let bytes = bytemuck::bytes_of(&uniform);
        let slot = self.meshes.len();
        self.object_staging[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        self.queue
            .write_buffer(&self.object_buffer, 0, &self.object_staging);
    }

    fn encode_scene_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let [r, g, b] = self.settings.background;
        let (view, resolve_target) = self.targets.color_attachment();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vault.scene.pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for step in &self.draw_order {
            match *step {
                DrawStep::Mesh(slot) => {
                    let draw = &self.meshes[slot];
                    let offset = (slot as u64 * self.object_stride) as u32;
                    pass.set_pipeline(self.pipelines.mesh(draw.pass));
                    pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                    pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        draw.mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
                }
                DrawStep::Points => {
                    let Some(particles) = &self.particles else {
                        continue;
                    };
                    let offset = (self.meshes.len() as u64 * self.object_stride) as u32;
                    pass.set_pipeline(&self.pipelines.points);
                    pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                    pass.set_vertex_buffer(0, particles.positions.slice(..));
                    pass.set_vertex_buffer(1, particles.colors.slice(..));
                    pass.draw(0..6, 0..particles.count);
                }
            }
        }
    }

    /// Write the most recent offscreen frame to `path` as PNG.
    pub fn capture_png(&self, path: &Path) -> Result<(), RenderError> {
        let size = self.targets.size;
        let pixels = capture::read_rgba8(&self.device, &self.queue, &self.targets.resolve, size)?;
        capture::save_png(path, size[0], size[1], &pixels)
    }
}

fn clamp_target(size: [u32; 2], max_dimension: u32) -> [u32; 2] {
    let max_dimension = max_dimension.max(1);
    [size[0].min(max_dimension), size[1].min(max_dimension)]
}

fn uniform_entry(dynamic: bool, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn create_blit_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    targets: &SceneTargets,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vault.blit.bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&targets.resolve_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn upload_meshes(device: &wgpu::Device, scene: &VaultScene) -> Vec<MeshDraw> {
    let mut draws = Vec::new();
    for (element_index, element) in scene.mesh_elements().iter().enumerate() {
        for (part_index, part) in element.parts.iter().enumerate() {
            let data = tessellate(&part.shape);
            draws.push(MeshDraw {
                element: element_index,
                part: part_index,
                pass: MeshPass::for_material(&part.material),
                mesh: MeshResource::upload(
                    device,
                    &format!("mesh{element_index}.{part_index}"),
                    &data,
                ),
            });
        }
    }
    // Stable sort keeps element order within each pass.
    draws.sort_by_key(|draw| draw.pass == MeshPass::Translucent);
    log::debug!("Uploaded {} mesh parts", draws.len());
    draws
}

/// `None` for an empty field; wgpu rejects zero-sized vertex slices.
fn upload_particles(device: &wgpu::Device, scene: &VaultScene) -> Option<ParticleDraw> {
    let buffers = &scene.particles.buffers;
    if buffers.is_empty() {
        log::warn!("Particle field is empty, skipping point pass");
        return None;
    }
    let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vault.particles.positions"),
        contents: bytemuck::cast_slice(buffers.positions()),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let colors = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vault.particles.colors"),
        contents: bytemuck::cast_slice(buffers.colors()),
        usage: wgpu::BufferUsages::VERTEX,
    });
    Some(ParticleDraw {
        positions,
        colors,
        count: buffers.len() as u32,
    })
}

const INSTANCE_POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const INSTANCE_COLOR: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];

fn build_pipelines(
    device: &wgpu::Device,
    frame_layout: &wgpu::BindGroupLayout,
    object_layout: &wgpu::BindGroupLayout,
    blit_layout: &wgpu::BindGroupLayout,
    sample_count: u32,
    surface_format: wgpu::TextureFormat,
) -> Pipelines {
    let mesh_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vault.mesh.shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::mesh_source().into()),
    });
    let points_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vault.points.shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::points_source().into()),
    });
    let blit_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vault.blit.shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::BLIT_WGSL.into()),
    });

    let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vault.scene.pipeline_layout"),
        bind_group_layouts: &[frame_layout, object_layout],
        push_constant_ranges: &[],
    });
    let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vault.blit.pipeline_layout"),
        bind_group_layouts: &[blit_layout],
        push_constant_ranges: &[],
    });

    let multisample = wgpu::MultisampleState {
        count: sample_count,
        mask: !0,
        alpha_to_coverage_enabled: false,
    };
    let mesh_pipeline = |label: &str,
                         cull_mode: Option<wgpu::Face>,
                         blend: wgpu::BlendState| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &mesh_module,
                entry_point: "vs_main",
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: SCENE_FORMAT,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample,
            multiview: None,
        })
    };

    let opaque = mesh_pipeline(
        "vault.mesh.opaque",
        Some(wgpu::Face::Back),
        wgpu::BlendState::REPLACE,
    );
    let opaque_double_sided =
        mesh_pipeline("vault.mesh.double_sided", None, wgpu::BlendState::REPLACE);
    let translucent = mesh_pipeline(
        "vault.mesh.translucent",
        None,
        wgpu::BlendState::ALPHA_BLENDING,
    );

    let additive = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    let points = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vault.points"),
        layout: Some(&scene_layout),
        vertex: wgpu::VertexState {
            module: &points_module,
            entry_point: "vs_points",
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &INSTANCE_POSITION,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &INSTANCE_COLOR,
                },
            ],
        },
        fragment: Some(wgpu::FragmentState {
            module: &points_module,
            entry_point: "fs_points",
            targets: &[Some(wgpu::ColorTargetState {
                format: SCENE_FORMAT,
                blend: Some(wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample,
        multiview: None,
    });

    let blit_entry = if surface_format.is_srgb() {
        "fs_blit"
    } else {
        "fs_blit_encode"
    };
    let blit = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vault.blit"),
        layout: Some(&blit_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &blit_module,
            entry_point: "vs_blit",
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &blit_module,
            entry_point: blit_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    Pipelines {
        opaque,
        opaque_double_sided,
        translucent,
        points,
        blit,
    }
}
