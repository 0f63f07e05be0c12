use std::ops::Range;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3, Vec4};

use super::generators::{BrdfLut, PrefilteredEnvMap};
use super::mesh::Mesh;
use super::target::RenderTarget;
use super::texture::{self, Texture2D, TextureCubeMap};
use super::{RenderContext, UniformArena};

// ── Geometry input ────────────────────────────────────────────────────────────

/// Vertex layout consumed by the G-buffer pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl ModelVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
        1 => Float32x3,  // normal
        2 => Float32x2,  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

// ── Material / Model ──────────────────────────────────────────────────────────

/// PBR surface description.  Absent maps fall back to the scalar values; the
/// shader branches on per-map presence flags uploaded with the model.
pub struct Material {
    pub base_color: Vec3,
    pub roughness: f32,
    pub metallic: f32,
    pub albedo_map: Option<Arc<Texture2D>>,
    pub roughness_metallic_map: Option<Arc<Texture2D>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            roughness: 0.5,
            metallic: 0.0,
            albedo_map: None,
            roughness_metallic_map: None,
        }
    }
}

/// One draw submission.  The renderer keeps the `Arc` clones only until the
/// end of the current `render` call — submissions are frame-scoped.
pub struct Model {
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    pub material: Arc<Material>,
    /// Sub-range of the mesh's index buffer; `None` draws the whole mesh.
    pub index_range: Option<Range<u32>>,
}

impl Model {
    pub fn new(mesh: Arc<Mesh>, transform: Mat4, material: Arc<Material>) -> Self {
        Self { mesh, transform, material, index_range: None }
    }
}

// ── Lights ────────────────────────────────────────────────────────────────────

const LIGHT_DIRECTIONAL: u32 = 0;
const LIGHT_POINT: u32 = 1;
const LIGHT_SPOT: u32 = 2;

/// Light submission.  Color carries intensity in the alpha channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional { color: Vec4, direction: Vec3 },
    Point { color: Vec4, position: Vec3, radius: f32 },
    Spot { color: Vec4, position: Vec3, direction: Vec3, cutoff: f32 },
}

/// GPU-side light record; one per full-screen accumulation quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub color: [f32; 4],
    /// xyz = position, w = radius (point lights).
    pub position_radius: [f32; 4],
    /// xyz = direction, w = cutoff angle in radians (spot lights).
    pub direction_cutoff: [f32; 4],
    /// x = light kind; yzw padding.
    pub kind: [u32; 4],
}

/// Flatten a [`Light`] into its uniform record.  The kind discriminant keeps
/// the set closed — adding a variant fails to compile until handled here.
pub fn light_uniform(light: &Light) -> LightUniform {
    match *light {
        Light::Directional { color, direction } => LightUniform {
            color: color.to_array(),
            position_radius: [0.0; 4],
            direction_cutoff: [direction.x, direction.y, direction.z, 0.0],
            kind: [LIGHT_DIRECTIONAL, 0, 0, 0],
        },
        Light::Point { color, position, radius } => LightUniform {
            color: color.to_array(),
            position_radius: [position.x, position.y, position.z, radius],
            direction_cutoff: [0.0; 4],
            kind: [LIGHT_POINT, 0, 0, 0],
        },
        Light::Spot { color, position, direction, cutoff } => LightUniform {
            color: color.to_array(),
            position_radius: [position.x, position.y, position.z, 0.0],
            direction_cutoff: [direction.x, direction.y, direction.z, cutoff],
            kind: [LIGHT_SPOT, 0, 0, 0],
        },
    }
}

// ── Uniform blocks ────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniform {
    proj: [[f32; 4]; 4],
    /// World → camera (the inverse of the camera's world transform).
    view: [[f32; 4]; 4],
    eye: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    /// x = roughness, y = metallic, z = albedo map bound, w = r/m map bound.
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    eye: [f32; 4],
    /// x = environment map bound, y = prefiltered mip count.
    env: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyboxUniform {
    proj: [[f32; 4]; 4],
    /// Rotation-only view matrix — the skybox never translates.
    view_rot: [[f32; 4]; 4],
}

// ── GBufferPass ───────────────────────────────────────────────────────────────

/// First deferred pass: rasterise every submitted model's albedo, normal,
/// world position and material parameters into the G-buffer.
pub struct GBufferPass {
    target: RenderTarget,
    pipeline: Arc<wgpu::RenderPipeline>,
    uniform_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    scene_buffer: wgpu::Buffer,
    model_arena: UniformArena,
    uniform_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    /// Bound in place of absent material maps.
    white: Texture2D,
}

/// G-buffer attachment order.
const GBUFFER_FORMATS: [wgpu::TextureFormat; 4] = [
    wgpu::TextureFormat::Rgba8Unorm,   // albedo
    wgpu::TextureFormat::Rgba8Unorm,   // normal (encoded *0.5+0.5)
    wgpu::TextureFormat::Rgba32Float,  // world position (w = coverage flag)
    wgpu::TextureFormat::Rgba8Unorm,   // material params
];

impl GBufferPass {
    pub fn new(ctx: &mut RenderContext, width: u32, height: u32) -> Self {
        let target = Self::build_target(ctx, width, height);

        let uniform_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gbuffer_uniform_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let texture_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gbuffer_texture_bgl"),
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
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = ctx.render_pipeline("gbuffer", |device, _format| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("gbuffer_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gbuffer.wgsl").into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("gbuffer_pipeline_layout"),
                bind_group_layouts: &[&uniform_bgl, &texture_bgl],
                ..Default::default()
            });
            let targets: Vec<Option<wgpu::ColorTargetState>> = GBUFFER_FORMATS
                .iter()
                .map(|&format| {
                    Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })
                })
                .collect();
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("gbuffer_pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[ModelVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        });

        let scene_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gbuffer_scene_uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_arena = UniformArena::new(&ctx.device, "gbuffer_model_arena", 64);
        let uniform_bind_group =
            Self::make_uniform_bind_group(&ctx.device, &uniform_bgl, &scene_buffer, &model_arena);

        let sampler = texture::linear_clamp_sampler(ctx);
        let white = Texture2D::new(
            ctx,
            "material_white",
            1,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        white.update(ctx, &[255, 255, 255, 255], 4);

        Self {
            target,
            pipeline,
            uniform_bgl,
            texture_bgl,
            scene_buffer,
            model_arena,
            uniform_bind_group,
            sampler,
            white,
        }
    }

    fn build_target(ctx: &RenderContext, width: u32, height: u32) -> RenderTarget {
        let mut target = RenderTarget::new(width, height);
        for format in GBUFFER_FORMATS {
            target.add_color_attachment(ctx, format);
        }
        target.add_depth_attachment(ctx);
        target
    }

    fn make_uniform_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        scene_buffer: &wgpu::Buffer,
        arena: &UniformArena,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gbuffer_uniform_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: scene_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: arena.binding() },
            ],
        })
    }

    /// The G-buffer attachments, readable by downstream passes.
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Recreate the G-buffer at a new viewport size.
    pub fn resize(&mut self, ctx: &RenderContext, width: u32, height: u32) {
        self.target = Self::build_target(ctx, width, height);
    }

    fn record(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        models: &[Model],
        proj: Mat4,
        view: Mat4,
    ) {
        let scene = SceneUniform {
            proj: proj.to_cols_array_2d(),
            view: view.inverse().to_cols_array_2d(),
            eye: view.w_axis.to_array(),
        };
        ctx.queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&scene));

        if self.model_arena.ensure(&ctx.device, models.len() as u32) {
            self.uniform_bind_group = Self::make_uniform_bind_group(
                &ctx.device,
                &self.uniform_bgl,
                &self.scene_buffer,
                &self.model_arena,
            );
        }

        let mut texture_bind_groups = Vec::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            let mat = &model.material;
            self.model_arena.write(&ctx.queue, i as u32, &ModelUniform {
                model: model.transform.to_cols_array_2d(),
                base_color: [mat.base_color.x, mat.base_color.y, mat.base_color.z, 1.0],
                params: [
                    mat.roughness,
                    mat.metallic,
                    if mat.albedo_map.is_some() { 1.0 } else { 0.0 },
                    if mat.roughness_metallic_map.is_some() { 1.0 } else { 0.0 },
                ],
            });

            let albedo = mat.albedo_map.as_deref().unwrap_or(&self.white);
            let rough_metal = mat.roughness_metallic_map.as_deref().unwrap_or(&self.white);
            texture_bind_groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("gbuffer_material_bg"),
                layout: &self.texture_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&albedo.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&rough_metal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }));
        }

        // Clearing to transparent keeps position.w == 0 for sky pixels; the
        // lighting pass reads that as "no geometry".
        let mut pass = self
            .target
            .begin_pass(encoder, "gbuffer_pass", Some(wgpu::Color::TRANSPARENT));
        pass.set_pipeline(&self.pipeline);

        for (i, model) in models.iter().enumerate() {
            if !model.mesh.bind(&mut pass) {
                continue;
            }
            pass.set_bind_group(0, &self.uniform_bind_group, &[UniformArena::offset(i as u32)]);
            pass.set_bind_group(1, &texture_bind_groups[i], &[]);
            let range = model.index_range.clone().unwrap_or(0..model.mesh.index_count());
            pass.draw_indexed(range, 0, 0..1);
        }
    }
}

// ── LightingPass ──────────────────────────────────────────────────────────────

/// Second deferred pass: one ambient/IBL full-screen triangle (alpha
/// blending), one additive full-screen triangle per submitted light, then
/// the skybox at far depth when an environment map is assigned.
pub struct LightingPass {
    ambient_pipeline: Arc<wgpu::RenderPipeline>,
    light_pipeline: Arc<wgpu::RenderPipeline>,
    skybox_pipeline: Arc<wgpu::RenderPipeline>,
    uniform_bgl: wgpu::BindGroupLayout,
    gbuffer_bgl: wgpu::BindGroupLayout,
    skybox_bgl: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    light_arena: UniformArena,
    uniform_bind_group: wgpu::BindGroup,
    gbuffer_bind_group: wgpu::BindGroup,
    skybox_buffer: wgpu::Buffer,
    skybox_bind_group: Option<wgpu::BindGroup>,
    brdf_lut: Texture2D,
    env_map: Option<Arc<TextureCubeMap>>,
    prefiltered: Option<TextureCubeMap>,
    black_env: TextureCubeMap,
    linear_sampler: wgpu::Sampler,
}

impl LightingPass {
    pub fn new(ctx: &mut RenderContext, gbuffer: &RenderTarget) -> Self {
        let brdf_lut = BrdfLut::generate(ctx, BrdfLut::DEFAULT_SIZE);
        let black_env = TextureCubeMap::black(ctx);
        let linear_sampler = texture::linear_clamp_sampler(ctx);

        let uniform_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting_uniform_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // G-buffer attachments are read with textureLoad (no filtering — the
        // position buffer is Rgba32Float); environment and LUT are sampled.
        let mut gbuffer_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..4)
            .map(|i| wgpu::BindGroupLayoutEntry {
                binding: i,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        gbuffer_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 4,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::Cube,
                multisampled: false,
            },
            count: None,
        });
        gbuffer_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 5,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        gbuffer_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 6,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let gbuffer_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting_gbuffer_bgl"),
            entries: &gbuffer_entries,
        });

        let skybox_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let lighting_shader = |device: &wgpu::Device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("lighting_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lighting.wgsl").into()),
            })
        };

        let fullscreen_pipeline = |device: &wgpu::Device,
                                   format: wgpu::TextureFormat,
                                   label: &str,
                                   entry: &str,
                                   blend: wgpu::BlendState| {
            let shader = lighting_shader(device);
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&uniform_bgl, &gbuffer_bgl],
                ..Default::default()
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let ambient_pipeline = ctx.render_pipeline("deferred_ambient", |device, format| {
            fullscreen_pipeline(
                device,
                format,
                "deferred_ambient_pipeline",
                "fs_ambient",
                wgpu::BlendState::ALPHA_BLENDING,
            )
        });
        // Classic deferred accumulation: src = ONE, dst = ONE per light.
        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        let light_pipeline = ctx.render_pipeline("deferred_light", |device, format| {
            fullscreen_pipeline(device, format, "deferred_light_pipeline", "fs_light", additive)
        });

        let skybox_pipeline = ctx.render_pipeline("skybox", |device, format| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("skybox_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/skybox.wgsl").into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("skybox_pipeline_layout"),
                bind_group_layouts: &[&skybox_bgl],
                ..Default::default()
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("skybox_pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    // The cube is seen from inside — cull the outward faces.
                    cull_mode: Some(wgpu::Face::Front),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        });

        let frame_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting_frame_uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_arena = UniformArena::new(&ctx.device, "light_arena", 16);
        let uniform_bind_group =
            Self::make_uniform_bind_group(&ctx.device, &uniform_bgl, &frame_buffer, &light_arena);

        let skybox_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skybox_uniform"),
            size: std::mem::size_of::<SkyboxUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let gbuffer_bind_group = Self::make_gbuffer_bind_group(
            &ctx.device,
            &gbuffer_bgl,
            gbuffer,
            &black_env,
            &brdf_lut,
            &linear_sampler,
        );

        Self {
            ambient_pipeline,
            light_pipeline,
            skybox_pipeline,
            uniform_bgl,
            gbuffer_bgl,
            skybox_bgl,
            frame_buffer,
            light_arena,
            uniform_bind_group,
            gbuffer_bind_group,
            skybox_buffer,
            skybox_bind_group: None,
            brdf_lut,
            env_map: None,
            prefiltered: None,
            black_env,
            linear_sampler,
        }
    }

    fn make_uniform_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        frame_buffer: &wgpu::Buffer,
        arena: &UniformArena,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting_uniform_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: arena.binding() },
            ],
        })
    }

    fn make_gbuffer_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        gbuffer: &RenderTarget,
        env: &TextureCubeMap,
        brdf_lut: &Texture2D,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting_gbuffer_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color(0).view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color(1).view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color(2).view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color(3).view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&env.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&brdf_lut.view),
                },
                wgpu::BindGroupEntry { binding: 6, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        })
    }

    /// The precomputed BRDF integration LUT (debug-viewable).
    pub fn brdf_lut(&self) -> &Texture2D {
        &self.brdf_lut
    }

    pub fn environment(&self) -> Option<&Arc<TextureCubeMap>> {
        self.env_map.as_ref()
    }

    /// Assign the environment cubemap: prefilters it for specular IBL and
    /// enables the skybox draw.
    fn set_environment(&mut self, ctx: &mut RenderContext, env: Arc<TextureCubeMap>, gbuffer: &RenderTarget) {
        let prefiltered = PrefilteredEnvMap::generate(ctx, &env);

        self.skybox_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox_bg"),
            layout: &self.skybox_bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.skybox_buffer.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&env.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        }));

        self.env_map = Some(env);
        self.prefiltered = Some(prefiltered);
        self.rebind_gbuffer(ctx, gbuffer);
    }

    /// Rebuild the G-buffer bind group (after env change or resize).
    fn rebind_gbuffer(&mut self, ctx: &RenderContext, gbuffer: &RenderTarget) {
        let env = self.prefiltered.as_ref().unwrap_or(&self.black_env);
        self.gbuffer_bind_group = Self::make_gbuffer_bind_group(
            &ctx.device,
            &self.gbuffer_bgl,
            gbuffer,
            env,
            &self.brdf_lut,
            &self.linear_sampler,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &RenderTarget,
        frame_view: &wgpu::TextureView,
        lights: &[Light],
        proj: Mat4,
        view: Mat4,
        clear_color: wgpu::Color,
    ) {
        let mips = self.prefiltered.as_ref().map(|p| p.mip_level_count).unwrap_or(1);
        let frame = FrameUniform {
            eye: view.w_axis.to_array(),
            env: [
                if self.env_map.is_some() { 1.0 } else { 0.0 },
                mips as f32,
                0.0,
                0.0,
            ],
        };
        ctx.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        if self.light_arena.ensure(&ctx.device, lights.len().max(1) as u32) {
            self.uniform_bind_group = Self::make_uniform_bind_group(
                &ctx.device,
                &self.uniform_bgl,
                &self.frame_buffer,
                &self.light_arena,
            );
        }
        for (i, light) in lights.iter().enumerate() {
            self.light_arena.write(&ctx.queue, i as u32, &light_uniform(light));
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lighting_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&self.ambient_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[0]);
            pass.set_bind_group(1, &self.gbuffer_bind_group, &[]);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.light_pipeline);
            for i in 0..lights.len() {
                pass.set_bind_group(0, &self.uniform_bind_group, &[UniformArena::offset(i as u32)]);
                pass.draw(0..3, 0..1);
            }
        }

        // Skybox: drawn against the G-buffer depth so scene geometry keeps
        // occluding it; skipped entirely until an environment map is set.
        if let Some(skybox_bg) = &self.skybox_bind_group {
            let sky = SkyboxUniform {
                proj: proj.to_cols_array_2d(),
                view_rot: Mat4::from_mat3(Mat3::from_mat4(view.inverse())).to_cols_array_2d(),
            };
            ctx.queue.write_buffer(&self.skybox_buffer, 0, bytemuck::bytes_of(&sky));

            let depth = gbuffer.depth().expect("g-buffer always has a depth attachment");
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("skybox_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.skybox_pipeline);
            pass.set_bind_group(0, skybox_bg, &[]);
            pass.draw(0..36, 0..1);
        }
    }
}

// ── DeferredRenderer ──────────────────────────────────────────────────────────

/// Typed result of a named pass lookup.
pub enum PassRef<'a> {
    GBuffer(&'a GBufferPass),
    Lighting(&'a LightingPass),
}

/// G-buffer + lighting composition over frame-scoped model and light lists.
///
/// Per frame: `submit` models and lights, then `render` exactly once.  Both
/// lists are cleared before `render` returns; the renderer never retains
/// submissions across frames.
pub struct DeferredRenderer {
    gbuffer_pass: GBufferPass,
    lighting_pass: LightingPass,
    models: Vec<Model>,
    lights: Vec<Light>,
    pub clear_color: wgpu::Color,
}

impl DeferredRenderer {
    pub fn new(ctx: &mut RenderContext, width: u32, height: u32) -> Self {
        let gbuffer_pass = GBufferPass::new(ctx, width, height);
        let lighting_pass = LightingPass::new(ctx, gbuffer_pass.target());
        Self {
            gbuffer_pass,
            lighting_pass,
            models: Vec::new(),
            lights: Vec::new(),
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Queue a model for this frame.
    pub fn submit(&mut self, model: Model) {
        self.models.push(model);
    }

    /// Queue a light for this frame.
    pub fn submit_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Assign the environment cubemap used for IBL and the skybox.
    pub fn set_environment(&mut self, ctx: &mut RenderContext, env: Arc<TextureCubeMap>) {
        self.lighting_pass.set_environment(ctx, env, self.gbuffer_pass.target());
    }

    pub fn gbuffer(&self) -> &GBufferPass {
        &self.gbuffer_pass
    }

    pub fn lighting(&self) -> &LightingPass {
        &self.lighting_pass
    }

    /// Named pass lookup (`"gbuffer"` / `"lighting"`).
    pub fn pass(&self, name: &str) -> Option<PassRef<'_>> {
        match name {
            "gbuffer" => Some(PassRef::GBuffer(&self.gbuffer_pass)),
            "lighting" => Some(PassRef::Lighting(&self.lighting_pass)),
            _ => None,
        }
    }

    /// Recreate the G-buffer for a new viewport size.
    pub fn resize(&mut self, ctx: &RenderContext, width: u32, height: u32) {
        self.gbuffer_pass.resize(ctx, width, height);
        self.lighting_pass.rebind_gbuffer(ctx, self.gbuffer_pass.target());
    }

    /// Render the frame: G-buffer pass, then lighting, then skybox.
    ///
    /// `view` is the camera's world transform (its inverse is the view
    /// matrix).  An empty submission list still clears the G-buffer and runs
    /// both passes.  The pass boundary inside the shared encoder is the
    /// write→sample barrier between G-buffer output and lighting input.
    pub fn render(
        &mut self,
        ctx: &mut RenderContext,
        frame_view: &wgpu::TextureView,
        proj: Mat4,
        view: Mat4,
    ) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("deferred") });

        self.gbuffer_pass.record(ctx, &mut encoder, &self.models, proj, view);
        self.lighting_pass.record(
            ctx,
            &mut encoder,
            self.gbuffer_pass.target(),
            frame_view,
            &self.lights,
            proj,
            view,
            self.clear_color,
        );

        ctx.queue.submit(std::iter::once(encoder.finish()));

        // Submissions are valid for exactly one frame.
        self.models.clear();
        self.lights.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_light_maps_kind_and_direction() {
        let u = light_uniform(&Light::Directional {
            color: Vec4::new(1.0, 0.5, 0.25, 2.0),
            direction: Vec3::new(0.0, -1.0, 0.0),
        });
        assert_eq!(u.kind[0], LIGHT_DIRECTIONAL);
        assert_eq!(u.color, [1.0, 0.5, 0.25, 2.0]);
        assert_eq!(u.direction_cutoff, [0.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn point_light_maps_position_and_radius() {
        let u = light_uniform(&Light::Point {
            color: Vec4::ONE,
            position: Vec3::new(1.0, 2.0, 3.0),
            radius: 7.5,
        });
        assert_eq!(u.kind[0], LIGHT_POINT);
        assert_eq!(u.position_radius, [1.0, 2.0, 3.0, 7.5]);
    }

    #[test]
    fn spot_light_maps_cutoff_into_direction_w() {
        let cutoff = std::f32::consts::PI / 3.5;
        let u = light_uniform(&Light::Spot {
            color: Vec4::ONE,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            cutoff,
        });
        assert_eq!(u.kind[0], LIGHT_SPOT);
        assert_eq!(u.direction_cutoff, [0.0, 0.0, -1.0, cutoff]);
    }

    #[test]
    fn light_uniform_is_deterministic() {
        let l = Light::Point { color: Vec4::ONE, position: Vec3::X, radius: 2.0 };
        assert_eq!(light_uniform(&l), light_uniform(&l));
    }

    #[test]
    fn default_material_has_no_maps() {
        let m = Material::default();
        assert!(m.albedo_map.is_none());
        assert!(m.roughness_metallic_map.is_none());
        assert_eq!(m.base_color, Vec3::ONE);
        assert_eq!(m.roughness, 0.5);
        assert_eq!(m.metallic, 0.0);
    }

    #[test]
    fn gbuffer_has_four_color_formats() {
        // Albedo, normal, position, material — the lighting shader indexes
        // them by attachment order.
        assert_eq!(GBUFFER_FORMATS.len(), 4);
        assert_eq!(GBUFFER_FORMATS[2], wgpu::TextureFormat::Rgba32Float);
    }
}
