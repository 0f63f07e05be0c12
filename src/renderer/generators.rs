use wgpu::util::DeviceExt;

use super::RenderContext;
use super::texture::{self, Texture2D, TextureCubeMap};

// ── One-shot compute precomputations ─────────────────────────────────────────
//
// Both generators are pure functions of their inputs: run once at startup,
// reuse the returned texture for the lifetime of the renderer.  Each builds
// its pipeline through the context registry, records a single compute
// dispatch and submits; wgpu inserts the storage-write → sample barrier at
// the submission boundary, so callers may bind the result immediately.

/// BRDF split-sum integration lookup table.
///
/// RG channels hold the scale/bias pair indexed by `(NdotV, roughness)`.
/// `Rgba16Float` because wgpu has no two-channel 8-bit storage format; the
/// BA channels are unused.
pub struct BrdfLut;

impl BrdfLut {
    pub const DEFAULT_SIZE: u32 = 512;

    const WORKGROUP: u32 = 4;

    pub fn generate(ctx: &mut RenderContext, size: u32) -> Texture2D {
        let lut = Texture2D::new(
            ctx,
            "brdf_lut",
            size,
            size,
            wgpu::TextureFormat::Rgba16Float,
            1,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        let pipeline = ctx.compute_pipeline("brdf_lut", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("brdf_lut_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/brdf_lut.wgsl").into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("brdf_lut_pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("brdf_lut_bg"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&lut.view),
            }],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("brdf_lut") });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("brdf_lut"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                size.div_ceil(Self::WORKGROUP),
                size.div_ceil(Self::WORKGROUP),
                1,
            );
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        lut
    }
}

/// Per-mip dispatch parameters for the prefilter kernel.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PrefilterParams {
    mip_size: [f32; 2],
    roughness: f32,
    _pad: f32,
}

/// Environment cubemap pre-convolved per roughness level.
///
/// Mip `i` holds the GGX importance-sampled convolution of the source at
/// roughness `i / (mips - 1)`; the lighting shader selects specular mips by
/// roughness.
pub struct PrefilteredEnvMap;

impl PrefilteredEnvMap {
    pub const MIP_LEVELS: u32 = 5;

    const WORKGROUP: u32 = 16;

    pub fn generate(ctx: &mut RenderContext, source: &TextureCubeMap) -> TextureCubeMap {
        let size = source.size;
        let mips = Self::MIP_LEVELS.min(texture::mip_level_count(size, size));
        let output = TextureCubeMap::storage(ctx, "prefiltered_env", size, mips);

        let pipeline = ctx.compute_pipeline("prefilter_env", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("prefilter_env_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/prefilter_env.wgsl").into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("prefilter_env_pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        });

        let sampler = texture::linear_clamp_sampler(ctx);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("prefilter_env") });

        for mip in 0..mips {
            let mip_size = (size >> mip).max(1);
            let roughness = if mips > 1 { mip as f32 / (mips - 1) as f32 } else { 0.0 };

            let params = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("prefilter_params"),
                contents: bytemuck::bytes_of(&PrefilterParams {
                    mip_size: [mip_size as f32, mip_size as f32],
                    roughness,
                    _pad: 0.0,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let mip_view = output.mip_storage_view(mip);
            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("prefilter_env_bg"),
                layout: &pipeline.get_bind_group_layout(0),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&mip_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: params.as_entire_binding(),
                    },
                ],
            });

            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("prefilter_env_mip"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            // div_ceil: the small tail mips still need one workgroup.
            pass.dispatch_workgroups(
                mip_size.div_ceil(Self::WORKGROUP),
                mip_size.div_ceil(Self::WORKGROUP),
                6,
            );
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));

        output
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefilter_mip_roughness_spans_zero_to_one() {
        let mips = PrefilteredEnvMap::MIP_LEVELS;
        let roughness: Vec<f32> = (0..mips).map(|i| i as f32 / (mips - 1) as f32).collect();
        assert_eq!(roughness.first(), Some(&0.0));
        assert_eq!(roughness.last(), Some(&1.0));
        assert!(roughness.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn small_mips_still_dispatch_one_workgroup() {
        // A 128px cubemap's last prefilter mip is 8px — smaller than the
        // 16-wide workgroup, but div_ceil keeps the dispatch non-empty.
        let mip_size: u32 = 8;
        assert_eq!(mip_size.div_ceil(PrefilteredEnvMap::WORKGROUP), 1);
        assert_eq!(512u32.div_ceil(BrdfLut::WORKGROUP), 128);
    }
}
