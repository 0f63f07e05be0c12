use wgpu::util::DeviceExt;

use super::RenderContext;
use super::texture::{self, Texture2D};

// ── Debug quad blit ───────────────────────────────────────────────────────────

/// Draw `texture` into `target` at the normalised window rectangle
/// `(x, y, w, h)` (all in `[0, 1]`, origin bottom-left).
///
/// Meant for debugging — blitting G-buffer attachments or the font atlas
/// into a corner of the frame.  The pipeline is a shared singleton fetched
/// from the context registry; the texture must be filterable (the
/// `Rgba32Float` position attachment is not).
pub fn draw_quad(
    ctx: &mut RenderContext,
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    texture: &Texture2D,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) {
    let pipeline = ctx.render_pipeline("quad", |device, format| {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quad_pipeline"),
            layout: None,
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
    });

    let rect = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad_rect"),
        contents: bytemuck::cast_slice(&[x, y, width, height]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let sampler = texture::nearest_clamp_sampler(ctx);
    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quad_bg"),
        layout: &pipeline.get_bind_group_layout(0),
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: rect.as_entire_binding() },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&sampler) },
        ],
    });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("quad_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(&pipeline);
    pass.set_bind_group(0, &bind_group, &[]);
    pass.draw(0..6, 0..1);
}
