use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::EmberError;

use super::mesh::Mesh;
use super::packer::{self, PackRect};
use super::sdf;
use super::text::{
    self, Align, CharUv, Character, FALLBACK_2D, FALLBACK_3D, GlyphSet, TextVertex,
};
use super::texture::{self, Texture2D};
use super::{RenderContext, UniformArena};

// ── Character set ─────────────────────────────────────────────────────────────

/// The 27 Windows-1252 characters mapped into the 0x80–0x9F range.
const CP1252_EXTRAS: [char; 27] = [
    '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•',
    '–', '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
];

/// Every renderable Windows-1252 code point, in code-page order.  Glyphs
/// that rasterize to zero area (space, NBSP, soft hyphen) are dropped later.
pub fn charset() -> Vec<char> {
    (0x20u32..=0x7E)
        .chain(0xA0..=0xFF)
        .filter_map(char::from_u32)
        .chain(CP1252_EXTRAS)
        .collect()
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Glyphs are rasterized at this pixel height; `draw_3d` scale 1.0 maps one
/// line of text to one world unit.
pub const REFERENCE_PIXEL_HEIGHT: f32 = 80.0;

#[derive(Clone, Copy, Debug)]
pub struct FontConfig {
    /// Edge length of the square atlas (power of two).
    pub atlas_size: u32,
    /// SDF search radius in pixels; values <= 1 keep the raw coverage.
    pub sdf_spread: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { atlas_size: 2048, sdf_spread: 16.0 }
    }
}

// ── Batching state ────────────────────────────────────────────────────────────

struct DrawCall {
    first_index: u32,
    index_count: u32,
    transform: Mat4,
    depth_test: bool,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ProjUniform {
    proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct TextModelUniform {
    model: [[f32; 4]; 4],
}

// ── Font ──────────────────────────────────────────────────────────────────────

/// SDF font atlas plus the batched text-draw API.
///
/// Construction rasterizes the whole character set, packs it into one
/// single-channel atlas, runs SDF synthesis and uploads the result with a
/// full mip chain — a one-shot startup cost.  Per frame only the text mesh
/// is rebuilt, inside a `begin_drawing` / `end_drawing` scope:
///
/// - `draw` — screen-space text (pixel coordinates, Y down).
/// - `draw_3d` — world-space text placed by a model matrix.
///
/// All quads batched between begin and end are uploaded once and rendered
/// with the shared font pipeline at `end_drawing`.
pub struct Font {
    glyphs: GlyphSet,
    pub atlas: Texture2D,
    spread: f32,
    padding: u32,
    atlas_size: u32,

    mesh: Mesh,
    drawing: bool,
    vertices: Vec<TextVertex>,
    indices: Vec<u32>,
    start_index: u32,
    draw_calls: Vec<DrawCall>,

    overlay_pipeline: Arc<wgpu::RenderPipeline>,
    depth_off_pipeline: Arc<wgpu::RenderPipeline>,
    depth_test_pipeline: Arc<wgpu::RenderPipeline>,
    uniform_bgl: wgpu::BindGroupLayout,
    proj_buffer: wgpu::Buffer,
    model_arena: UniformArena,
    uniform_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
}

impl Font {
    pub fn new(ctx: &mut RenderContext, font_bytes: &[u8], config: FontConfig) -> Result<Self, EmberError> {
        let face = fontdue::Font::from_bytes(font_bytes, fontdue::FontSettings::default())
            .map_err(EmberError::FontParse)?;

        let spread = config.sdf_spread;
        let atlas_size = config.atlas_size;
        let padding = (spread * 1.5) as u32;

        // ── 1. Rasterize the character set ─────────────────────────────
        let mut characters: HashMap<char, Character> = HashMap::new();
        let mut bitmaps: HashMap<char, Vec<u8>> = HashMap::new();
        let mut order: Vec<char> = Vec::new();
        let mut line_height = 0u32;

        for ch in charset() {
            let (metrics, bitmap) = face.rasterize(ch, REFERENCE_PIXEL_HEIGHT);
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            let (w, h) = (metrics.width as u32, metrics.height as u32);
            line_height = line_height.max(h);

            characters.insert(ch, Character {
                ch,
                size: (w, h),
                bearing: (metrics.xmin, metrics.ymin + metrics.height as i32),
                advance: metrics.advance_width.floor() as i32,
                pack: PackRect::new(w + padding * 2, h + padding * 2),
                atlas_pos: (0, 0),
            });
            bitmaps.insert(ch, bitmap);
            order.push(ch);
        }
        let line_height = line_height + 5;

        // ── 2. Pack all padded rectangles (tallest first) ──────────────
        let mut rects: Vec<PackRect> = order.iter().map(|c| characters[c].pack).collect();
        let tight_bound = packer::pack(atlas_size, atlas_size, &mut rects)?;
        for (c, rect) in order.iter().zip(&rects) {
            let ch = characters.get_mut(c).unwrap();
            ch.pack = *rect;
            ch.atlas_pos = (rect.x + padding, rect.y + padding);
        }
        eprintln!(
            "font: packed {} glyphs into {atlas_size}x{atlas_size} atlas (tight height {tight_bound})",
            order.len()
        );

        // ── 3. Composite, flip once, synthesize the SDF ────────────────
        let mut atlas_image = vec![0u8; (atlas_size * atlas_size) as usize];
        for c in &order {
            let ch = &characters[c];
            let bitmap = &bitmaps[c];
            let (w, h) = ch.size;
            let (ax, ay) = ch.atlas_pos;
            for row in 0..h {
                let src = (row * w) as usize;
                let dst = ((ay + row) * atlas_size + ax) as usize;
                atlas_image[dst..dst + w as usize]
                    .copy_from_slice(&bitmap[src..src + w as usize]);
            }
        }
        let atlas_image = flip_vertical(&atlas_image, atlas_size as usize);

        let atlas_data = if spread > 1.0 {
            sdf::synthesize(&atlas_image, atlas_size as usize, atlas_size as usize, spread)
        } else {
            atlas_image
        };

        // ── 4. Upload with a full mip chain ────────────────────────────
        let mips = texture::mip_chain_r8(&atlas_data, atlas_size, atlas_size);
        let atlas = Texture2D::new(
            ctx,
            "font_atlas",
            atlas_size,
            atlas_size,
            wgpu::TextureFormat::R8Unorm,
            mips.len() as u32,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        for (level, data) in mips.iter().enumerate() {
            atlas.write_mip(ctx, level as u32, data, 1);
        }

        // ── 5. UVs (V flipped once, matching the atlas flip) ───────────
        let uvs: HashMap<char, CharUv> = characters
            .iter()
            .map(|(&c, ch)| (c, CharUv::from_pack(&ch.pack, atlas_size)))
            .collect();

        let glyphs = GlyphSet { characters, uvs, line_height };

        // ── 6. GPU plumbing: pipelines, samplers, bind groups ──────────
        let uniform_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("font_uniform_bgl"),
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
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let atlas_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("font_atlas_bgl"),
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

        let overlay_pipeline = ctx.render_pipeline("font_overlay", |device, format| {
            font_pipeline(device, format, "font_overlay", &uniform_bgl, &atlas_bgl, None)
        });
        let depth_off_pipeline = ctx.render_pipeline("font_depth_off", |device, format| {
            font_pipeline(
                device,
                format,
                "font_depth_off",
                &uniform_bgl,
                &atlas_bgl,
                Some(wgpu::CompareFunction::Always),
            )
        });
        let depth_test_pipeline = ctx.render_pipeline("font_depth_test", |device, format| {
            font_pipeline(
                device,
                format,
                "font_depth_test",
                &uniform_bgl,
                &atlas_bgl,
                Some(wgpu::CompareFunction::LessEqual),
            )
        });

        let proj_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("font_proj_uniform"),
            size: std::mem::size_of::<ProjUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_arena = UniformArena::new(&ctx.device, "font_model_arena", 16);
        let uniform_bind_group =
            make_uniform_bind_group(&ctx.device, &uniform_bgl, &proj_buffer, &model_arena);

        let sampler = texture::linear_clamp_sampler(ctx);
        let atlas_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("font_atlas_bg"),
            layout: &atlas_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Ok(Self {
            glyphs,
            atlas,
            spread,
            padding,
            atlas_size,
            mesh: Mesh::new("font_mesh"),
            drawing: false,
            vertices: Vec::new(),
            indices: Vec::new(),
            start_index: 0,
            draw_calls: Vec::new(),
            overlay_pipeline,
            depth_off_pipeline,
            depth_test_pipeline,
            uniform_bgl,
            proj_buffer,
            model_arena,
            uniform_bind_group,
            atlas_bind_group,
        })
    }

    pub fn glyphs(&self) -> &GlyphSet {
        &self.glyphs
    }

    pub fn line_height(&self) -> u32 {
        self.glyphs.line_height
    }

    /// Measured pixel width of a single line at the given scale.
    pub fn measure(&self, text: &str, scale: f32) -> f32 {
        text::measure_line(&self.glyphs, text, scale)
    }

    // ── Batch scope ────────────────────────────────────────────────────────

    /// Open a batch scope.  Calling it again before `end_drawing` is a no-op.
    pub fn begin_drawing(&mut self) {
        if self.drawing {
            return;
        }
        self.drawing = true;
        self.start_index = 0;
    }

    /// Queue screen-space text at pixel position `(x, y)`.
    pub fn draw(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        scale: f32,
        color: [f32; 4],
        align: Align,
    ) -> Result<(), EmberError> {
        if !self.drawing {
            return Err(EmberError::DrawOutsideBatch);
        }
        let (verts, inds) =
            text::generate_text_mesh(&self.glyphs, text, x, y, scale, color, align, false, FALLBACK_2D);
        self.push_call(verts, inds, Mat4::IDENTITY, false);
        Ok(())
    }

    /// Queue world-space text placed by `transform`.  Scale 1.0 maps one
    /// line of text to one world unit.
    pub fn draw_3d(
        &mut self,
        text: &str,
        transform: Mat4,
        scale: f32,
        color: [f32; 4],
        align: Align,
    ) -> Result<(), EmberError> {
        if !self.drawing {
            return Err(EmberError::DrawOutsideBatch);
        }
        let scl = scale / REFERENCE_PIXEL_HEIGHT;
        let (verts, inds) =
            text::generate_text_mesh(&self.glyphs, text, 0.0, 0.0, scl, color, align, true, FALLBACK_3D);
        self.push_call(verts, inds, transform, true);
        Ok(())
    }

    fn push_call(&mut self, verts: Vec<TextVertex>, inds: Vec<u32>, transform: Mat4, depth_test: bool) {
        let first_index = self.indices.len() as u32;
        let base = self.start_index;
        self.indices.extend(inds.iter().map(|i| i + base));
        self.start_index += verts.len() as u32;
        self.vertices.extend_from_slice(&verts);
        self.draw_calls.push(DrawCall {
            first_index,
            index_count: inds.len() as u32,
            transform,
            depth_test,
        });
    }

    /// Close the batch scope: upload every queued quad once and render all
    /// draw calls into `target`.  A no-op when no scope is open.
    ///
    /// `depth` is the depth buffer 3D text is tested against
    /// (`Depth32Float`); without it every call renders as an overlay.
    pub fn end_drawing(
        &mut self,
        ctx: &mut RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: Option<&wgpu::TextureView>,
        proj: Mat4,
    ) {
        if !self.drawing {
            return;
        }
        self.drawing = false;

        let vertices = std::mem::take(&mut self.vertices);
        let indices = std::mem::take(&mut self.indices);
        let draw_calls = std::mem::take(&mut self.draw_calls);
        self.start_index = 0;

        if draw_calls.is_empty() || indices.is_empty() {
            return;
        }

        self.mesh.update(ctx, &vertices, &indices);
        ctx.queue.write_buffer(
            &self.proj_buffer,
            0,
            bytemuck::bytes_of(&ProjUniform { proj: proj.to_cols_array_2d() }),
        );

        if self.model_arena.ensure(&ctx.device, draw_calls.len() as u32) {
            self.uniform_bind_group = make_uniform_bind_group(
                &ctx.device,
                &self.uniform_bgl,
                &self.proj_buffer,
                &self.model_arena,
            );
        }
        for (i, call) in draw_calls.iter().enumerate() {
            self.model_arena.write(&ctx.queue, i as u32, &TextModelUniform {
                model: call.transform.to_cols_array_2d(),
            });
        }

        let depth_stencil_attachment = depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("font_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if !self.mesh.bind(&mut pass) {
            return;
        }
        pass.set_bind_group(1, &self.atlas_bind_group, &[]);

        for (i, call) in draw_calls.iter().enumerate() {
            let pipeline = match (depth.is_some(), call.depth_test) {
                (true, true) => &self.depth_test_pipeline,
                (true, false) => &self.depth_off_pipeline,
                (false, _) => &self.overlay_pipeline,
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[UniformArena::offset(i as u32)]);
            pass.draw_indexed(call.first_index..call.first_index + call.index_count, 0, 0..1);
        }
    }

    // ── Glyph-metrics export / import ──────────────────────────────────────

    /// Snapshot the glyph metrics for caching or inspection.
    pub fn export_metrics(&self) -> GlyphMap {
        glyph_map_from_set(&self.glyphs, self.atlas_size, self.spread, self.padding)
    }

    pub fn export_metrics_json(&self) -> Result<String, EmberError> {
        Ok(serde_json::to_string_pretty(&self.export_metrics())?)
    }
}

fn make_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    proj_buffer: &wgpu::Buffer,
    arena: &UniformArena,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("font_uniform_bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: proj_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: arena.binding() },
        ],
    })
}

fn font_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    label: &'static str,
    uniform_bgl: &wgpu::BindGroupLayout,
    atlas_bgl: &wgpu::BindGroupLayout,
    depth_compare: Option<wgpu::CompareFunction>,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("font_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/font.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[uniform_bgl, atlas_bgl],
        ..Default::default()
    });

    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
        1 => Float32x2,  // uv
        2 => Float32x4,  // color
    ];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TextVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &ATTRIBS,
            }],
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
            // Text quads must be visible from both sides of a billboard.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: depth_compare.map(|compare| wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: false,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Flip an image buffer vertically (row order reversed).
fn flip_vertical(data: &[u8], width: usize) -> Vec<u8> {
    data.chunks(width).rev().flatten().copied().collect()
}

// ── Glyph-metrics JSON format ─────────────────────────────────────────────────

/// Serialisable glyph record: code point plus packed-rect and metrics.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RawGlyph {
    /// Unicode code point.
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub raw_width: u32,
    pub raw_height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance: i32,
}

/// Complete glyph-metrics snapshot for one baked atlas.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GlyphMap {
    pub line_height: u32,
    pub atlas_size: u32,
    pub spread: f32,
    pub padding: u32,
    pub glyphs: Vec<RawGlyph>,
}

fn glyph_map_from_set(glyphs: &GlyphSet, atlas_size: u32, spread: f32, padding: u32) -> GlyphMap {
    let mut records: Vec<RawGlyph> = glyphs
        .characters
        .values()
        .map(|ch| RawGlyph {
            id: ch.ch as u32,
            x: ch.pack.x,
            y: ch.pack.y,
            width: ch.pack.w,
            height: ch.pack.h,
            raw_width: ch.size.0,
            raw_height: ch.size.1,
            bearing_x: ch.bearing.0,
            bearing_y: ch.bearing.1,
            advance: ch.advance,
        })
        .collect();
    records.sort_by_key(|g| g.id);

    GlyphMap { line_height: glyphs.line_height, atlas_size, spread, padding, glyphs: records }
}

/// Rebuild a [`GlyphSet`] from exported metrics JSON (the GPU atlas itself
/// is not part of the snapshot).  Code points that are not valid scalar
/// values are skipped.
pub fn glyph_set_from_json(json: &str) -> Result<(GlyphSet, GlyphMap), EmberError> {
    let map: GlyphMap = serde_json::from_str(json)?;

    let mut characters = HashMap::new();
    let mut uvs = HashMap::new();
    for raw in &map.glyphs {
        let Some(ch) = char::from_u32(raw.id) else { continue };
        let pack = PackRect { x: raw.x, y: raw.y, w: raw.width, h: raw.height };
        uvs.insert(ch, CharUv::from_pack(&pack, map.atlas_size));
        characters.insert(ch, Character {
            ch,
            size: (raw.raw_width, raw.raw_height),
            bearing: (raw.bearing_x, raw.bearing_y),
            advance: raw.advance,
            pack,
            atlas_pos: (raw.x + map.padding, raw.y + map.padding),
        });
    }

    let glyphs = GlyphSet { characters, uvs, line_height: map.line_height };
    Ok((glyphs, map))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_covers_windows_1252() {
        let chars = charset();
        // 95 ASCII printables + 96 upper Latin-1 + 27 mapped C1 characters.
        assert_eq!(chars.len(), 95 + 96 + 27);
        assert!(chars.contains(&'A'));
        assert!(chars.contains(&'?'));
        assert!(chars.contains(&'_'));
        assert!(chars.contains(&'€'));
        assert!(chars.contains(&'Ÿ'));
        assert!(chars.contains(&'ÿ'));
        // Characters outside the code page are not enumerated.
        assert!(!chars.contains(&'Ω'));
    }

    #[test]
    fn padding_is_one_and_a_half_spreads() {
        let config = FontConfig::default();
        assert_eq!((config.sdf_spread * 1.5) as u32, 24);
    }

    #[test]
    fn fallbacks_are_part_of_the_charset() {
        let chars = charset();
        assert!(chars.contains(&FALLBACK_2D));
        assert!(chars.contains(&FALLBACK_3D));
    }

    fn sample_map() -> GlyphMap {
        GlyphMap {
            line_height: 105,
            atlas_size: 2048,
            spread: 16.0,
            padding: 24,
            glyphs: vec![
                RawGlyph {
                    id: 'A' as u32,
                    x: 0,
                    y: 0,
                    width: 98,
                    height: 120,
                    raw_width: 50,
                    raw_height: 72,
                    bearing_x: 2,
                    bearing_y: 72,
                    advance: 54,
                },
                RawGlyph {
                    id: 'j' as u32,
                    x: 98,
                    y: 0,
                    width: 70,
                    height: 140,
                    raw_width: 22,
                    raw_height: 92,
                    bearing_x: -4,
                    bearing_y: 72,
                    advance: 24,
                },
            ],
        }
    }

    #[test]
    fn metrics_json_round_trips() {
        let map = sample_map();
        let json = serde_json::to_string(&map).unwrap();
        let (glyphs, reparsed) = glyph_set_from_json(&json).unwrap();
        assert_eq!(reparsed, map);
        assert_eq!(glyphs.characters.len(), 2);
        let a = &glyphs.characters[&'A'];
        assert_eq!(a.size, (50, 72));
        assert_eq!(a.advance, 54);
        assert_eq!(a.atlas_pos, (24, 24));
    }

    #[test]
    fn imported_uvs_match_pack_rects() {
        let json = serde_json::to_string(&sample_map()).unwrap();
        let (glyphs, map) = glyph_set_from_json(&json).unwrap();
        let j = &glyphs.characters[&'j'];
        let uv = &glyphs.uvs[&'j'];
        assert_eq!(uv.u0, j.pack.x as f32 / map.atlas_size as f32);
        assert_eq!(uv.v0, 1.0 - j.pack.y as f32 / map.atlas_size as f32);
        assert!(uv.v1 < uv.v0);
    }

    #[test]
    fn flip_vertical_reverses_rows() {
        let img = vec![
            1, 2, //
            3, 4, //
            5, 6,
        ];
        assert_eq!(flip_vertical(&img, 2), vec![5, 6, 3, 4, 1, 2]);
    }
}
