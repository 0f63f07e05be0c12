use std::path::Path;

use crate::error::EmberError;

use super::RenderContext;

// ── Texture2D ─────────────────────────────────────────────────────────────────

/// A 2D GPU texture plus its default view.
pub struct Texture2D {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
    pub format: wgpu::TextureFormat,
}

impl Texture2D {
    pub fn new(
        ctx: &RenderContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        mip_level_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, size: (width, height), format }
    }

    /// Texture usable as a framebuffer color attachment and sampled later.
    pub fn render_attachment(
        ctx: &RenderContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self::new(
            ctx,
            label,
            width,
            height,
            format,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Depth (or combined depth/stencil) attachment, also sampleable.
    pub fn depth_attachment(
        ctx: &RenderContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self::new(
            ctx,
            label,
            width,
            height,
            format,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Upload pixel data for a single mip level.
    pub fn write_mip(&self, ctx: &RenderContext, mip: u32, data: &[u8], bytes_per_pixel: u32) {
        let w = (self.size.0 >> mip).max(1);
        let h = (self.size.1 >> mip).max(1);
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: mip,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * bytes_per_pixel),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
    }

    /// Upload base-level pixel data.
    pub fn update(&self, ctx: &RenderContext, data: &[u8], bytes_per_pixel: u32) {
        self.write_mip(ctx, 0, data, bytes_per_pixel);
    }
}

// ── CPU mip chain ─────────────────────────────────────────────────────────────

/// Number of mip levels for a `width` × `height` texture down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Full single-channel mip chain (level 0 included), 2×2 box filter.
/// Odd dimensions clamp the second sample to the last row/column.
pub fn mip_chain_r8(base: &[u8], width: u32, height: u32) -> Vec<Vec<u8>> {
    assert_eq!(base.len(), (width * height) as usize);

    let mut chain = vec![base.to_vec()];
    let (mut w, mut h) = (width, height);

    while w > 1 || h > 1 {
        let nw = (w / 2).max(1);
        let nh = (h / 2).max(1);
        let prev = chain.last().unwrap();
        let mut level = vec![0u8; (nw * nh) as usize];

        for y in 0..nh {
            for x in 0..nw {
                let x0 = (x * 2).min(w - 1);
                let x1 = (x * 2 + 1).min(w - 1);
                let y0 = (y * 2).min(h - 1);
                let y1 = (y * 2 + 1).min(h - 1);
                let sum = prev[(y0 * w + x0) as usize] as u32
                    + prev[(y0 * w + x1) as usize] as u32
                    + prev[(y1 * w + x0) as usize] as u32
                    + prev[(y1 * w + x1) as usize] as u32;
                level[(y * nw + x) as usize] = (sum / 4) as u8;
            }
        }

        chain.push(level);
        w = nw;
        h = nh;
    }

    chain
}

// ── Samplers ──────────────────────────────────────────────────────────────────

pub fn linear_clamp_sampler(ctx: &RenderContext) -> wgpu::Sampler {
    ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("linear_clamp"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

pub fn nearest_clamp_sampler(ctx: &RenderContext) -> wgpu::Sampler {
    ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("nearest_clamp"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

// ── TextureCubeMap ────────────────────────────────────────────────────────────

/// Face order follows the cubemap layer convention: +X, -X, +Y, -Y, +Z, -Z.
const FACE_STEMS: [&[&str]; 6] = [
    &["px", "posx", "right"],
    &["nx", "negx", "left"],
    &["py", "posy", "top"],
    &["ny", "negy", "bottom"],
    &["pz", "posz", "front"],
    &["nz", "negz", "back"],
];

/// Six-layer cube texture (`Rgba8Unorm`), sampled through a cube view.
pub struct TextureCubeMap {
    pub texture: wgpu::Texture,
    /// Cube view over every face and mip.
    pub view: wgpu::TextureView,
    pub size: u32,
    pub mip_level_count: u32,
}

impl TextureCubeMap {
    pub fn new(
        ctx: &RenderContext,
        label: &str,
        size: u32,
        mip_level_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: 6 },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view, size, mip_level_count }
    }

    /// Cubemap writable from a compute shader (used by the prefilter pass).
    pub fn storage(ctx: &RenderContext, label: &str, size: u32, mip_level_count: u32) -> Self {
        Self::new(
            ctx,
            label,
            size,
            mip_level_count,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING,
        )
    }

    /// 1×1 black placeholder used before an environment map is assigned.
    pub fn black(ctx: &RenderContext) -> Self {
        let cube = Self::new(
            ctx,
            "cubemap_black",
            1,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        for face in 0..6 {
            cube.update_face(ctx, face, &[0, 0, 0, 255]);
        }
        cube
    }

    /// Upload RGBA pixel data for one face (base mip).
    pub fn update_face(&self, ctx: &RenderContext, face: u32, rgba: &[u8]) {
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: face },
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size * 4),
                rows_per_image: Some(self.size),
            },
            wgpu::Extent3d { width: self.size, height: self.size, depth_or_array_layers: 1 },
        );
    }

    /// A single-mip array view — the storage binding a compute pass writes
    /// one roughness level through.
    pub fn mip_storage_view(&self, mip: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cubemap_mip"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            base_mip_level: mip,
            mip_level_count: Some(1),
            ..Default::default()
        })
    }

    /// Load six face images from a folder scanned recursively.
    ///
    /// Face files are matched by stem: `px`/`nx`/`py`/`ny`/`pz`/`nz` (also
    /// `posx`… and `right`/`left`/`top`/`bottom`/`front`/`back`).  All faces
    /// must be square and equally sized.
    pub fn load_folder(ctx: &RenderContext, path: impl AsRef<Path>) -> Result<Self, EmberError> {
        let mut faces: [Option<image::RgbaImage>; 6] = Default::default();

        for entry in walkdir::WalkDir::new(path.as_ref())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_path = entry.path();
            let Some(stem) = file_path.file_stem().and_then(|s| s.to_str()) else { continue };
            let stem = stem.to_ascii_lowercase();

            let Some(face) = FACE_STEMS.iter().position(|names| names.contains(&stem.as_str())) else {
                continue;
            };
            if faces[face].is_some() {
                continue;
            }

            let img = image::open(file_path)
                .map_err(|e| EmberError::CubemapLoad(format!("{file_path:?}: {e}")))?;
            faces[face] = Some(img.to_rgba8());
        }

        let first = faces[0]
            .as_ref()
            .ok_or_else(|| EmberError::CubemapLoad("missing +X face".into()))?;
        let size = first.width();
        if first.height() != size {
            return Err(EmberError::CubemapLoad(format!(
                "faces must be square, got {}x{}",
                first.width(),
                first.height()
            )));
        }

        let cube = Self::new(
            ctx,
            "cubemap",
            size,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );

        for (i, face) in faces.iter().enumerate() {
            let img = face
                .as_ref()
                .ok_or_else(|| EmberError::CubemapLoad(format!("missing face {i}")))?;
            if img.width() != size || img.height() != size {
                return Err(EmberError::CubemapLoad(format!(
                    "face {i} is {}x{}, expected {size}x{size}",
                    img.width(),
                    img.height()
                )));
            }
            cube.update_face(ctx, i as u32, img.as_raw());
        }

        Ok(cube)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_covers_down_to_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(2048, 2048), 12);
        assert_eq!(mip_level_count(256, 64), 9);
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let base = vec![128u8; 8 * 8];
        let chain = mip_chain_r8(&base, 8, 8);
        assert_eq!(chain.len(), 4); // 8, 4, 2, 1
        assert_eq!(chain[1].len(), 16);
        assert_eq!(chain[2].len(), 4);
        assert_eq!(chain[3].len(), 1);
    }

    #[test]
    fn mip_chain_box_filter_averages() {
        // 2x2 block of 0/0/255/255 averages to 127.
        let base = vec![0, 0, 255, 255];
        let chain = mip_chain_r8(&base, 2, 2);
        assert_eq!(chain[1], vec![127]);
    }

    #[test]
    fn mip_chain_constant_image_stays_constant() {
        let base = vec![200u8; 16 * 16];
        for level in mip_chain_r8(&base, 16, 16) {
            assert!(level.iter().all(|&v| v == 200));
        }
    }

    #[test]
    fn mip_chain_length_matches_mip_level_count() {
        let base = vec![0u8; 32 * 32];
        assert_eq!(mip_chain_r8(&base, 32, 32).len() as u32, mip_level_count(32, 32));
    }
}
