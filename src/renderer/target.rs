use crate::error::EmberError;

use super::RenderContext;
use super::texture::Texture2D;

// ── RenderTarget ──────────────────────────────────────────────────────────────

/// A multi-attachment off-screen framebuffer with a fixed size.
///
/// Color attachments accumulate in call order; depth and stencil are
/// singletons (re-adding replaces).  Binding is scoped: `begin_pass` returns
/// a render pass targeting every attachment, and the pass ends when the
/// guard drops — there is no global framebuffer state to save or restore,
/// and a second bind before the first ends is a borrow error rather than a
/// caller obligation.
pub struct RenderTarget {
    width: u32,
    height: u32,
    color_attachments: Vec<Texture2D>,
    depth_attachment: Option<Texture2D>,
    has_depth: bool,
    has_stencil: bool,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_attachments: Vec::new(),
            depth_attachment: None,
            has_depth: false,
            has_stencil: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Append a color attachment created at the target's size.
    pub fn add_color_attachment(&mut self, ctx: &RenderContext, format: wgpu::TextureFormat) {
        let index = self.color_attachments.len();
        let label = match index {
            0 => "target_color0",
            1 => "target_color1",
            2 => "target_color2",
            _ => "target_color",
        };
        self.color_attachments
            .push(Texture2D::render_attachment(ctx, label, self.width, self.height, format));
    }

    /// Append an explicitly-provided texture as a color attachment.
    /// Fails when its size differs from the target's fixed size.
    pub fn attach_color_texture(&mut self, texture: Texture2D) -> Result<(), EmberError> {
        if texture.size != (self.width, self.height) {
            return Err(EmberError::DimensionMismatch {
                got_w: texture.size.0,
                got_h: texture.size.1,
                want_w: self.width,
                want_h: self.height,
            });
        }
        self.color_attachments.push(texture);
        Ok(())
    }

    /// Add (or replace) the depth attachment.
    pub fn add_depth_attachment(&mut self, ctx: &RenderContext) {
        self.has_depth = true;
        self.rebuild_depth(ctx);
    }

    /// Add (or replace) the stencil attachment.  wgpu couples depth and
    /// stencil into a single texture, so requesting both yields one
    /// `Depth24PlusStencil8` attachment.
    pub fn add_stencil_attachment(&mut self, ctx: &RenderContext) {
        self.has_stencil = true;
        self.rebuild_depth(ctx);
    }

    fn rebuild_depth(&mut self, ctx: &RenderContext) {
        let format = self.depth_stencil_format().unwrap();
        self.depth_attachment = Some(Texture2D::depth_attachment(
            ctx,
            "target_depth",
            self.width,
            self.height,
            format,
        ));
    }

    /// Format of the depth/stencil attachment, if any was added.
    pub fn depth_stencil_format(&self) -> Option<wgpu::TextureFormat> {
        match (self.has_depth, self.has_stencil) {
            (_, true) => Some(wgpu::TextureFormat::Depth24PlusStencil8),
            (true, false) => Some(wgpu::TextureFormat::Depth32Float),
            (false, false) => None,
        }
    }

    pub fn colors(&self) -> &[Texture2D] {
        &self.color_attachments
    }

    pub fn color(&self, index: usize) -> &Texture2D {
        &self.color_attachments[index]
    }

    pub fn depth(&self) -> Option<&Texture2D> {
        self.depth_attachment.as_ref()
    }

    /// Begin a render pass over every attachment.
    ///
    /// `clear` clears all color attachments to the given color and depth to
    /// 1.0; `None` loads the previous contents.  The returned pass borrows
    /// `encoder` and unbinds on drop.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        clear: Option<wgpu::Color>,
    ) -> wgpu::RenderPass<'e> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
            .color_attachments
            .iter()
            .map(|tex| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &tex.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: match clear {
                            Some(c) => wgpu::LoadOp::Clear(c),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let depth_stencil_attachment = self.depth_attachment.as_ref().map(|tex| {
            wgpu::RenderPassDepthStencilAttachment {
                view: &tex.view,
                depth_ops: Some(wgpu::Operations {
                    load: match clear {
                        Some(_) => wgpu::LoadOp::Clear(1.0),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: self.has_stencil.then_some(wgpu::Operations {
                    load: match clear {
                        Some(_) => wgpu::LoadOp::Clear(0),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
            }
        });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_format_tracks_attachment_requests() {
        let mut t = RenderTarget::new(64, 64);
        assert_eq!(t.depth_stencil_format(), None);
        t.has_depth = true;
        assert_eq!(t.depth_stencil_format(), Some(wgpu::TextureFormat::Depth32Float));
        t.has_stencil = true;
        assert_eq!(t.depth_stencil_format(), Some(wgpu::TextureFormat::Depth24PlusStencil8));
    }

    #[test]
    fn new_target_has_no_attachments() {
        let t = RenderTarget::new(128, 32);
        assert!(t.colors().is_empty());
        assert!(t.depth().is_none());
        assert_eq!(t.size(), (128, 32));
    }
}
