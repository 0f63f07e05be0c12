use thiserror::Error;

/// Failure modes of the rendering core.
///
/// Construction-time errors (font parsing, atlas packing) are unrecoverable
/// and expected to abort initialisation; the per-frame surface only fails on
/// precondition violations such as drawing text outside a batch scope.
#[derive(Debug, Error)]
pub enum EmberError {
    /// A texture attached to a [`RenderTarget`](crate::renderer::target::RenderTarget)
    /// does not match the target's fixed size.
    #[error("texture size {got_w}x{got_h} does not match render target size {want_w}x{want_h}")]
    DimensionMismatch {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },

    /// A glyph rectangle did not fit any free region during atlas packing.
    /// Surfaced as a hard failure at atlas-build time — a partially packed
    /// atlas would render overlapping glyphs.
    #[error("rectangle {width}x{height} does not fit any free atlas region")]
    PackingOverflow { width: u32, height: u32 },

    /// `draw` / `draw_3d` was called without an active
    /// `begin_drawing` / `end_drawing` scope.
    #[error("text drawn outside a begin_drawing/end_drawing scope")]
    DrawOutsideBatch,

    /// The font file could not be parsed by the rasterizer.
    #[error("font parse failed: {0}")]
    FontParse(&'static str),

    /// A cubemap face folder was missing, mismatched or unreadable.
    #[error("cubemap load failed: {0}")]
    CubemapLoad(String),

    /// Glyph-metrics JSON could not be (de)serialised.
    #[error(transparent)]
    MetricsJson(#[from] serde_json::Error),
}
