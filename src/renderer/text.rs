use std::collections::HashMap;

use super::packer::PackRect;

// ── Glyph records ─────────────────────────────────────────────────────────────

/// Metrics and atlas placement for a single character.
///
/// `size`, `bearing` and `advance` come from the rasterizer and never change
/// after creation; `pack` and `atlas_pos` are write-once, filled in when the
/// atlas is packed.
#[derive(Clone, Debug)]
pub struct Character {
    pub ch: char,
    /// Raw bitmap size in pixels (without SDF padding).
    pub size: (u32, u32),
    /// Horizontal/vertical offset from the pen position to the bitmap origin.
    pub bearing: (i32, i32),
    /// Horizontal pen increment in whole pixels.
    pub advance: i32,
    /// Padded rectangle assigned by the packer.
    pub pack: PackRect,
    /// Blit origin inside the atlas (`pack` origin plus padding).
    pub atlas_pos: (u32, u32),
}

/// Normalised atlas rectangle for one character, with the vertical flip
/// already applied: `v0` is the top edge and is the *larger* value
/// (`0 <= u0 < u1 <= 1`, `0 <= v1 < v0 <= 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharUv {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl CharUv {
    /// Derive the UV rectangle from a packed rect and the atlas edge length,
    /// flipping V once so callers never re-flip.
    pub fn from_pack(pack: &PackRect, atlas_size: u32) -> Self {
        let s = atlas_size as f32;
        Self {
            u0: pack.x as f32 / s,
            v0: 1.0 - pack.y as f32 / s,
            u1: (pack.x + pack.w) as f32 / s,
            v1: 1.0 - (pack.y + pack.h) as f32 / s,
        }
    }
}

/// The CPU side of a font atlas: every packed character plus its UVs.
pub struct GlyphSet {
    pub characters: HashMap<char, Character>,
    pub uvs: HashMap<char, CharUv>,
    /// Tallest raw glyph height plus a fixed 5 px gap.
    pub line_height: u32,
}

impl GlyphSet {
    /// Look up `ch`, falling back to `fallback` for unknown characters.
    /// Returns `None` only when the fallback itself is missing.
    pub fn get(&self, ch: char, fallback: char) -> Option<&Character> {
        self.characters.get(&ch).or_else(|| self.characters.get(&fallback))
    }
}

// ── Text mesh generation (pure, GPU-free) ─────────────────────────────────────

/// One text-quad vertex: position, atlas UV, RGBA color.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Horizontal anchoring of each text line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Fallback glyph for the screen-space text path.
pub const FALLBACK_2D: char = '?';
/// Fallback glyph for the world-space text path.
pub const FALLBACK_3D: char = '_';

/// Per-glyph depth offset: glyph `i` within its line sits at `z = i * step`,
/// keeping overlapping quads at stable, distinct depths.
const GLYPH_Z_STEP: f32 = 1e-3;

/// Sum of scaled advances for one line.  `\n`/`\r` contribute zero; unknown
/// characters measure as `'?'` (whitespace still occupies its advance).
pub fn measure_line(glyphs: &GlyphSet, text: &str, scale: f32) -> f32 {
    text.chars()
        .filter(|c| !matches!(c, '\n' | '\r'))
        .filter_map(|c| glyphs.get(c, FALLBACK_2D))
        .map(|ch| ch.advance as f32 * scale)
        .sum()
}

/// Build the quad mesh for `text` anchored at `(x, y)`.
///
/// One quad per non-whitespace character, sized by the glyph's *packed*
/// rectangle so the SDF padding is part of the rendered quad; the pen
/// advances for every character, whitespace included.  Lines split on `\n`
/// and step down by the scaled line height; each line is offset left by
/// 0 / half / full measured width according to `align`.
///
/// `flip_y` selects the world-space (Y-up) vertex arrangement used by the
/// 3D path.  Indices are relative to the returned vertex list; batch callers
/// add their own base.
#[allow(clippy::too_many_arguments)]
pub fn generate_text_mesh(
    glyphs: &GlyphSet,
    text: &str,
    x: f32,
    y: f32,
    scale: f32,
    color: [f32; 4],
    align: Align,
    flip_y: bool,
    fallback: char,
) -> (Vec<TextVertex>, Vec<u32>) {
    let mut vertices: Vec<TextVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let line_height = glyphs.line_height as f32 * scale;
    let mut ty = y;

    for line in text.split('\n') {
        let ox = match align {
            Align::Left => 0.0,
            Align::Center => measure_line(glyphs, line, scale) / 2.0,
            Align::Right => measure_line(glyphs, line, scale),
        };

        let mut tx = x;
        for (index, c) in line.chars().enumerate() {
            let Some(ch) = glyphs.get(c, fallback) else { continue };

            if !c.is_whitespace() {
                push_char_quad(&mut vertices, &mut indices, glyphs, ch, index, tx - ox, ty, scale, color, flip_y);
            }

            tx += ch.advance as f32 * scale;
        }

        ty += line_height;
    }

    (vertices, indices)
}

#[allow(clippy::too_many_arguments)]
fn push_char_quad(
    vertices: &mut Vec<TextVertex>,
    indices: &mut Vec<u32>,
    glyphs: &GlyphSet,
    ch: &Character,
    char_index: usize,
    x: f32,
    y: f32,
    scale: f32,
    color: [f32; 4],
    flip_y: bool,
) {
    let Some(uv) = glyphs.uvs.get(&ch.ch) else { return };

    let w = ch.pack.w as f32 * scale;
    let h = ch.pack.h as f32 * scale;
    // The packed rect is taller than the raw bitmap by 2x padding; pull the
    // quad up so the padded bitmap still lines up with the baseline.
    let bearing_gap = (ch.size.1 as f32 - ch.pack.h as f32) * scale;

    let xpos = x + ch.bearing.0 as f32 * scale;
    let ypos = if flip_y {
        y + bearing_gap
    } else {
        (y - ch.bearing.1 as f32 * scale) + bearing_gap
    };

    let (top_h, bot_h) = if flip_y { (h, 0.0) } else { (0.0, h) };
    let z = char_index as f32 * GLYPH_Z_STEP;

    let base = vertices.len() as u32;
    vertices.push(TextVertex { position: [xpos, ypos + top_h, z], uv: [uv.u0, uv.v0], color });
    vertices.push(TextVertex { position: [xpos + w, ypos + top_h, z], uv: [uv.u1, uv.v0], color });
    vertices.push(TextVertex { position: [xpos + w, ypos + bot_h, z], uv: [uv.u1, uv.v1], color });
    vertices.push(TextVertex { position: [xpos, ypos + bot_h, z], uv: [uv.u0, uv.v1], color });
    indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic glyph set: 'A' and 'B' with distinct metrics plus the two
    /// fallback glyphs, padding 4 on each side (pack = raw + 8).
    fn make_glyphs() -> GlyphSet {
        let mut characters = HashMap::new();
        let mut uvs = HashMap::new();
        let mut add = |ch: char, w: u32, h: u32, advance: i32, px: u32, py: u32| {
            let pack = PackRect { x: px, y: py, w: w + 8, h: h + 8 };
            uvs.insert(ch, CharUv::from_pack(&pack, 256));
            characters.insert(ch, Character {
                ch,
                size: (w, h),
                bearing: (1, h as i32),
                advance,
                pack,
                atlas_pos: (px + 4, py + 4),
            });
        };
        add('A', 14, 20, 16, 0, 0);
        add('B', 13, 20, 15, 40, 0);
        add('?', 10, 20, 12, 80, 0);
        add('_', 12, 4, 14, 120, 0);
        GlyphSet { characters, uvs, line_height: 25 }
    }

    // ── UV validity ───────────────────────────────────────────────────────

    #[test]
    fn uvs_are_flipped_and_ordered() {
        let g = make_glyphs();
        for (ch, uv) in &g.uvs {
            assert!(0.0 <= uv.u0 && uv.u0 < uv.u1 && uv.u1 <= 1.0, "{ch}: {uv:?}");
            assert!(0.0 <= uv.v1 && uv.v1 < uv.v0 && uv.v0 <= 1.0, "{ch}: {uv:?}");
        }
    }

    #[test]
    fn uv_rect_area_matches_packed_rect() {
        let g = make_glyphs();
        let a = &g.characters[&'A'];
        let uv = &g.uvs[&'A'];
        let px_w = (uv.u1 - uv.u0) * 256.0;
        let px_h = (uv.v0 - uv.v1) * 256.0;
        assert!((px_w - a.pack.w as f32).abs() < 1e-4);
        assert!((px_h - a.pack.h as f32).abs() < 1e-4);
    }

    // ── measuring ─────────────────────────────────────────────────────────

    #[test]
    fn measure_sums_scaled_advances() {
        let g = make_glyphs();
        assert_eq!(measure_line(&g, "AB", 1.0), 31.0);
        assert_eq!(measure_line(&g, "AB", 2.0), 62.0);
    }

    #[test]
    fn measure_skips_newline_and_carriage_return() {
        let g = make_glyphs();
        assert_eq!(measure_line(&g, "A\r\nB", 1.0), 31.0);
    }

    #[test]
    fn measure_uses_question_mark_for_unknown() {
        let g = make_glyphs();
        // 'Z' is unknown → measured as '?' (advance 12).
        assert_eq!(measure_line(&g, "Z", 1.0), 12.0);
    }

    // ── mesh generation ───────────────────────────────────────────────────

    #[test]
    fn one_quad_per_visible_character() {
        let g = make_glyphs();
        let (v, i) = generate_text_mesh(&g, "AB", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        assert_eq!(v.len(), 8);
        assert_eq!(i.len(), 12);
    }

    #[test]
    fn whitespace_advances_pen_without_quads() {
        let g = make_glyphs();
        let (spaced, _) = generate_text_mesh(&g, "A B", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        let (tight, _) = generate_text_mesh(&g, "AB", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        // Same quad count, but the space shifted 'B' right by the fallback advance.
        assert_eq!(spaced.len(), tight.len());
        let spaced_b_x = spaced[4].position[0];
        let tight_b_x = tight[4].position[0];
        assert_eq!(spaced_b_x - tight_b_x, 12.0);
    }

    #[test]
    fn newline_steps_down_one_line_height() {
        let g = make_glyphs();
        let (v, _) = generate_text_mesh(&g, "A\nA", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        assert_eq!(v.len(), 8);
        let dy = v[4].position[1] - v[0].position[1];
        assert_eq!(dy, 25.0);
        // Both lines restart at the same x.
        assert_eq!(v[4].position[0], v[0].position[0]);
    }

    #[test]
    fn unknown_character_uses_path_fallback() {
        let g = make_glyphs();
        let (v2d, _) = generate_text_mesh(&g, "Z", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        let (v3d, _) = generate_text_mesh(&g, "Z", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, true, FALLBACK_3D);
        // '?' pack is 18 wide, '_' pack is 20 wide.
        assert_eq!(v2d[1].position[0] - v2d[0].position[0], 18.0);
        assert_eq!(v3d[1].position[0] - v3d[0].position[0], 20.0);
    }

    // ── alignment ─────────────────────────────────────────────────────────

    #[test]
    fn right_aligned_line_ends_at_anchor() {
        let g = make_glyphs();
        let anchor = 100.0;
        let (v, _) = generate_text_mesh(&g, "AB", anchor, 0.0, 1.0, [1.0; 4], Align::Right, false, FALLBACK_2D);
        let total = measure_line(&g, "AB", 1.0);
        // First quad starts at anchor - total + bearing.
        assert_eq!(v[0].position[0], anchor - total + 1.0);
    }

    #[test]
    fn center_aligned_line_straddles_anchor() {
        let g = make_glyphs();
        let anchor = 100.0;
        let (v, _) = generate_text_mesh(&g, "AB", anchor, 0.0, 1.0, [1.0; 4], Align::Center, false, FALLBACK_2D);
        let total = measure_line(&g, "AB", 1.0);
        assert_eq!(v[0].position[0], anchor - total / 2.0 + 1.0);
    }

    #[test]
    fn left_aligned_line_starts_at_anchor() {
        let g = make_glyphs();
        let (v, _) = generate_text_mesh(&g, "AB", 50.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
        assert_eq!(v[0].position[0], 51.0);
    }

    // ── determinism / idempotence ─────────────────────────────────────────

    #[test]
    fn identical_calls_produce_identical_geometry() {
        let g = make_glyphs();
        let (v1, i1) = generate_text_mesh(&g, "AB\nBA", 3.0, 7.0, 1.5, [1.0, 0.5, 0.2, 1.0], Align::Center, false, FALLBACK_2D);
        let (v2, i2) = generate_text_mesh(&g, "AB\nBA", 3.0, 7.0, 1.5, [1.0, 0.5, 0.2, 1.0], Align::Center, false, FALLBACK_2D);
        assert_eq!(v1, v2);
        assert_eq!(i1, i2);
    }

    #[test]
    fn glyph_depth_offsets_are_stable_per_index() {
        let g = make_glyphs();
        let (v, _) = generate_text_mesh(&g, "ABA", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, true, FALLBACK_3D);
        assert_eq!(v[0].position[2], 0.0);
        assert_eq!(v[4].position[2], 1e-3);
        assert_eq!(v[8].position[2], 2e-3);
    }
}
