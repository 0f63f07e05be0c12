// ── Text layout behaviour through the public API ─────────────────────────────

use std::collections::HashMap;

use ember::renderer::packer::PackRect;
use ember::renderer::text::{
    Align, CharUv, Character, FALLBACK_2D, GlyphSet, generate_text_mesh, measure_line,
};

const ATLAS: u32 = 512;
const PAD: u32 = 6;

/// Build a glyph set with uniform metrics: every glyph 10 wide, 20 tall,
/// advance 12, packed left to right along the top of the atlas.
fn uniform_glyphs(chars: &str) -> GlyphSet {
    let mut characters = HashMap::new();
    let mut uvs = HashMap::new();
    for (i, ch) in chars.chars().enumerate() {
        let pack = PackRect {
            x: i as u32 * 40,
            y: 0,
            w: 10 + PAD * 2,
            h: 20 + PAD * 2,
        };
        uvs.insert(ch, CharUv::from_pack(&pack, ATLAS));
        characters.insert(ch, Character {
            ch,
            size: (10, 20),
            bearing: (0, 20),
            advance: 12,
            pack,
            atlas_pos: (pack.x + PAD, pack.y + PAD),
        });
    }
    GlyphSet { characters, uvs, line_height: 25 }
}

#[test]
fn right_alignment_left_edge_is_anchor_minus_total_advance() {
    let g = uniform_glyphs("abc?_");
    let (v, _) = generate_text_mesh(&g, "abc", 200.0, 0.0, 1.0, [1.0; 4], Align::Right, false, FALLBACK_2D);
    // Three glyphs, advance 12 each, zero bearing: left edge = 200 - 36.
    assert_eq!(v[0].position[0], 200.0 - 36.0);
}

#[test]
fn center_alignment_is_half_the_right_offset() {
    let g = uniform_glyphs("abc?_");
    let (left, _) = generate_text_mesh(&g, "abc", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
    let (center, _) = generate_text_mesh(&g, "abc", 0.0, 0.0, 1.0, [1.0; 4], Align::Center, false, FALLBACK_2D);
    assert_eq!(left[0].position[0] - center[0].position[0], 18.0);
}

#[test]
fn drawing_twice_offsets_only_index_base() {
    // Two identical generations are byte-identical; a batcher reuses them by
    // re-basing indices only.
    let g = uniform_glyphs("hi?_");
    let (v1, i1) = generate_text_mesh(&g, "hi", 5.0, 9.0, 2.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
    let (v2, i2) = generate_text_mesh(&g, "hi", 5.0, 9.0, 2.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
    assert_eq!(v1, v2);
    assert_eq!(i1, i2);

    let base = v1.len() as u32;
    let rebased: Vec<u32> = i2.iter().map(|i| i + base).collect();
    for (a, b) in i1.iter().zip(&rebased) {
        assert_eq!(b - a, base);
    }
}

#[test]
fn quads_use_packed_size_not_raw_bitmap_size() {
    let g = uniform_glyphs("x?_");
    let (v, _) = generate_text_mesh(&g, "x", 0.0, 0.0, 1.0, [1.0; 4], Align::Left, false, FALLBACK_2D);
    let w = v[1].position[0] - v[0].position[0];
    let h = v[3].position[1] - v[0].position[1];
    // Padded 10+12 x 20+12, not the raw 10 x 20 — the quad must cover the
    // SDF margin.
    assert_eq!(w, 22.0);
    assert_eq!(h, 32.0);
}

#[test]
fn uv_rectangles_stay_normalised_after_v_flip() {
    let g = uniform_glyphs("abcdefgh?_");
    for (ch, uv) in &g.uvs {
        assert!(uv.u0 >= 0.0 && uv.u1 <= 1.0 && uv.u0 < uv.u1, "{ch}");
        assert!(uv.v1 >= 0.0 && uv.v0 <= 1.0 && uv.v1 < uv.v0, "{ch}");
        // Pixel-space area round-trips through the flip.
        let c = &g.characters[ch];
        let w_px = (uv.u1 - uv.u0) * ATLAS as f32;
        let h_px = (uv.v0 - uv.v1) * ATLAS as f32;
        assert!((w_px - c.pack.w as f32).abs() < 1e-3);
        assert!((h_px - c.pack.h as f32).abs() < 1e-3);
    }
}

#[test]
fn measure_ignores_line_breaks_but_counts_spaces() {
    let g = uniform_glyphs("ab ?_");
    // Space emits no quad but still occupies its advance; '\n' contributes
    // nothing to the measured width.
    assert_eq!(measure_line(&g, "a b", 1.0), 36.0);
    assert_eq!(measure_line(&g, "a\nb", 1.0), 24.0);
}

#[test]
fn multiline_center_aligns_each_line_independently() {
    let g = uniform_glyphs("aabb?_");
    let (v, _) = generate_text_mesh(&g, "a\nbbb", 100.0, 0.0, 1.0, [1.0; 4], Align::Center, false, FALLBACK_2D);
    // Line 1: one glyph (advance 12) → starts at 100 - 6.
    assert_eq!(v[0].position[0], 94.0);
    // Line 2: three glyphs (36) → starts at 100 - 18.
    assert_eq!(v[4].position[0], 82.0);
}
