// ── Font atlas metadata behaviour (GPU-free paths) ───────────────────────────

use ember::renderer::font::{GlyphMap, RawGlyph, charset, glyph_set_from_json};
use ember::renderer::text::{FALLBACK_2D, FALLBACK_3D};

#[test]
fn charset_is_the_windows_1252_page() {
    let chars = charset();
    assert_eq!(chars.len(), 218);
    // The full printable ASCII range is present…
    for c in ' '..='~' {
        assert!(chars.contains(&c), "missing {c:?}");
    }
    // …and the C1-mapped typographic characters.
    for c in ['€', '™', '—', '‘', '’', 'œ', 'Ž'] {
        assert!(chars.contains(&c), "missing {c:?}");
    }
    // Both draw-path fallbacks are guaranteed renderable.
    assert!(chars.contains(&FALLBACK_2D));
    assert!(chars.contains(&FALLBACK_3D));
}

#[test]
fn charset_enumeration_is_deterministic() {
    assert_eq!(charset(), charset());
}

fn sample_map() -> GlyphMap {
    GlyphMap {
        line_height: 101,
        atlas_size: 1024,
        spread: 8.0,
        padding: 12,
        glyphs: vec![
            RawGlyph {
                id: '?' as u32,
                x: 0,
                y: 0,
                width: 64,
                height: 96,
                raw_width: 40,
                raw_height: 72,
                bearing_x: 3,
                bearing_y: 70,
                advance: 44,
            },
            RawGlyph {
                id: '_' as u32,
                x: 64,
                y: 0,
                width: 80,
                height: 40,
                raw_width: 56,
                raw_height: 16,
                bearing_x: -2,
                bearing_y: -4,
                advance: 52,
            },
        ],
    }
}

#[test]
fn metrics_json_rebuilds_an_equivalent_glyph_set() {
    let map = sample_map();
    let json = serde_json::to_string(&map).unwrap();
    let (glyphs, reparsed) = glyph_set_from_json(&json).unwrap();

    assert_eq!(reparsed, map);
    assert_eq!(glyphs.line_height, 101);

    let q = &glyphs.characters[&'?'];
    assert_eq!(q.pack.w, 64);
    assert_eq!(q.size, (40, 72));
    assert_eq!(q.bearing, (3, 70));
    // Blit origin is the packed origin plus the SDF padding.
    assert_eq!(q.atlas_pos, (12, 12));
}

#[test]
fn rebuilt_uvs_cover_the_packed_rects() {
    let json = serde_json::to_string(&sample_map()).unwrap();
    let (glyphs, map) = glyph_set_from_json(&json).unwrap();
    for (ch, uv) in &glyphs.uvs {
        let c = &glyphs.characters[ch];
        let s = map.atlas_size as f32;
        assert_eq!(uv.u0, c.pack.x as f32 / s);
        assert_eq!(uv.u1, (c.pack.x + c.pack.w) as f32 / s);
        assert_eq!(uv.v0, 1.0 - c.pack.y as f32 / s);
        assert_eq!(uv.v1, 1.0 - (c.pack.y + c.pack.h) as f32 / s);
    }
}

#[test]
fn malformed_metrics_json_is_rejected() {
    assert!(glyph_set_from_json("{not json").is_err());
    assert!(glyph_set_from_json("{}").is_err());
}
