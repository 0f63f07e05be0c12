// ── Atlas packing behaviour through the public API ───────────────────────────

use ember::EmberError;
use ember::renderer::packer::{PackRect, pack};

fn rects(sizes: &[(u32, u32)]) -> Vec<PackRect> {
    sizes.iter().map(|&(w, h)| PackRect::new(w, h)).collect()
}

fn assert_valid(rects: &[PackRect], bin_w: u32, bin_h: u32) {
    for (i, a) in rects.iter().enumerate() {
        assert!(a.x + a.w <= bin_w && a.y + a.h <= bin_h, "{a:?} out of bounds");
        for b in rects.iter().skip(i + 1) {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn spec_scenario_three_rects_in_40x40() {
    // (10,20), (10,10), (30,5) into a (40,40) bin: all placed, no overlap,
    // capacity respected.
    let mut r = rects(&[(10, 20), (10, 10), (30, 5)]);
    pack(40, 40, &mut r).unwrap();
    assert_valid(&r, 40, 40);
}

#[test]
fn glyph_like_workload_packs_validly() {
    // Heights vary widely, widths are comparatively uniform — the shape the
    // tallest-first heuristic is tuned for.
    let sizes: Vec<(u32, u32)> = (0..120)
        .map(|i| (20 + (i * 7) % 18, 10 + (i * 13) % 60))
        .collect();
    let mut r = rects(&sizes);
    let bound = pack(512, 512, &mut r).unwrap();
    assert_valid(&r, 512, 512);
    assert!(bound.is_power_of_two());
}

#[test]
fn packing_is_deterministic_across_runs() {
    let sizes: Vec<(u32, u32)> = (0..60).map(|i| (4 + i % 11, 4 + (i * 3) % 17)).collect();
    let mut a = rects(&sizes);
    let mut b = rects(&sizes);
    pack(256, 256, &mut a).unwrap();
    pack(256, 256, &mut b).unwrap();
    assert_eq!(a, b, "same input must give identical placements");
}

#[test]
fn overflow_is_a_hard_error_not_a_silent_origin_rect() {
    let mut r = rects(&[(40, 40), (40, 40)]);
    let err = pack(64, 64, &mut r).unwrap_err();
    assert!(matches!(err, EmberError::PackingOverflow { .. }));
    // The error carries the offending size.
    if let EmberError::PackingOverflow { width, height } = err {
        assert_eq!((width, height), (40, 40));
    }
}

#[test]
fn free_space_is_never_double_booked() {
    // Tile the bin to exactly its area; any double booking would force an
    // overlap, any lost free space an overflow.
    let mut r = rects(&vec![(16, 16); 16]);
    pack(64, 64, &mut r).unwrap();
    assert_valid(&r, 64, 64);
    let area: u32 = r.iter().map(|p| p.w * p.h).sum();
    assert_eq!(area, 64 * 64);
}
