// ── SDF synthesis behaviour through the public API ───────────────────────────

use ember::renderer::sdf::synthesize;

fn disc(size: usize, cx: f32, cy: f32, radius: f32) -> Vec<u8> {
    let mut b = vec![0u8; size * size];
    for y in 0..size {
        for x in 0..size {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if d <= radius {
                b[y * size + x] = 255;
            }
        }
    }
    b
}

#[test]
fn disc_centre_saturates_inside_and_corners_outside() {
    let b = disc(64, 32.0, 32.0, 20.0);
    let sdf = synthesize(&b, 64, 64, 8.0);
    assert_eq!(sdf[32 * 64 + 32], 255, "centre is > spread inside");
    assert_eq!(sdf[0], 0, "corner is > spread outside");
}

#[test]
fn midpoint_threshold_recovers_the_disc() {
    let b = disc(48, 24.0, 24.0, 14.0);
    let sdf = synthesize(&b, 48, 48, 6.0);
    for i in 0..b.len() {
        assert_eq!(sdf[i] > 127, b[i] > 127, "pixel {i}");
    }
}

#[test]
fn spread_one_degenerates_to_binary() {
    // At spread 1 every pixel is either fully inside (255) or outside (0).
    let b = disc(32, 16.0, 16.0, 9.0);
    let sdf = synthesize(&b, 32, 32, 1.0);
    assert!(sdf.iter().all(|&v| v == 0 || v == 255));
}

#[test]
fn values_grade_across_the_boundary() {
    let b = disc(64, 32.0, 32.0, 16.0);
    let sdf = synthesize(&b, 64, 64, 8.0);
    // Walking a horizontal ray outward from the centre must cross a graded
    // band: saturated inside, intermediate values near the edge, zero far
    // outside.
    let row: Vec<u8> = (32..64).map(|x| sdf[32 * 64 + x]).collect();
    assert_eq!(row[0], 255);
    assert_eq!(*row.last().unwrap(), 0);
    assert!(
        row.iter().any(|&v| v > 0 && v < 255),
        "no gradient found across the boundary: {row:?}"
    );
}
