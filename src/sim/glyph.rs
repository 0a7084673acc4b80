//! Seven-segment digit glyphs sampled into target points

use glam::Vec2;

/// Segment order: a (top), b (top right), c (bottom right), d (bottom),
/// e (bottom left), f (top left), g (middle)
pub const SEGMENT_PATTERNS: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],     // 0
    [false, true, true, false, false, false, false], // 1
    [true, true, false, true, true, false, true],    // 2
    [true, true, true, true, false, false, true],    // 3
    [false, true, true, false, false, true, true],   // 4
    [true, false, true, true, false, true, true],    // 5
    [true, false, true, true, true, true, true],     // 6
    [true, true, true, false, false, false, false],  // 7
    [true, true, true, true, true, true, true],      // 8
    [true, true, true, true, false, true, true],     // 9
];

/// Segment endpoints in a unit cell (x, y in -0.5..=0.5, y down)
const SEGMENTS: [(Vec2, Vec2); 7] = [
    (Vec2::new(-0.5, -0.5), Vec2::new(0.5, -0.5)), // a
    (Vec2::new(0.5, -0.5), Vec2::new(0.5, 0.0)),   // b
    (Vec2::new(0.5, 0.0), Vec2::new(0.5, 0.5)),    // c
    (Vec2::new(-0.5, 0.5), Vec2::new(0.5, 0.5)),   // d
    (Vec2::new(-0.5, 0.0), Vec2::new(-0.5, 0.5)),  // e
    (Vec2::new(-0.5, -0.5), Vec2::new(-0.5, 0.0)), // f
    (Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0)),   // g
];

/// Lit segments of a digit as world-space line segments.
/// Empty for values that have no glyph.
pub fn lit_segments(digit: u32, center: Vec2, size: Vec2) -> Vec<(Vec2, Vec2)> {
    let Some(pattern) = SEGMENT_PATTERNS.get(digit as usize) else {
        return Vec::new();
    };
    pattern
        .iter()
        .zip(SEGMENTS.iter())
        .filter(|(lit, _)| **lit)
        .map(|(_, (a, b))| (center + *a * size, center + *b * size))
        .collect()
}

/// `count` points spread evenly along the lit segments of `digit`, ordered
/// bottom to top so a digit fills up from its base.
pub fn sample_digit(digit: u32, center: Vec2, size: Vec2, count: usize) -> Vec<Vec2> {
    let segments = lit_segments(digit, center, size);
    let total: f32 = segments.iter().map(|(a, b)| a.distance(*b)).sum();
    if segments.is_empty() || total <= 0.0 || count == 0 {
        return Vec::new();
    }

    // Walk the concatenated segments, placing points at the middle of equal spans
    let spacing = total / count as f32;
    let mut points = Vec::with_capacity(count);
    let mut seg_iter = segments.iter();
    let mut current = seg_iter.next();
    let mut seg_start = 0.0;
    for i in 0..count {
        let along = spacing * (i as f32 + 0.5);
        while let Some((a, b)) = current {
            let len = a.distance(*b);
            if along <= seg_start + len {
                let t = if len > 0.0 { (along - seg_start) / len } else { 0.0 };
                points.push(a.lerp(*b, t));
                break;
            }
            seg_start += len;
            current = seg_iter.next();
        }
    }

    // Larger y is lower on screen
    points.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    points
}
