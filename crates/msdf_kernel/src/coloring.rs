//! Edge-color assignment: picks {Cyan, Magenta, Yellow, White} per edge so
//! that every geometric corner becomes a channel disagreement (spec.md §4.4).

use crate::geometry::{EdgeColor, Shape};

/// Deflection beyond which a junction between two edges counts as a corner,
/// expressed as the angle in radians per spec.md §4.4 (~172 degrees).
pub const DEFAULT_CORNER_ANGLE: f64 = 3.0;

/// Assigns colors to every edge of every contour in `shape`, in place.
/// Color state persists across contours so disjoint contours land on
/// different assignments (spec.md §4.4). `seed` drives the deterministic
/// xorshift64 switch and is advanced as coloring proceeds.
pub fn color_shape(shape: &mut Shape, angle_threshold: f64, seed: &mut u64) {
    let cross_threshold = angle_threshold.sin();
    let mut color = EdgeColor::YELLOW;

    for contour in shape.contours.iter_mut() {
        let edges = &mut contour.edges;
        if edges.is_empty() {
            continue;
        }

        let m = edges.len();
        if m == 1 {
            edges[0].set_color(EdgeColor::WHITE);
            continue;
        }
        if m == 2 {
            color = color.switch_seeded(seed);
            edges[0].set_color(color);
            color = color.switch_seeded(seed);
            edges[1].set_color(color);
            continue;
        }

        let corners = find_corners(edges, cross_threshold);
        match corners.len() {
            0 => {
                // Smooth loop: one color for every edge.
                color = color.switch_seeded(seed);
                for edge in edges.iter_mut() {
                    edge.set_color(color);
                }
            }
            1 => {
                color_teardrop(edges, corners[0], &mut color, seed);
            }
            _ => {
                color_multi_corner(edges, &corners, &mut color, seed);
            }
        }
    }
}

/// Indices `i` of edges whose start is preceded by a corner junction
/// (comparing `edges[i-1].direction(1)` to `edges[i].direction(0)`, with
/// wraparound).
fn find_corners(edges: &[crate::geometry::Segment], cross_threshold: f64) -> Vec<usize> {
    let m = edges.len();
    let mut corners = Vec::new();
    let mut prev_dir = edges[m - 1].direction(1.0).normalize();
    for (i, edge) in edges.iter().enumerate() {
        let dir = edge.direction(0.0).normalize();
        if is_corner(prev_dir, dir, cross_threshold) {
            corners.push(i);
        }
        prev_dir = edge.direction(1.0).normalize();
    }
    corners
}

fn is_corner(a: crate::geometry::Vec2, b: crate::geometry::Vec2, cross_threshold: f64) -> bool {
    a.dot(b) <= 0.0 || a.cross(b).abs() > cross_threshold
}

/// Teardrop case: a single corner among `m >= 3` edges. Colors split
/// `(c1, White, c2)` symmetrically around the contour via [`trichotomy`].
fn color_teardrop(
    edges: &mut [crate::geometry::Segment],
    corner: usize,
    color: &mut EdgeColor,
    seed: &mut u64,
) {
    let m = edges.len();
    *color = color.switch_seeded(seed);
    let c1 = *color;
    let c2 = color.switch().switch();
    let colors = [c1, EdgeColor::WHITE, c2];

    for i in 0..m {
        let idx = (corner + i) % m;
        let bucket = trichotomy(i as i64, m as i64);
        edges[idx].set_color(colors[(bucket + 1) as usize]);
    }
}

/// `trich(i,m) = floor(3 + 2.875*i/(m-1) - 1.4375 + 0.5) - 3 in {-1,0,1}`.
fn trichotomy(i: i64, m: i64) -> i64 {
    let x = 3.0 + 2.875 * (i as f64) / ((m - 1) as f64) - 1.4375 + 0.5;
    x.floor() as i64 - 3
}

fn color_multi_corner(
    edges: &mut [crate::geometry::Segment],
    corners: &[usize],
    color: &mut EdgeColor,
    seed: &mut u64,
) {
    let m = edges.len();
    *color = color.switch_seeded(seed);
    let initial_color = *color;

    let mut spline = 0usize;
    let corners_len = corners.len();
    let start = corners[0];
    for i in 0..m {
        let idx = (start + i) % m;
        if spline + 1 < corners_len && corners[spline + 1] == idx {
            spline += 1;
            *color = color.switch_seeded(seed);
            // Last spline of the contour must not collide with the very
            // first spline across the closing corner (spec.md §4.4).
            if spline == corners_len - 1 && *color == initial_color {
                *color = color.switch_seeded(seed);
            }
        }
        edges[idx].set_color(*color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Contour, Segment, Shape, Vec2};

    fn square() -> Contour {
        Contour::new(vec![
            Segment::linear(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), EdgeColor::BLACK),
            Segment::linear(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0), EdgeColor::BLACK),
            Segment::linear(Vec2::new(10.0, 10.0), Vec2::new(0.0, 10.0), EdgeColor::BLACK),
            Segment::linear(Vec2::new(0.0, 10.0), Vec2::new(0.0, 0.0), EdgeColor::BLACK),
        ])
    }

    #[test]
    fn square_corners_get_disagreeing_neighbor_colors() {
        let mut shape = Shape::new(vec![square()]);
        let mut seed = 1u64;
        color_shape(&mut shape, DEFAULT_CORNER_ANGLE, &mut seed);
        let edges = &shape.contours[0].edges;
        for i in 0..edges.len() {
            let next = (i + 1) % edges.len();
            assert_ne!(edges[i].color(), edges[next].color());
        }
    }

    #[test]
    fn smooth_loop_gets_single_color() {
        // An approximate circle built from several quadratics has no hard
        // corners at the default threshold.
        let n = 8;
        let mut edges = Vec::new();
        for i in 0..n {
            let t0 = std::f64::consts::TAU * i as f64 / n as f64;
            let t1 = std::f64::consts::TAU * (i + 1) as f64 / n as f64;
            let tm = (t0 + t1) / 2.0;
            let p0 = Vec2::new(t0.cos() * 10.0, t0.sin() * 10.0);
            let p1 = Vec2::new(t1.cos() * 10.0, t1.sin() * 10.0);
            let ctrl_radius = 10.0 / tm.cos().max(0.001).abs().max(1.0).min(12.0);
            let ctrl = Vec2::new(tm.cos() * ctrl_radius, tm.sin() * ctrl_radius);
            edges.push(Segment::quadratic(p0, ctrl, p1, EdgeColor::BLACK));
        }
        let mut shape = Shape::new(vec![Contour::new(edges)]);
        let mut seed = 7u64;
        color_shape(&mut shape, DEFAULT_CORNER_ANGLE, &mut seed);
        let first = shape.contours[0].edges[0].color();
        assert!(shape.contours[0].edges.iter().all(|e| e.color() == first));
    }

    #[test]
    fn teardrop_uses_three_colors() {
        // Two edges meeting at a sharp corner, both returning to start
        // smoothly, forces a single-corner (teardrop) classification.
        let edges = vec![
            Segment::linear(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), EdgeColor::BLACK),
            Segment::quadratic(
                Vec2::new(10.0, 0.0),
                Vec2::new(5.0, 10.0),
                Vec2::new(0.0, 0.0),
                EdgeColor::BLACK,
            ),
        ];
        let mut shape = Shape::new(vec![Contour::new(edges)]);
        let mut seed = 42u64;
        color_shape(&mut shape, DEFAULT_CORNER_ANGLE, &mut seed);
        assert_ne!(
            shape.contours[0].edges[0].color(),
            shape.contours[0].edges[1].color()
        );
    }

    #[test]
    fn trichotomy_is_balanced() {
        let m = 7i64;
        let sum: i64 = (0..m).map(|i| trichotomy(i, m)).sum();
        assert_eq!(sum, 0);
    }
}
