//! Bezier edge segments: the linear/quadratic/cubic primitives that make up
//! a [`crate::geometry::shape::Contour`].

mod cubic;
mod line;
mod quadratic;

use super::edge_color::EdgeColor;
use super::signed_distance::DistanceResult;
use super::vector::Vec2;

/// One edge of a contour. `p0` is always the start point, the last listed
/// point is always the end point; any interior points are control handles.
#[derive(Debug, Clone, Copy)]
pub enum Segment {
    Linear(Vec2, Vec2, EdgeColor),
    Quadratic(Vec2, Vec2, Vec2, EdgeColor),
    Cubic(Vec2, Vec2, Vec2, Vec2, EdgeColor),
}

impl Segment {
    pub fn linear(p0: Vec2, p1: Vec2, color: EdgeColor) -> Self {
        Segment::Linear(p0, p1, color)
    }

    /// Degenerate control points (coincident with an endpoint) are nudged to
    /// the midpoint so the curve stays a valid, non-self-intersecting
    /// quadratic rather than collapsing to a line with an ill-defined tangent.
    pub fn quadratic(p0: Vec2, mut p1: Vec2, p2: Vec2, color: EdgeColor) -> Self {
        if p1 == p0 || p1 == p2 {
            p1 = p0.lerp(p2, 0.5);
        }
        Segment::Quadratic(p0, p1, p2, color)
    }

    /// Degenerate (colinear with both endpoints coincident with handles)
    /// cubics are nudged onto the chord trisection points for the same
    /// reason as [`Segment::quadratic`].
    pub fn cubic(p0: Vec2, mut p1: Vec2, mut p2: Vec2, p3: Vec2, color: EdgeColor) -> Self {
        if (p1 == p0 || p1 == p3) && (p2 == p0 || p2 == p3) {
            p1 = p0.lerp(p3, 1.0 / 3.0);
            p2 = p0.lerp(p3, 2.0 / 3.0);
        }
        Segment::Cubic(p0, p1, p2, p3, color)
    }

    pub fn start(&self) -> Vec2 {
        match *self {
            Segment::Linear(p0, ..) => p0,
            Segment::Quadratic(p0, ..) => p0,
            Segment::Cubic(p0, ..) => p0,
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Segment::Linear(_, p1, _) => p1,
            Segment::Quadratic(_, _, p2, _) => p2,
            Segment::Cubic(_, _, _, p3, _) => p3,
        }
    }

    pub fn color(&self) -> EdgeColor {
        match *self {
            Segment::Linear(_, _, c) => c,
            Segment::Quadratic(_, _, _, c) => c,
            Segment::Cubic(_, _, _, _, c) => c,
        }
    }

    pub fn set_color(&mut self, color: EdgeColor) {
        match self {
            Segment::Linear(_, _, c) => *c = color,
            Segment::Quadratic(_, _, _, c) => *c = color,
            Segment::Cubic(_, _, _, _, c) => *c = color,
        }
    }

    pub fn point(&self, t: f64) -> Vec2 {
        match *self {
            Segment::Linear(p0, p1, _) => line::point(p0, p1, t),
            Segment::Quadratic(p0, p1, p2, _) => quadratic::point(p0, p1, p2, t),
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::point(p0, p1, p2, p3, t),
        }
    }

    pub fn direction(&self, t: f64) -> Vec2 {
        match *self {
            Segment::Linear(p0, p1, _) => line::direction(p0, p1, t),
            Segment::Quadratic(p0, p1, p2, _) => quadratic::direction(p0, p1, p2, t),
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::direction(p0, p1, p2, p3, t),
        }
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let (mut l, mut b, mut r, mut t) = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        match *self {
            Segment::Linear(p0, p1, _) => line::find_bounds(p0, p1, &mut l, &mut b, &mut r, &mut t),
            Segment::Quadratic(p0, p1, p2, _) => quadratic::find_bounds(p0, p1, p2, &mut l, &mut b, &mut r, &mut t),
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::find_bounds(p0, p1, p2, p3, &mut l, &mut b, &mut r, &mut t),
        }
        (Vec2::new(l, b), Vec2::new(r, t))
    }

    /// Signed distance from `origin` plus the (possibly out-of-[0,1])
    /// minimizing parameter, per spec.md §4.2.
    pub fn signed_distance_with_param(&self, origin: Vec2) -> DistanceResult {
        match *self {
            Segment::Linear(p0, p1, _) => line::signed_distance(p0, p1, origin),
            Segment::Quadratic(p0, p1, p2, _) => quadratic::signed_distance(p0, p1, p2, origin),
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::signed_distance(p0, p1, p2, p3, origin),
        }
    }

    /// Reverses traversal direction, preserving color. Cubic control points
    /// swap in pairs so the curve's geometry is unchanged.
    pub fn reversed(&self) -> Segment {
        match *self {
            Segment::Linear(p0, p1, c) => Segment::Linear(p1, p0, c),
            Segment::Quadratic(p0, p1, p2, c) => Segment::Quadratic(p2, p1, p0, c),
            Segment::Cubic(p0, p1, p2, p3, c) => Segment::Cubic(p3, p2, p1, p0, c),
        }
    }

    /// Splits this segment at parameter `t` into two segments covering
    /// `[0, t]` and `[t, 1]` via De Casteljau subdivision. Used by
    /// `split_at_inflections`.
    pub fn split_at(&self, t: f64) -> (Segment, Segment) {
        match *self {
            Segment::Linear(p0, p1, c) => {
                let mid = p0.lerp(p1, t);
                (Segment::Linear(p0, mid, c), Segment::Linear(mid, p1, c))
            }
            Segment::Quadratic(p0, p1, p2, c) => {
                let p01 = p0.lerp(p1, t);
                let p12 = p1.lerp(p2, t);
                let mid = p01.lerp(p12, t);
                (
                    Segment::quadratic(p0, p01, mid, c),
                    Segment::quadratic(mid, p12, p2, c),
                )
            }
            Segment::Cubic(p0, p1, p2, p3, c) => {
                let p01 = p0.lerp(p1, t);
                let p12 = p1.lerp(p2, t);
                let p23 = p2.lerp(p3, t);
                let p012 = p01.lerp(p12, t);
                let p123 = p12.lerp(p23, t);
                let mid = p012.lerp(p123, t);
                (
                    Segment::cubic(p0, p01, p012, mid, c),
                    Segment::cubic(mid, p123, p23, p3, c),
                )
            }
        }
    }

    /// Interior inflection points (where the curvature of `B''(t) x B'(t)`
    /// changes sign), clamped to `(0.01, 0.99)` per spec.md §4.2. Empty for
    /// linear and quadratic segments, which have no curvature sign change.
    pub fn find_inflections(&self) -> Vec<f64> {
        match *self {
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::find_inflections(p0, p1, p2, p3),
            _ => Vec::new(),
        }
    }

    /// Up to 3 horizontal-scanline x-crossings at `y = scan_y`, each tagged
    /// with the edge's y-direction sign at that crossing. Crossings at
    /// exactly `t = 0` or `t = 1` are excluded so that a shared endpoint
    /// between adjacent edges isn't counted twice.
    pub fn scanline_intersections(&self, scan_y: f64) -> Vec<(f64, i32)> {
        match *self {
            Segment::Linear(p0, p1, _) => line::scanline_intersections(p0, p1, scan_y),
            Segment::Quadratic(p0, p1, p2, _) => quadratic::scanline_intersections(p0, p1, p2, scan_y),
            Segment::Cubic(p0, p1, p2, p3, _) => cubic::scanline_intersections(p0, p1, p2, p3, scan_y),
        }
    }
}

impl Segment {
    /// Converts a raw signed distance achieved at `distance.param` outside
    /// `[0, 1]` into the pseudo-distance to the extended tangent line, per
    /// the contract in spec.md §4.5. No-op when `param` is within range.
    pub fn distance_to_pseudo_distance(&self, distance: &mut DistanceResult, origin: Vec2) {
        let param = distance.param;
        if param < 0.0 {
            let dir = self.direction(0.0).normalize();
            let aq = origin - self.start();
            if aq.dot(dir) < 0.0 {
                let pseudo = aq.cross(dir);
                if pseudo.abs() <= distance.distance.distance.abs() {
                    distance.distance = super::signed_distance::SignedDistance::new(pseudo, 0.0);
                }
            }
        } else if param > 1.0 {
            let dir = self.direction(1.0).normalize();
            let bq = origin - self.end();
            if bq.dot(dir) > 0.0 {
                let pseudo = bq.cross(dir);
                if pseudo.abs() <= distance.distance.distance.abs() {
                    distance.distance = super::signed_distance::SignedDistance::new(pseudo, 0.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_point_on_segment_has_near_zero_distance() {
        let seg = Segment::linear(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), EdgeColor::WHITE);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = seg.point(t);
            let d = seg.signed_distance_with_param(p).distance.distance;
            assert!(d.abs() < 1e-6, "t={} d={}", t, d);
        }
    }

    #[test]
    fn quadratic_point_on_segment_has_near_zero_distance() {
        let seg = Segment::quadratic(
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(10.0, 0.0),
            EdgeColor::WHITE,
        );
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = seg.point(t);
            let d = seg.signed_distance_with_param(p).distance.distance;
            assert!(d.abs() < 1e-6, "t={} d={}", t, d);
        }
    }

    #[test]
    fn cubic_point_on_segment_has_near_zero_distance() {
        let seg = Segment::cubic(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 0.0),
            EdgeColor::WHITE,
        );
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = seg.point(t);
            let d = seg.signed_distance_with_param(p).distance.distance;
            assert!(d.abs() < 1e-6, "t={} d={}", t, d);
        }
    }

    #[test]
    fn reversed_preserves_geometry() {
        let seg = Segment::cubic(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(4.0, 0.0),
            EdgeColor::CYAN,
        );
        let rev = seg.reversed();
        assert_eq!(rev.start(), seg.end());
        assert_eq!(rev.end(), seg.start());
        assert_eq!(rev.color(), seg.color());
    }

    #[test]
    fn s_curve_has_one_inflection() {
        let seg = Segment::cubic(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 0.0),
            EdgeColor::WHITE,
        );
        let inflections = seg.find_inflections();
        assert_eq!(inflections.len(), 1);
        assert!(inflections[0] > 0.1 && inflections[0] < 0.9);
    }

    #[test]
    fn split_at_reproduces_original_points() {
        let seg = Segment::cubic(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 0.0),
            EdgeColor::WHITE,
        );
        let (a, b) = seg.split_at(0.5);
        for &t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            let expected = seg.point(t);
            let actual = if t <= 0.5 { a.point(t * 2.0) } else { b.point((t - 0.5) * 2.0) };
            assert!((expected.x - actual.x).abs() < 1e-9);
            assert!((expected.y - actual.y).abs() < 1e-9);
        }
    }
}
