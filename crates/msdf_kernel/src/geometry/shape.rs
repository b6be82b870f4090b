//! Contours and shapes: orientation, winding, and the normalize() pass that
//! brings a parser's raw output into the canonical CCW-outer/CW-hole form.

use super::segment::Segment;
use super::vector::Vec2;

const CONTOUR_CLOSURE_EPS: f64 = 1e-10;
/// Golden-ratio offset used to pick a normalize() scanline that avoids
/// landing on rational coincidences with control points (spec.md §4.3).
const GOLDEN_RATIO_PHI: f64 = 0.3819660112501051;
const WINDING_SUBSTEPS: usize = 16;

/// An ordered, cyclic sequence of segments. `segment[i].end` must equal
/// `segment[i+1].start` (wrapping) within [`CONTOUR_CLOSURE_EPS`].
#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub edges: Vec<Segment>,
}

impl Contour {
    pub fn new(edges: Vec<Segment>) -> Self {
        Contour { edges }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Verifies the closure invariant; used by tests and by parsers as a
    /// sanity check before handing a contour to a Shape.
    pub fn is_closed(&self) -> bool {
        if self.edges.len() < 2 {
            return true;
        }
        self.edges.iter().enumerate().all(|(i, edge)| {
            let next = &self.edges[(i + 1) % self.edges.len()];
            (edge.end().x - next.start().x).abs() < CONTOUR_CLOSURE_EPS
                && (edge.end().y - next.start().y).abs() < CONTOUR_CLOSURE_EPS
        })
    }

    /// Sign of the shoelace-style integral `sum((x1-x0)(y1+y0))` sampled at
    /// [`WINDING_SUBSTEPS`] points per edge. Positive for CCW under the
    /// standard mathematical convention; callers decide what that means for
    /// their font's handedness.
    pub fn winding(&self) -> i32 {
        if self.edges.is_empty() {
            return 0;
        }
        let mut total = 0.0;
        let mut prev = self.edges[0].point(0.0);
        for edge in &self.edges {
            for step in 1..=WINDING_SUBSTEPS {
                let t = step as f64 / WINDING_SUBSTEPS as f64;
                let cur = edge.point(t);
                total += (cur.x - prev.x) * (cur.y + prev.y);
                prev = cur;
            }
        }
        if total > 0.0 {
            1
        } else if total < 0.0 {
            -1
        } else {
            0
        }
    }

    pub fn reverse(&mut self) {
        self.edges.reverse();
        for edge in self.edges.iter_mut() {
            *edge = edge.reversed();
        }
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for edge in &self.edges {
            let (l, h) = edge.bounds();
            lo.x = lo.x.min(l.x);
            lo.y = lo.y.min(l.y);
            hi.x = hi.x.max(h.x);
            hi.y = hi.y.max(h.y);
        }
        (lo, hi)
    }

    /// A point guaranteed to lie strictly in this contour's interior,
    /// approximated by the midpoint of its bounding box — adequate for the
    /// containment fallback in `normalize()`, which only needs "some"
    /// interior sample, not a precise centroid.
    fn interior_sample(&self) -> Vec2 {
        let (lo, hi) = self.bounds();
        Vec2::new((lo.x + hi.x) / 2.0, (lo.y + hi.y) / 2.0)
    }

    /// Splits every cubic edge at its interior inflection points, in place.
    /// Linear and quadratic edges pass through unchanged.
    pub fn split_at_inflections(&mut self) {
        let mut result = Vec::with_capacity(self.edges.len());
        for edge in self.edges.drain(..) {
            let inflections = edge.find_inflections();
            if inflections.is_empty() {
                result.push(edge);
                continue;
            }
            let mut remaining = edge;
            let mut last_t = 0.0;
            for &t in &inflections {
                let local_t = (t - last_t) / (1.0 - last_t);
                let (head, tail) = remaining.split_at(local_t);
                result.push(head);
                remaining = tail;
                last_t = t;
            }
            result.push(remaining);
        }
        self.edges = result;
    }
}

/// An ordered list of contours (outer boundaries and holes).
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub contours: Vec<Contour>,
}

impl Shape {
    pub fn new(contours: Vec<Contour>) -> Self {
        Shape { contours }
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for contour in &self.contours {
            if contour.is_empty() {
                continue;
            }
            let (l, h) = contour.bounds();
            lo.x = lo.x.min(l.x);
            lo.y = lo.y.min(l.y);
            hi.x = hi.x.max(h.x);
            hi.y = hi.y.max(h.y);
        }
        (lo, hi)
    }

    /// Non-zero fill rule winding of the whole shape at `p`: for each edge,
    /// count scanline crossings strictly to the right of `p`, signed by
    /// y-direction. Nonzero means inside.
    pub fn winding_at(&self, p: Vec2) -> i32 {
        let mut winding = 0;
        for contour in &self.contours {
            for edge in &contour.edges {
                for (x, dir) in edge.scanline_intersections(p.y) {
                    if x > p.x {
                        winding += dir;
                    }
                }
            }
        }
        winding
    }

    pub fn is_inside(&self, p: Vec2) -> bool {
        self.winding_at(p) != 0
    }

    /// Brings every contour to canonical orientation: outer contours CCW
    /// (positive winding), holes CW. Uses the robust scanline algorithm from
    /// spec.md §4.3 rather than the "reverse all if largest-area contour is
    /// CW" heuristic — the latter misclassifies nested non-convex holes.
    pub fn normalize(&mut self) {
        let n = self.contours.len();
        if n == 0 {
            return;
        }
        let mut resolved = vec![false; n];
        let mut should_be_positive = vec![true; n];

        for i in 0..n {
            if self.contours[i].is_empty() {
                resolved[i] = true;
                continue;
            }
            let (lo, hi) = self.contours[i].bounds();
            let scan_y = lo.y + GOLDEN_RATIO_PHI * (hi.y - lo.y);

            // Collect all intersections at this scanline across every
            // contour, tagged by owning contour index.
            let mut hits: Vec<(f64, i32, usize)> = Vec::new();
            for (ci, contour) in self.contours.iter().enumerate() {
                for edge in &contour.edges {
                    for (x, dir) in edge.scanline_intersections(scan_y) {
                        hits.push((x, dir, ci));
                    }
                }
            }
            if hits.is_empty() {
                continue;
            }
            hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            // Zero out ambiguous corner hits: pairs with exactly equal x.
            let mut k = 0;
            while k + 1 < hits.len() {
                if (hits[k].0 - hits[k + 1].0).abs() < 1e-12 {
                    hits[k].1 = 0;
                    hits[k + 1].1 = 0;
                    k += 2;
                } else {
                    k += 1;
                }
            }

            let mut parity = 0;
            let mut vote = 0i32;
            for (_, dir, ci) in &hits {
                if *ci == i {
                    // Even parity before this hit + the hit's own direction
                    // vote for this contour's orientation.
                    vote += if parity % 2 == 0 { *dir } else { -*dir };
                }
                parity += dir.unsigned_abs() as i32;
            }
            if vote > 0 {
                should_be_positive[i] = true;
                resolved[i] = true;
            } else if vote < 0 {
                should_be_positive[i] = false;
                resolved[i] = true;
            }
        }

        // Containment fallback for contours the scanline vote couldn't
        // resolve (e.g. a contour entirely absent from its own chosen
        // scanline due to unlucky geometry).
        for i in 0..n {
            if resolved[i] {
                continue;
            }
            let sample = self.contours[i].interior_sample();
            let mut containing = 0;
            for (j, other) in self.contours.iter().enumerate() {
                if i == j || other.is_empty() {
                    continue;
                }
                if shape_contour_contains(other, sample) {
                    containing += 1;
                }
            }
            should_be_positive[i] = containing % 2 == 0;
        }

        for i in 0..n {
            let winding = self.contours[i].winding();
            let wants_positive = should_be_positive[i];
            if (winding > 0) != wants_positive {
                self.contours[i].reverse();
            }
        }
    }

    /// Splits every cubic edge of every contour at its inflection points.
    pub fn split_at_inflections(&mut self) {
        for contour in self.contours.iter_mut() {
            contour.split_at_inflections();
        }
    }
}

fn shape_contour_contains(contour: &Contour, p: Vec2) -> bool {
    let mut winding = 0;
    for edge in &contour.edges {
        for (x, dir) in edge.scanline_intersections(p.y) {
            if x > p.x {
                winding += dir;
            }
        }
    }
    winding != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::edge_color::EdgeColor;

    fn square_ccw() -> Contour {
        Contour::new(vec![
            Segment::linear(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(10.0, 10.0), Vec2::new(0.0, 10.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(0.0, 10.0), Vec2::new(0.0, 0.0), EdgeColor::WHITE),
        ])
    }

    #[test]
    fn square_is_closed() {
        assert!(square_ccw().is_closed());
    }

    #[test]
    fn ccw_square_has_positive_winding() {
        assert_eq!(square_ccw().winding(), 1);
    }

    #[test]
    fn reversed_square_has_negative_winding() {
        let mut c = square_ccw();
        c.reverse();
        assert_eq!(c.winding(), -1);
    }

    #[test]
    fn normalize_fixes_cw_single_contour() {
        let mut c = square_ccw();
        c.reverse(); // now CW
        let mut shape = Shape::new(vec![c]);
        shape.normalize();
        assert_eq!(shape.contours[0].winding(), 1);
        assert!(shape.is_inside(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn outer_and_hole_normalize_to_opposite_windings() {
        let outer = square_ccw();
        let mut hole = Contour::new(vec![
            Segment::linear(Vec2::new(3.0, 3.0), Vec2::new(7.0, 3.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(7.0, 3.0), Vec2::new(7.0, 7.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(7.0, 7.0), Vec2::new(3.0, 7.0), EdgeColor::WHITE),
            Segment::linear(Vec2::new(3.0, 7.0), Vec2::new(3.0, 3.0), EdgeColor::WHITE),
        ]);
        // Given in the same (CCW) order as the outer contour, which is wrong
        // for a hole — normalize() must flip it.
        let mut shape = Shape::new(vec![outer, std::mem::take(&mut hole)]);
        shape.normalize();
        assert_eq!(shape.contours[0].winding(), 1);
        assert_eq!(shape.contours[1].winding(), -1);
        assert!(shape.is_inside(Vec2::new(1.0, 1.0)));
        assert!(!shape.is_inside(Vec2::new(5.0, 5.0)));
    }
}
