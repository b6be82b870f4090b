use crate::geometry::signed_distance::{DistanceResult, SignedDistance};
use crate::geometry::vector::{non_zero_sign, Vec2};

pub fn point(p0: Vec2, p1: Vec2, t: f64) -> Vec2 {
    p0.lerp(p1, t)
}

pub fn direction(p0: Vec2, p1: Vec2, _t: f64) -> Vec2 {
    p1 - p0
}

pub fn find_bounds(p0: Vec2, p1: Vec2, l: &mut f64, b: &mut f64, r: &mut f64, t: &mut f64) {
    for p in [p0, p1] {
        *l = l.min(p.x);
        *r = r.max(p.x);
        *b = b.min(p.y);
        *t = t.max(p.y);
    }
}

pub fn signed_distance(p0: Vec2, p1: Vec2, origin: Vec2) -> DistanceResult {
    let ab = p1 - p0;
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        // Degenerate zero-length segment: never wins a real comparison.
        return DistanceResult::new(SignedDistance::infinite(), 0.0);
    }
    let aq = origin - p0;
    let param = aq.dot(ab) / len_sq;

    if param > 0.0 && param < 1.0 {
        // (ab.y, -ab.x) rather than `ab.perpendicular()` = (-ab.y, ab.x): the
        // interior branch must agree in sign with the endpoint branch below
        // (`non_zero_sign(aq.cross(ab))`) and with quadratic/cubic.
        let ortho = Vec2::new(ab.y, -ab.x).normalize().dot(aq);
        let endpoint = if param > 0.5 { p1 } else { p0 };
        let endpoint_distance = (endpoint - origin).length();
        if ortho.abs() < endpoint_distance {
            return DistanceResult::new(SignedDistance::new(ortho, 0.0), param);
        }
    }

    let endpoint = if param > 0.5 { p1 } else { p0 };
    let eq = endpoint - origin;
    let endpoint_distance = eq.length();
    let sign = non_zero_sign(aq.cross(ab));
    let orthogonality = ab.normalize().dot(eq.normalize()).abs();
    DistanceResult::new(SignedDistance::new(sign * endpoint_distance, orthogonality), param)
}

pub fn scanline_intersections(p0: Vec2, p1: Vec2, scan_y: f64) -> Vec<(f64, i32)> {
    if (p0.y <= scan_y && p1.y > scan_y) || (p1.y <= scan_y && p0.y > scan_y) {
        let t = (scan_y - p0.y) / (p1.y - p0.y);
        if t > 0.0 && t < 1.0 {
            let x = p0.x + t * (p1.x - p0.x);
            let dir = if p1.y > p0.y { 1 } else { -1 };
            return vec![(x, dir)];
        }
    }
    Vec::new()
}
