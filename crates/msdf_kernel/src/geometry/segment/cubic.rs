use crate::geometry::equation::{solve_cubic, solve_quadratic};
use crate::geometry::signed_distance::{DistanceResult, SignedDistance};
use crate::geometry::vector::{non_zero_sign, Vec2};

const SEARCH_STARTS: usize = 4;
const SEARCH_STEPS: usize = 4;

pub fn point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f64) -> Vec2 {
    let p01 = p0.lerp(p1, t);
    let p12 = p1.lerp(p2, t);
    let p23 = p2.lerp(p3, t);
    p01.lerp(p12, t).lerp(p12.lerp(p23, t), t)
}

/// First derivative. At the exact endpoints this falls back to the chord to
/// the second control point when the local tangent vanishes (coincident
/// handle), matching the convention used by the sign test in spec.md §4.2.
pub fn direction(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f64) -> Vec2 {
    let tangent = (p1 - p0).lerp(p2 - p1, t).lerp((p2 - p1).lerp(p3 - p2, t), t);
    if tangent.is_zero() {
        if t == 0.0 {
            return p2 - p0;
        }
        if t == 1.0 {
            return p3 - p1;
        }
    }
    tangent
}

fn second_derivative_coeffs(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> (Vec2, Vec2, Vec2) {
    let ab = p1 - p0;
    let br = p2 - p1 - ab;
    let as_ = (p3 - p2) - (p2 - p1) - br;
    (ab, br, as_)
}

pub fn find_bounds(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, l: &mut f64, b: &mut f64, r: &mut f64, t: &mut f64) {
    for p in [p0, p3] {
        *l = l.min(p.x);
        *r = r.max(p.x);
        *b = b.min(p.y);
        *t = t.max(p.y);
    }
    let a0 = p1 - p0;
    let a1 = 2.0 * (p2 - p1 - a0);
    let a2 = p3 - 3.0 * p2 + 3.0 * p1 - p0;

    for axis_roots in [
        solve_quadratic(a2.x, a1.x, a0.x),
        solve_quadratic(a2.y, a1.y, a0.y),
    ] {
        for param in axis_roots {
            if param > 0.0 && param < 1.0 {
                let p = point(p0, p1, p2, p3, param);
                *l = l.min(p.x);
                *r = r.max(p.x);
                *b = b.min(p.y);
                *t = t.max(p.y);
            }
        }
    }
}

/// Newton's method seeded at `t = i/SEARCH_STARTS`, per spec.md §4.2: no
/// closed form exists for the quintic critical-point equation.
pub fn signed_distance(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, origin: Vec2) -> DistanceResult {
    let qa = p0 - origin;
    let (ab, br, as_) = second_derivative_coeffs(p0, p1, p2, p3);

    let start_tangent = direction(p0, p1, p2, p3, 0.0);
    let mut min_distance = non_zero_sign(start_tangent.cross(qa)) * qa.length();
    let mut param = -qa.dot(start_tangent) / start_tangent.dot(start_tangent);

    {
        let end_tangent = direction(p0, p1, p2, p3, 1.0);
        let end_to_origin = p3 - origin;
        let distance = end_to_origin.length();
        if distance < min_distance.abs() {
            min_distance = non_zero_sign(end_tangent.cross(end_to_origin)) * distance;
            param = (origin - p2).dot(end_tangent) / end_tangent.dot(end_tangent);
        }
    }

    for i in 0..SEARCH_STARTS {
        let mut t = i as f64 / SEARCH_STARTS as f64;
        let mut qe = qa + 3.0 * t * ab + 3.0 * t * t * br + t * t * t * as_;
        for _ in 0..SEARCH_STEPS {
            let d1 = 3.0 * ab + 6.0 * t * br + 3.0 * t * t * as_;
            let d2 = 6.0 * br + 6.0 * t * as_;
            let denom = d1.dot(d1) + qe.dot(d2);
            if denom.abs() < 1e-14 {
                break;
            }
            t -= qe.dot(d1) / denom;
            if !(0.0..=1.0).contains(&t) {
                break;
            }
            qe = qa + 3.0 * t * ab + 3.0 * t * t * br + t * t * t * as_;
            let distance = qe.length();
            if distance < min_distance.abs() {
                min_distance = non_zero_sign(d1.cross(qe)) * distance;
                param = t;
            }
        }
    }

    if (0.0..=1.0).contains(&param) {
        DistanceResult::new(SignedDistance::new(min_distance, 0.0), param)
    } else if param < 0.5 {
        let orthogonality = start_tangent.normalize().dot(qa.normalize()).abs();
        DistanceResult::new(SignedDistance::new(min_distance, orthogonality), param)
    } else {
        let end_tangent = direction(p0, p1, p2, p3, 1.0);
        let end_to_origin = p3 - origin;
        let orthogonality = end_tangent.normalize().dot(end_to_origin.normalize()).abs();
        DistanceResult::new(SignedDistance::new(min_distance, orthogonality), param)
    }
}

/// Roots of the scalar cross `B'(t) x B''(t)`, clamped to `(0.01, 0.99)`.
pub fn find_inflections(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Vec<f64> {
    // B'(t)/3 = ab + 2t*br + t^2*as, B''(t)/6 = br + t*as. Expanding
    // cross(B', B'') and dropping the cross(br,br) = cross(as,as) = 0 terms
    // leaves a quadratic in t:
    //   cross(ab,br) + t*cross(ab,as) + t^2*cross(br,as) = 0
    let (ab, br, as_) = second_derivative_coeffs(p0, p1, p2, p3);
    let a = br.cross(as_);
    let b = ab.cross(as_);
    let c = ab.cross(br);
    let roots = solve_quadratic(a, b, c);
    roots.into_iter().filter(|t| *t > 0.01 && *t < 0.99).collect()
}

pub fn scanline_intersections(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, scan_y: f64) -> Vec<(f64, i32)> {
    let a = -p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y;
    let b = 3.0 * p0.y - 6.0 * p1.y + 3.0 * p2.y;
    let c = -3.0 * p0.y + 3.0 * p1.y;
    let d = p0.y - scan_y;
    let mut out = Vec::new();
    for t in solve_cubic(a, b, c, d) {
        if t > 0.0 && t < 1.0 {
            let x = point(p0, p1, p2, p3, t).x;
            let dy = direction(p0, p1, p2, p3, t).y;
            let dir = if dy > 0.0 { 1 } else { -1 };
            out.push((x, dir));
        }
    }
    out
}
