//! Polynomial root solvers used by segment distance and scanline queries.
//!
//! Numerically stable forms are used deliberately: catastrophic cancellation
//! here would show up as visible seams in the rasterized output, not just a
//! test failure.

/// Solves `a*x^2 + b*x + c = 0`, returning real roots sorted ascending.
/// Degrades to the linear case when `a` is negligible.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-14 {
        if b.abs() < 1e-14 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    if discriminant == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    let sqrt_d = discriminant.sqrt();
    let sign = if b < 0.0 { -1.0 } else { 1.0 };
    let q = -0.5 * (b + sign * sqrt_d);
    let mut roots = vec![q / a, c / q];
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap());
    roots
}

/// Solves `a*x^3 + b*x^2 + c*x + d = 0`, returning real roots sorted
/// ascending. Degrades to `solve_quadratic` when `a` is negligible.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < 1e-14 {
        return solve_quadratic(b, c, d);
    }

    // Normalize to x^3 + Bx^2 + Cx + D, then depress via x = t - B/3.
    let bn = b / a;
    let cn = c / a;
    let dn = d / a;
    let shift = bn / 3.0;

    let p = cn - bn * bn / 3.0;
    let q = 2.0 * bn * bn * bn / 27.0 - bn * cn / 3.0 + dn;

    let delta = (q / 2.0) * (q / 2.0) + (p / 3.0) * (p / 3.0) * (p / 3.0);

    let mut roots = if delta > 1e-14 {
        let sqrt_delta = delta.sqrt();
        let u = cube_root(-q / 2.0 + sqrt_delta);
        let v = cube_root(-q / 2.0 - sqrt_delta);
        vec![u + v]
    } else if delta < -1e-14 {
        // Casus irreducibilis: three real roots via the trigonometric form.
        let r = (-p / 3.0).sqrt();
        let phi = (3.0 * q / (2.0 * p * r)).clamp(-1.0, 1.0).acos() / 3.0;
        vec![
            2.0 * r * (phi).cos(),
            2.0 * r * (phi - 2.0 * std::f64::consts::PI / 3.0).cos(),
            2.0 * r * (phi - 4.0 * std::f64::consts::PI / 3.0).cos(),
        ]
    } else {
        // Double/triple root.
        let u = cube_root(-q / 2.0);
        if p.abs() < 1e-14 {
            vec![u]
        } else {
            vec![2.0 * u, -u]
        }
    };

    for root in roots.iter_mut() {
        *root -= shift;
    }
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap());
    roots
}

fn cube_root(x: f64) -> f64 {
    if x < 0.0 {
        -(-x).powf(1.0 / 3.0)
    } else {
        x.powf(1.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_roots_close(mut found: Vec<f64>, mut expected: Vec<f64>, eps: f64) {
        found.sort_by(|a, b| a.partial_cmp(b).unwrap());
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(found.len(), expected.len(), "found={:?} expected={:?}", found, expected);
        for (f, e) in found.iter().zip(expected.iter()) {
            assert!((f - e).abs() < eps, "found={:?} expected={:?}", found, expected);
        }
    }

    #[test]
    fn quadratic_two_roots() {
        // (x-1)(x-2) = x^2 - 3x + 2
        let roots = solve_quadratic(1.0, -3.0, 2.0);
        assert_roots_close(roots, vec![1.0, 2.0], 1e-9);
    }

    #[test]
    fn quadratic_degrades_to_linear() {
        let roots = solve_quadratic(0.0, 2.0, -4.0);
        assert_roots_close(roots, vec![2.0], 1e-9);
    }

    #[test]
    fn quadratic_no_real_roots() {
        let roots = solve_quadratic(1.0, 0.0, 1.0);
        assert!(roots.is_empty());
    }

    #[test]
    fn cubic_three_real_roots() {
        // (x+1)(x)(x-1) = x^3 - x
        let roots = solve_cubic(1.0, 0.0, -1.0, 0.0);
        assert_roots_close(roots, vec![-1.0, 0.0, 1.0], 1e-6);
    }

    #[test]
    fn cubic_one_real_root() {
        // x^3 + x + 1 has one real root near -0.6823278
        let roots = solve_cubic(1.0, 0.0, 1.0, 1.0);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] - (-0.6823278)).abs() < 1e-6);
    }

    #[test]
    fn cubic_degrades_to_quadratic() {
        let roots = solve_cubic(0.0, 1.0, -3.0, 2.0);
        assert_roots_close(roots, vec![1.0, 2.0], 1e-9);
    }

    #[test]
    fn cubic_triple_root() {
        // (x-2)^3 = x^3 - 6x^2 + 12x - 8
        let roots = solve_cubic(1.0, -6.0, 12.0, -8.0);
        assert_roots_close(roots, vec![2.0], 1e-4);
    }
}
