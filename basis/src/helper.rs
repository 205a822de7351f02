//! Numerical quadrature used to check basis functions against their analytic forms.

use nalgebra::Vector3;
use rayon::prelude::*;

/// Nodes and weights of the composite Simpson rule on `[lo, hi]`. An odd
/// panel count is bumped to the next even one.
pub(crate) fn simpson_rule(lo: f64, hi: f64, panels: usize) -> Vec<(f64, f64)> {
    let panels = panels + panels % 2;
    let h = (hi - lo) / panels as f64;
    (0..=panels)
        .map(|i| {
            let w = if i == 0 || i == panels {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            (lo + i as f64 * h, w * h / 3.0)
        })
        .collect()
}

pub(crate) fn integrate_line<F>(f: F, lo: f64, hi: f64, panels: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    simpson_rule(lo, hi, panels).into_iter().map(|(x, w)| w * f(x)).sum()
}

/// Integral over the cube `[lo, hi]^3` as a product rule, parallel over x.
pub(crate) fn integrate_cube<F>(f: F, lo: f64, hi: f64, panels: usize) -> f64
where
    F: Fn(&Vector3<f64>) -> f64 + Sync,
{
    let rule = simpson_rule(lo, hi, panels);
    rule.par_iter()
        .map(|&(x, wx)| {
            let mut plane = 0.0;
            for &(y, wy) in &rule {
                for &(z, wz) in &rule {
                    plane += wy * wz * f(&Vector3::new(x, y, z));
                }
            }
            wx * plane
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_is_exact_for_cubics() {
        let integral = integrate_line(|x| x * x * x - 2.0 * x + 1.0, -1.0, 2.0, 3);
        assert!((integral - 3.75).abs() < 1e-12);
        let weights: f64 = simpson_rule(0.0, 4.0, 6).iter().map(|&(_, w)| w).sum();
        assert!((weights - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cube_volume() {
        let volume = integrate_cube(|r| 1.0 + r.x * r.y * r.z, -1.5, 1.5, 4);
        assert!((volume - 27.0).abs() < 1e-10);
    }
}
