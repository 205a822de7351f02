extern crate nalgebra as na;

use na::Vector3;
use serde::{Deserialize, Serialize};

/// One Cartesian factor `N x^l exp(-alpha x^2)` of a primitive Gaussian.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct GTO1d {
    pub alpha: f64,
    pub l: i32,
    pub center: f64,
    pub norm: f64,
}

fn factorial(n: i32) -> f64 {
    (1..=n).fold(1.0, |acc, x| acc * x as f64)
}

impl GTO1d {
    pub fn new(alpha: f64, l: i32, center: f64) -> Self {
        let norm = GTO1d::compute_norm(alpha, l);
        Self {
            alpha,
            l,
            center,
            norm,
        }
    }

    fn compute_norm(alpha: f64, l: i32) -> f64 {
        let pi = std::f64::consts::PI;

        // N^2 = (2^(3l) * l! * alpha^l * sqrt(2 alpha / pi)) / (2l)!
        let numerator = 2.0_f64.powi(3 * l) * factorial(l) * alpha.powi(l);
        let denominator = factorial(2 * l);
        let factor = (2.0 * alpha / pi).sqrt();

        (numerator * factor / denominator).sqrt()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let x = x - self.center;
        self.norm * x.powi(self.l) * (-self.alpha * x * x).exp()
    }

    /// d/dx of [`GTO1d::evaluate`].
    pub fn derivative(&self, x: f64) -> f64 {
        let x = x - self.center;
        let gauss = (-self.alpha * x * x).exp();
        let outer = -2.0 * self.alpha * x.powi(self.l + 1);
        if self.l == 0 {
            self.norm * outer * gauss
        } else {
            let inner = self.l as f64 * x.powi(self.l - 1);
            self.norm * (inner + outer) * gauss
        }
    }
}

/// Primitive normalised Cartesian Gaussian `N x^i y^j z^k exp(-alpha r^2)`.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct GTO {
    pub alpha: f64,
    pub l_xyz: Vector3<i32>,
    pub center: Vector3<f64>,
    pub norm: f64,
    pub gto1d: [GTO1d; 3],
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    pub fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }
}

impl GTO {
    pub fn new(alpha: f64, l_xyz: Vector3<i32>, center: Vector3<f64>) -> Self {
        let gto1d = [
            GTO1d::new(alpha, l_xyz.x, center.x),
            GTO1d::new(alpha, l_xyz.y, center.y),
            GTO1d::new(alpha, l_xyz.z, center.z),
        ];
        let norm = gto1d[0].norm * gto1d[1].norm * gto1d[2].norm;
        Self {
            alpha,
            l_xyz,
            center,
            norm,
            gto1d,
        }
    }

    pub fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        self.gto1d[0].evaluate(r.x) * self.gto1d[1].evaluate(r.y) * self.gto1d[2].evaluate(r.z)
    }

    /// Partial derivative along `dir`; the other two factors are plain values.
    pub fn derivative(&self, r: &Vector3<f64>, dir: Direction) -> f64 {
        let d = dir.index();
        (0..3)
            .map(|axis| {
                if axis == d {
                    self.gto1d[axis].derivative(r[axis])
                } else {
                    self.gto1d[axis].evaluate(r[axis])
                }
            })
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{integrate_cube, integrate_line};

    #[test]
    fn test_gto1d_normalization() {
        for l in 0..4 {
            let gto = GTO1d::new(1.3, l, 0.5);
            let integral = integrate_line(|x| gto.evaluate(x).powi(2), -10.0, 10.0, 10_000);
            assert!(
                (integral - 1.0).abs() < 1e-6,
                "l = {}: integral is not close to 1: got {}",
                l,
                integral
            );
        }
    }

    #[test]
    fn test_gto_normalization() {
        let gto = GTO::new(1.0, Vector3::new(1, 0, 1), Vector3::new(0.0, 0.0, 0.0));
        let integral = integrate_cube(|r| gto.evaluate(r).powi(2), -8.0, 8.0, 80);
        assert!((integral - 1.0).abs() < 1e-5, "Integral is not close to 1: got {}", integral);
    }

    #[test]
    fn test_gto1d_derivative_matches_finite_difference() {
        let h = 1e-5;
        for l in 0..4 {
            let gto = GTO1d::new(0.7, l, -0.3);
            for &x in &[-1.7, -0.3, 0.2, 1.1, 2.4] {
                let numeric = (gto.evaluate(x + h) - gto.evaluate(x - h)) / (2.0 * h);
                let analytic = gto.derivative(x);
                assert!(
                    (numeric - analytic).abs() < 1e-6,
                    "l = {}, x = {}: {} vs {}",
                    l,
                    x,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn test_gto_gradient_matches_finite_difference() {
        let gto = GTO::new(0.9, Vector3::new(2, 1, 0), Vector3::new(0.1, -0.2, 0.3));
        let r = Vector3::new(0.4, 0.7, -0.5);
        let h = 1e-5;
        for dir in [Direction::X, Direction::Y, Direction::Z] {
            let mut step = Vector3::zeros();
            step[dir.index()] = h;
            let numeric = (gto.evaluate(&(r + step)) - gto.evaluate(&(r - step))) / (2.0 * h);
            assert!((numeric - gto.derivative(&r, dir)).abs() < 1e-7, "{:?}", dir);
        }
    }
}
