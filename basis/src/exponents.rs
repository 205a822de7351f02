//! Cartesian Gaussian type function exponents.
//!
//! A Cartesian GTF of angular momentum `l` has the form
//! `x^i y^j z^k exp(-alpha r^2)` with `i + j + k = l`. There are
//! `(l + 1)(l + 2) / 2` such monomials for every `l`.

use nalgebra::Vector3;
use std::sync::OnceLock;

/// Highest angular momentum served from the precomputed table.
const CACHED_LMAX: u32 = 8;

static EXPONENT_TABLE: OnceLock<Vec<Vec<Vector3<i32>>>> = OnceLock::new();

/// Shell letter -> angular momentum.
pub fn lmap(shell: &str) -> Option<u32> {
    let l = match shell.to_ascii_lowercase().as_str() {
        "s" => 0,
        "p" | "px" | "py" | "pz" => 1,
        "d" => 2,
        "f" => 3,
        "g" => 4,
        "h" => 5,
        "i" => 6,
        "k" => 7,
        "l" => 8,
        "m" => 9,
        _ => return None,
    };
    Some(l)
}

/// Number of real spherical components (2l + 1) for a shell letter.
pub fn ml_count(shell: &str) -> Option<usize> {
    lmap(shell).map(|l| 2 * l as usize + 1)
}

/// Number of Cartesian components for angular momentum `l`.
pub fn cartesian_gtf_count(l: u32) -> usize {
    let m = l as usize + 1;
    (m + 1) * m / 2
}

/// Generates the `(i, j, k)` exponent triples with `i + j + k = l`.
///
/// Triples are enumerated with ascending `i`, then ascending `j` (`k` is
/// determined). Whether that order matches the component order of a given
/// basis-set library is a contract of the basis evaluator, not of this
/// routine.
///
/// Orders up to [`CACHED_LMAX`] are served from a table built on first use;
/// higher orders are enumerated directly. Both give identical output.
pub fn cartesian_gtf_exponents(l: u32) -> Vec<Vector3<i32>> {
    if l <= CACHED_LMAX {
        let table = EXPONENT_TABLE.get_or_init(|| (0..=CACHED_LMAX).map(enumerate_exponents).collect());
        return table[l as usize].clone();
    }
    enumerate_exponents(l)
}

fn enumerate_exponents(l: u32) -> Vec<Vector3<i32>> {
    let l = l as i32;
    let mut values = Vec::with_capacity(cartesian_gtf_count(l as u32));
    for i in 0..=l {
        for j in 0..=(l - i) {
            values.push(Vector3::new(i, j, l - i - j));
        }
    }
    values
}
