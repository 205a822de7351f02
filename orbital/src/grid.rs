//! Regular Cartesian grids for field evaluation.
//!
//! A [`GridSpec`] is an origin, a step per axis and a point count per axis.
//! Points are laid out with `x` varying slowest and `z` fastest, the cube
//! file convention.

use crate::error::{FieldError, Result};
use itertools::iproduct;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Margin (bohr) added around the atoms when no grid is given.
pub const DEFAULT_MARGIN: f64 = 5.0;

/// Points per axis when no count is given.
pub const DEFAULT_POINTS: usize = 41;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin: Vector3<f64>,
    pub spacing: Vector3<f64>,
    pub counts: [usize; 3],
    pub frame: usize,
}

impl GridSpec {
    pub fn new(origin: Vector3<f64>, spacing: Vector3<f64>, counts: [usize; 3], frame: usize) -> Result<Self> {
        if counts.iter().any(|&n| n == 0) {
            return Err(FieldError::InvalidGrid(format!("point counts must be positive, got {:?}", counts)));
        }
        if spacing.iter().any(|&d| !(d > 0.0) || !d.is_finite()) {
            return Err(FieldError::InvalidGrid(format!(
                "spacing must be positive, got [{}, {}, {}]",
                spacing.x, spacing.y, spacing.z
            )));
        }
        Ok(GridSpec {
            origin,
            spacing,
            counts,
            frame,
        })
    }

    /// Grid spanning `[min, max]` with `counts` points per axis, ends included.
    pub fn from_bounds(min: Vector3<f64>, max: Vector3<f64>, counts: [usize; 3], frame: usize) -> Result<Self> {
        let mut spacing = Vector3::zeros();
        for axis in 0..3 {
            if counts[axis] < 2 {
                return Err(FieldError::InvalidGrid(format!(
                    "at least two points are needed along axis {} to span a range",
                    axis
                )));
            }
            spacing[axis] = (max[axis] - min[axis]) / (counts[axis] - 1) as f64;
        }
        GridSpec::new(min, spacing, counts, frame)
    }

    pub fn npoints(&self) -> usize {
        self.counts.iter().product()
    }

    /// Volume per grid point, `dx * dy * dz`.
    pub fn volume_element(&self) -> f64 {
        self.spacing.x * self.spacing.y * self.spacing.z
    }

    pub fn max_corner(&self) -> Vector3<f64> {
        let mut corner = self.origin;
        for axis in 0..3 {
            corner[axis] += (self.counts[axis] - 1) as f64 * self.spacing[axis];
        }
        corner
    }

    pub fn axis_values(&self, axis: usize) -> Vec<f64> {
        (0..self.counts[axis])
            .map(|i| self.origin[axis] + i as f64 * self.spacing[axis])
            .collect()
    }

    pub fn coordinates(&self) -> GridCoordinates {
        let xs = self.axis_values(0);
        let ys = self.axis_values(1);
        let zs = self.axis_values(2);

        let n = self.npoints();
        let mut coords = GridCoordinates {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        };
        for (x, y, z) in iproduct!(xs.iter(), ys.iter(), zs.iter()) {
            coords.x.push(*x);
            coords.y.push(*y);
            coords.z.push(*z);
        }
        coords
    }
}

/// Flattened coordinates of every grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCoordinates {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl GridCoordinates {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn position(&self, p: usize) -> Vector3<f64> {
        Vector3::new(self.x[p], self.y[p], self.z[p])
    }
}

/// User-facing grid parameters; every field is optional.
///
/// Resolution order: `origin` + `spacing`, then `origin` + `extent`
/// (the far corner), then the bounding box of the atoms widened by
/// `margin`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    pub origin: Option<[f64; 3]>,
    pub spacing: Option<[f64; 3]>,
    pub extent: Option<[f64; 3]>,
    pub counts: Option<[usize; 3]>,
    pub margin: Option<f64>,
    pub frame: Option<usize>,
}

impl FieldParams {
    pub fn with_defaults(mut self) -> Self {
        if self.counts.is_none() {
            self.counts = Some([DEFAULT_POINTS; 3]);
        }
        if self.margin.is_none() {
            self.margin = Some(DEFAULT_MARGIN);
        }
        if self.frame.is_none() {
            self.frame = Some(0);
        }
        self
    }

    pub fn frame(&self) -> usize {
        self.frame.unwrap_or(0)
    }
}

/// Resolves one grid per requested field.
///
/// `count` is the number of value arrays that will be attached (one per
/// orbital, or one for a density). `atoms` are the positions of the frame
/// the grid belongs to and are only consulted when `params` does not fix
/// the grid.
pub fn resolve_grid(params: Option<&FieldParams>, atoms: Option<&[Vector3<f64>]>, count: usize) -> Result<Vec<GridSpec>> {
    if count == 0 {
        return Err(FieldError::InvalidGrid("no fields requested".to_string()));
    }
    let params = params.cloned().unwrap_or_default().with_defaults();
    let counts = params.counts.unwrap_or([DEFAULT_POINTS; 3]);
    let frame = params.frame();

    let spec = match (params.origin, params.spacing, params.extent) {
        (Some(origin), Some(spacing), _) => GridSpec::new(origin.into(), spacing.into(), counts, frame)?,
        (Some(origin), None, Some(extent)) => GridSpec::from_bounds(origin.into(), extent.into(), counts, frame)?,
        _ => {
            let atoms = match atoms {
                Some(a) if !a.is_empty() => a,
                _ => return Err(FieldError::NoGridSource),
            };
            let margin = params.margin.unwrap_or(DEFAULT_MARGIN);
            let (min, max) = bounding_box(atoms);
            let pad = Vector3::repeat(margin);
            GridSpec::from_bounds(min - pad, max + pad, counts, frame)?
        }
    };

    Ok(vec![spec; count])
}

fn bounding_box(points: &[Vector3<f64>]) -> (Vector3<f64>, Vector3<f64>) {
    points.iter().fold(
        (Vector3::repeat(f64::INFINITY), Vector3::repeat(f64::NEG_INFINITY)),
        |(min, max), p| (min.inf(p), max.sup(p)),
    )
}
