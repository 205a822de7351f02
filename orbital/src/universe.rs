//! A minimal data container for atoms, orbitals and attached fields.
//!
//! Derived tables (the frame table and the Cartesian GTF order) are computed
//! on first access and cached; invalidation is explicit.

use crate::error::{FieldError, Result};
use crate::field::Field;
use basis::{cartesian_gtf_exponents, BasisFunctions};
use nalgebra::{DMatrix, Vector3};
use periodic_table_on_an_enum::Element;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// Default coefficient column of the MO matrix.
pub const COEF_COLUMN: &str = "coef";
/// Default occupation column of the orbital table.
pub const OCCUPATION_COLUMN: &str = "occupation";
/// Conventional real-part coefficient column for angular momentum work.
pub const LREAL_COLUMN: &str = "lreal";
/// Conventional imaginary-part coefficient column for angular momentum work.
pub const LIMAG_COLUMN: &str = "limag";

/// Occupations with a smaller magnitude are treated as empty.
pub const OCCUPATION_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    pub symbol: String,
    pub position: Vector3<f64>,
    pub frame: usize,
}

impl Atom {
    pub fn new(symbol: &str, position: Vector3<f64>, frame: usize) -> Self {
        Atom {
            symbol: symbol.to_string(),
            position,
            frame,
        }
    }

    pub fn atomic_number(&self) -> Result<u32> {
        Element::from_symbol(&self.symbol)
            .map(|e| e.get_atomic_number() as u32)
            .ok_or_else(|| FieldError::UnknownElement(self.symbol.clone()))
    }
}

/// Atom count per frame, derived from the atom table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    pub atom_counts: BTreeMap<usize, usize>,
}

impl FrameTable {
    fn from_atoms(atoms: &[Atom]) -> Self {
        let mut atom_counts = BTreeMap::new();
        for atom in atoms {
            *atom_counts.entry(atom.frame).or_insert(0) += 1;
        }
        FrameTable { atom_counts }
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.atom_counts.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.atom_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_counts.is_empty()
    }
}

/// Per-orbital data columns (occupations, energies, ...).
#[derive(Debug, Clone, Default)]
pub struct OrbitalTable {
    norb: usize,
    columns: HashMap<String, Vec<f64>>,
    pub irrep: Option<Vec<usize>>,
}

impl OrbitalTable {
    pub fn new(norb: usize) -> Self {
        OrbitalTable {
            norb,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.norb
    }

    pub fn is_empty(&self) -> bool {
        self.norb == 0
    }

    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.norb {
            return Err(FieldError::ShapeMismatch {
                context: "orbital table column",
                expected: (self.norb, 1),
                found: (values.len(), 1),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn with_irreps(mut self, irreps: Vec<usize>) -> Result<Self> {
        if irreps.len() != self.norb {
            return Err(FieldError::ShapeMismatch {
                context: "orbital irreps",
                expected: (self.norb, 1),
                found: (irreps.len(), 1),
            });
        }
        self.irrep = Some(irreps);
        Ok(self)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FieldError::MissingColumn {
                table: "orbital",
                column: name.to_string(),
            })
    }

    /// Orbital indices belonging to `irrep`, in table order.
    pub fn irrep_indices(&self, irrep: usize) -> Result<Vec<usize>> {
        let labels = self
            .irrep
            .as_ref()
            .ok_or(FieldError::UnsupportedState("orbital irreps"))?;
        Ok(labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == irrep)
            .map(|(i, _)| i)
            .collect())
    }

    /// Position (within `subset`) of the last occupied orbital.
    pub fn homo(&self, column: &str, subset: &[usize]) -> Result<Option<usize>> {
        let occ = self.column(column)?;
        Ok(subset
            .iter()
            .rposition(|&i| occ.get(i).map_or(false, |o| o.abs() > OCCUPATION_TOLERANCE)))
    }
}

/// Named coefficient matrices, each (basis functions x orbitals).
#[derive(Debug, Clone, Default)]
pub struct MoMatrix {
    nbasis: usize,
    norb: usize,
    columns: HashMap<String, DMatrix<f64>>,
}

impl MoMatrix {
    pub fn new(nbasis: usize, norb: usize) -> Self {
        MoMatrix {
            nbasis,
            norb,
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, coefficients: DMatrix<f64>) -> Result<Self> {
        if coefficients.shape() != (self.nbasis, self.norb) {
            return Err(FieldError::ShapeMismatch {
                context: "coefficient matrix",
                expected: (self.nbasis, self.norb),
                found: coefficients.shape(),
            });
        }
        self.columns.insert(name.to_string(), coefficients);
        Ok(self)
    }

    pub fn nbasis(&self) -> usize {
        self.nbasis
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&DMatrix<f64>> {
        self.columns.get(name).ok_or_else(|| FieldError::MissingColumn {
            table: "momatrix",
            column: name.to_string(),
        })
    }
}

/// Ordering metadata of the basis functions.
#[derive(Debug, Clone, Default)]
pub struct BasisSetOrder {
    pub atom: Vec<usize>,
    pub irrep: Option<Vec<usize>>,
}

impl BasisSetOrder {
    pub fn irrep_indices(&self, irrep: usize) -> Result<Vec<usize>> {
        let labels = self
            .irrep
            .as_ref()
            .ok_or(FieldError::UnsupportedState("basis set order irreps"))?;
        Ok(labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == irrep)
            .map(|(i, _)| i)
            .collect())
    }
}

/// Every Cartesian exponent triple for `l = 0..=lmax`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianGtfOrder {
    pub lmax: u32,
    pub rows: Vec<(u32, Vector3<i32>)>,
}

impl CartesianGtfOrder {
    pub fn from_lmax(lmax: u32) -> Self {
        let rows = (0..=lmax)
            .flat_map(|l| cartesian_gtf_exponents(l).into_iter().map(move |e| (l, e)))
            .collect();
        CartesianGtfOrder { lmax, rows }
    }

    /// Rows belonging to angular momentum `l`.
    pub fn shell(&self, l: u32) -> Vec<Vector3<i32>> {
        self.rows.iter().filter(|(rl, _)| *rl == l).map(|(_, e)| *e).collect()
    }
}

/// Container for one molecular system across frames.
#[derive(Default)]
pub struct Universe {
    atoms: Vec<Atom>,
    frame: OnceLock<FrameTable>,
    orbital: Option<OrbitalTable>,
    momatrix: Option<MoMatrix>,
    basis_functions: Option<Arc<dyn BasisFunctions>>,
    basis_set_order: Option<BasisSetOrder>,
    cartesian_gtf_order: Option<CartesianGtfOrder>,
    field: Option<Field>,
    traits_need_update: bool,
}

impl Universe {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Universe {
            atoms,
            ..Default::default()
        }
    }

    pub fn with_orbital(mut self, orbital: OrbitalTable) -> Self {
        self.orbital = Some(orbital);
        self
    }

    pub fn with_momatrix(mut self, momatrix: MoMatrix) -> Self {
        self.momatrix = Some(momatrix);
        self
    }

    pub fn with_basis_functions(mut self, basis: Arc<dyn BasisFunctions>) -> Self {
        self.basis_functions = Some(basis);
        self
    }

    pub fn with_basis_set_order(mut self, order: BasisSetOrder) -> Self {
        self.basis_set_order = Some(order);
        self
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn set_atoms(&mut self, atoms: Vec<Atom>) {
        self.atoms = atoms;
        self.invalidate_frame();
    }

    /// Frame table, computed from the atoms on first access.
    pub fn frame(&self) -> &FrameTable {
        self.frame.get_or_init(|| FrameTable::from_atoms(&self.atoms))
    }

    pub fn invalidate_frame(&mut self) {
        self.frame.take();
    }

    /// Atomic positions of one frame.
    pub fn positions(&self, frame: usize) -> Result<Vec<Vector3<f64>>> {
        if !self.frame().contains(frame) {
            return Err(FieldError::FrameNotFound(frame));
        }
        Ok(self
            .atoms
            .iter()
            .filter(|a| a.frame == frame)
            .map(|a| a.position)
            .collect())
    }

    /// Sum of nuclear charges of one frame.
    pub fn nuclear_charge(&self, frame: usize) -> Result<u32> {
        if !self.frame().contains(frame) {
            return Err(FieldError::FrameNotFound(frame));
        }
        self.atoms
            .iter()
            .filter(|a| a.frame == frame)
            .map(Atom::atomic_number)
            .sum()
    }

    pub fn orbital(&self) -> Result<&OrbitalTable> {
        self.orbital.as_ref().ok_or(FieldError::MissingTable("orbital"))
    }

    pub fn momatrix(&self) -> Result<&MoMatrix> {
        self.momatrix.as_ref().ok_or(FieldError::MissingTable("momatrix"))
    }

    pub fn basis_functions(&self) -> Result<&Arc<dyn BasisFunctions>> {
        self.basis_functions
            .as_ref()
            .ok_or(FieldError::MissingTable("basis functions"))
    }

    pub fn basis_set_order(&self) -> Result<&BasisSetOrder> {
        self.basis_set_order
            .as_ref()
            .ok_or(FieldError::MissingTable("basis set order"))
    }

    /// Resolves a named column: the requested name if given, otherwise
    /// `default`. Either way the column must exist.
    pub fn check_column(&self, table: &'static str, requested: Option<&str>, default: &str) -> Result<String> {
        let name = requested.unwrap_or(default);
        let exists = match table {
            "orbital" => self.orbital()?.has_column(name),
            "momatrix" => self.momatrix()?.has_column(name),
            _ => return Err(FieldError::MissingTable(table)),
        };
        if !exists {
            return Err(FieldError::MissingColumn {
                table,
                column: name.to_string(),
            });
        }
        Ok(name.to_string())
    }

    /// Number of basis functions, or of those in `irrep`.
    pub fn basis_count(&self, irrep: Option<usize>) -> Result<usize> {
        match irrep {
            None => Ok(self.basis_functions()?.len()),
            Some(label) => Ok(self.basis_set_order()?.irrep_indices(label)?.len()),
        }
    }

    /// Global orbital indices of the coefficient matrix, or of `irrep`'s block.
    pub fn orbital_block(&self, irrep: Option<usize>) -> Result<Vec<usize>> {
        match irrep {
            None => {
                if let Ok(momatrix) = self.momatrix() {
                    Ok((0..momatrix.norb()).collect())
                } else {
                    Ok((0..self.basis_functions()?.len()).collect())
                }
            }
            Some(label) => self.orbital()?.irrep_indices(label),
        }
    }

    /// Square coefficient matrix for `column`, restricted to the basis rows
    /// and orbital columns of `irrep` when one is given.
    pub fn square(&self, column: &str, irrep: Option<usize>) -> Result<DMatrix<f64>> {
        let full = self.momatrix()?.column(column)?;
        match irrep {
            None => Ok(full.clone()),
            Some(label) => {
                let rows = self.basis_set_order()?.irrep_indices(label)?;
                let cols = self.orbital()?.irrep_indices(label)?;
                Ok(full.select_rows(rows.iter()).select_columns(cols.iter()))
            }
        }
    }

    pub fn compute_cartesian_gtf_order(&mut self, lmax: u32) {
        self.cartesian_gtf_order = Some(CartesianGtfOrder::from_lmax(lmax));
    }

    pub fn cartesian_gtf_order(&self) -> Result<&CartesianGtfOrder> {
        self.cartesian_gtf_order
            .as_ref()
            .ok_or(FieldError::UnsupportedState("cartesian_gtf_order"))
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    pub fn clear_field(&mut self) {
        self.field = None;
    }

    /// Adds a field, concatenating with any field already attached.
    ///
    /// With `frame` given the frame must exist and is stamped on every
    /// entry of `field`.
    pub fn append_field(&mut self, mut field: Field, frame: Option<usize>) -> Result<()> {
        if let Some(frame) = frame {
            if !self.frame().contains(frame) {
                return Err(FieldError::FrameNotFound(frame));
            }
            field.set_frame(frame);
        }
        match self.field.as_mut() {
            None => self.field = Some(field),
            Some(existing) => existing.concat(field),
        }
        self.traits_need_update = true;
        Ok(())
    }

    /// Whether cached display state is stale after a field change.
    pub fn traits_need_update(&self) -> bool {
        self.traits_need_update
    }

    pub fn mark_traits_updated(&mut self) {
        self.traits_need_update = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_frame_universe() -> Universe {
        Universe::new(vec![
            Atom::new("O", Vector3::new(0.0, 0.0, 0.0), 0),
            Atom::new("H", Vector3::new(0.0, 1.4, 1.1), 0),
            Atom::new("H", Vector3::new(0.0, -1.4, 1.1), 0),
            Atom::new("O", Vector3::new(0.1, 0.0, 0.0), 1),
        ])
    }

    #[test]
    fn test_frame_table_is_cached_and_invalidated() {
        let mut uni = two_frame_universe();
        assert_eq!(uni.frame().len(), 2);
        assert_eq!(uni.frame().atom_counts[&0], 3);

        uni.set_atoms(vec![Atom::new("He", Vector3::zeros(), 4)]);
        assert!(uni.frame().contains(4));
        assert!(!uni.frame().contains(0));
    }

    #[test]
    fn test_positions_and_charge_per_frame() {
        let uni = two_frame_universe();
        assert_eq!(uni.positions(0).unwrap().len(), 3);
        assert_eq!(uni.nuclear_charge(0).unwrap(), 10);
        assert_eq!(uni.nuclear_charge(1).unwrap(), 8);
        assert!(matches!(uni.positions(7), Err(FieldError::FrameNotFound(7))));
    }

    #[test]
    fn test_check_column_defaults() {
        let orbital = OrbitalTable::new(2).with_column(OCCUPATION_COLUMN, vec![2.0, 0.0]).unwrap();
        let uni = Universe::default().with_orbital(orbital);
        assert_eq!(uni.check_column("orbital", None, OCCUPATION_COLUMN).unwrap(), "occupation");
        assert!(matches!(
            uni.check_column("orbital", Some("lreal"), OCCUPATION_COLUMN),
            Err(FieldError::MissingColumn { .. })
        ));
        assert!(matches!(
            uni.check_column("momatrix", None, COEF_COLUMN),
            Err(FieldError::MissingTable("momatrix"))
        ));
    }

    #[test]
    fn test_square_restricts_to_irrep_block() {
        let coef = DMatrix::from_fn(3, 3, |i, j| (10 * i + j) as f64);
        let momatrix = MoMatrix::new(3, 3).with_column(COEF_COLUMN, coef).unwrap();
        let orbital = OrbitalTable::new(3)
            .with_column(OCCUPATION_COLUMN, vec![2.0, 2.0, 0.0])
            .unwrap();
        let mut uni = Universe::default().with_momatrix(momatrix).with_orbital(orbital);

        assert!(matches!(
            uni.square(COEF_COLUMN, Some(1)),
            Err(FieldError::MissingTable("basis set order"))
        ));

        uni = uni.with_basis_set_order(BasisSetOrder {
            atom: vec![0, 0, 1],
            irrep: Some(vec![0, 1, 1]),
        });
        assert!(matches!(
            uni.square(COEF_COLUMN, Some(1)),
            Err(FieldError::UnsupportedState("orbital irreps"))
        ));

        let orbital = OrbitalTable::new(3)
            .with_column(OCCUPATION_COLUMN, vec![2.0, 2.0, 0.0])
            .unwrap()
            .with_irreps(vec![1, 0, 1])
            .unwrap();
        uni = uni.with_orbital(orbital);
        let block = uni.square(COEF_COLUMN, Some(1)).unwrap();
        assert_eq!(block.shape(), (2, 2));
        assert_eq!(block[(0, 0)], 10.0);
        assert_eq!(block[(0, 1)], 12.0);
        assert_eq!(block[(1, 1)], 22.0);
    }

    #[test]
    fn test_homo_lookup() {
        let orbital = OrbitalTable::new(5)
            .with_column(OCCUPATION_COLUMN, vec![2.0, 2.0, 1.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(orbital.homo(OCCUPATION_COLUMN, &[0, 1, 2, 3, 4]).unwrap(), Some(2));
        assert_eq!(orbital.homo(OCCUPATION_COLUMN, &[3, 4]).unwrap(), None);
        assert_eq!(orbital.homo(OCCUPATION_COLUMN, &[0, 3, 4]).unwrap(), Some(0));
    }

    #[test]
    fn test_cartesian_gtf_order_requires_compute() {
        let mut uni = Universe::default();
        assert!(matches!(
            uni.cartesian_gtf_order(),
            Err(FieldError::UnsupportedState("cartesian_gtf_order"))
        ));
        uni.compute_cartesian_gtf_order(2);
        let order = uni.cartesian_gtf_order().unwrap();
        assert_eq!(order.rows.len(), 1 + 3 + 6);
        assert_eq!(order.shell(1).len(), 3);
    }

    #[test]
    fn test_append_field_checks_frame() {
        let mut uni = two_frame_universe();
        assert!(matches!(
            uni.append_field(Field::default(), Some(9)),
            Err(FieldError::FrameNotFound(9))
        ));
        assert!(!uni.traits_need_update());
        uni.append_field(Field::default(), Some(1)).unwrap();
        assert!(uni.traits_need_update());
        uni.mark_traits_updated();
        assert!(!uni.traits_need_update());
    }
}
