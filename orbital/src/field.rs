//! Grid-tagged field values and their attachment to a [`Universe`].

use crate::error::{FieldError, Result};
use crate::grid::GridSpec;
use crate::universe::Universe;
use nalgebra::DVector;

/// Values of one field on its grid.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Scalar(DVector<f64>),
    /// x, y and z components.
    Vector([DVector<f64>; 3]),
}

impl FieldValues {
    /// Number of grid points covered.
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Scalar(v) => v.len(),
            FieldValues::Vector(c) => c[0].len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Option<&DVector<f64>> {
        match self {
            FieldValues::Scalar(v) => Some(v),
            FieldValues::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[DVector<f64>; 3]> {
        match self {
            FieldValues::Vector(c) => Some(c),
            FieldValues::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub label: String,
    pub grid: GridSpec,
    pub values: FieldValues,
}

/// An ordered collection of field entries, each with its own grid.
///
/// Concatenating fields collects entries; values are never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    entries: Vec<FieldEntry>,
}

impl Field {
    pub fn new(entries: Vec<FieldEntry>) -> Result<Self> {
        for entry in &entries {
            if let FieldValues::Vector(c) = &entry.values {
                if c.iter().any(|v| v.len() != c[0].len()) {
                    return Err(FieldError::ShapeMismatch {
                        context: "vector field components",
                        expected: (c[0].len(), 3),
                        found: (c[1].len().max(c[2].len()), 3),
                    });
                }
            }
            if entry.values.len() != entry.grid.npoints() {
                return Err(FieldError::ShapeMismatch {
                    context: "field values vs grid points",
                    expected: (entry.grid.npoints(), 1),
                    found: (entry.values.len(), 1),
                });
            }
        }
        Ok(Field { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn grid(&self, index: usize) -> Option<&GridSpec> {
        self.entries.get(index).map(|e| &e.grid)
    }

    pub fn values(&self, index: usize) -> Option<&FieldValues> {
        self.entries.get(index).map(|e| &e.values)
    }

    pub fn set_frame(&mut self, frame: usize) {
        for entry in &mut self.entries {
            entry.grid.frame = frame;
        }
    }

    pub fn concat(&mut self, other: Field) {
        self.entries.extend(other.entries);
    }
}

/// Pairs each value array with its grid and label.
pub fn make_field(values: Vec<FieldValues>, labels: Vec<String>, grids: &[GridSpec]) -> Result<Field> {
    if values.len() != grids.len() || labels.len() != grids.len() {
        return Err(FieldError::ShapeMismatch {
            context: "field arrays vs grids",
            expected: (grids.len(), 1),
            found: (values.len(), labels.len()),
        });
    }
    let entries = values
        .into_iter()
        .zip(labels)
        .zip(grids)
        .map(|((values, label), grid)| FieldEntry {
            label,
            grid: *grid,
            values,
        })
        .collect();
    Field::new(entries)
}

/// Where a finished field goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Attach to the universe instead of returning the field.
    pub inplace: bool,
    /// Drop any previously attached field first.
    pub replace: bool,
}

impl Default for Attachment {
    fn default() -> Self {
        Attachment {
            inplace: true,
            replace: false,
        }
    }
}

/// Returns the field, or attaches it and returns `None`.
pub fn attach_field(uni: &mut Universe, field: Field, attachment: Attachment) -> Result<Option<Field>> {
    if !attachment.inplace {
        return Ok(Some(field));
    }
    if attachment.replace {
        uni.clear_field();
    }
    uni.append_field(field, None)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn grid(n: usize) -> GridSpec {
        GridSpec::new(Vector3::zeros(), Vector3::repeat(0.5), [n, 1, 1], 0).unwrap()
    }

    #[test]
    fn test_make_field_pairs_values_with_grids() {
        let grids = vec![grid(3), grid(3)];
        let values = vec![
            FieldValues::Scalar(DVector::from_vec(vec![1.0, 2.0, 3.0])),
            FieldValues::Scalar(DVector::from_vec(vec![0.0, 0.0, 1.0])),
        ];
        let field = make_field(values, vec!["a".into(), "b".into()], &grids).unwrap();
        assert_eq!(field.len(), 2);
        assert_eq!(field.entries()[1].label, "b");
        assert_eq!(field.grid(0).map(|g| g.npoints()), Some(3));
    }

    #[test]
    fn test_make_field_rejects_wrong_length() {
        let values = vec![FieldValues::Scalar(DVector::zeros(4))];
        assert!(matches!(
            make_field(values, vec!["a".into()], &[grid(3)]),
            Err(FieldError::ShapeMismatch { .. })
        ));
        assert!(make_field(vec![], vec![], &[grid(3)]).is_err());
    }

    #[test]
    fn test_returned_field_leaves_universe_untouched() {
        let mut uni = Universe::default();
        let field = make_field(vec![FieldValues::Scalar(DVector::zeros(2))], vec!["a".into()], &[grid(2)]).unwrap();
        let attachment = Attachment {
            inplace: false,
            replace: false,
        };
        let returned = attach_field(&mut uni, field.clone(), attachment).unwrap();
        assert_eq!(returned, Some(field));
        assert!(uni.field().is_none());
        assert!(!uni.traits_need_update());
    }
}
