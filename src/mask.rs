//! Masks and the bitmap marker protocol
//!
//! A [`Mask`] gates which result positions may be written. Entry `(i, j)`
//! of the mask matrix is *true* when it is present and, unless the mask is
//! structural, its value is nonzero (any nonzero byte counts). A
//! complemented mask inverts that verdict.
//!
//! # Markers
//!
//! Bitmap results with a complemented sparse or hypersparse mask use a
//! three-state presence buffer so the hot loop needs no mask lookup:
//!
//! | Marker | Meaning |
//! |--------|---------|
//! | [`ABSENT`] (0) | nothing written yet, the mask allows a write |
//! | [`PRESENT`] (1) | value written |
//! | [`EXCLUDED`] (2) | the mask is true here, so the complement excludes it |
//!
//! [`Mask::scatter_excluded`] writes `EXCLUDED` for every true mask entry.
//! The elementwise pass computes only where the marker is `ABSENT` and
//! resets every `EXCLUDED` back to `ABSENT`, so the finished buffer holds
//! only 0 and 1.

use crate::error::{Error, Result};
use crate::matrix::{Matrix, SparsityFormat};
use crate::parallel::{Workers, partition};

/// Presence marker: no entry
pub const ABSENT: i8 = 0;
/// Presence marker: entry written
pub const PRESENT: i8 = 1;
/// Presence marker: excluded by a complemented mask (transient)
pub const EXCLUDED: i8 = 2;

/// A matrix used as a write gate, with its modifiers
#[derive(Clone, Copy, Debug)]
pub struct Mask<'a> {
    matrix: &'a Matrix,
    structural: bool,
    complement: bool,
}

impl<'a> Mask<'a> {
    /// Valued, uncomplemented mask
    pub fn new(matrix: &'a Matrix) -> Self {
        Self {
            matrix,
            structural: false,
            complement: false,
        }
    }

    /// Use presence only; values are ignored
    pub fn structural(mut self) -> Self {
        self.structural = true;
        self
    }

    /// Invert the gate
    pub fn complement(mut self) -> Self {
        self.complement = !self.complement;
        self
    }

    /// The mask matrix
    #[inline]
    pub fn matrix(&self) -> &'a Matrix {
        self.matrix
    }

    /// Returns true if only presence matters
    #[inline]
    pub fn is_structural(&self) -> bool {
        self.structural
    }

    /// Returns true if the gate is inverted
    #[inline]
    pub fn is_complemented(&self) -> bool {
        self.complement
    }

    /// Sparsity format of the mask matrix
    #[inline]
    pub fn format(&self) -> SparsityFormat {
        self.matrix.format()
    }

    /// Check the mask against the result shape.
    ///
    /// A valued mask must have a built-in type, since its values are tested
    /// for truth.
    pub(crate) fn validate(&self, nrows: usize, ncols: usize) -> Result<()> {
        if self.matrix.shape() != (nrows, ncols) {
            return Err(Error::DimensionMismatch {
                expected: (nrows, ncols),
                got: self.matrix.shape(),
            });
        }
        if !self.structural && self.matrix.ty().is_user_defined() {
            return Err(Error::domain_mismatch(
                "mask",
                self.matrix.ty(),
                "a built-in type or a structural mask",
            ));
        }
        Ok(())
    }

    /// Truth of the stored value in `slot`
    #[inline]
    pub(crate) fn value_true(&self, slot: usize) -> bool {
        self.structural || self.matrix.value_at(slot).iter().any(|&b| b != 0)
    }

    /// Mask truth at position `pos` of a bitmap or full mask, before the
    /// complement is applied
    #[inline]
    pub(crate) fn test_pos(&self, pos: usize) -> bool {
        self.matrix.is_present(pos) && self.value_true(pos)
    }

    /// Whether the gate allows writing position `pos` (bitmap or full mask)
    #[inline]
    pub(crate) fn allows_pos(&self, pos: usize) -> bool {
        self.test_pos(pos) != self.complement
    }

    /// Whether the gate allows writing `(row, col)`, for a mask in any format
    pub(crate) fn allows(&self, row: usize, col: usize) -> bool {
        let m = self.matrix;
        let mij = match m.format() {
            SparsityFormat::Bitmap | SparsityFormat::Full => self.test_pos(row + col * m.nrows()),
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => {
                let range = m.col_range(col);
                let start = range.start;
                match m.i[range].binary_search(&row) {
                    Ok(k) => self.value_true(start + k),
                    Err(_) => false,
                }
            }
        };
        mij != self.complement
    }

    /// Mark every true entry of a sparse or hypersparse mask as
    /// [`EXCLUDED`] in the presence buffer `cb` (length `nrows * ncols`).
    ///
    /// Columns are split across tasks, so each task owns a disjoint slice.
    pub(crate) fn scatter_excluded(&self, cb: &mut [i8], workers: Workers<'_>, ntasks: usize) {
        let m = self.matrix;
        assert!(
            m.format().is_sparse_or_hyper(),
            "scatter needs a sparse or hypersparse mask, got {}",
            m.format()
        );
        let nrows = m.nrows();
        debug_assert_eq!(cb.len(), nrows * m.ncols());
        let ranges = partition(m.ncols(), ntasks);
        workers.map_mut(cb, nrows, &ranges, |_, cols, piece| {
            let base = cols.start * nrows;
            let (k0, k1) = match m.format() {
                SparsityFormat::Hypersparse => (
                    m.h.partition_point(|&c| c < cols.start),
                    m.h.partition_point(|&c| c < cols.end),
                ),
                _ => (cols.start, cols.end),
            };
            for k in k0..k1 {
                let col = m.vec_col(k);
                for e in m.p[k]..m.p[k + 1] {
                    if self.value_true(e) {
                        piece[m.i[e] + col * nrows - base] = EXCLUDED;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_valued_mask_ignores_false_values() {
        let m = Matrix::bitmap_vector(&[Some(1u8), Some(0), None]).unwrap();
        let mask = Mask::new(&m);
        assert!(mask.allows_pos(0));
        assert!(!mask.allows_pos(1));
        assert!(!mask.allows_pos(2));

        let structural = Mask::new(&m).structural();
        assert!(structural.allows_pos(1));

        let comp = Mask::new(&m).complement();
        assert!(!comp.allows_pos(0));
        assert!(comp.allows_pos(1));
        assert!(comp.allows_pos(2));
    }

    #[test]
    fn test_float_negative_zero_is_true() {
        let m = Matrix::full(2, 1, &[-0.0f64, 0.0]).unwrap();
        let mask = Mask::new(&m);
        assert!(mask.allows(0, 0));
        assert!(!mask.allows(1, 0));
    }

    #[test]
    fn test_sparse_lookup() {
        let m = Matrix::from_tuples(4, 2, SparsityFormat::Hypersparse, &[(3, 1, true)]).unwrap();
        let mask = Mask::new(&m);
        assert!(mask.allows(3, 1));
        assert!(!mask.allows(3, 0));
        assert!(Mask::new(&m).complement().allows(0, 0));
    }

    #[test]
    fn test_scatter_marks_excluded() {
        let m = Matrix::from_tuples(
            3,
            2,
            SparsityFormat::Sparse,
            &[(0, 0, 1i32), (2, 1, 0), (1, 1, 5)],
        )
        .unwrap();
        let mut cb = vec![ABSENT; 6];
        Mask::new(&m)
            .complement()
            .scatter_excluded(&mut cb, Workers::sequential(), 2);
        // (2,1) holds a zero value, so it is not excluded
        assert_eq!(cb, vec![EXCLUDED, 0, 0, 0, EXCLUDED, 0]);
    }

    #[test]
    fn test_validate() {
        let m = Matrix::new(DType::Bool, 2, 2);
        assert!(Mask::new(&m).validate(2, 2).is_ok());
        assert!(Mask::new(&m).validate(2, 3).is_err());
        let u = crate::dtype::UserType::new("blob", 4);
        let um = Matrix::new(u, 2, 2);
        assert!(Mask::new(&um).validate(2, 2).is_err());
        assert!(Mask::new(&um).structural().validate(2, 2).is_ok());
    }
}
