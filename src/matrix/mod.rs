//! Matrices and vectors in four sparsity formats
//!
//! A [`Matrix`] stores values of one element [`Type`] as raw bytes in one of
//! the layouts of [`SparsityFormat`]. A vector is a matrix with one column.
//!
//! # Layout
//!
//! | Format | Structure | Values |
//! |--------|-----------|--------|
//! | Hypersparse | `h` (non-empty columns), `p` (len `h.len()+1`), `i` (row indices) | one per entry |
//! | Sparse | `p` (len `ncols+1`), `i` (row indices) | one per entry |
//! | Bitmap | presence buffer `b` (len `nrows*ncols`, each 0 or 1) | one per position |
//! | Full | none | one per position |
//!
//! An **iso** matrix holds exactly one value that every present entry shares;
//! its value buffer is one element long whatever the format.
//!
//! Kernels never resize a matrix in place. They build fresh buffers and the
//! caller's output is replaced only after a kernel succeeds.

mod check;
mod convert;
mod format;

pub use format::SparsityFormat;

use crate::dtype::{Caster, Element, Scalar, Type};
use crate::error::{Error, Result};
use std::ops::Range;

/// A matrix (or column vector) in one of four sparsity formats
#[derive(Clone, Debug)]
pub struct Matrix {
    pub(crate) ty: Type,
    pub(crate) nrows: usize,
    pub(crate) ncols: usize,
    pub(crate) format: SparsityFormat,
    pub(crate) iso: bool,
    pub(crate) values: Vec<u8>,
    /// Presence buffer (bitmap format only)
    pub(crate) bitmap: Option<Vec<i8>>,
    /// Column pointers (sparse and hypersparse)
    pub(crate) p: Vec<usize>,
    /// Non-empty column list (hypersparse only)
    pub(crate) h: Vec<usize>,
    /// Row indices (sparse and hypersparse)
    pub(crate) i: Vec<usize>,
    pub(crate) nvals: usize,
}

pub(crate) fn dense_len(nrows: usize, ncols: usize) -> Result<usize> {
    nrows.checked_mul(ncols).ok_or_else(|| {
        Error::invalid_value(
            "dimensions",
            format!("{} x {} is too large for a dense layout", nrows, ncols),
        )
    })
}

impl Matrix {
    /// Empty sparse matrix with no entries
    pub fn new(ty: impl Into<Type>, nrows: usize, ncols: usize) -> Self {
        Self {
            ty: ty.into(),
            nrows,
            ncols,
            format: SparsityFormat::Sparse,
            iso: false,
            values: Vec::new(),
            bitmap: None,
            p: vec![0; ncols + 1],
            h: Vec::new(),
            i: Vec::new(),
            nvals: 0,
        }
    }

    /// Full matrix from column-major values
    pub fn full<T: Element>(nrows: usize, ncols: usize, values: &[T]) -> Result<Self> {
        let n = dense_len(nrows, ncols)?;
        if values.len() != n {
            return Err(Error::invalid_value(
                "values",
                format!("expected {} values, got {}", n, values.len()),
            ));
        }
        Ok(Self {
            ty: T::DTYPE.into(),
            nrows,
            ncols,
            format: SparsityFormat::Full,
            iso: false,
            values: pack(values),
            bitmap: None,
            p: Vec::new(),
            h: Vec::new(),
            i: Vec::new(),
            nvals: n,
        })
    }

    /// Bitmap matrix from column-major values and a presence pattern.
    ///
    /// Values at absent positions are ignored and stored as zero bytes.
    pub fn bitmap<T: Element>(
        nrows: usize,
        ncols: usize,
        values: &[T],
        present: &[bool],
    ) -> Result<Self> {
        let n = dense_len(nrows, ncols)?;
        if values.len() != n || present.len() != n {
            return Err(Error::invalid_value(
                "values",
                format!(
                    "expected {} values and flags, got {} and {}",
                    n,
                    values.len(),
                    present.len()
                ),
            ));
        }
        let size = T::DTYPE.size_in_bytes();
        let mut bytes = vec![0u8; n * size];
        let mut bitmap = vec![0i8; n];
        let mut nvals = 0;
        for (pos, (&v, &b)) in values.iter().zip(present).enumerate() {
            if b {
                v.write(&mut bytes[pos * size..]);
                bitmap[pos] = 1;
                nvals += 1;
            }
        }
        Ok(Self {
            ty: T::DTYPE.into(),
            nrows,
            ncols,
            format: SparsityFormat::Bitmap,
            iso: false,
            values: bytes,
            bitmap: Some(bitmap),
            p: Vec::new(),
            h: Vec::new(),
            i: Vec::new(),
            nvals,
        })
    }

    /// Column vector in bitmap format; `None` marks an absent entry
    pub fn bitmap_vector<T: Element>(entries: &[Option<T>]) -> Result<Self> {
        let present: Vec<bool> = entries.iter().map(Option::is_some).collect();
        let values: Vec<T> = entries.iter().map(|e| e.unwrap_or_else(T::zero)).collect();
        Self::bitmap(entries.len(), 1, &values, &present)
    }

    /// Matrix in `format` from `(row, col, value)` tuples in any order.
    ///
    /// Duplicate or out-of-range indices are rejected.
    pub fn from_tuples<T: Element>(
        nrows: usize,
        ncols: usize,
        format: SparsityFormat,
        tuples: &[(usize, usize, T)],
    ) -> Result<Self> {
        let size = T::DTYPE.size_in_bytes();
        let mut bytes = vec![0u8; tuples.len() * size];
        let mut coords = Vec::with_capacity(tuples.len());
        for (k, &(r, c, v)) in tuples.iter().enumerate() {
            v.write(&mut bytes[k * size..]);
            coords.push((r, c));
        }
        Self::from_tuples_bytes(T::DTYPE.into(), nrows, ncols, format, &coords, &bytes)
    }

    /// Matrix of any type from coordinates and packed value bytes
    /// (`coords.len() * ty.size()` bytes, in the same order)
    pub fn from_tuples_bytes(
        ty: Type,
        nrows: usize,
        ncols: usize,
        format: SparsityFormat,
        coords: &[(usize, usize)],
        values: &[u8],
    ) -> Result<Self> {
        let size = ty.size();
        if values.len() != coords.len() * size {
            return Err(Error::invalid_value(
                "values",
                format!(
                    "{} bytes given for {} entries of size {}",
                    values.len(),
                    coords.len(),
                    size
                ),
            ));
        }
        let mut order: Vec<usize> = (0..coords.len()).collect();
        for &(r, c) in coords {
            if r >= nrows || c >= ncols {
                return Err(Error::invalid_value(
                    "index",
                    format!("({}, {}) is outside {} x {}", r, c, nrows, ncols),
                ));
            }
        }
        order.sort_unstable_by_key(|&k| (coords[k].1, coords[k].0));
        if let Some(w) = order.windows(2).find(|w| coords[w[0]] == coords[w[1]]) {
            let (r, c) = coords[w[0]];
            return Err(Error::invalid_value(
                "index",
                format!("duplicate entry at ({}, {})", r, c),
            ));
        }

        let mut p = vec![0usize; ncols + 1];
        let mut i = Vec::with_capacity(coords.len());
        let mut bytes = Vec::with_capacity(values.len());
        for &k in &order {
            let (r, c) = coords[k];
            p[c + 1] += 1;
            i.push(r);
            bytes.extend_from_slice(&values[k * size..(k + 1) * size]);
        }
        for c in 0..ncols {
            p[c + 1] += p[c];
        }
        let sparse = Self {
            ty,
            nrows,
            ncols,
            format: SparsityFormat::Sparse,
            iso: false,
            values: bytes,
            bitmap: None,
            p,
            h: Vec::new(),
            i,
            nvals: coords.len(),
        };
        sparse.to_format(format)
    }

    /// Turn this matrix into an iso matrix whose every entry is `value`.
    ///
    /// The pattern is kept; the element type becomes the value's type.
    pub fn into_iso(mut self, value: Scalar) -> Self {
        self.ty = value.ty().clone();
        self.values = value.as_bytes().to_vec();
        self.iso = true;
        self
    }

    /// Element type
    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Sparsity format
    #[inline]
    pub fn format(&self) -> SparsityFormat {
        self.format
    }

    /// Returns true if every present entry shares one stored value
    #[inline]
    pub fn is_iso(&self) -> bool {
        self.iso
    }

    /// Number of present entries
    #[inline]
    pub fn nvals(&self) -> usize {
        self.nvals
    }

    /// Raw value buffer
    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Presence buffer of a bitmap matrix
    #[inline]
    pub fn presence(&self) -> Option<&[i8]> {
        self.bitmap.as_deref()
    }

    /// Iso value, if this is an iso matrix
    pub fn iso_value(&self) -> Option<Scalar> {
        if self.iso {
            Scalar::from_bytes(self.ty.clone(), &self.values).ok()
        } else {
            None
        }
    }

    /// Number of stored columns (`h.len()` for hypersparse, `ncols` otherwise)
    #[inline]
    pub(crate) fn nvec(&self) -> usize {
        match self.format {
            SparsityFormat::Hypersparse => self.h.len(),
            _ => self.ncols,
        }
    }

    /// Column index of the `k`th stored column
    #[inline]
    pub(crate) fn vec_col(&self, k: usize) -> usize {
        match self.format {
            SparsityFormat::Hypersparse => self.h[k],
            _ => k,
        }
    }

    /// Entry range of column `j` of a sparse or hypersparse matrix
    pub(crate) fn col_range(&self, j: usize) -> Range<usize> {
        match self.format {
            SparsityFormat::Sparse => self.p[j]..self.p[j + 1],
            SparsityFormat::Hypersparse => match self.h.binary_search(&j) {
                Ok(k) => self.p[k]..self.p[k + 1],
                Err(_) => 0..0,
            },
            _ => unreachable!("col_range on a {} matrix", self.format),
        }
    }

    /// Whether position `pos` of a bitmap or full matrix holds an entry
    #[inline]
    pub(crate) fn is_present(&self, pos: usize) -> bool {
        match &self.bitmap {
            Some(b) => b[pos] != 0,
            None => true,
        }
    }

    /// Bytes of the value in slot `slot` (entry index for sparse formats,
    /// position for dense formats; ignored when iso)
    #[inline]
    pub(crate) fn value_at(&self, slot: usize) -> &[u8] {
        let size = self.ty.size();
        let off = if self.iso { 0 } else { slot * size };
        &self.values[off..off + size]
    }

    /// Raw bytes of entry `(row, col)`, or `None` if absent
    pub fn get_bytes(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        match self.format {
            SparsityFormat::Bitmap | SparsityFormat::Full => {
                let pos = row + col * self.nrows;
                self.is_present(pos).then(|| self.value_at(pos))
            }
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => {
                let range = self.col_range(col);
                let start = range.start;
                self.i[range]
                    .binary_search(&row)
                    .ok()
                    .map(|k| self.value_at(start + k))
            }
        }
    }

    /// Entry `(row, col)` cast to `T`.
    ///
    /// Returns `NoValue` if the entry is absent.
    pub fn get<T: Element>(&self, row: usize, col: usize) -> Result<T> {
        if row >= self.nrows || col >= self.ncols {
            return Err(Error::invalid_value(
                "index",
                format!("({}, {}) is outside {} x {}", row, col, self.nrows, self.ncols),
            ));
        }
        let bytes = self
            .get_bytes(row, col)
            .ok_or(Error::NoValue { row, col })?;
        let to: Type = T::DTYPE.into();
        let caster = Caster::new(&self.ty, &to)
            .ok_or_else(|| Error::domain_mismatch("Matrix::get", &self.ty, &to))?;
        let mut out = [0u8; 16];
        caster.apply(&mut out, bytes);
        Ok(T::read(&out))
    }

    /// `(row, col, value slot)` of every present entry, column-major
    pub(crate) fn entries(&self) -> Vec<(usize, usize, usize)> {
        let mut out = Vec::with_capacity(self.nvals);
        match self.format {
            SparsityFormat::Bitmap | SparsityFormat::Full => {
                for col in 0..self.ncols {
                    for row in 0..self.nrows {
                        let pos = row + col * self.nrows;
                        if self.is_present(pos) {
                            out.push((row, col, pos));
                        }
                    }
                }
            }
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => {
                for k in 0..self.nvec() {
                    let col = self.vec_col(k);
                    for e in self.p[k]..self.p[k + 1] {
                        out.push((self.i[e], col, e));
                    }
                }
            }
        }
        out
    }

    /// All present entries as `(row, col, value)`, column-major, cast to `T`
    pub fn to_tuples<T: Element>(&self) -> Result<Vec<(usize, usize, T)>> {
        let to: Type = T::DTYPE.into();
        let caster = Caster::new(&self.ty, &to)
            .ok_or_else(|| Error::domain_mismatch("Matrix::to_tuples", &self.ty, &to))?;
        let mut buf = [0u8; 16];
        Ok(self
            .entries()
            .into_iter()
            .map(|(r, c, slot)| {
                caster.apply(&mut buf, self.value_at(slot));
                (r, c, T::read(&buf))
            })
            .collect())
    }

    /// All present entries as `(row, col, bytes)`, column-major
    pub fn to_tuples_bytes(&self) -> Vec<(usize, usize, Vec<u8>)> {
        self.entries()
            .into_iter()
            .map(|(r, c, slot)| (r, c, self.value_at(slot).to_vec()))
            .collect()
    }
}

fn pack<T: Element>(values: &[T]) -> Vec<u8> {
    let size = T::DTYPE.size_in_bytes();
    let mut bytes = vec![0u8; values.len() * size];
    for (k, &v) in values.iter().enumerate() {
        v.write(&mut bytes[k * size..]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::error::Status;

    #[test]
    fn test_full_and_get() {
        // [1 3]
        // [2 4]
        let m = Matrix::full(2, 2, &[1i32, 2, 3, 4]).unwrap();
        assert_eq!(m.nvals(), 4);
        assert_eq!(m.get::<i32>(0, 1).unwrap(), 3);
        assert_eq!(m.get::<f64>(1, 0).unwrap(), 2.0);
    }

    #[test]
    fn test_bitmap_nvals_and_no_value() {
        let m = Matrix::bitmap_vector(&[Some(1.0f64), None, Some(3.0), None]).unwrap();
        assert_eq!(m.nvals(), 2);
        assert_eq!(m.presence().unwrap(), &[1, 0, 1, 0]);
        let err = m.get::<f64>(1, 0).unwrap_err();
        assert_eq!(err.status(), Status::NoValue);
    }

    #[test]
    fn test_from_tuples_sorts_and_rejects_duplicates() {
        let m = Matrix::from_tuples(
            3,
            3,
            SparsityFormat::Sparse,
            &[(2, 1, 5u8), (0, 1, 4), (1, 0, 7)],
        )
        .unwrap();
        assert_eq!(m.p, vec![0, 1, 3, 3]);
        assert_eq!(m.i, vec![1, 0, 2]);
        assert_eq!(
            m.to_tuples::<u8>().unwrap(),
            vec![(1, 0, 7), (0, 1, 4), (2, 1, 5)]
        );

        let dup = Matrix::from_tuples(2, 2, SparsityFormat::Sparse, &[(0, 0, 1u8), (0, 0, 2)]);
        assert!(dup.is_err());
        let oob = Matrix::from_tuples(2, 2, SparsityFormat::Sparse, &[(2, 0, 1u8)]);
        assert!(oob.is_err());
    }

    #[test]
    fn test_hypersparse_lookup() {
        let m = Matrix::from_tuples(
            4,
            1000,
            SparsityFormat::Hypersparse,
            &[(3, 999, 1i64), (0, 7, 2)],
        )
        .unwrap();
        assert_eq!(m.h, vec![7, 999]);
        assert_eq!(m.get::<i64>(3, 999).unwrap(), 1);
        assert!(m.get_bytes(0, 8).is_none());
    }

    #[test]
    fn test_iso_value() {
        let m = Matrix::full(3, 1, &[0u16; 3])
            .unwrap()
            .into_iso(Scalar::new(9u16));
        assert!(m.is_iso());
        assert_eq!(m.values().len(), 2);
        assert_eq!(m.get::<u16>(2, 0).unwrap(), 9);
        assert_eq!(m.iso_value().unwrap().get::<u16>().unwrap(), 9);
        assert!(m.check().is_ok());
    }

    #[test]
    fn test_new_is_empty_sparse() {
        let m = Matrix::new(DType::F32, 5, 2);
        assert_eq!(m.format(), SparsityFormat::Sparse);
        assert_eq!(m.nvals(), 0);
        assert!(m.check().is_ok());
    }
}
