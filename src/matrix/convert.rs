//! Format conversion: to_format

use super::{Matrix, SparsityFormat, dense_len};
use crate::error::{Error, Result};

impl Matrix {
    /// Copy of this matrix in another sparsity format.
    ///
    /// Entries, values and the iso property are preserved. Converting to
    /// [`SparsityFormat::Full`] requires every entry to be present.
    pub fn to_format(&self, format: SparsityFormat) -> Result<Matrix> {
        if format == self.format {
            return Ok(self.clone());
        }
        let size = self.ty.size();
        let entries = self.entries();
        let mut out = Matrix {
            ty: self.ty.clone(),
            nrows: self.nrows,
            ncols: self.ncols,
            format,
            iso: self.iso,
            values: Vec::new(),
            bitmap: None,
            p: Vec::new(),
            h: Vec::new(),
            i: Vec::new(),
            nvals: entries.len(),
        };

        match format {
            SparsityFormat::Full => {
                let n = dense_len(self.nrows, self.ncols)?;
                if entries.len() != n {
                    return Err(Error::invalid_value(
                        "format",
                        format!(
                            "full format needs all {} entries present, {} are",
                            n,
                            entries.len()
                        ),
                    ));
                }
                // Column-major entry order is position order.
                out.values = self.gather(&entries);
            }
            SparsityFormat::Bitmap => {
                let n = dense_len(self.nrows, self.ncols)?;
                let mut bitmap = vec![0i8; n];
                if self.iso {
                    out.values = self.values.clone();
                } else {
                    out.values = vec![0u8; n * size];
                }
                for &(r, c, slot) in &entries {
                    let pos = r + c * self.nrows;
                    bitmap[pos] = 1;
                    if !self.iso {
                        out.values[pos * size..(pos + 1) * size]
                            .copy_from_slice(self.value_at(slot));
                    }
                }
                out.bitmap = Some(bitmap);
            }
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => {
                let hyper = format == SparsityFormat::Hypersparse;
                let mut p = vec![0usize];
                let mut h = Vec::new();
                if hyper {
                    for &(_, c, _) in &entries {
                        if h.last() != Some(&c) {
                            h.push(c);
                            p.push(*p.last().unwrap_or(&0));
                        }
                        if let Some(last) = p.last_mut() {
                            *last += 1;
                        }
                    }
                } else {
                    p = vec![0usize; self.ncols + 1];
                    for &(_, c, _) in &entries {
                        p[c + 1] += 1;
                    }
                    for c in 0..self.ncols {
                        p[c + 1] += p[c];
                    }
                }
                out.p = p;
                out.h = h;
                out.i = entries.iter().map(|&(r, _, _)| r).collect();
                out.values = self.gather(&entries);
            }
        }
        Ok(out)
    }

    /// Values of `entries` packed in order (or the single iso value)
    fn gather(&self, entries: &[(usize, usize, usize)]) -> Vec<u8> {
        if self.iso {
            return self.values.clone();
        }
        let mut values = Vec::with_capacity(entries.len() * self.ty.size());
        for &(_, _, slot) in entries {
            values.extend_from_slice(self.value_at(slot));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Scalar;

    fn sample() -> Matrix {
        // [1 . .]
        // [. . 3]
        // [2 . 4]
        Matrix::from_tuples(
            3,
            3,
            SparsityFormat::Sparse,
            &[(0, 0, 1i32), (2, 0, 2), (1, 2, 3), (2, 2, 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_every_format_holds_same_entries() {
        let a = sample();
        let expected = a.to_tuples::<i32>().unwrap();
        for &f in SparsityFormat::ALL.iter().filter(|f| **f != SparsityFormat::Full) {
            let b = a.to_format(f).unwrap();
            assert_eq!(b.format(), f);
            assert_eq!(b.nvals(), 4);
            assert!(b.check().is_ok(), "{} invalid", f);
            assert_eq!(b.to_tuples::<i32>().unwrap(), expected);
        }
    }

    #[test]
    fn test_hypersparse_skips_empty_columns() {
        let h = sample().to_format(SparsityFormat::Hypersparse).unwrap();
        assert_eq!(h.h, vec![0, 2]);
        assert_eq!(h.p, vec![0, 2, 4]);
    }

    #[test]
    fn test_to_full_requires_all_present() {
        assert!(sample().to_format(SparsityFormat::Full).is_err());
        let b = Matrix::bitmap_vector(&[Some(1u8), Some(2)]).unwrap();
        let f = b.to_format(SparsityFormat::Full).unwrap();
        assert_eq!(f.values(), &[1, 2]);
    }

    #[test]
    fn test_iso_survives_conversion() {
        let a = sample().into_iso(Scalar::new(7i32));
        let b = a.to_format(SparsityFormat::Bitmap).unwrap();
        assert!(b.is_iso());
        assert_eq!(b.values().len(), 4);
        assert_eq!(b.get::<i32>(2, 2).unwrap(), 7);
        assert!(b.check().is_ok());
    }
}
