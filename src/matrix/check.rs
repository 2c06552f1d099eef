//! Format invariant validation

use super::{Matrix, SparsityFormat};
use crate::error::{Error, Result};

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidObject(reason.into())
}

impl Matrix {
    /// Validate the format invariants.
    ///
    /// Returns `InvalidObject` naming the first violation found:
    /// - iso matrices hold exactly one value;
    /// - bitmap presence entries are 0 or 1 and `nvals` equals their count;
    /// - full matrices have every entry present;
    /// - sparse and hypersparse pointers are monotone, row indices are in
    ///   range and strictly increasing within each column.
    pub fn check(&self) -> Result<()> {
        let size = self.ty.size();
        let slots = match self.format {
            SparsityFormat::Bitmap | SparsityFormat::Full => self
                .nrows
                .checked_mul(self.ncols)
                .ok_or_else(|| invalid("dense dimensions overflow"))?,
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => self.i.len(),
        };
        let expected_values = if self.iso { size } else { slots * size };
        if self.values.len() != expected_values {
            return Err(invalid(format!(
                "value buffer holds {} bytes, expected {}",
                self.values.len(),
                expected_values
            )));
        }

        match self.format {
            SparsityFormat::Full => {
                if self.bitmap.is_some() {
                    return Err(invalid("full matrix carries a presence buffer"));
                }
                if self.nvals != slots {
                    return Err(invalid(format!(
                        "full matrix declares {} entries, has {}",
                        self.nvals, slots
                    )));
                }
            }
            SparsityFormat::Bitmap => {
                let bitmap = self
                    .bitmap
                    .as_ref()
                    .ok_or_else(|| invalid("bitmap matrix has no presence buffer"))?;
                if bitmap.len() != slots {
                    return Err(invalid("presence buffer length differs from nrows * ncols"));
                }
                let mut count = 0;
                for (pos, &b) in bitmap.iter().enumerate() {
                    match b {
                        0 => {}
                        1 => count += 1,
                        other => {
                            return Err(invalid(format!(
                                "presence entry {} is {}, expected 0 or 1",
                                pos, other
                            )));
                        }
                    }
                }
                if count != self.nvals {
                    return Err(invalid(format!(
                        "bitmap declares {} entries, presence buffer has {}",
                        self.nvals, count
                    )));
                }
            }
            SparsityFormat::Sparse | SparsityFormat::Hypersparse => {
                if self.bitmap.is_some() {
                    return Err(invalid("sparse matrix carries a presence buffer"));
                }
                let nvec = if self.format == SparsityFormat::Hypersparse {
                    for w in self.h.windows(2) {
                        if w[0] >= w[1] {
                            return Err(invalid("hypersparse column list not increasing"));
                        }
                    }
                    if self.h.last().is_some_and(|&c| c >= self.ncols) {
                        return Err(invalid("hypersparse column index out of range"));
                    }
                    self.h.len()
                } else {
                    if !self.h.is_empty() {
                        return Err(invalid("sparse matrix carries a column list"));
                    }
                    self.ncols
                };
                if self.p.len() != nvec + 1 || self.p[0] != 0 {
                    return Err(invalid("column pointer array malformed"));
                }
                if self.p[nvec] != self.i.len() || self.nvals != self.i.len() {
                    return Err(invalid(format!(
                        "declares {} entries, pointers end at {}, {} row indices",
                        self.nvals,
                        self.p[nvec],
                        self.i.len()
                    )));
                }
                for k in 0..nvec {
                    let (start, end) = (self.p[k], self.p[k + 1]);
                    if start > end {
                        return Err(invalid("column pointers decrease"));
                    }
                    let rows = &self.i[start..end];
                    if rows.iter().any(|&r| r >= self.nrows) {
                        return Err(invalid("row index out of range"));
                    }
                    if rows.windows(2).any(|w| w[0] >= w[1]) {
                        return Err(invalid("row indices not increasing within a column"));
                    }
                }
            }
        }
        Ok(())
    }
}
