//! Method selection for elementwise multiply
//!
//! | A, B | Mask | Method | Result |
//! |------|------|--------|--------|
//! | any sparse/hyper | any | [`SparseMerge`](EmultMethod::SparseMerge) | sparse (hyper if an operand is) |
//! | bitmap/full | sparse/hyper, not complemented | [`SparseMaskDriven`](EmultMethod::SparseMaskDriven) | sparse (hyper if the mask is) |
//! | both full | none | [`FullNoMask`](EmultMethod::FullNoMask) | full |
//! | bitmap/full, one bitmap | none | method 18 | bitmap |
//! | bitmap/full | sparse/hyper, complemented | method 19 | bitmap |
//! | bitmap/full | bitmap/full | method 20 | bitmap |

use crate::matrix::SparsityFormat;
use std::fmt;

/// Shape of the mask as far as dispatch is concerned
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaskShape {
    /// Format of the mask matrix
    pub format: SparsityFormat,
    /// Whether the mask is complemented
    pub complement: bool,
}

/// Structurally distinct method bodies for `C<M> = A .* B`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EmultMethod {
    /// Column-wise merge of sparse operands
    SparseMerge,
    /// Walk the entries of an uncomplemented sparse mask
    SparseMaskDriven,
    /// Bitmap result, no mask (method 18)
    BitmapNoMask,
    /// Bitmap result, complemented sparse mask scattered first (method 19)
    BitmapSparseComplementMask,
    /// Bitmap result, bitmap or full mask tested per position (method 20)
    BitmapDenseMask,
    /// Two full operands, no mask
    FullNoMask,
}

impl EmultMethod {
    /// Every method tag
    pub const ALL: [EmultMethod; 6] = [
        EmultMethod::SparseMerge,
        EmultMethod::SparseMaskDriven,
        EmultMethod::BitmapNoMask,
        EmultMethod::BitmapSparseComplementMask,
        EmultMethod::BitmapDenseMask,
        EmultMethod::FullNoMask,
    ];

    /// Numbered bitmap method, if this is one
    pub const fn number(self) -> Option<u8> {
        match self {
            EmultMethod::BitmapNoMask => Some(18),
            EmultMethod::BitmapSparseComplementMask => Some(19),
            EmultMethod::BitmapDenseMask => Some(20),
            _ => None,
        }
    }

    /// Returns true for the methods that produce a bitmap result
    pub const fn is_bitmap(self) -> bool {
        self.number().is_some()
    }
}

impl fmt::Display for EmultMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(n) => write!(f, "method {}", n),
            None => match self {
                EmultMethod::SparseMerge => write!(f, "sparse merge"),
                EmultMethod::SparseMaskDriven => write!(f, "sparse mask-driven"),
                _ => write!(f, "full, no mask"),
            },
        }
    }
}

/// Pick the method for `C<M> = A .* B`.
///
/// Every combination of formats and mask shape maps to exactly one method.
pub fn emult_method(a: SparsityFormat, b: SparsityFormat, mask: Option<MaskShape>) -> EmultMethod {
    if a.is_sparse_or_hyper() || b.is_sparse_or_hyper() {
        return EmultMethod::SparseMerge;
    }
    match mask {
        Some(m) if m.format.is_sparse_or_hyper() && !m.complement => EmultMethod::SparseMaskDriven,
        None if a == SparsityFormat::Full && b == SparsityFormat::Full => EmultMethod::FullNoMask,
        _ => bitmap_emult_method(a, b, mask),
    }
}

/// Pick the bitmap-result method for operands already known to be bitmap
/// or full.
///
/// # Panics
///
/// If an operand is sparse or hypersparse, if neither operand is bitmap
/// when there is no mask, or if a sparse mask is not complemented. Those
/// combinations never reach the bitmap-result path.
pub fn bitmap_emult_method(
    a: SparsityFormat,
    b: SparsityFormat,
    mask: Option<MaskShape>,
) -> EmultMethod {
    assert!(
        a.is_bitmap_or_full() && b.is_bitmap_or_full(),
        "bitmap emult needs bitmap or full operands, got {} and {}",
        a,
        b
    );
    match mask {
        None => {
            assert!(
                a == SparsityFormat::Bitmap || b == SparsityFormat::Bitmap,
                "two full operands without a mask do not produce a bitmap result"
            );
            EmultMethod::BitmapNoMask
        }
        Some(m) if m.format.is_sparse_or_hyper() => {
            assert!(
                m.complement,
                "an uncomplemented sparse mask does not produce a bitmap result"
            );
            EmultMethod::BitmapSparseComplementMask
        }
        Some(_) => EmultMethod::BitmapDenseMask,
    }
}

/// Format of the result produced by `method`
pub fn emult_result_format(
    method: EmultMethod,
    a: SparsityFormat,
    b: SparsityFormat,
    mask: Option<MaskShape>,
) -> SparsityFormat {
    match method {
        EmultMethod::SparseMerge => {
            if a == SparsityFormat::Hypersparse || b == SparsityFormat::Hypersparse {
                SparsityFormat::Hypersparse
            } else {
                SparsityFormat::Sparse
            }
        }
        EmultMethod::SparseMaskDriven => match mask {
            Some(m) if m.format == SparsityFormat::Hypersparse => SparsityFormat::Hypersparse,
            _ => SparsityFormat::Sparse,
        },
        EmultMethod::FullNoMask => SparsityFormat::Full,
        _ => SparsityFormat::Bitmap,
    }
}
