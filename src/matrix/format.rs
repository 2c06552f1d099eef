//! Sparsity format definitions

/// Physical layout of a matrix
///
/// All four layouts are column-oriented: a vector is a single column and
/// position `(i, j)` of a bitmap or full matrix lives at `i + j * nrows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SparsityFormat {
    /// Compressed columns, listing only the non-empty ones
    ///
    /// Column list + column pointers + row indices + values.
    /// Best for: very sparse matrices with mostly empty columns
    /// Storage: O(2 * nvec + 2 * nnz)
    Hypersparse,

    /// Compressed Sparse Column (CSC)
    ///
    /// Column pointers + row indices + values.
    /// Best for: general sparse work
    /// Storage: O(ncols + 2 * nnz)
    Sparse,

    /// Dense presence flags + dense values
    ///
    /// Best for: moderately dense results, masked elementwise work
    /// Storage: O(nrows * ncols)
    Bitmap,

    /// Dense values, every entry present
    ///
    /// Storage: O(nrows * ncols)
    Full,
}

impl SparsityFormat {
    /// Every format, sparsest first
    pub const ALL: [SparsityFormat; 4] = [
        SparsityFormat::Hypersparse,
        SparsityFormat::Sparse,
        SparsityFormat::Bitmap,
        SparsityFormat::Full,
    ];

    /// Returns true for the compressed layouts (sparse or hypersparse)
    #[inline]
    pub fn is_sparse_or_hyper(&self) -> bool {
        matches!(self, SparsityFormat::Hypersparse | SparsityFormat::Sparse)
    }

    /// Returns true for the dense layouts (bitmap or full)
    #[inline]
    pub fn is_bitmap_or_full(&self) -> bool {
        matches!(self, SparsityFormat::Bitmap | SparsityFormat::Full)
    }

    /// Returns the format name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SparsityFormat::Hypersparse => "hypersparse",
            SparsityFormat::Sparse => "sparse",
            SparsityFormat::Bitmap => "bitmap",
            SparsityFormat::Full => "full",
        }
    }
}

impl std::fmt::Display for SparsityFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display() {
        assert_eq!(SparsityFormat::Hypersparse.to_string(), "hypersparse");
        assert_eq!(SparsityFormat::Bitmap.to_string(), "bitmap");
    }

    #[test]
    fn test_format_properties() {
        assert!(SparsityFormat::Hypersparse.is_sparse_or_hyper());
        assert!(SparsityFormat::Sparse.is_sparse_or_hyper());
        assert!(!SparsityFormat::Bitmap.is_sparse_or_hyper());

        assert!(SparsityFormat::Full.is_bitmap_or_full());
        assert!(!SparsityFormat::Sparse.is_bitmap_or_full());
    }
}
