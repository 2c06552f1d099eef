//! Common test utilities
#![allow(dead_code)]

use gbkern::context::Context;
use gbkern::dtype::Element;
use gbkern::kernel::KernelConfig;
use gbkern::mask::Mask;
use gbkern::matrix::{Matrix, SparsityFormat};
use gbkern::ops::BinaryOp;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

/// Fixed seed for every randomized test
pub const SEED: u64 = 0x6b65_726e;

/// Seeded generator
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

/// Single-threaded context with the default kernels
pub fn ctx_seq() -> Context {
    Context::new().with_nthreads(1)
}

/// Context that runs only the generic kernels
pub fn ctx_generic() -> Context {
    ctx_seq().with_kernels(KernelConfig::default().force_generic(true))
}

/// Random coordinates of an `nrows x ncols` matrix, each present with
/// probability `density`, in column-major order
pub fn random_pattern(rng: &mut StdRng, nrows: usize, ncols: usize, density: f64) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for col in 0..ncols {
        for row in 0..nrows {
            if rng.random_bool(density) {
                out.push((row, col));
            }
        }
    }
    out
}

/// Random matrix in `format`; values come from `value`.
///
/// For [`SparsityFormat::Full`] every position is filled.
pub fn random_matrix<T: Element>(
    rng: &mut StdRng,
    nrows: usize,
    ncols: usize,
    density: f64,
    format: SparsityFormat,
    mut value: impl FnMut(&mut StdRng) -> T,
) -> Matrix {
    let density = if format == SparsityFormat::Full { 1.0 } else { density };
    let tuples: Vec<(usize, usize, T)> = random_pattern(rng, nrows, ncols, density)
        .into_iter()
        .map(|(r, c)| (r, c, value(rng)))
        .collect();
    Matrix::from_tuples(nrows, ncols, format, &tuples).unwrap()
}

/// `(row, col) -> value bytes` of every entry
pub fn entry_map(m: &Matrix) -> BTreeMap<(usize, usize), Vec<u8>> {
    m.to_tuples_bytes()
        .into_iter()
        .map(|(r, c, v)| ((r, c), v))
        .collect()
}

/// Whether mask entry `(row, col)` lets a write through
fn mask_allows(mask: &Mask<'_>, row: usize, col: usize) -> bool {
    let truth = match mask.matrix().get_bytes(row, col) {
        Some(v) => mask.is_structural() || v.iter().any(|&b| b != 0),
        None => false,
    };
    truth != mask.is_complemented()
}

/// Entry-by-entry `C<M> = A .* B` computed from extracted tuples
pub fn emult_reference(
    mask: Option<&Mask<'_>>,
    op: &BinaryOp,
    a: &Matrix,
    b: &Matrix,
) -> BTreeMap<(usize, usize), Vec<u8>> {
    let a_entries = entry_map(a);
    let b_entries = entry_map(b);
    let mut out = BTreeMap::new();
    for (&(r, c), x) in &a_entries {
        let Some(y) = b_entries.get(&(r, c)) else {
            continue;
        };
        if mask.is_some_and(|m| !mask_allows(m, r, c)) {
            continue;
        }
        let mut z = vec![0u8; op.ztype().size()];
        op.apply_bytes(&mut z, x, y);
        out.insert((r, c), z);
    }
    out
}

/// Assert that a bitmap result holds only 0/1 markers and that `nvals`
/// matches its presence buffer
pub fn assert_markers_settled(m: &Matrix) {
    m.check().unwrap();
    if let Some(bitmap) = m.presence() {
        assert!(bitmap.iter().all(|&x| x == 0 || x == 1), "marker left over");
        let set = bitmap.iter().filter(|&&x| x == 1).count();
        assert_eq!(set, m.nvals());
    }
}
