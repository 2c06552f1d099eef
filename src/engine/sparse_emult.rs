//! Sparse and hypersparse results of `A .* B`
//!
//! Built in two passes over the result's columns: count the entries of
//! each column, turn the counts into column pointers, then fill row indices
//! and values. Both passes visit entries in the same order, so every chunk
//! knows exactly which slice of the output it owns.

use super::emult::EmultJob;
use crate::kernel::BinaryCell;
use crate::matrix::{Matrix, SparsityFormat};
use crate::parallel::partition;
use std::ops::Range;

/// Entry visitor: `f(row, a_slot, b_slot)` for every result entry of one
/// result column
type Visit<'f> = &'f mut dyn FnMut(usize, usize, usize);

/// Sorted intersection of two sorted index lists
fn intersect(x: &[usize], y: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(x.len().min(y.len()));
    let (mut p, mut q) = (0, 0);
    while p < x.len() && q < y.len() {
        match x[p].cmp(&y[q]) {
            std::cmp::Ordering::Less => p += 1,
            std::cmp::Ordering::Greater => q += 1,
            std::cmp::Ordering::Equal => {
                out.push(x[p]);
                p += 1;
                q += 1;
            }
        }
    }
    out
}

/// Any mask; at least one operand sparse or hypersparse
pub(super) fn merge<C: BinaryCell>(job: &EmultJob<'_>, cell: &C) -> Matrix {
    let (a, b) = (job.a, job.b);
    let nrows = a.nrows;
    let cols: Vec<usize> = match (a.format, b.format) {
        (SparsityFormat::Hypersparse, SparsityFormat::Hypersparse) => intersect(&a.h, &b.h),
        (SparsityFormat::Hypersparse, _) => a.h.clone(),
        (_, SparsityFormat::Hypersparse) => b.h.clone(),
        _ => (0..a.ncols).collect(),
    };
    let a_sparse = a.format.is_sparse_or_hyper();
    let b_sparse = b.format.is_sparse_or_hyper();
    let allows = |row: usize, col: usize| job.mask.is_none_or(|m| m.allows(row, col));

    build(job, cell, &cols, |k, f| {
        let col = cols[k];
        match (a_sparse, b_sparse) {
            (true, true) => {
                let (ra, rb) = (a.col_range(col), b.col_range(col));
                let (mut p, mut q) = (ra.start, rb.start);
                while p < ra.end && q < rb.end {
                    let (ia, ib) = (a.i[p], b.i[q]);
                    if ia < ib {
                        p += 1;
                    } else if ib < ia {
                        q += 1;
                    } else {
                        if allows(ia, col) {
                            f(ia, p, q);
                        }
                        p += 1;
                        q += 1;
                    }
                }
            }
            (true, false) => {
                for p in a.col_range(col) {
                    let pos = a.i[p] + col * nrows;
                    if b.is_present(pos) && allows(a.i[p], col) {
                        f(a.i[p], p, pos);
                    }
                }
            }
            (false, true) => {
                for q in b.col_range(col) {
                    let pos = b.i[q] + col * nrows;
                    if a.is_present(pos) && allows(b.i[q], col) {
                        f(b.i[q], pos, q);
                    }
                }
            }
            (false, false) => unreachable!("sparse merge with two dense operands"),
        }
    })
}

/// A and B bitmap or full; the mask is sparse or hypersparse and not
/// complemented, so only its true entries can appear in the result
pub(super) fn mask_driven<C: BinaryCell>(job: &EmultJob<'_>, cell: &C) -> Matrix {
    let (a, b) = (job.a, job.b);
    let Some(mask) = job.mask else {
        unreachable!("mask-driven emult without a mask")
    };
    let m = mask.matrix();
    debug_assert!(m.format.is_sparse_or_hyper() && !mask.is_complemented());
    let nrows = a.nrows;
    let cols: Vec<usize> = (0..m.nvec()).map(|k| m.vec_col(k)).collect();

    build(job, cell, &cols, |k, f| {
        let col = cols[k];
        for e in m.p[k]..m.p[k + 1] {
            let row = m.i[e];
            let pos = row + col * nrows;
            if mask.value_true(e) && a.is_present(pos) && b.is_present(pos) {
                f(row, pos, pos);
            }
        }
    })
}

/// Two-pass construction over `cols`; `visit(k, f)` reports the entries of
/// result column `cols[k]` in increasing row order
fn build<C, V>(job: &EmultJob<'_>, cell: &C, cols: &[usize], visit: V) -> Matrix
where
    C: BinaryCell,
    V: Fn(usize, Visit<'_>) + Sync,
{
    let (a, b) = (job.a, job.b);
    let csize = job.csize();
    let ranges = partition(cols.len(), job.ntasks);

    // pass 1: entries per column
    let mut counts = vec![0usize; cols.len()];
    job.workers.map_mut(&mut counts, 1, &ranges, |_, r, counts| {
        for (slot, k) in counts.iter_mut().zip(r) {
            visit(k, &mut |_, _, _| *slot += 1);
        }
    });

    let mut p = Vec::with_capacity(cols.len() + 1);
    p.push(0usize);
    for &n in &counts {
        p.push(p[p.len() - 1] + n);
    }
    let nvals = p[cols.len()];

    // pass 2: fill; chunk t owns entries p[r.start]..p[r.end]
    let mut ci = vec![0usize; nvals];
    let mut cx = vec![0u8; nvals * csize];
    let entry_ranges: Vec<Range<usize>> = ranges.iter().map(|r| p[r.start]..p[r.end]).collect();
    job.workers
        .map_mut2(&mut ci, 1, &mut cx, csize, &entry_ranges, |t, _, ci, cx| {
            let mut at = 0usize;
            for k in ranges[t].clone() {
                visit(k, &mut |row, sa, sb| {
                    ci[at] = row;
                    cell.apply(&mut cx[at * csize..][..csize], a.value_at(sa), b.value_at(sb));
                    at += 1;
                });
            }
        });

    match job.format {
        SparsityFormat::Hypersparse => {
            let mut h = Vec::new();
            let mut hp = vec![0usize];
            for (k, &col) in cols.iter().enumerate() {
                if p[k + 1] > p[k] {
                    h.push(col);
                    hp.push(p[k + 1]);
                }
            }
            job.output(cx, None, hp, h, ci, nvals)
        }
        _ => {
            debug_assert_eq!(cols.len(), a.ncols);
            job.output(cx, None, p, Vec::new(), ci, nvals)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        assert_eq!(intersect(&[1, 4, 7, 9], &[0, 4, 9, 12]), vec![4, 9]);
        assert!(intersect(&[], &[1]).is_empty());
    }
}
