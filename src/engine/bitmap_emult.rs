//! Bitmap and full results of `A .* B` (methods 18, 19, 20 and full)
//!
//! Both operands are bitmap or full, so every position `pos` in
//! `[0, nrows * ncols)` addresses the same entry in A, B and C. Positions
//! are split into contiguous chunks; each chunk owns its slice of C's value
//! and presence buffers and counts what it wrote.

use super::emult::EmultJob;
use crate::dispatch::EmultMethod;
use crate::kernel::BinaryCell;
use crate::mask::{ABSENT, PRESENT};
use crate::matrix::Matrix;
use crate::parallel::partition;

/// Methods 18, 19 and 20
pub(super) fn bitmap<C: BinaryCell>(job: &EmultJob<'_>, cell: &C) -> Matrix {
    let (a, b) = (job.a, job.b);
    let n = a.nrows * a.ncols;
    let csize = job.csize();
    let mut cx = vec![0u8; n * csize];
    let mut cb = vec![ABSENT; n];

    if job.method == EmultMethod::BitmapSparseComplementMask {
        match job.mask {
            Some(mask) => mask.scatter_excluded(&mut cb, job.workers, job.ntasks),
            None => unreachable!("method 19 without a mask"),
        }
    }

    let ranges = partition(n, job.ntasks);
    let counts = job
        .workers
        .map_mut2(&mut cx, csize, &mut cb, 1, &ranges, |_, r, cx, cb| {
            let base = r.start;
            let mut count = 0usize;
            let mut write = |pos: usize, cx: &mut [u8], cb: &mut [i8]| {
                let k = pos - base;
                cell.apply(&mut cx[k * csize..][..csize], a.value_at(pos), b.value_at(pos));
                cb[k] = PRESENT;
                count += 1;
            };
            match (job.method, job.mask) {
                (EmultMethod::BitmapNoMask, _) => {
                    for pos in r {
                        if a.is_present(pos) && b.is_present(pos) {
                            write(pos, cx, cb);
                        }
                    }
                }
                (EmultMethod::BitmapSparseComplementMask, _) => {
                    // only ABSENT may be computed; EXCLUDED goes back to ABSENT
                    for pos in r {
                        if cb[pos - base] != ABSENT {
                            cb[pos - base] = ABSENT;
                        } else if a.is_present(pos) && b.is_present(pos) {
                            write(pos, cx, cb);
                        }
                    }
                }
                (EmultMethod::BitmapDenseMask, Some(mask)) => {
                    for pos in r {
                        if a.is_present(pos) && b.is_present(pos) && mask.allows_pos(pos) {
                            write(pos, cx, cb);
                        }
                    }
                }
                (method, _) => unreachable!("{} is not a bitmap method", method),
            }
            count
        });

    let nvals = counts.iter().sum();
    job.output(cx, Some(cb), Vec::new(), Vec::new(), Vec::new(), nvals)
}

/// Two full operands, no mask
pub(super) fn full<C: BinaryCell>(job: &EmultJob<'_>, cell: &C) -> Matrix {
    let (a, b) = (job.a, job.b);
    let n = a.nrows * a.ncols;
    let csize = job.csize();
    let mut cx = vec![0u8; n * csize];
    let ranges = partition(n, job.ntasks);
    job.workers.map_mut(&mut cx, csize, &ranges, |_, r, cx| {
        let base = r.start;
        for pos in r {
            cell.apply(
                &mut cx[(pos - base) * csize..][..csize],
                a.value_at(pos),
                b.value_at(pos),
            );
        }
    });
    job.output(cx, None, Vec::new(), Vec::new(), Vec::new(), n)
}
