//! Partition & reduce protocol
//!
//! Every kernel runs the same way:
//!
//! 1. pick a task count from a work estimate ([`nthreads_for`]);
//! 2. split `[0, n)` into that many contiguous, equal-size chunks
//!    ([`partition`]). The split depends only on `(n, ntasks)`;
//! 3. run each chunk on its own disjoint slice of the output with a private
//!    accumulator ([`Workers::map`], [`Workers::map_mut`],
//!    [`Workers::map_mut2`]);
//! 4. after the join, combine the accumulators in chunk order.
//!
//! No chunk ever sees another chunk's accumulator, and output slices are
//! split with `split_at_mut`, so no locking is needed.

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::ops::Range;

/// Default work units per task
pub const DEFAULT_CHUNK: usize = 64 * 1024;

/// Task count for `work` units: one task per `chunk` units, at least one and
/// at most `nthreads_max`.
pub fn nthreads_for(work: usize, chunk: usize, nthreads_max: usize) -> usize {
    let chunk = chunk.max(1);
    (work / chunk).clamp(1, nthreads_max.max(1))
}

/// First index of chunk `k` when `[0, n)` is split into `ntasks` chunks
#[inline]
pub fn partition_start(k: usize, n: usize, ntasks: usize) -> usize {
    if k >= ntasks {
        n
    } else {
        ((k as u128 * n as u128) / ntasks as u128) as usize
    }
}

/// Split `[0, n)` into `ntasks` contiguous chunks; chunk `k` is
/// `[k*n/ntasks, (k+1)*n/ntasks)`.
///
/// When `ntasks > n` some chunks are empty. `ntasks == 0` is treated as 1.
pub fn partition(n: usize, ntasks: usize) -> Vec<Range<usize>> {
    let ntasks = ntasks.max(1);
    (0..ntasks)
        .map(|k| partition_start(k, n, ntasks)..partition_start(k + 1, n, ntasks))
        .collect()
}

/// Cut `data` into one slice per range; range `r` covers
/// `data[r.start * stride .. r.end * stride]`.
fn split_by<'d, T>(data: &'d mut [T], stride: usize, ranges: &[Range<usize>]) -> Vec<&'d mut [T]> {
    let mut pieces = Vec::with_capacity(ranges.len());
    let mut rest = data;
    let mut at = ranges.first().map_or(0, |r| r.start);
    for r in ranges {
        assert_eq!(r.start, at, "chunks must be contiguous");
        let (head, tail) = rest.split_at_mut((r.end - r.start) * stride);
        pieces.push(head);
        rest = tail;
        at = r.end;
    }
    pieces
}

/// Handle to the worker pool a kernel runs its chunks on
#[derive(Clone, Copy)]
pub struct Workers<'a> {
    #[cfg(feature = "rayon")]
    pool: Option<&'a rayon::ThreadPool>,
    #[cfg(not(feature = "rayon"))]
    _pool: std::marker::PhantomData<&'a ()>,
}

impl std::fmt::Debug for Workers<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workers")
            .field("parallel", &self.is_parallel())
            .finish()
    }
}

impl<'a> Workers<'a> {
    /// Run chunks one after another on the calling thread
    pub fn sequential() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            pool: None,
            #[cfg(not(feature = "rayon"))]
            _pool: std::marker::PhantomData,
        }
    }

    /// Run chunks on `pool`
    #[cfg(feature = "rayon")]
    pub fn pool(pool: &'a rayon::ThreadPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Returns true if chunks may run concurrently
    pub fn is_parallel(&self) -> bool {
        #[cfg(feature = "rayon")]
        {
            self.pool.is_some()
        }
        #[cfg(not(feature = "rayon"))]
        {
            false
        }
    }

    /// Run `f(task, range)` for every chunk; results come back in chunk order.
    pub fn map<R, F>(&self, ranges: &[Range<usize>], f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize, Range<usize>) -> R + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        if let Some(pool) = self.pool.filter(|_| ranges.len() > 1) {
            return pool.install(|| {
                ranges
                    .par_iter()
                    .enumerate()
                    .map(|(t, r)| f(t, r.clone()))
                    .collect()
            });
        }
        ranges
            .iter()
            .enumerate()
            .map(|(t, r)| f(t, r.clone()))
            .collect()
    }

    /// Like [`map`](Self::map), with each chunk also receiving its own
    /// disjoint slice of `data` (`stride` elements per index).
    pub fn map_mut<T, R, F>(&self, data: &mut [T], stride: usize, ranges: &[Range<usize>], f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, Range<usize>, &mut [T]) -> R + Sync + Send,
    {
        let pieces = split_by(data, stride, ranges);

        #[cfg(feature = "rayon")]
        if let Some(pool) = self.pool.filter(|_| ranges.len() > 1) {
            return pool.install(|| {
                pieces
                    .into_par_iter()
                    .enumerate()
                    .map(|(t, piece)| f(t, ranges[t].clone(), piece))
                    .collect()
            });
        }
        pieces
            .into_iter()
            .enumerate()
            .map(|(t, piece)| f(t, ranges[t].clone(), piece))
            .collect()
    }

    /// Like [`map_mut`](Self::map_mut) over two buffers split by the same
    /// ranges (for example a value buffer and a presence buffer).
    pub fn map_mut2<A, B, R, F>(
        &self,
        a: &mut [A],
        a_stride: usize,
        b: &mut [B],
        b_stride: usize,
        ranges: &[Range<usize>],
        f: F,
    ) -> Vec<R>
    where
        A: Send,
        B: Send,
        R: Send,
        F: Fn(usize, Range<usize>, &mut [A], &mut [B]) -> R + Sync + Send,
    {
        let a_pieces = split_by(a, a_stride, ranges);
        let b_pieces = split_by(b, b_stride, ranges);

        #[cfg(feature = "rayon")]
        if let Some(pool) = self.pool.filter(|_| ranges.len() > 1) {
            return pool.install(|| {
                a_pieces
                    .into_par_iter()
                    .zip(b_pieces)
                    .enumerate()
                    .map(|(t, (pa, pb))| f(t, ranges[t].clone(), pa, pb))
                    .collect()
            });
        }
        a_pieces
            .into_iter()
            .zip(b_pieces)
            .enumerate()
            .map(|(t, (pa, pb))| f(t, ranges[t].clone(), pa, pb))
            .collect()
    }
}
