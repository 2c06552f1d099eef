//! Reduce a matrix to a scalar with a monoid

use crate::context::Context;
use crate::dtype::{Scalar, compatible};
use crate::error::{Error, Result};
use crate::kernel::{Fold, GenericFold, Selection};
use crate::matrix::Matrix;
use crate::offload::{OffloadDecision, OffloadRequest};
use crate::ops::Monoid;
use crate::parallel::{Workers, partition};

/// A host reduction ready to run
pub struct ReduceJob<'a> {
    pub(super) a: &'a Matrix,
    pub(super) monoid: &'a Monoid,
    pub(super) workers: Workers<'a>,
    pub(super) ntasks: usize,
}

impl ReduceJob<'_> {
    /// Reduction monoid
    pub fn monoid(&self) -> &Monoid {
        self.monoid
    }

    /// Operand
    pub fn operand(&self) -> &Matrix {
        self.a
    }
}

/// Reduce every entry of `a` with `monoid`.
///
/// Values are cast to the monoid's type first. An empty matrix gives the
/// monoid's identity. If the offload policy picks the device and the
/// accelerator fails, the reduction reruns on the host; the device error
/// is never returned.
pub fn reduce_to_scalar(ctx: &Context, monoid: &Monoid, a: &Matrix) -> Result<Scalar> {
    if !compatible(a.ty(), monoid.ty()) {
        return Err(Error::domain_mismatch(monoid.op().name(), a.ty(), monoid.ty()));
    }
    if ctx.kernels().is_unsupported(monoid.opcode()) {
        return Err(Error::not_implemented(format!(
            "reduce with {}",
            monoid.op().name()
        )));
    }
    if a.nvals() == 0 {
        return Ok(monoid.identity().clone());
    }

    let req = OffloadRequest {
        work: a.nvals(),
        monoid,
        ty: a.ty(),
        iso: a.is_iso(),
    };
    let decision = ctx.policy().decide(&req, ctx.devices());
    ctx.burble(|| {
        format!(
            "reduce: {} over {} entries, device units {}",
            monoid.op().name(),
            req.work,
            decision.units()
        )
    });

    if let OffloadDecision::Device { units } = decision {
        match ctx.accelerator() {
            Some(device) => match device.reduce_to_scalar(monoid, a, units) {
                Ok(s) if s.ty() == monoid.ty() => return Ok(s),
                Ok(s) => log::warn!(
                    "reduce: {} answered {} for a {} monoid, falling back to host",
                    device.name(),
                    s.ty(),
                    monoid.ty()
                ),
                Err(e) => {
                    log::warn!("reduce: {} failed ({}), falling back to host", device.name(), e)
                }
            },
            None => ctx.burble(|| "reduce: no accelerator attached, using host".to_string()),
        }
    }
    reduce_host(ctx, monoid, a)
}

fn reduce_host(ctx: &Context, monoid: &Monoid, a: &Matrix) -> Result<Scalar> {
    if a.is_iso() {
        let value = Scalar::from_bytes(a.ty().clone(), a.values())?.cast(monoid.ty())?;
        ctx.burble(|| {
            let steps = usize::BITS - a.nvals().leading_zeros();
            format!("reduce: iso operand, {} doubling step(s)", steps)
        });
        return Ok(reduce_iso(monoid, &value, a.nvals()));
    }

    let slots = a.values().len() / a.ty().size().max(1);
    let job = ReduceJob {
        a,
        monoid,
        workers: ctx.workers(),
        ntasks: ctx.ntasks(slots),
    };
    match ctx.registry().select_reduce(ctx.kernels(), monoid, a.ty()) {
        Selection::Specialized(kernel) => {
            ctx.burble(|| {
                format!("reduce: specialized {}, {} task(s)", monoid.op().name(), job.ntasks)
            });
            Ok(kernel.run(&job))
        }
        Selection::Generic => {
            ctx.burble(|| {
                format!("reduce: generic {}, {} task(s)", monoid.op().name(), job.ntasks)
            });
            Ok(fold(&job, &GenericFold::new(monoid, a.ty())?))
        }
        Selection::Unsupported => Err(Error::not_implemented(format!(
            "reduce with {}",
            monoid.op().name()
        ))),
    }
}

/// `x ⊕ x ⊕ ... ⊕ x` (`n` times) by repeated doubling
fn reduce_iso(monoid: &Monoid, x: &Scalar, mut n: usize) -> Scalar {
    let op = monoid.op();
    let combine = |l: &Scalar, r: &Scalar| {
        let mut z = Scalar::zeroed(monoid.ty().clone());
        op.apply_bytes(z.as_bytes_mut(), l.as_bytes(), r.as_bytes());
        z
    };
    let mut acc = monoid.identity().clone();
    let mut base = x.clone();
    while n > 0 {
        if n & 1 == 1 {
            acc = combine(&acc, &base);
            if monoid.is_terminal(acc.as_bytes()) {
                break;
            }
        }
        n >>= 1;
        if n > 0 {
            base = combine(&base, &base);
        }
    }
    acc
}

/// Host reduction: every chunk folds its slots into a private accumulator,
/// then the accumulators are merged in chunk order
pub(crate) fn fold<F: Fold>(job: &ReduceJob<'_>, f: &F) -> Scalar {
    let a = job.a;
    let slots = a.values.len() / a.ty.size().max(1);
    let dense = !a.format.is_sparse_or_hyper();
    let ranges = partition(slots, job.ntasks);
    let partials = job.workers.map(&ranges, |_, r| {
        let mut acc: Option<F::Acc> = None;
        for s in r {
            if dense && !a.is_present(s) {
                continue;
            }
            let acc = acc.get_or_insert_with(|| f.init());
            f.absorb(acc, a.value_at(s));
            if f.is_terminal(acc) {
                break;
            }
        }
        acc
    });

    let mut parts = partials.into_iter().flatten();
    let Some(mut total) = parts.next() else {
        return f.finish(f.init());
    };
    for part in parts {
        if f.is_terminal(&total) {
            break;
        }
        f.merge(&mut total, &part);
    }
    f.finish(total)
}
