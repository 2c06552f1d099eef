//! Unary apply `C = f(A)`

use crate::context::Context;
use crate::dtype::{Scalar, Type, compatible};
use crate::error::{Error, Result};
use crate::kernel::{GenericUnary, Selection, UnaryCell};
use crate::matrix::Matrix;
use crate::ops::UnaryOp;
use crate::parallel::{Workers, partition};

/// A unary transform ready to run
pub struct ApplyJob<'a> {
    pub(super) a: &'a Matrix,
    pub(super) ctype: Type,
    pub(super) workers: Workers<'a>,
    pub(super) ntasks: usize,
}

impl ApplyJob<'_> {
    /// Operand
    pub fn operand(&self) -> &Matrix {
        self.a
    }
}

/// `C = f(A)`: C takes A's pattern and format, with values transformed by
/// `op` and cast to C's type. An iso A gives an iso C.
///
/// On error `C` is left as it was.
pub fn apply(ctx: &Context, c: &mut Matrix, op: &UnaryOp, a: &Matrix) -> Result<()> {
    if c.shape() != a.shape() {
        return Err(Error::DimensionMismatch {
            expected: a.shape(),
            got: c.shape(),
        });
    }
    if !compatible(a.ty(), op.xtype()) {
        return Err(Error::domain_mismatch(op.name(), a.ty(), op.xtype()));
    }
    if !compatible(op.ztype(), c.ty()) {
        return Err(Error::domain_mismatch(op.name(), op.ztype(), c.ty()));
    }
    if ctx.kernels().is_unary_unsupported(op.opcode()) {
        return Err(Error::not_implemented(format!("apply with {}", op.name())));
    }
    let ctype = c.ty().clone();

    if a.is_iso() {
        let cell = GenericUnary::new(op, a.ty(), &ctype)?;
        let mut z = Scalar::zeroed(ctype.clone());
        cell.apply(z.as_bytes_mut(), a.values());
        ctx.burble(|| format!("apply: {} on an iso {}", op.name(), a.format()));
        *c = with_values(a, ctype, z.as_bytes().to_vec(), true);
        return Ok(());
    }

    let slots = a.values().len() / a.ty().size().max(1);
    let job = ApplyJob {
        a,
        ctype,
        workers: ctx.workers(),
        ntasks: ctx.ntasks(slots),
    };
    let result = match ctx
        .registry()
        .select_apply(ctx.kernels(), op, a.ty(), &job.ctype)
    {
        Selection::Specialized(kernel) => {
            ctx.burble(|| format!("apply: specialized {}, {} task(s)", op.name(), job.ntasks));
            kernel.run(&job)
        }
        Selection::Generic => {
            ctx.burble(|| format!("apply: generic {}, {} task(s)", op.name(), job.ntasks));
            let cell = GenericUnary::new(op, a.ty(), &job.ctype)?;
            execute(&job, &cell)
        }
        Selection::Unsupported => {
            return Err(Error::not_implemented(format!("apply with {}", op.name())));
        }
    };
    *c = result;
    Ok(())
}

fn with_values(a: &Matrix, ty: Type, values: Vec<u8>, iso: bool) -> Matrix {
    Matrix {
        ty,
        nrows: a.nrows,
        ncols: a.ncols,
        format: a.format,
        iso,
        values,
        bitmap: a.bitmap.clone(),
        p: a.p.clone(),
        h: a.h.clone(),
        i: a.i.clone(),
        nvals: a.nvals,
    }
}

/// Transform every stored value of the job's operand with `cell`
pub(crate) fn execute<C: UnaryCell>(job: &ApplyJob<'_>, cell: &C) -> Matrix {
    let a = job.a;
    let csize = job.ctype.size();
    let slots = a.values.len() / a.ty.size().max(1);
    let dense = !a.format.is_sparse_or_hyper();
    let mut cx = vec![0u8; slots * csize];
    let ranges = partition(slots, job.ntasks);
    job.workers.map_mut(&mut cx, csize, &ranges, |_, r, cx| {
        let base = r.start;
        for s in r {
            // absent bitmap slots hold no value
            if dense && !a.is_present(s) {
                continue;
            }
            cell.apply(&mut cx[(s - base) * csize..][..csize], a.value_at(s));
        }
    });
    with_values(a, job.ctype.clone(), cx, false)
}
