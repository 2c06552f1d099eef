//! Elementwise multiply `C<M> = A .* B`
//!
//! The result holds an entry wherever both operands do and the mask allows
//! it. `C` is overwritten with the masked product; its previous contents
//! are discarded.

use super::{bitmap_emult, sparse_emult};
use crate::context::Context;
use crate::dispatch::{EmultMethod, MaskShape, emult_method, emult_result_format};
use crate::dtype::{Scalar, Type, compatible};
use crate::error::{Error, Result};
use crate::kernel::{BinaryCell, GenericBinary, PatternOnly, Selection};
use crate::mask::Mask;
use crate::matrix::{Matrix, SparsityFormat};
use crate::ops::{BinaryOp, BinaryOpcode};
use crate::parallel::Workers;

/// Everything a method body needs, fixed before the parallel region
pub struct EmultJob<'a> {
    pub(super) a: &'a Matrix,
    pub(super) b: &'a Matrix,
    pub(super) mask: Option<Mask<'a>>,
    pub(super) method: EmultMethod,
    pub(super) format: SparsityFormat,
    pub(super) ctype: Type,
    pub(super) iso: Option<Scalar>,
    pub(super) workers: Workers<'a>,
    pub(super) ntasks: usize,
}

impl EmultJob<'_> {
    /// Method chosen by format dispatch
    pub fn method(&self) -> EmultMethod {
        self.method
    }

    /// Format of the result
    pub fn result_format(&self) -> SparsityFormat {
        self.format
    }

    /// Bytes written per result entry; zero when the result is iso
    #[inline]
    pub(super) fn csize(&self) -> usize {
        if self.iso.is_some() { 0 } else { self.ctype.size() }
    }

    /// Assemble the result from the buffers a method body built
    pub(super) fn output(
        &self,
        values: Vec<u8>,
        bitmap: Option<Vec<i8>>,
        p: Vec<usize>,
        h: Vec<usize>,
        i: Vec<usize>,
        nvals: usize,
    ) -> Matrix {
        let (values, iso) = match &self.iso {
            Some(v) => (v.as_bytes().to_vec(), true),
            None => (values, false),
        };
        Matrix {
            ty: self.ctype.clone(),
            nrows: self.a.nrows,
            ncols: self.a.ncols,
            format: self.format,
            iso,
            values,
            bitmap,
            p,
            h,
            i,
            nvals,
        }
    }
}

fn check_domain(op: &BinaryOp, from: &Type, to: &Type) -> Result<()> {
    if compatible(from, to) {
        Ok(())
    } else {
        Err(Error::domain_mismatch(op.name(), from, to))
    }
}

/// Value shared by every result entry, if the result is iso
fn iso_value(op: &BinaryOp, a: &Matrix, b: &Matrix, ctype: &Type) -> Result<Option<Scalar>> {
    let iso = match op.opcode() {
        BinaryOpcode::Pair => true,
        BinaryOpcode::First if a.is_iso() => true,
        BinaryOpcode::Second if b.is_iso() => true,
        _ => a.is_iso() && b.is_iso() && op.is_builtin(),
    };
    if !iso {
        return Ok(None);
    }
    // the unused side of first/second/pair is never read
    let operand = |m: &Matrix| {
        if m.iso {
            m.values.clone()
        } else {
            vec![0u8; m.ty.size()]
        }
    };
    let cell = GenericBinary::new(op, a.ty(), b.ty(), ctype)?;
    let mut z = Scalar::zeroed(ctype.clone());
    cell.apply(z.as_bytes_mut(), &operand(a), &operand(b));
    Ok(Some(z))
}

/// `C<M> = A .* B`.
///
/// All of `A`, `B`, `C` and the mask must have the same dimensions. `A` and
/// `B` are cast to the operator's operand types and the result to `C`'s
/// type. On error `C` is left as it was.
pub fn emult(
    ctx: &Context,
    c: &mut Matrix,
    mask: Option<Mask<'_>>,
    op: &BinaryOp,
    a: &Matrix,
    b: &Matrix,
) -> Result<()> {
    let (nrows, ncols) = a.shape();
    for got in [b.shape(), c.shape()] {
        if got != (nrows, ncols) {
            return Err(Error::DimensionMismatch {
                expected: (nrows, ncols),
                got,
            });
        }
    }
    if let Some(m) = &mask {
        m.validate(nrows, ncols)?;
    }
    check_domain(op, a.ty(), op.xtype())?;
    check_domain(op, b.ty(), op.ytype())?;
    check_domain(op, op.ztype(), c.ty())?;
    if ctx.kernels().is_unsupported(op.opcode()) {
        return Err(Error::not_implemented(format!("emult with {}", op.name())));
    }

    let shape = mask.map(|m| MaskShape {
        format: m.format(),
        complement: m.is_complemented(),
    });
    let method = emult_method(a.format(), b.format(), shape);
    let format = emult_result_format(method, a.format(), b.format(), shape);
    let work = match method {
        EmultMethod::SparseMerge => a.nvals() + b.nvals(),
        EmultMethod::SparseMaskDriven => mask.map_or(0, |m| m.matrix().nvals()),
        _ => nrows * ncols,
    };
    let ctype = c.ty().clone();
    let job = EmultJob {
        a,
        b,
        mask,
        method,
        format,
        iso: iso_value(op, a, b, &ctype)?,
        ctype,
        workers: ctx.workers(),
        ntasks: ctx.ntasks(work),
    };
    ctx.burble(|| {
        format!(
            "emult: {} ({} .* {}{}) -> {}, work {}, {} task(s)",
            method,
            a.format(),
            b.format(),
            match shape {
                Some(m) if m.complement => format!(", mask !{}", m.format),
                Some(m) => format!(", mask {}", m.format),
                None => String::new(),
            },
            format,
            work,
            job.ntasks
        )
    });

    let result = if job.iso.is_some() {
        ctx.burble(|| format!("emult: {} gives an iso result", op.name()));
        execute(&job, &PatternOnly)
    } else {
        match ctx
            .registry()
            .select_emult(ctx.kernels(), op, a.ty(), b.ty(), &job.ctype)
        {
            Selection::Specialized(kernel) => {
                ctx.burble(|| format!("emult: specialized kernel for {}", op.name()));
                kernel.run(&job)
            }
            Selection::Generic => {
                ctx.burble(|| format!("emult: generic kernel for {}", op.name()));
                let cell = GenericBinary::new(op, a.ty(), b.ty(), &job.ctype)?;
                execute(&job, &cell)
            }
            Selection::Unsupported => {
                return Err(Error::not_implemented(format!("emult with {}", op.name())));
            }
        }
    };
    debug_assert!(result.check().is_ok(), "emult built an invalid {}", format);
    *c = result;
    Ok(())
}

/// Run the method body chosen for `job` with `cell`
pub(crate) fn execute<C: BinaryCell>(job: &EmultJob<'_>, cell: &C) -> Matrix {
    match job.method {
        EmultMethod::SparseMerge => sparse_emult::merge(job, cell),
        EmultMethod::SparseMaskDriven => sparse_emult::mask_driven(job, cell),
        EmultMethod::FullNoMask => bitmap_emult::full(job, cell),
        EmultMethod::BitmapNoMask
        | EmultMethod::BitmapSparseComplementMask
        | EmultMethod::BitmapDenseMask => bitmap_emult::bitmap(job, cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    fn ctx() -> Context {
        Context::new().with_nthreads(1)
    }

    #[test]
    fn test_dimension_mismatch_leaves_c() {
        let a = Matrix::full(2, 1, &[1i32, 2]).unwrap();
        let b = Matrix::full(3, 1, &[1i32, 2, 3]).unwrap();
        let mut c = Matrix::full(2, 1, &[7i32, 7]).unwrap();
        let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::I32).unwrap();
        assert!(emult(&ctx(), &mut c, None, &op, &a, &b).is_err());
        assert_eq!(c.to_tuples::<i32>().unwrap(), vec![(0, 0, 7), (1, 0, 7)]);
    }

    #[test]
    fn test_pair_is_iso() {
        let a = Matrix::bitmap_vector(&[Some(4u8), None, Some(6)]).unwrap();
        let b = Matrix::full(3, 1, &[1u8, 1, 0]).unwrap();
        let op = BinaryOp::builtin(BinaryOpcode::Pair, DType::U8).unwrap();
        let mut c = Matrix::new(DType::F32, 3, 1);
        emult(&ctx(), &mut c, None, &op, &a, &b).unwrap();
        assert!(c.is_iso());
        assert_eq!(c.format(), SparsityFormat::Bitmap);
        assert_eq!(c.to_tuples::<f32>().unwrap(), vec![(0, 0, 1.0), (2, 0, 1.0)]);
    }

    #[test]
    fn test_first_of_iso_is_iso() {
        let a = Matrix::full(2, 2, &[0i16; 4]).unwrap().into_iso(Scalar::new(-3i16));
        let b = Matrix::from_tuples(2, 2, SparsityFormat::Sparse, &[(1, 1, 9i16)]).unwrap();
        let op = BinaryOp::builtin(BinaryOpcode::First, DType::I16).unwrap();
        let mut c = Matrix::new(DType::I16, 2, 2);
        emult(&ctx(), &mut c, None, &op, &a, &b).unwrap();
        assert!(c.is_iso());
        assert_eq!(c.to_tuples::<i16>().unwrap(), vec![(1, 1, -3)]);
    }

    #[test]
    fn test_domain_mismatch_for_user_types() {
        let u = crate::dtype::UserType::new("cell", 2);
        let a = Matrix::new(u, 2, 2);
        let b = Matrix::new(DType::U16, 2, 2);
        let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::U16).unwrap();
        let mut c = Matrix::new(DType::U16, 2, 2);
        let err = emult(&ctx(), &mut c, None, &op, &a, &b).unwrap_err();
        assert_eq!(err.status(), crate::error::Status::DomainMismatch);
    }
}
