//! Integration tests for the specialization cache
//!
//! Every built-in operator is run twice over the same operands, once
//! through its specialized kernel and once through the generic kernel, and
//! the results must agree byte for byte. Operands mix random values with
//! the boundary values of each type (extremes, zero, -1, NaN, infinities),
//! over boundary shapes: zero rows, a single entry, all-absent and
//! all-present.

mod common;

use common::{ctx_generic, ctx_seq, rng};
use gbkern::context::Context;
use gbkern::dtype::{Complex64, Complex128, DType, Scalar, Type};
use gbkern::engine::{apply, emult, reduce_to_scalar};
use gbkern::kernel::{KernelConfig, KernelRegistry};
use gbkern::matrix::{Matrix, SparsityFormat};
use gbkern::ops::{BinaryOp, BinaryOpcode, Monoid, UnaryOp, UnaryOpcode};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;

const UNARY: [UnaryOpcode; 6] = [
    UnaryOpcode::Identity,
    UnaryOpcode::Ainv,
    UnaryOpcode::Minv,
    UnaryOpcode::Abs,
    UnaryOpcode::Lnot,
    UnaryOpcode::One,
];

const MONOIDS: [BinaryOpcode; 9] = [
    BinaryOpcode::Plus,
    BinaryOpcode::Times,
    BinaryOpcode::Min,
    BinaryOpcode::Max,
    BinaryOpcode::Any,
    BinaryOpcode::Lor,
    BinaryOpcode::Land,
    BinaryOpcode::Lxor,
    BinaryOpcode::Eq,
];

fn boundary(dtype: DType) -> Vec<Scalar> {
    match dtype {
        DType::Bool => vec![Scalar::new(false), Scalar::new(true)],
        DType::I8 => vec![Scalar::new(i8::MIN), Scalar::new(i8::MAX), Scalar::new(0i8), Scalar::new(-1i8)],
        DType::I16 => vec![Scalar::new(i16::MIN), Scalar::new(i16::MAX), Scalar::new(0i16), Scalar::new(-1i16)],
        DType::I32 => vec![Scalar::new(i32::MIN), Scalar::new(i32::MAX), Scalar::new(0i32), Scalar::new(-1i32)],
        DType::I64 => vec![Scalar::new(i64::MIN), Scalar::new(i64::MAX), Scalar::new(0i64), Scalar::new(-1i64)],
        DType::U8 => vec![Scalar::new(u8::MAX), Scalar::new(0u8), Scalar::new(1u8)],
        DType::U16 => vec![Scalar::new(u16::MAX), Scalar::new(0u16), Scalar::new(1u16)],
        DType::U32 => vec![Scalar::new(u32::MAX), Scalar::new(0u32), Scalar::new(1u32)],
        DType::U64 => vec![Scalar::new(u64::MAX), Scalar::new(0u64), Scalar::new(1u64)],
        DType::F32 => vec![
            Scalar::new(0.0f32),
            Scalar::new(-0.0f32),
            Scalar::new(f32::NAN),
            Scalar::new(f32::INFINITY),
            Scalar::new(f32::NEG_INFINITY),
            Scalar::new(f32::MAX),
        ],
        DType::F64 => vec![
            Scalar::new(0.0f64),
            Scalar::new(-0.0f64),
            Scalar::new(f64::NAN),
            Scalar::new(f64::INFINITY),
            Scalar::new(f64::MIN_POSITIVE),
        ],
        DType::Complex64 => vec![
            Scalar::new(Complex64::new(0.0, 0.0)),
            Scalar::new(Complex64::new(f32::NAN, 1.0)),
            Scalar::new(Complex64::new(-2.5, f32::INFINITY)),
        ],
        DType::Complex128 => vec![
            Scalar::new(Complex128::new(0.0, 0.0)),
            Scalar::new(Complex128::new(1.0, -1.0)),
            Scalar::new(Complex128::new(f64::NAN, 0.0)),
        ],
    }
}

/// Value bytes: a boundary value a third of the time, otherwise random
fn random_value(rng: &mut StdRng, dtype: DType) -> Vec<u8> {
    let specials = boundary(dtype);
    if rng.random_bool(0.33) {
        let k = rng.random_range(0..specials.len());
        return specials[k].as_bytes().to_vec();
    }
    if dtype == DType::Bool {
        return vec![rng.random_bool(0.5) as u8];
    }
    // small magnitudes keep float results finite and integer results varied
    let x = rng.random_range(-20i32..20);
    Scalar::new(x).cast(&Type::from(dtype)).unwrap().as_bytes().to_vec()
}

/// `(nrows, ncols, density)` of every operand shape under test
const SHAPES: [(usize, usize, f64); 5] = [
    (13, 5, 0.7),
    (0, 5, 0.7),
    (1, 1, 1.0),
    (13, 5, 0.0),
    (13, 5, 1.0),
];

fn random_operand(
    rng: &mut StdRng,
    dtype: DType,
    format: SparsityFormat,
    (nrows, ncols, density): (usize, usize, f64),
) -> Matrix {
    let density = if format == SparsityFormat::Full { 1.0 } else { density };
    let mut coords = Vec::new();
    let mut bytes = Vec::new();
    for col in 0..ncols {
        for row in 0..nrows {
            if rng.random_bool(density) {
                coords.push((row, col));
                bytes.extend(random_value(rng, dtype));
            }
        }
    }
    Matrix::from_tuples_bytes(dtype.into(), nrows, ncols, format, &coords, &bytes).unwrap()
}

#[test]
fn test_emult_specialized_matches_generic() {
    let mut rng = rng();
    let specialized = ctx_seq();
    let generic = ctx_generic();
    let format_pairs = [
        (SparsityFormat::Bitmap, SparsityFormat::Full),
        (SparsityFormat::Bitmap, SparsityFormat::Bitmap),
        (SparsityFormat::Sparse, SparsityFormat::Bitmap),
    ];

    for &dtype in DType::ALL.iter() {
        for &opcode in BinaryOpcode::BUILTIN.iter().filter(|o| o.supports(dtype)) {
            let op = BinaryOp::builtin(opcode, dtype).unwrap();
            let ztype = op.ztype().clone();
            for ((fa, fb), shape) in format_pairs
                .iter()
                .flat_map(|&pair| SHAPES.into_iter().map(move |shape| (pair, shape)))
            {
                let a = random_operand(&mut rng, dtype, fa, shape);
                let b = random_operand(&mut rng, dtype, fb, shape);
                assert!(
                    specialized
                        .registry()
                        .select_emult(specialized.kernels(), &op, a.ty(), b.ty(), &ztype)
                        .is_specialized(),
                    "{} has no specialization",
                    op.name()
                );

                let mut c1 = Matrix::new(ztype.clone(), a.nrows(), a.ncols());
                let mut c2 = Matrix::new(ztype.clone(), a.nrows(), a.ncols());
                emult(&specialized, &mut c1, None, &op, &a, &b).unwrap();
                emult(&generic, &mut c2, None, &op, &a, &b).unwrap();
                assert_eq!(c1.nvals(), c2.nvals(), "{} {:?}", op.name(), shape);
                assert_eq!(
                    c1.to_tuples_bytes(),
                    c2.to_tuples_bytes(),
                    "{} {:?}",
                    op.name(),
                    shape
                );
            }
        }
    }
}

#[test]
fn test_apply_specialized_matches_generic() {
    let mut rng = rng();
    let specialized = ctx_seq();
    let generic = ctx_generic();

    for &dtype in DType::ALL.iter() {
        for &opcode in UNARY.iter() {
            let Ok(op) = UnaryOp::builtin(opcode, dtype) else {
                continue;
            };
            for format in [SparsityFormat::Sparse, SparsityFormat::Bitmap] {
                for shape in SHAPES {
                    let a = random_operand(&mut rng, dtype, format, shape);
                    let mut c1 = Matrix::new(dtype, a.nrows(), a.ncols());
                    let mut c2 = Matrix::new(dtype, a.nrows(), a.ncols());
                    apply(&specialized, &mut c1, &op, &a).unwrap();
                    apply(&generic, &mut c2, &op, &a).unwrap();
                    assert_eq!(c1.nvals(), a.nvals());
                    assert_eq!(c1.nvals(), c2.nvals());
                    assert_eq!(
                        c1.to_tuples_bytes(),
                        c2.to_tuples_bytes(),
                        "{} {:?}",
                        op.name(),
                        shape
                    );
                }
            }
        }
    }
}

#[test]
fn test_reduce_specialized_matches_generic() {
    let mut rng = rng();
    let specialized = ctx_seq();
    let generic = ctx_generic();

    for &dtype in DType::ALL.iter() {
        for &opcode in MONOIDS.iter() {
            let Ok(monoid) = Monoid::builtin(opcode, dtype) else {
                continue;
            };
            for format in [SparsityFormat::Sparse, SparsityFormat::Bitmap] {
                for shape in SHAPES {
                    let a = random_operand(&mut rng, dtype, format, shape);
                    let s1 = reduce_to_scalar(&specialized, &monoid, &a).unwrap();
                    let s2 = reduce_to_scalar(&generic, &monoid, &a).unwrap();
                    assert_eq!(s1.as_bytes(), s2.as_bytes(), "{} over {} {:?}", opcode, dtype, shape);
                }
            }
        }
    }
}

#[test]
fn test_casting_operands_take_generic_path() {
    let ctx = ctx_seq();
    let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::I32).unwrap();
    let i8t: Type = DType::I8.into();
    let i32t: Type = DType::I32.into();

    let same = ctx.registry().select_emult(ctx.kernels(), &op, &i32t, &i32t, &i32t);
    let cast = ctx.registry().select_emult(ctx.kernels(), &op, &i8t, &i32t, &i32t);
    assert!(same.is_specialized());
    assert!(cast.is_generic());

    // i8 operands are widened before the add, so nothing wraps at 127
    let a = Matrix::full(2, 1, &[100i8, -100]).unwrap();
    let b = Matrix::full(2, 1, &[100i32, -100]).unwrap();
    let mut c = Matrix::new(DType::I32, 2, 1);
    emult(&ctx, &mut c, None, &op, &a, &b).unwrap();
    assert_eq!(c.to_tuples::<i32>().unwrap(), vec![(0, 0, 200), (1, 0, -200)]);
}

#[test]
fn test_disabled_entries_fall_back_to_generic() {
    let op = BinaryOp::builtin(BinaryOpcode::Times, DType::F32).unwrap();
    let f32t: Type = DType::F32.into();
    let by_opcode = KernelConfig::default().disable(BinaryOpcode::Times);
    let by_type = KernelConfig::default().disable_type(DType::F32);
    let registry = KernelRegistry::global();

    assert!(registry.select_emult(&by_opcode, &op, &f32t, &f32t, &f32t).is_generic());
    assert!(registry.select_emult(&by_type, &op, &f32t, &f32t, &f32t).is_generic());

    let a = Matrix::full(3, 1, &[1.5f32, -2.0, 4.0]).unwrap();
    let b = Matrix::bitmap_vector(&[Some(2.0f32), None, Some(0.25)]).unwrap();
    let mut expected = Matrix::new(DType::F32, 3, 1);
    emult(&ctx_seq(), &mut expected, None, &op, &a, &b).unwrap();
    for kernels in [by_opcode, by_type] {
        let mut c = Matrix::new(DType::F32, 3, 1);
        emult(&ctx_seq().with_kernels(kernels), &mut c, None, &op, &a, &b).unwrap();
        assert_eq!(c.to_tuples_bytes(), expected.to_tuples_bytes());
    }
}

#[test]
fn test_empty_registry_runs_everything_generically() {
    let ctx = Context::new()
        .with_nthreads(1)
        .with_registry(Arc::new(KernelRegistry::empty()));
    let monoid = Monoid::builtin(BinaryOpcode::Max, DType::U8).unwrap();
    let a = Matrix::bitmap_vector(&[Some(3u8), None, Some(250), Some(7)]).unwrap();

    assert!(ctx.registry().select_reduce(ctx.kernels(), &monoid, a.ty()).is_generic());
    let s = reduce_to_scalar(&ctx, &monoid, &a).unwrap();
    assert_eq!(s.get::<u8>().unwrap(), 250);
}
