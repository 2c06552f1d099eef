//! Integration tests for reduce-to-scalar and device offload
//!
//! Mock accelerators record how often they are called; a failing one must
//! never surface its error.

mod common;

use common::{random_matrix, rng};
use gbkern::context::Context;
use gbkern::dtype::{DType, Scalar, Type, UserType};
use gbkern::engine::reduce_to_scalar;
use gbkern::error::{Error, Result, Status};
use gbkern::kernel::KernelConfig;
use gbkern::matrix::{Matrix, SparsityFormat};
use gbkern::offload::{
    Accelerator, DeviceControl, DeviceSettings, OffloadDecision, OffloadPolicy, OffloadRequest,
    ThresholdPolicy,
};
use gbkern::ops::{BinaryOp, BinaryOpcode, Monoid};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Accelerator that answers a fixed value or fails
#[derive(Debug, Default)]
struct MockDevice {
    calls: AtomicUsize,
    last_units: AtomicUsize,
    answer: Option<Scalar>,
}

impl MockDevice {
    fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn answering(value: i64) -> Arc<Self> {
        Self::answering_scalar(Scalar::new(value))
    }

    fn answering_scalar(value: Scalar) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(value),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Accelerator for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn reduce_to_scalar(&self, _monoid: &Monoid, _a: &Matrix, units: usize) -> Result<Scalar> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_units.store(units, Ordering::SeqCst);
        match &self.answer {
            Some(v) => Ok(v.clone()),
            None => Err(Error::Device("out of device memory".to_string())),
        }
    }
}

fn always(count: usize) -> DeviceSettings {
    DeviceSettings {
        control: DeviceControl::Always,
        count,
        chunk: 1,
    }
}

fn values(n: usize) -> Matrix {
    let v: Vec<i64> = (1..=n as i64).collect();
    Matrix::full(n, 1, &v).unwrap()
}

#[test]
fn test_failing_device_falls_back_to_host() {
    let device = MockDevice::failing();
    let ctx = Context::new()
        .with_devices(always(2))
        .with_accelerator(device.clone());
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::I64).unwrap();

    let s = reduce_to_scalar(&ctx, &plus, &values(100)).unwrap();

    assert_eq!(device.calls(), 1);
    assert_eq!(s.get::<i64>().unwrap(), 5050);
}

#[test]
fn test_device_answer_is_returned() {
    let device = MockDevice::answering(-7);
    let ctx = Context::new()
        .with_devices(always(3))
        .with_accelerator(device.clone());
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::I64).unwrap();

    let s = reduce_to_scalar(&ctx, &plus, &values(10)).unwrap();

    assert_eq!(s.get::<i64>().unwrap(), -7);
    assert_eq!(device.last_units.load(Ordering::SeqCst), 3);
}

#[test]
fn test_mistyped_device_answer_falls_back_to_host() {
    let device = MockDevice::answering_scalar(Scalar::new(1.5f64));
    let ctx = Context::new()
        .with_policy(Arc::new(Eager { units: 3 }))
        .with_accelerator(device.clone());
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::I32).unwrap();
    let a = Matrix::full(2, 1, &[1i32, 2]).unwrap();

    let s = reduce_to_scalar(&ctx, &plus, &a).unwrap();

    assert_eq!(device.calls(), 1);
    assert_eq!(device.last_units.load(Ordering::SeqCst), 3);
    assert_eq!(s.ty(), &Type::from(DType::I32));
    assert_eq!(s.get::<i32>().unwrap(), 3);
}

#[test]
fn test_never_skips_the_device() {
    let device = MockDevice::answering(0);
    let ctx = Context::new().with_accelerator(device.clone());
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::I64).unwrap();

    assert_eq!(reduce_to_scalar(&ctx, &plus, &values(10)).unwrap().get::<i64>().unwrap(), 55);
    assert_eq!(device.calls(), 0);
}

#[test]
fn test_ineligible_reductions_stay_on_host() {
    let device = MockDevice::answering(0);
    let ctx = Context::new()
        .with_devices(always(4))
        .with_accelerator(device.clone());

    // iso operand
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::I64).unwrap();
    let iso = Matrix::full(6, 1, &[0i64; 6]).unwrap().into_iso(Scalar::new(5i64));
    assert_eq!(reduce_to_scalar(&ctx, &plus, &iso).unwrap().get::<i64>().unwrap(), 30);

    // trivial monoid
    let any = Monoid::builtin(BinaryOpcode::Any, DType::I64).unwrap();
    reduce_to_scalar(&ctx, &any, &values(8)).unwrap();

    // user-defined monoid over a built-in type
    let i64t: Type = DType::I64.into();
    let op = BinaryOp::user("wrap_add", i64t.clone(), i64t.clone(), i64t, |z, x, y| {
        let x = i64::from_ne_bytes(x.try_into().unwrap());
        let y = i64::from_ne_bytes(y.try_into().unwrap());
        z.copy_from_slice(&x.wrapping_add(y).to_ne_bytes());
    });
    let user = Monoid::user(op, Scalar::new(0i64), None).unwrap();
    assert_eq!(reduce_to_scalar(&ctx, &user, &values(4)).unwrap().get::<i64>().unwrap(), 10);

    assert_eq!(device.calls(), 0);
}

#[test]
fn test_user_type_reduction() {
    // (count, max) pairs packed into two bytes
    let ty: Type = UserType::new("count_max", 2).into();
    let op = BinaryOp::user("merge", ty.clone(), ty.clone(), ty.clone(), |z, x, y| {
        z[0] = x[0].wrapping_add(y[0]);
        z[1] = x[1].max(y[1]);
    });
    let identity = Scalar::from_bytes(ty.clone(), &[0, 0]).unwrap();
    let monoid = Monoid::user(op, identity, None).unwrap();
    let a = Matrix::from_tuples_bytes(
        ty,
        4,
        4,
        SparsityFormat::Sparse,
        &[(0, 0), (3, 1), (2, 3)],
        &[1, 9, 1, 4, 1, 17],
    )
    .unwrap();
    let device = MockDevice::answering(0);
    let ctx = Context::new()
        .with_devices(always(1))
        .with_accelerator(device.clone());

    let s = reduce_to_scalar(&ctx, &monoid, &a).unwrap();

    assert_eq!(s.as_bytes(), &[3, 17]);
    assert_eq!(device.calls(), 0);
}

#[test]
fn test_auto_units_monotonic_in_entries() {
    let devices = DeviceSettings {
        control: DeviceControl::Auto,
        count: 6,
        chunk: 100,
    };
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::F64).unwrap();
    let ty: Type = DType::F64.into();
    let mut last = 0;
    for work in (0..2000).step_by(37) {
        let req = OffloadRequest {
            work,
            monoid: &plus,
            ty: &ty,
            iso: false,
        };
        let units = ThresholdPolicy.decide(&req, &devices).units();
        assert!(units >= last, "units fell from {} to {} at work {}", last, units, work);
        assert!(units <= devices.count);
        last = units;
    }
    assert_eq!(last, 6);
}

/// Policy that sends everything to the device
#[derive(Debug)]
struct Eager {
    units: usize,
}

impl OffloadPolicy for Eager {
    fn decide(&self, _req: &OffloadRequest<'_>, _devices: &DeviceSettings) -> OffloadDecision {
        OffloadDecision::Device { units: self.units }
    }
}

#[test]
fn test_custom_policy_without_accelerator_uses_host() {
    let ctx = Context::new().with_policy(Arc::new(Eager { units: 1 }));
    let max = Monoid::builtin(BinaryOpcode::Max, DType::I64).unwrap();
    assert_eq!(reduce_to_scalar(&ctx, &max, &values(9)).unwrap().get::<i64>().unwrap(), 9);
}

// ============================================================================
// Host reductions
// ============================================================================

#[test]
fn test_empty_matrix_gives_identity() {
    let ctx = Context::new();
    for (opcode, expected) in [
        (BinaryOpcode::Plus, 0i32),
        (BinaryOpcode::Times, 1),
        (BinaryOpcode::Min, i32::MAX),
        (BinaryOpcode::Max, i32::MIN),
    ] {
        let monoid = Monoid::builtin(opcode, DType::I32).unwrap();
        for format in [
            SparsityFormat::Hypersparse,
            SparsityFormat::Sparse,
            SparsityFormat::Bitmap,
        ] {
            let a = Matrix::new(DType::I32, 5, 5).to_format(format).unwrap();
            let s = reduce_to_scalar(&ctx, &monoid, &a).unwrap();
            assert_eq!(s.get::<i32>().unwrap(), expected);
        }
    }
}

#[test]
fn test_terminal_values_short_circuit_to_the_same_answer() {
    let mut rng = rng();
    let a = random_matrix(&mut rng, 200, 4, 0.8, SparsityFormat::Bitmap, |r| {
        r.random_range(-30..30i8)
    });
    let direct_min = a.to_tuples::<i8>().unwrap().iter().map(|t| t.2).min().unwrap();
    let min = Monoid::builtin(BinaryOpcode::Min, DType::I8).unwrap();
    let times = Monoid::builtin(BinaryOpcode::Times, DType::I8).unwrap();
    let ctx = Context::new().with_nthreads(4).with_chunk(16);

    assert_eq!(reduce_to_scalar(&ctx, &min, &a).unwrap().get::<i8>().unwrap(), direct_min);
    // a zero is present at this density, and zero is terminal for times
    assert!(a.to_tuples::<i8>().unwrap().iter().any(|t| t.2 == 0));
    assert_eq!(reduce_to_scalar(&ctx, &times, &a).unwrap().get::<i8>().unwrap(), 0);
}

#[test]
fn test_any_returns_an_entry_value() {
    let a = Matrix::from_tuples(
        10,
        10,
        SparsityFormat::Hypersparse,
        &[(3, 2, 40u16), (9, 9, 41), (0, 5, 42)],
    )
    .unwrap();
    let any = Monoid::builtin(BinaryOpcode::Any, DType::U16).unwrap();
    let v = reduce_to_scalar(&Context::new(), &any, &a).unwrap().get::<u16>().unwrap();
    assert!([40, 41, 42].contains(&v));
}

#[test]
fn test_operand_cast_to_monoid_type() {
    let a = Matrix::full(3, 1, &[250u8, 250, 250]).unwrap();
    let plus = Monoid::builtin(BinaryOpcode::Plus, DType::U32).unwrap();
    let s = reduce_to_scalar(&Context::new(), &plus, &a).unwrap();
    assert_eq!(s.get::<u32>().unwrap(), 750);
}

#[test]
fn test_iso_reduction_by_doubling() {
    let times = Monoid::builtin(BinaryOpcode::Times, DType::U64).unwrap();
    let a = Matrix::new(DType::U64, 64, 1)
        .to_format(SparsityFormat::Bitmap)
        .unwrap();
    assert_eq!(reduce_to_scalar(&Context::new(), &times, &a).unwrap().get::<u64>().unwrap(), 1);

    let iso = Matrix::full(40, 1, &[0u64; 40]).unwrap().into_iso(Scalar::new(2u64));
    let s = reduce_to_scalar(&Context::new(), &times, &iso).unwrap();
    assert_eq!(s.get::<u64>().unwrap(), 1u64 << 40);
}

#[test]
fn test_unsupported_monoid_and_domain_errors() {
    let ctx = Context::new().with_kernels(KernelConfig::default().mark_unsupported(BinaryOpcode::Max));
    let max = Monoid::builtin(BinaryOpcode::Max, DType::I64).unwrap();
    let err = reduce_to_scalar(&ctx, &max, &values(3)).unwrap_err();
    assert_eq!(err.status(), Status::NotImplemented);

    let u = Matrix::new(UserType::new("blob", 8), 2, 2);
    let err = reduce_to_scalar(&Context::new(), &max, &u).unwrap_err();
    assert_eq!(err.status(), Status::DomainMismatch);
}
