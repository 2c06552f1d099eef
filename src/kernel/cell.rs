//! Per-entry cells driven by the engine's method bodies
//!
//! The engine's loops are generic over a cell trait. A typed cell compiles
//! to a direct call of the scalar operator; a generic cell goes through
//! casters and the descriptor's byte-level function.

use crate::dtype::{Caster, Element, Scalar, Type};
use crate::error::{Error, Result};
use crate::ops::{BinaryOp, BinaryScalar, Monoid, Terminal, UnaryOp, UnaryScalar};
use smallvec::SmallVec;
use std::marker::PhantomData;

type Scratch = SmallVec<[u8; 16]>;

/// `z = f(x, y)` on raw bytes: `x` and `y` in the operand types, `z` in
/// the result type
pub trait BinaryCell: Sync {
    /// Compute one entry
    fn apply(&self, z: &mut [u8], x: &[u8], y: &[u8]);
}

/// `z = f(x)` on raw bytes
pub trait UnaryCell: Sync {
    /// Compute one entry
    fn apply(&self, z: &mut [u8], x: &[u8]);
}

/// Running reduction with a private accumulator
pub trait Fold: Sync {
    /// Accumulator
    type Acc: Send;

    /// Identity accumulator
    fn init(&self) -> Self::Acc;

    /// `acc = acc ⊕ x`, with `x` in the operand type
    fn absorb(&self, acc: &mut Self::Acc, x: &[u8]);

    /// `acc = acc ⊕ other`
    fn merge(&self, acc: &mut Self::Acc, other: &Self::Acc);

    /// Returns true once further input cannot change `acc`
    fn is_terminal(&self, acc: &Self::Acc) -> bool;

    /// Final value
    fn finish(&self, acc: Self::Acc) -> Scalar;
}

// ============================================================================
// Typed cells
// ============================================================================

/// Binary cell specialized for operator `O` over `T`
pub struct TypedBinary<T, O>(PhantomData<fn() -> (T, O)>);

impl<T, O> TypedBinary<T, O> {
    /// New cell
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element, O: BinaryScalar<T>> BinaryCell for TypedBinary<T, O> {
    #[inline(always)]
    fn apply(&self, z: &mut [u8], x: &[u8], y: &[u8]) {
        O::apply(T::read(x), T::read(y)).write(z)
    }
}

/// Unary cell specialized for operator `O` over `T`
pub struct TypedUnary<T, O>(PhantomData<fn() -> (T, O)>);

impl<T, O> TypedUnary<T, O> {
    /// New cell
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element, O: UnaryScalar<T>> UnaryCell for TypedUnary<T, O> {
    #[inline(always)]
    fn apply(&self, z: &mut [u8], x: &[u8]) {
        O::apply(T::read(x)).write(z)
    }
}

/// Monoid reduction specialized for operator `O` over `T`
pub struct TypedFold<T, O> {
    identity: T,
    terminal: Option<T>,
    any: bool,
    _op: PhantomData<fn() -> O>,
}

impl<T: Element, O: BinaryScalar<T, Z = T>> TypedFold<T, O> {
    /// Fold for `monoid`, whose type must be `T`
    pub fn new(monoid: &Monoid) -> Self {
        debug_assert!(*monoid.ty() == T::DTYPE);
        let (terminal, any) = match monoid.terminal() {
            Terminal::None => (None, false),
            Terminal::Value(t) => (Some(T::read(t.as_bytes())), false),
            Terminal::Any => (None, true),
        };
        Self {
            identity: T::read(monoid.identity().as_bytes()),
            terminal,
            any,
            _op: PhantomData,
        }
    }
}

impl<T: Element, O: BinaryScalar<T, Z = T>> Fold for TypedFold<T, O> {
    type Acc = T;

    #[inline]
    fn init(&self) -> T {
        self.identity
    }

    #[inline(always)]
    fn absorb(&self, acc: &mut T, x: &[u8]) {
        *acc = O::apply(*acc, T::read(x));
    }

    #[inline]
    fn merge(&self, acc: &mut T, other: &T) {
        *acc = O::apply(*acc, *other);
    }

    #[inline(always)]
    fn is_terminal(&self, acc: &T) -> bool {
        self.any || self.terminal == Some(*acc)
    }

    fn finish(&self, acc: T) -> Scalar {
        Scalar::new(acc)
    }
}

// ============================================================================
// Generic cells
// ============================================================================

/// Cast `src` through `caster` into `buf` unless the cast is a plain copy
#[inline]
fn cast_in<'b>(caster: &Caster, size: usize, src: &'b [u8], buf: &'b mut Scratch) -> &'b [u8] {
    if caster.is_copy() {
        src
    } else {
        buf.resize(size, 0);
        caster.apply(buf, src);
        buf
    }
}

fn caster(op: &str, from: &Type, to: &Type) -> Result<Caster> {
    Caster::new(from, to).ok_or_else(|| Error::domain_mismatch(op, from, to))
}

/// Binary cell for any operator and types: operands are cast to the
/// operator's domain, the operator is called through its descriptor and
/// the result is cast to the output type
pub struct GenericBinary {
    op: BinaryOp,
    cast_x: Caster,
    cast_y: Caster,
    cast_z: Caster,
}

impl GenericBinary {
    /// Cell computing `op` on operands of `atype`, `btype` into `ctype`
    pub fn new(op: &BinaryOp, atype: &Type, btype: &Type, ctype: &Type) -> Result<Self> {
        Ok(Self {
            op: op.clone(),
            cast_x: caster(op.name(), atype, op.xtype())?,
            cast_y: caster(op.name(), btype, op.ytype())?,
            cast_z: caster(op.name(), op.ztype(), ctype)?,
        })
    }
}

impl BinaryCell for GenericBinary {
    fn apply(&self, z: &mut [u8], x: &[u8], y: &[u8]) {
        let (mut xb, mut yb) = (Scratch::new(), Scratch::new());
        let x = cast_in(&self.cast_x, self.op.xtype().size(), x, &mut xb);
        let y = cast_in(&self.cast_y, self.op.ytype().size(), y, &mut yb);
        if self.cast_z.is_copy() {
            self.op.apply_bytes(z, x, y);
        } else {
            let mut zb = Scratch::from_elem(0, self.op.ztype().size());
            self.op.apply_bytes(&mut zb, x, y);
            self.cast_z.apply(z, &zb);
        }
    }
}

/// Unary cell for any operator and types
pub struct GenericUnary {
    op: UnaryOp,
    cast_x: Caster,
    cast_z: Caster,
}

impl GenericUnary {
    /// Cell computing `op` on operands of `atype` into `ctype`
    pub fn new(op: &UnaryOp, atype: &Type, ctype: &Type) -> Result<Self> {
        Ok(Self {
            op: op.clone(),
            cast_x: caster(op.name(), atype, op.xtype())?,
            cast_z: caster(op.name(), op.ztype(), ctype)?,
        })
    }
}

impl UnaryCell for GenericUnary {
    fn apply(&self, z: &mut [u8], x: &[u8]) {
        let mut xb = Scratch::new();
        let x = cast_in(&self.cast_x, self.op.xtype().size(), x, &mut xb);
        if self.cast_z.is_copy() {
            self.op.apply_bytes(z, x);
        } else {
            let mut zb = Scratch::from_elem(0, self.op.ztype().size());
            self.op.apply_bytes(&mut zb, x);
            self.cast_z.apply(z, &zb);
        }
    }
}

/// Monoid reduction for any monoid and operand type
pub struct GenericFold {
    monoid: Monoid,
    cast: Caster,
}

impl GenericFold {
    /// Fold of values of type `atype` with `monoid`
    pub fn new(monoid: &Monoid, atype: &Type) -> Result<Self> {
        Ok(Self {
            monoid: monoid.clone(),
            cast: caster(monoid.op().name(), atype, monoid.ty())?,
        })
    }
}

impl Fold for GenericFold {
    type Acc = Scratch;

    fn init(&self) -> Scratch {
        Scratch::from_slice(self.monoid.identity().as_bytes())
    }

    fn absorb(&self, acc: &mut Scratch, x: &[u8]) {
        let mut xb = Scratch::new();
        let x = cast_in(&self.cast, self.monoid.ty().size(), x, &mut xb);
        let mut z = Scratch::from_elem(0, acc.len());
        self.monoid.op().apply_bytes(&mut z, acc, x);
        *acc = z;
    }

    fn merge(&self, acc: &mut Scratch, other: &Scratch) {
        let mut z = Scratch::from_elem(0, acc.len());
        self.monoid.op().apply_bytes(&mut z, acc, other);
        *acc = z;
    }

    fn is_terminal(&self, acc: &Scratch) -> bool {
        self.monoid.is_terminal(acc)
    }

    fn finish(&self, acc: Scratch) -> Scalar {
        let mut out = Scalar::zeroed(self.monoid.ty().clone());
        out.as_bytes_mut().copy_from_slice(&acc);
        out
    }
}

/// Cell that writes nothing, for results whose single iso value is
/// computed up front
pub struct PatternOnly;

impl BinaryCell for PatternOnly {
    #[inline(always)]
    fn apply(&self, _z: &mut [u8], _x: &[u8], _y: &[u8]) {}
}

impl UnaryCell for PatternOnly {
    #[inline(always)]
    fn apply(&self, _z: &mut [u8], _x: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::{Complex64, DType};
    use crate::ops::{BinaryOpcode, binary};

    #[test]
    fn test_generic_matches_typed_without_casts() {
        let op = BinaryOp::builtin(BinaryOpcode::Div, DType::I16).unwrap();
        let t: Type = DType::I16.into();
        let generic = GenericBinary::new(&op, &t, &t, &t).unwrap();
        let typed = TypedBinary::<i16, binary::Div>::new();
        for (x, y) in [(7i16, 2i16), (-7, 0), (0, 0), (i16::MIN, -1)] {
            let (mut zg, mut zt) = ([0u8; 2], [0u8; 2]);
            generic.apply(&mut zg, &x.to_ne_bytes(), &y.to_ne_bytes());
            typed.apply(&mut zt, &x.to_ne_bytes(), &y.to_ne_bytes());
            assert_eq!(zg, zt);
        }
    }

    #[test]
    fn test_generic_casts_real_into_complex() {
        let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::F64).unwrap();
        let cell = GenericBinary::new(
            &op,
            &DType::I32.into(),
            &DType::F32.into(),
            &DType::Complex64.into(),
        )
        .unwrap();
        let mut z = [0u8; 8];
        cell.apply(&mut z, &3i32.to_ne_bytes(), &0.5f32.to_ne_bytes());
        assert_eq!(Complex64::read(&z), Complex64::new(3.5, 0.0));
    }

    #[test]
    fn test_generic_rejects_user_to_builtin() {
        let u = crate::dtype::UserType::new("opaque", 3);
        let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::U8).unwrap();
        let t: Type = DType::U8.into();
        assert!(GenericBinary::new(&op, &u.into(), &t, &t).is_err());
    }

    #[test]
    fn test_folds_agree() {
        let m = Monoid::builtin(BinaryOpcode::Max, DType::I32).unwrap();
        let typed = TypedFold::<i32, binary::Max>::new(&m);
        let generic = GenericFold::new(&m, &DType::I32.into()).unwrap();
        let mut at = typed.init();
        let mut ag = generic.init();
        for x in [3i32, -9, 12, 4] {
            typed.absorb(&mut at, &x.to_ne_bytes());
            generic.absorb(&mut ag, &x.to_ne_bytes());
        }
        assert_eq!(typed.finish(at), generic.finish(ag));
        assert!(typed.is_terminal(&i32::MAX));
        assert!(generic.is_terminal(&Scratch::from_slice(&i32::MAX.to_ne_bytes())));
    }
}
