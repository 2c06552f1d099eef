//! Monoids: associative binary operators with an identity
//!
//! A monoid reduces a collection to a single value. Built-in monoids carry
//! the identity implied by their opcode and, where one exists, a terminal
//! value that lets a reduction stop early (for example `0` for integer
//! `times`, or `-inf` for `min`).

use super::{BinaryOp, BinaryOpcode};
use crate::dtype::{Complex64, Complex128, DType, Element, Ordered, Scalar, Type};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Early-exit value of a monoid
#[derive(Clone, Debug, PartialEq)]
pub enum Terminal {
    /// No terminal value
    None,
    /// Once the running value equals this, further input cannot change it
    Value(Scalar),
    /// Any value is final (the `any` monoid)
    Any,
}

#[derive(Debug)]
struct MonoidInner {
    op: BinaryOp,
    identity: Scalar,
    terminal: Terminal,
}

/// Immutable monoid descriptor
#[derive(Clone, Debug)]
pub struct Monoid {
    inner: Arc<MonoidInner>,
}

fn ordered_identity<T: Ordered>(opcode: BinaryOpcode) -> Option<(Scalar, Terminal)> {
    let (identity, terminal) = match opcode {
        BinaryOpcode::Plus => (T::zero(), None),
        BinaryOpcode::Times if T::DTYPE.is_float() => (T::one(), None),
        BinaryOpcode::Times => (T::one(), Some(T::zero())),
        BinaryOpcode::Min => (T::highest(), Some(T::lowest())),
        BinaryOpcode::Max => (T::lowest(), Some(T::highest())),
        BinaryOpcode::Lor => (T::zero(), Some(T::one())),
        BinaryOpcode::Land => (T::one(), Some(T::zero())),
        BinaryOpcode::Lxor => (T::zero(), None),
        BinaryOpcode::Eq if T::DTYPE == DType::Bool => (T::one(), None),
        BinaryOpcode::Any => return Some((Scalar::new(T::zero()), Terminal::Any)),
        _ => return None,
    };
    let terminal = match terminal {
        Some(t) => Terminal::Value(Scalar::new(t)),
        None => Terminal::None,
    };
    Some((Scalar::new(identity), terminal))
}

fn complex_identity<T: Element>(opcode: BinaryOpcode) -> Option<(Scalar, Terminal)> {
    match opcode {
        BinaryOpcode::Plus => Some((Scalar::new(T::zero()), Terminal::None)),
        BinaryOpcode::Times => Some((Scalar::new(T::one()), Terminal::None)),
        BinaryOpcode::Any => Some((Scalar::new(T::zero()), Terminal::Any)),
        _ => None,
    }
}

fn builtin_identity(opcode: BinaryOpcode, dtype: DType) -> Option<(Scalar, Terminal)> {
    match dtype {
        DType::Bool => ordered_identity::<bool>(opcode),
        DType::I8 => ordered_identity::<i8>(opcode),
        DType::I16 => ordered_identity::<i16>(opcode),
        DType::I32 => ordered_identity::<i32>(opcode),
        DType::I64 => ordered_identity::<i64>(opcode),
        DType::U8 => ordered_identity::<u8>(opcode),
        DType::U16 => ordered_identity::<u16>(opcode),
        DType::U32 => ordered_identity::<u32>(opcode),
        DType::U64 => ordered_identity::<u64>(opcode),
        DType::F32 => ordered_identity::<f32>(opcode),
        DType::F64 => ordered_identity::<f64>(opcode),
        DType::Complex64 => complex_identity::<Complex64>(opcode),
        DType::Complex128 => complex_identity::<Complex128>(opcode),
    }
}

impl Monoid {
    /// Built-in monoid `opcode` over `dtype`.
    ///
    /// Valid opcodes: `plus, times, min, max, any, lor, land, lxor`, and
    /// `eq` over bool. Ordering and logical monoids are not defined for
    /// complex types.
    pub fn builtin(opcode: BinaryOpcode, dtype: DType) -> Result<Self> {
        let op = BinaryOp::builtin(opcode, dtype)?;
        let (identity, terminal) = builtin_identity(opcode, dtype).ok_or_else(|| {
            Error::invalid_value(
                "opcode",
                format!("{} over {} does not form a monoid", opcode, dtype),
            )
        })?;
        Ok(Self {
            inner: Arc::new(MonoidInner {
                op,
                identity,
                terminal,
            }),
        })
    }

    /// Monoid over a user-supplied operator.
    ///
    /// The operator must have `x`, `y` and `z` of one type, and the identity
    /// (and terminal, if given) must be of that type. Associativity of the
    /// operator is the caller's responsibility.
    pub fn user(op: BinaryOp, identity: Scalar, terminal: Option<Scalar>) -> Result<Self> {
        let ty = op.ztype().clone();
        if *op.xtype() != ty || *op.ytype() != ty {
            return Err(Error::domain_mismatch(op.name(), op.xtype(), &ty));
        }
        if *identity.ty() != ty {
            return Err(Error::domain_mismatch(op.name(), identity.ty(), &ty));
        }
        let terminal = match terminal {
            Some(t) if *t.ty() != ty => {
                return Err(Error::domain_mismatch(op.name(), t.ty(), &ty));
            }
            Some(t) => Terminal::Value(t),
            None => Terminal::None,
        };
        Ok(Self {
            inner: Arc::new(MonoidInner {
                op,
                identity,
                terminal,
            }),
        })
    }

    /// The binary operator
    #[inline]
    pub fn op(&self) -> &BinaryOp {
        &self.inner.op
    }

    /// Opcode of the operator
    #[inline]
    pub fn opcode(&self) -> BinaryOpcode {
        self.inner.op.opcode()
    }

    /// Value type
    #[inline]
    pub fn ty(&self) -> &Type {
        self.inner.op.ztype()
    }

    /// Identity value
    #[inline]
    pub fn identity(&self) -> &Scalar {
        &self.inner.identity
    }

    /// Terminal value
    #[inline]
    pub fn terminal(&self) -> &Terminal {
        &self.inner.terminal
    }

    /// Returns true if the operator is a built-in opcode over a built-in type
    #[inline]
    pub fn is_builtin(&self) -> bool {
        self.inner.op.is_builtin()
    }

    /// Returns true for degenerate operators (`any`, `first`, `second`,
    /// `pair`) whose reduction costs O(1) per value
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.opcode().is_trivial()
    }

    /// Returns true if `value` equals the terminal
    #[inline]
    pub fn is_terminal(&self, value: &[u8]) -> bool {
        match &self.inner.terminal {
            Terminal::None => false,
            Terminal::Any => true,
            Terminal::Value(t) => t.as_bytes() == value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_identities() {
        let m = Monoid::builtin(BinaryOpcode::Min, DType::F32).unwrap();
        assert_eq!(m.identity().get::<f32>().unwrap(), f32::INFINITY);
        assert!(m.is_terminal(&f32::NEG_INFINITY.to_ne_bytes()));

        let m = Monoid::builtin(BinaryOpcode::Max, DType::I16).unwrap();
        assert_eq!(m.identity().get::<i16>().unwrap(), i16::MIN);

        let m = Monoid::builtin(BinaryOpcode::Times, DType::U32).unwrap();
        assert_eq!(m.identity().get::<u32>().unwrap(), 1);
        assert!(m.is_terminal(&0u32.to_ne_bytes()));

        let m = Monoid::builtin(BinaryOpcode::Times, DType::F64).unwrap();
        assert_eq!(*m.terminal(), Terminal::None);
    }

    #[test]
    fn test_non_monoid_opcodes_rejected() {
        let err = Monoid::builtin(BinaryOpcode::Minus, DType::I32).unwrap_err();
        assert_eq!(err.status(), crate::error::Status::InvalidValue);
        assert!(Monoid::builtin(BinaryOpcode::Eq, DType::I32).is_err());
        assert!(Monoid::builtin(BinaryOpcode::Eq, DType::Bool).is_ok());
        assert!(Monoid::builtin(BinaryOpcode::Max, DType::Complex64).is_err());
    }

    #[test]
    fn test_trivial_flag() {
        assert!(
            Monoid::builtin(BinaryOpcode::Any, DType::F64)
                .unwrap()
                .is_trivial()
        );
        assert!(
            !Monoid::builtin(BinaryOpcode::Plus, DType::F64)
                .unwrap()
                .is_trivial()
        );
    }

    #[test]
    fn test_user_monoid_type_checks() {
        let op = BinaryOp::builtin(BinaryOpcode::Plus, DType::I64).unwrap();
        assert!(Monoid::user(op.clone(), Scalar::new(0i32), None).is_err());
        let m = Monoid::user(op, Scalar::new(0i64), None).unwrap();
        assert!(m.is_builtin());
        assert_eq!(*m.ty(), DType::I64);
    }
}
