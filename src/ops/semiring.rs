//! Semirings for generalized matrix products.
//!
//! A semiring pairs an additive [`Monoid`] (⊕) with a multiplicative
//! [`BinaryOp`] (⊗): `C[i,j] = ⊕_k (A[i,k] ⊗ B[k,j])`. Besides the usual
//! (+, ×) there are built-in semirings for graph algorithms:
//!
//! - `MinPlus`: shortest paths, tropical geometry
//! - `MaxPlus`: longest paths, scheduling
//! - `MaxMin`: bottleneck/network capacity
//! - `MinMax`: fuzzy relations
//! - `LorLand`: boolean products, transitive closure
//! - `PlusMax`: dynamic programming formulations

use super::{BinaryOp, BinaryOpcode, Monoid};
use crate::dtype::{DType, Type};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Built-in semiring catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SemiringOp {
    /// (+, ×): conventional arithmetic
    PlusTimes,
    /// (min, +): shortest path distances
    MinPlus,
    /// (max, +): longest path distances
    MaxPlus,
    /// (max, min): bottleneck / max-capacity paths
    MaxMin,
    /// (min, max): fuzzy relations
    MinMax,
    /// (OR, AND): boolean products / transitive closure
    LorLand,
    /// (+, max): certain DP formulations
    PlusMax,
}

impl SemiringOp {
    /// Opcodes of the additive monoid and the multiplicative operator
    pub const fn opcodes(self) -> (BinaryOpcode, BinaryOpcode) {
        match self {
            SemiringOp::PlusTimes => (BinaryOpcode::Plus, BinaryOpcode::Times),
            SemiringOp::MinPlus => (BinaryOpcode::Min, BinaryOpcode::Plus),
            SemiringOp::MaxPlus => (BinaryOpcode::Max, BinaryOpcode::Plus),
            SemiringOp::MaxMin => (BinaryOpcode::Max, BinaryOpcode::Min),
            SemiringOp::MinMax => (BinaryOpcode::Min, BinaryOpcode::Max),
            SemiringOp::LorLand => (BinaryOpcode::Lor, BinaryOpcode::Land),
            SemiringOp::PlusMax => (BinaryOpcode::Plus, BinaryOpcode::Max),
        }
    }
}

impl fmt::Display for SemiringOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (reduce, combine) = match self {
            SemiringOp::PlusTimes => ("+", "*"),
            SemiringOp::MinPlus => ("min", "+"),
            SemiringOp::MaxPlus => ("max", "+"),
            SemiringOp::MaxMin => ("max", "min"),
            SemiringOp::MinMax => ("min", "max"),
            SemiringOp::LorLand => ("OR", "AND"),
            SemiringOp::PlusMax => ("+", "max"),
        };
        write!(f, "({}, {})", reduce, combine)
    }
}

#[derive(Debug)]
struct SemiringInner {
    add: Monoid,
    multiply: BinaryOp,
}

/// Immutable semiring descriptor
#[derive(Clone, Debug)]
pub struct Semiring {
    inner: Arc<SemiringInner>,
}

impl Semiring {
    /// Build a semiring from parts.
    ///
    /// The multiplicative operator's result type must be the monoid's type.
    pub fn new(add: Monoid, multiply: BinaryOp) -> Result<Self> {
        if multiply.ztype() != add.ty() {
            return Err(Error::domain_mismatch(
                multiply.name(),
                multiply.ztype(),
                add.ty(),
            ));
        }
        Ok(Self {
            inner: Arc::new(SemiringInner { add, multiply }),
        })
    }

    /// Built-in semiring over `dtype`
    pub fn builtin(kind: SemiringOp, dtype: DType) -> Result<Self> {
        let (add, mult) = kind.opcodes();
        Self::new(
            Monoid::builtin(add, dtype)?,
            BinaryOp::builtin(mult, dtype)?,
        )
    }

    /// (+, ×)
    pub fn plus_times(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::PlusTimes, dtype)
    }

    /// (min, +)
    pub fn min_plus(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::MinPlus, dtype)
    }

    /// (max, +)
    pub fn max_plus(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::MaxPlus, dtype)
    }

    /// (max, min)
    pub fn max_min(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::MaxMin, dtype)
    }

    /// (min, max)
    pub fn min_max(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::MinMax, dtype)
    }

    /// (OR, AND)
    pub fn lor_land(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::LorLand, dtype)
    }

    /// (+, max)
    pub fn plus_max(dtype: DType) -> Result<Self> {
        Self::builtin(SemiringOp::PlusMax, dtype)
    }

    /// Additive monoid
    #[inline]
    pub fn add(&self) -> &Monoid {
        &self.inner.add
    }

    /// Multiplicative operator
    #[inline]
    pub fn multiply(&self) -> &BinaryOp {
        &self.inner.multiply
    }

    /// Result type of the product
    #[inline]
    pub fn ty(&self) -> &Type {
        self.inner.add.ty()
    }

    /// Returns true if both parts are built-in
    pub fn is_builtin(&self) -> bool {
        self.inner.add.is_builtin() && self.inner.multiply.is_builtin()
    }
}

impl fmt::Display for Semiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            self.inner.add.op().name(),
            self.inner.multiply.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Element;

    fn mult<T: Element>(s: &Semiring, x: T, y: T) -> T {
        let (mut xb, mut yb, mut zb) = ([0u8; 8], [0u8; 8], [0u8; 8]);
        x.write(&mut xb);
        y.write(&mut yb);
        s.multiply().apply_bytes(&mut zb, &xb, &yb);
        T::read(&zb)
    }

    #[test]
    fn test_min_plus_parts() {
        let s = Semiring::min_plus(DType::F32).unwrap();
        assert_eq!(mult(&s, 3.0f32, 5.0), 8.0);
        assert_eq!(s.add().opcode(), BinaryOpcode::Min);
        assert_eq!(s.add().identity().get::<f32>().unwrap(), f32::INFINITY);
    }

    #[test]
    fn test_max_min_combine() {
        let s = Semiring::max_min(DType::I32).unwrap();
        assert_eq!(mult(&s, 3i32, 5), 3);
        assert_eq!(s.add().identity().get::<i32>().unwrap(), i32::MIN);
    }

    #[test]
    fn test_plus_max() {
        let s = Semiring::plus_max(DType::F64).unwrap();
        assert_eq!(mult(&s, 3.0f64, 5.0), 5.0);
        assert_eq!(s.add().identity().get::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_lor_land_bool() {
        let s = Semiring::lor_land(DType::Bool).unwrap();
        assert!(!mult(&s, true, false));
        assert!(s.is_builtin());
    }

    #[test]
    fn test_comparison_multiply_rejected() {
        let add = Monoid::builtin(BinaryOpcode::Plus, DType::I32).unwrap();
        let lt = BinaryOp::builtin(BinaryOpcode::Lt, DType::I32).unwrap();
        assert!(Semiring::new(add, lt).is_err());
        assert!(Semiring::min_plus(DType::Complex64).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SemiringOp::MinPlus), "(min, +)");
        assert_eq!(format!("{}", SemiringOp::LorLand), "(OR, AND)");
        let s = Semiring::plus_times(DType::F64).unwrap();
        assert_eq!(s.to_string(), "(plus_fp64, times_fp64)");
    }
}
