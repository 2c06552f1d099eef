//! Specialization cache and kernel selection
//!
//! For every built-in `(opcode, type)` pair the engine carries a kernel that
//! is monomorphized over the operator and element type ([`TypedBinary`],
//! [`TypedUnary`], [`TypedMonoid`]). These live in a [`KernelRegistry`] that
//! is filled once and never mutated afterwards, so lookups need no locking.
//!
//! When no specialization applies (user-defined operator or type, operand
//! types that need casting, or a [`KernelConfig`] switch) the selector
//! answers [`Selection::Generic`] and the engine runs the same method body
//! with a boxed cell ([`GenericBinary`], [`GenericUnary`], [`GenericFold`])
//! that casts operands and calls the operator through its descriptor. Both
//! paths use the same casting rules and the same scalar operators, so their
//! results are bit-identical.

mod cell;
mod registry;

pub use cell::{
    BinaryCell, Fold, GenericBinary, GenericFold, GenericUnary, PatternOnly, TypedBinary,
    TypedFold, TypedUnary, UnaryCell,
};
pub use registry::{KernelConfig, KernelRegistry, TypedMonoid};

use crate::dtype::Scalar;
use crate::engine::{ApplyJob, EmultJob, ReduceJob};
use crate::matrix::Matrix;
use std::fmt;
use std::sync::Arc;

/// Specialized elementwise-multiply kernel
pub trait EmultKernel: Send + Sync {
    /// Run the job's method body with this kernel's cell
    fn run(&self, job: &EmultJob<'_>) -> Matrix;
}

/// Specialized unary-apply kernel
pub trait ApplyKernel: Send + Sync {
    /// Transform every entry of the job's operand
    fn run(&self, job: &ApplyJob<'_>) -> Matrix;
}

/// Specialized reduce-to-scalar kernel
pub trait ReduceKernel: Send + Sync {
    /// Reduce the job's operand with its monoid
    fn run(&self, job: &ReduceJob<'_>) -> Scalar;
}

/// Outcome of a kernel lookup
pub enum Selection<K: ?Sized> {
    /// A specialization exists and is enabled
    Specialized(Arc<K>),
    /// Use the boxed generic path
    Generic,
    /// The operator is marked unsupported; no path applies
    Unsupported,
}

impl<K: ?Sized> Selection<K> {
    /// Returns true for [`Selection::Specialized`]
    pub fn is_specialized(&self) -> bool {
        matches!(self, Selection::Specialized(_))
    }

    /// Returns true for [`Selection::Generic`]
    pub fn is_generic(&self) -> bool {
        matches!(self, Selection::Generic)
    }
}

impl<K: ?Sized> fmt::Debug for Selection<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Specialized(_) => write!(f, "Specialized"),
            Selection::Generic => write!(f, "Generic"),
            Selection::Unsupported => write!(f, "Unsupported"),
        }
    }
}
