//! Binary operators
//!
//! A [`BinaryOp`] is an immutable descriptor `z = f(x, y)` with a domain
//! type pair and a codomain type. Built-in operators are named by a
//! [`BinaryOpcode`] over a built-in type; user operators wrap an opaque
//! byte-level function and may use user-defined types.
//!
//! Each built-in opcode also has a zero-sized scalar implementation
//! ([`BinaryScalar`]). The [`dispatch_binary!`](crate::dispatch_binary) macro
//! maps a runtime `(opcode, dtype)` pair onto those implementations so that
//! typed kernels and the byte-level function of a descriptor are generated
//! from the same source and cannot disagree.

use crate::dtype::{DType, Element, Ordered, Type};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Built-in binary opcodes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOpcode {
    /// `z = x`
    First,
    /// `z = y`
    Second,
    /// `z = x or y`, whichever is cheapest (this engine returns `y`)
    Any,
    /// `z = 1`
    Pair,
    /// `z = min(x, y)`
    Min,
    /// `z = max(x, y)`
    Max,
    /// `z = x + y`
    Plus,
    /// `z = x - y`
    Minus,
    /// `z = y - x`
    Rminus,
    /// `z = x * y`
    Times,
    /// `z = x / y`
    Div,
    /// `z = y / x`
    Rdiv,
    /// `z = (x == y)`, boolean result
    Eq,
    /// `z = (x != y)`, boolean result
    Ne,
    /// `z = (x > y)`, boolean result
    Gt,
    /// `z = (x < y)`, boolean result
    Lt,
    /// `z = (x >= y)`, boolean result
    Ge,
    /// `z = (x <= y)`, boolean result
    Le,
    /// `z = (x != 0) || (y != 0)`
    Lor,
    /// `z = (x != 0) && (y != 0)`
    Land,
    /// `z = (x != 0) != (y != 0)`
    Lxor,
    /// Opaque user-defined function
    User,
}

impl BinaryOpcode {
    /// Every built-in opcode
    pub const BUILTIN: [BinaryOpcode; 21] = [
        BinaryOpcode::First,
        BinaryOpcode::Second,
        BinaryOpcode::Any,
        BinaryOpcode::Pair,
        BinaryOpcode::Min,
        BinaryOpcode::Max,
        BinaryOpcode::Plus,
        BinaryOpcode::Minus,
        BinaryOpcode::Rminus,
        BinaryOpcode::Times,
        BinaryOpcode::Div,
        BinaryOpcode::Rdiv,
        BinaryOpcode::Eq,
        BinaryOpcode::Ne,
        BinaryOpcode::Gt,
        BinaryOpcode::Lt,
        BinaryOpcode::Ge,
        BinaryOpcode::Le,
        BinaryOpcode::Lor,
        BinaryOpcode::Land,
        BinaryOpcode::Lxor,
    ];

    /// Lower-case name used in descriptor names and traces
    pub const fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Any => "any",
            Self::Pair => "pair",
            Self::Min => "min",
            Self::Max => "max",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Rminus => "rminus",
            Self::Times => "times",
            Self::Div => "div",
            Self::Rdiv => "rdiv",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::Lor => "lor",
            Self::Land => "land",
            Self::Lxor => "lxor",
            Self::User => "user",
        }
    }

    /// Returns true if the opcode needs an ordered domain
    #[inline]
    pub const fn requires_order(self) -> bool {
        matches!(
            self,
            Self::Min
                | Self::Max
                | Self::Gt
                | Self::Lt
                | Self::Ge
                | Self::Le
                | Self::Lor
                | Self::Land
                | Self::Lxor
        )
    }

    /// Returns true if the result does not depend on computing anything from
    /// the operands (a pick of one side, or a constant)
    #[inline]
    pub const fn is_trivial(self) -> bool {
        matches!(self, Self::First | Self::Second | Self::Any | Self::Pair)
    }

    /// Returns true if this opcode is defined for `dtype`
    #[inline]
    pub const fn supports(self, dtype: DType) -> bool {
        match self {
            Self::User => false,
            _ => !self.requires_order() || dtype.is_ordered(),
        }
    }
}

impl fmt::Display for BinaryOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Scalar implementations
// ============================================================================

/// Typed implementation of one built-in opcode over domain `T`
pub trait BinaryScalar<T: Element>: Send + Sync + 'static {
    /// Result type
    type Z: Element;

    /// Compute `z = f(x, y)`
    fn apply(x: T, y: T) -> Self::Z;
}

macro_rules! scalar_op {
    ($(#[$doc:meta])* $name:ident, $bound:ident, |$x:ident, $y:ident| -> $z:ty { $e:expr }) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $name;

        impl<T: $bound> BinaryScalar<T> for $name {
            type Z = $z;

            #[inline(always)]
            #[allow(unused_variables)]
            fn apply($x: T, $y: T) -> $z {
                $e
            }
        }
    };
}

scalar_op!(/// `x`
    First, Element, |x, y| -> T { x });
scalar_op!(/// `y`
    Second, Element, |x, y| -> T { y });
scalar_op!(/// `y`
    AnyOp, Element, |x, y| -> T { y });
scalar_op!(/// `1`
    Pair, Element, |x, y| -> T { T::one() });
scalar_op!(/// `min(x, y)`
    Min, Ordered, |x, y| -> T { x.minimum(y) });
scalar_op!(/// `max(x, y)`
    Max, Ordered, |x, y| -> T { x.maximum(y) });
scalar_op!(/// `x + y`
    Plus, Element, |x, y| -> T { x.plus(y) });
scalar_op!(/// `x - y`
    Minus, Element, |x, y| -> T { x.minus(y) });
scalar_op!(/// `y - x`
    Rminus, Element, |x, y| -> T { y.minus(x) });
scalar_op!(/// `x * y`
    Times, Element, |x, y| -> T { x.times(y) });
scalar_op!(/// `x / y`
    Div, Element, |x, y| -> T { x.divide(y) });
scalar_op!(/// `y / x`
    Rdiv, Element, |x, y| -> T { y.divide(x) });
scalar_op!(/// `x == y`
    EqOp, Element, |x, y| -> bool { x == y });
scalar_op!(/// `x != y`
    NeOp, Element, |x, y| -> bool { x != y });
scalar_op!(/// `x > y`
    GtOp, Ordered, |x, y| -> bool { x > y });
scalar_op!(/// `x < y`
    LtOp, Ordered, |x, y| -> bool { x < y });
scalar_op!(/// `x >= y`
    GeOp, Ordered, |x, y| -> bool { x >= y });
scalar_op!(/// `x <= y`
    LeOp, Ordered, |x, y| -> bool { x <= y });
scalar_op!(/// logical or
    Lor, Ordered, |x, y| -> T { T::from_bool(x.is_nonzero() || y.is_nonzero()) });
scalar_op!(/// logical and
    Land, Ordered, |x, y| -> T { T::from_bool(x.is_nonzero() && y.is_nonzero()) });
scalar_op!(/// logical xor
    Lxor, Ordered, |x, y| -> T { T::from_bool(x.is_nonzero() != y.is_nonzero()) });

/// Byte-level cell for a typed scalar op: reads `x` and `y`, writes `z`
pub(crate) fn byte_cell<T: Element, O: BinaryScalar<T>>(z: &mut [u8], x: &[u8], y: &[u8]) {
    O::apply(T::read(x), T::read(y)).write(z)
}

/// Runtime dispatch from `(opcode, dtype)` to a typed scalar op.
///
/// Binds `$T` to the Rust type of `dtype` and `$O` to the opcode's
/// [`BinaryScalar`] implementation, then evaluates `$body`. Evaluates to
/// `Some(body)` or `None` if the opcode is not defined for the type.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_binary {
    ($opcode:expr, $dtype:expr, $T:ident, $O:ident => $body:block) => {{
        match $dtype {
            $crate::dtype::DType::Bool => $crate::dispatch_binary!(@ordered $opcode, bool, $T, $O, $body),
            $crate::dtype::DType::I8 => $crate::dispatch_binary!(@ordered $opcode, i8, $T, $O, $body),
            $crate::dtype::DType::I16 => $crate::dispatch_binary!(@ordered $opcode, i16, $T, $O, $body),
            $crate::dtype::DType::I32 => $crate::dispatch_binary!(@ordered $opcode, i32, $T, $O, $body),
            $crate::dtype::DType::I64 => $crate::dispatch_binary!(@ordered $opcode, i64, $T, $O, $body),
            $crate::dtype::DType::U8 => $crate::dispatch_binary!(@ordered $opcode, u8, $T, $O, $body),
            $crate::dtype::DType::U16 => $crate::dispatch_binary!(@ordered $opcode, u16, $T, $O, $body),
            $crate::dtype::DType::U32 => $crate::dispatch_binary!(@ordered $opcode, u32, $T, $O, $body),
            $crate::dtype::DType::U64 => $crate::dispatch_binary!(@ordered $opcode, u64, $T, $O, $body),
            $crate::dtype::DType::F32 => $crate::dispatch_binary!(@ordered $opcode, f32, $T, $O, $body),
            $crate::dtype::DType::F64 => $crate::dispatch_binary!(@ordered $opcode, f64, $T, $O, $body),
            $crate::dtype::DType::Complex64 => {
                $crate::dispatch_binary!(@complex $opcode, $crate::dtype::Complex64, $T, $O, $body)
            }
            $crate::dtype::DType::Complex128 => {
                $crate::dispatch_binary!(@complex $opcode, $crate::dtype::Complex128, $T, $O, $body)
            }
        }
    }};
    (@arm $ty:ty, $op:ident, $T:ident, $O:ident, $body:block) => {{
        type $T = $ty;
        type $O = $crate::ops::binary::$op;
        Some($body)
    }};
    (@ordered $opcode:expr, $ty:ty, $T:ident, $O:ident, $body:block) => {
        match $opcode {
            $crate::ops::BinaryOpcode::First => $crate::dispatch_binary!(@arm $ty, First, $T, $O, $body),
            $crate::ops::BinaryOpcode::Second => $crate::dispatch_binary!(@arm $ty, Second, $T, $O, $body),
            $crate::ops::BinaryOpcode::Any => $crate::dispatch_binary!(@arm $ty, AnyOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Pair => $crate::dispatch_binary!(@arm $ty, Pair, $T, $O, $body),
            $crate::ops::BinaryOpcode::Min => $crate::dispatch_binary!(@arm $ty, Min, $T, $O, $body),
            $crate::ops::BinaryOpcode::Max => $crate::dispatch_binary!(@arm $ty, Max, $T, $O, $body),
            $crate::ops::BinaryOpcode::Plus => $crate::dispatch_binary!(@arm $ty, Plus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Minus => $crate::dispatch_binary!(@arm $ty, Minus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Rminus => $crate::dispatch_binary!(@arm $ty, Rminus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Times => $crate::dispatch_binary!(@arm $ty, Times, $T, $O, $body),
            $crate::ops::BinaryOpcode::Div => $crate::dispatch_binary!(@arm $ty, Div, $T, $O, $body),
            $crate::ops::BinaryOpcode::Rdiv => $crate::dispatch_binary!(@arm $ty, Rdiv, $T, $O, $body),
            $crate::ops::BinaryOpcode::Eq => $crate::dispatch_binary!(@arm $ty, EqOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Ne => $crate::dispatch_binary!(@arm $ty, NeOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Gt => $crate::dispatch_binary!(@arm $ty, GtOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Lt => $crate::dispatch_binary!(@arm $ty, LtOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Ge => $crate::dispatch_binary!(@arm $ty, GeOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Le => $crate::dispatch_binary!(@arm $ty, LeOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Lor => $crate::dispatch_binary!(@arm $ty, Lor, $T, $O, $body),
            $crate::ops::BinaryOpcode::Land => $crate::dispatch_binary!(@arm $ty, Land, $T, $O, $body),
            $crate::ops::BinaryOpcode::Lxor => $crate::dispatch_binary!(@arm $ty, Lxor, $T, $O, $body),
            $crate::ops::BinaryOpcode::User => None,
        }
    };
    (@complex $opcode:expr, $ty:ty, $T:ident, $O:ident, $body:block) => {
        match $opcode {
            $crate::ops::BinaryOpcode::First => $crate::dispatch_binary!(@arm $ty, First, $T, $O, $body),
            $crate::ops::BinaryOpcode::Second => $crate::dispatch_binary!(@arm $ty, Second, $T, $O, $body),
            $crate::ops::BinaryOpcode::Any => $crate::dispatch_binary!(@arm $ty, AnyOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Pair => $crate::dispatch_binary!(@arm $ty, Pair, $T, $O, $body),
            $crate::ops::BinaryOpcode::Plus => $crate::dispatch_binary!(@arm $ty, Plus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Minus => $crate::dispatch_binary!(@arm $ty, Minus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Rminus => $crate::dispatch_binary!(@arm $ty, Rminus, $T, $O, $body),
            $crate::ops::BinaryOpcode::Times => $crate::dispatch_binary!(@arm $ty, Times, $T, $O, $body),
            $crate::ops::BinaryOpcode::Div => $crate::dispatch_binary!(@arm $ty, Div, $T, $O, $body),
            $crate::ops::BinaryOpcode::Rdiv => $crate::dispatch_binary!(@arm $ty, Rdiv, $T, $O, $body),
            $crate::ops::BinaryOpcode::Eq => $crate::dispatch_binary!(@arm $ty, EqOp, $T, $O, $body),
            $crate::ops::BinaryOpcode::Ne => $crate::dispatch_binary!(@arm $ty, NeOp, $T, $O, $body),
            _ => None,
        }
    };
}

// ============================================================================
// Descriptor
// ============================================================================

/// Byte-level binary function `f(z, x, y)` used by the generic path
pub type BinaryFn = Arc<dyn Fn(&mut [u8], &[u8], &[u8]) + Send + Sync>;

#[derive(Clone)]
enum BinaryImpl {
    Builtin(fn(&mut [u8], &[u8], &[u8])),
    User(BinaryFn),
}

struct BinaryOpInner {
    name: String,
    opcode: BinaryOpcode,
    xtype: Type,
    ytype: Type,
    ztype: Type,
    func: BinaryImpl,
}

/// Immutable binary operator descriptor, shared by reference
#[derive(Clone)]
pub struct BinaryOp {
    inner: Arc<BinaryOpInner>,
}

impl BinaryOp {
    /// Built-in operator `opcode` over the built-in type `dtype`.
    ///
    /// Returns `DomainMismatch` if the opcode is not defined for the type
    /// (ordering and logical opcodes are not defined for complex types).
    pub fn builtin(opcode: BinaryOpcode, dtype: DType) -> Result<Self> {
        let found = dispatch_binary!(opcode, dtype, T, O => {
            (
                byte_cell::<T, O> as fn(&mut [u8], &[u8], &[u8]),
                <<O as BinaryScalar<T>>::Z as Element>::DTYPE,
            )
        });
        let (func, zdtype) = found.ok_or_else(|| {
            Error::domain_mismatch(format!("BinaryOp::{}", opcode), dtype, "an ordered type")
        })?;
        Ok(Self {
            inner: Arc::new(BinaryOpInner {
                name: format!("{}_{}", opcode.name(), dtype.name()),
                opcode,
                xtype: dtype.into(),
                ytype: dtype.into(),
                ztype: zdtype.into(),
                func: BinaryImpl::Builtin(func),
            }),
        })
    }

    /// User-defined operator over arbitrary types.
    ///
    /// `func(z, x, y)` receives byte slices of exactly the declared sizes.
    pub fn user<F>(name: impl Into<String>, xtype: Type, ytype: Type, ztype: Type, func: F) -> Self
    where
        F: Fn(&mut [u8], &[u8], &[u8]) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(BinaryOpInner {
                name: name.into(),
                opcode: BinaryOpcode::User,
                xtype,
                ytype,
                ztype,
                func: BinaryImpl::User(Arc::new(func)),
            }),
        }
    }

    /// Operator name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Opcode (`User` for user-defined operators)
    #[inline]
    pub fn opcode(&self) -> BinaryOpcode {
        self.inner.opcode
    }

    /// Type of the first operand
    #[inline]
    pub fn xtype(&self) -> &Type {
        &self.inner.xtype
    }

    /// Type of the second operand
    #[inline]
    pub fn ytype(&self) -> &Type {
        &self.inner.ytype
    }

    /// Result type
    #[inline]
    pub fn ztype(&self) -> &Type {
        &self.inner.ztype
    }

    /// Returns true for built-in (specialization-eligible) operators
    #[inline]
    pub fn is_builtin(&self) -> bool {
        self.inner.opcode != BinaryOpcode::User
    }

    /// Built-in domain type, if this is a built-in operator
    #[inline]
    pub fn builtin_dtype(&self) -> Option<DType> {
        if self.is_builtin() {
            self.inner.xtype.builtin()
        } else {
            None
        }
    }

    /// Apply the operator to raw operand bytes
    #[inline]
    pub fn apply_bytes(&self, z: &mut [u8], x: &[u8], y: &[u8]) {
        match &self.inner.func {
            BinaryImpl::Builtin(f) => f(z, x, y),
            BinaryImpl::User(f) => f(z, x, y),
        }
    }

    /// Returns true if both handles refer to the same descriptor
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("name", &self.inner.name)
            .field("opcode", &self.inner.opcode)
            .field("xtype", &self.inner.xtype)
            .field("ytype", &self.inner.ytype)
            .field("ztype", &self.inner.ztype)
            .finish()
    }
}
