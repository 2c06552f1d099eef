//! Unary operators used by `apply`

use crate::dtype::{DType, Element, Ordered, Type};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Built-in unary opcodes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOpcode {
    /// `z = x`
    Identity,
    /// `z = -x`
    Ainv,
    /// `z = 1 / x`
    Minv,
    /// `z = |x|` (not defined for complex)
    Abs,
    /// `z = !(x != 0)` (not defined for complex)
    Lnot,
    /// `z = 1`
    One,
    /// Opaque user-defined function
    User,
}

impl UnaryOpcode {
    /// Lower-case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Ainv => "ainv",
            Self::Minv => "minv",
            Self::Abs => "abs",
            Self::Lnot => "lnot",
            Self::One => "one",
            Self::User => "user",
        }
    }
}

/// Typed implementation of one built-in unary opcode
pub trait UnaryScalar<T: Element>: Send + Sync + 'static {
    /// Compute `z = f(x)`
    fn apply(x: T) -> T;
}

/// `x`
pub struct Identity;
/// `-x`
pub struct Ainv;
/// `1 / x`
pub struct Minv;
/// `|x|`
pub struct Abs;
/// `!x`
pub struct Lnot;
/// `1`
pub struct One;

impl<T: Element> UnaryScalar<T> for Identity {
    #[inline(always)]
    fn apply(x: T) -> T {
        x
    }
}

impl<T: Element> UnaryScalar<T> for Ainv {
    #[inline(always)]
    fn apply(x: T) -> T {
        x.ainv()
    }
}

impl<T: Element> UnaryScalar<T> for Minv {
    #[inline(always)]
    fn apply(x: T) -> T {
        x.minv()
    }
}

impl<T: Ordered> UnaryScalar<T> for Abs {
    #[inline(always)]
    fn apply(x: T) -> T {
        x.abs_val()
    }
}

impl<T: Ordered> UnaryScalar<T> for Lnot {
    #[inline(always)]
    fn apply(x: T) -> T {
        T::from_bool(!x.is_nonzero())
    }
}

impl<T: Element> UnaryScalar<T> for One {
    #[inline(always)]
    fn apply(_x: T) -> T {
        T::one()
    }
}

pub(crate) fn unary_cell<T: Element, O: UnaryScalar<T>>(z: &mut [u8], x: &[u8]) {
    O::apply(T::read(x)).write(z)
}

/// Runtime dispatch from `(opcode, dtype)` to a typed unary op; evaluates to
/// `Some(body)` or `None` if the opcode is not defined for the type.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_unary {
    ($opcode:expr, $dtype:expr, $T:ident, $O:ident => $body:block) => {{
        match $dtype {
            $crate::dtype::DType::Bool => $crate::dispatch_unary!(@ordered $opcode, bool, $T, $O, $body),
            $crate::dtype::DType::I8 => $crate::dispatch_unary!(@ordered $opcode, i8, $T, $O, $body),
            $crate::dtype::DType::I16 => $crate::dispatch_unary!(@ordered $opcode, i16, $T, $O, $body),
            $crate::dtype::DType::I32 => $crate::dispatch_unary!(@ordered $opcode, i32, $T, $O, $body),
            $crate::dtype::DType::I64 => $crate::dispatch_unary!(@ordered $opcode, i64, $T, $O, $body),
            $crate::dtype::DType::U8 => $crate::dispatch_unary!(@ordered $opcode, u8, $T, $O, $body),
            $crate::dtype::DType::U16 => $crate::dispatch_unary!(@ordered $opcode, u16, $T, $O, $body),
            $crate::dtype::DType::U32 => $crate::dispatch_unary!(@ordered $opcode, u32, $T, $O, $body),
            $crate::dtype::DType::U64 => $crate::dispatch_unary!(@ordered $opcode, u64, $T, $O, $body),
            $crate::dtype::DType::F32 => $crate::dispatch_unary!(@ordered $opcode, f32, $T, $O, $body),
            $crate::dtype::DType::F64 => $crate::dispatch_unary!(@ordered $opcode, f64, $T, $O, $body),
            $crate::dtype::DType::Complex64 => {
                $crate::dispatch_unary!(@complex $opcode, $crate::dtype::Complex64, $T, $O, $body)
            }
            $crate::dtype::DType::Complex128 => {
                $crate::dispatch_unary!(@complex $opcode, $crate::dtype::Complex128, $T, $O, $body)
            }
        }
    }};
    (@arm $ty:ty, $op:ident, $T:ident, $O:ident, $body:block) => {{
        type $T = $ty;
        type $O = $crate::ops::unary::$op;
        Some($body)
    }};
    (@ordered $opcode:expr, $ty:ty, $T:ident, $O:ident, $body:block) => {
        match $opcode {
            $crate::ops::UnaryOpcode::Identity => $crate::dispatch_unary!(@arm $ty, Identity, $T, $O, $body),
            $crate::ops::UnaryOpcode::Ainv => $crate::dispatch_unary!(@arm $ty, Ainv, $T, $O, $body),
            $crate::ops::UnaryOpcode::Minv => $crate::dispatch_unary!(@arm $ty, Minv, $T, $O, $body),
            $crate::ops::UnaryOpcode::Abs => $crate::dispatch_unary!(@arm $ty, Abs, $T, $O, $body),
            $crate::ops::UnaryOpcode::Lnot => $crate::dispatch_unary!(@arm $ty, Lnot, $T, $O, $body),
            $crate::ops::UnaryOpcode::One => $crate::dispatch_unary!(@arm $ty, One, $T, $O, $body),
            $crate::ops::UnaryOpcode::User => None,
        }
    };
    (@complex $opcode:expr, $ty:ty, $T:ident, $O:ident, $body:block) => {
        match $opcode {
            $crate::ops::UnaryOpcode::Identity => $crate::dispatch_unary!(@arm $ty, Identity, $T, $O, $body),
            $crate::ops::UnaryOpcode::Ainv => $crate::dispatch_unary!(@arm $ty, Ainv, $T, $O, $body),
            $crate::ops::UnaryOpcode::Minv => $crate::dispatch_unary!(@arm $ty, Minv, $T, $O, $body),
            $crate::ops::UnaryOpcode::One => $crate::dispatch_unary!(@arm $ty, One, $T, $O, $body),
            _ => None,
        }
    };
}

/// Byte-level unary function `f(z, x)` used by the generic path
pub type UnaryFn = Arc<dyn Fn(&mut [u8], &[u8]) + Send + Sync>;

#[derive(Clone)]
enum UnaryImpl {
    Builtin(fn(&mut [u8], &[u8])),
    User(UnaryFn),
}

struct UnaryOpInner {
    name: String,
    opcode: UnaryOpcode,
    xtype: Type,
    ztype: Type,
    func: UnaryImpl,
}

/// Immutable unary operator descriptor
#[derive(Clone)]
pub struct UnaryOp {
    inner: Arc<UnaryOpInner>,
}

impl UnaryOp {
    /// Built-in operator `opcode` over `dtype`
    pub fn builtin(opcode: UnaryOpcode, dtype: DType) -> Result<Self> {
        let func = dispatch_unary!(opcode, dtype, T, O => {
            unary_cell::<T, O> as fn(&mut [u8], &[u8])
        })
        .ok_or_else(|| {
            Error::domain_mismatch(
                format!("UnaryOp::{}", opcode.name()),
                dtype,
                "a real type",
            )
        })?;
        Ok(Self {
            inner: Arc::new(UnaryOpInner {
                name: format!("{}_{}", opcode.name(), dtype.name()),
                opcode,
                xtype: dtype.into(),
                ztype: dtype.into(),
                func: UnaryImpl::Builtin(func),
            }),
        })
    }

    /// User-defined operator; `func(z, x)` receives byte slices of the
    /// declared sizes
    pub fn user<F>(name: impl Into<String>, xtype: Type, ztype: Type, func: F) -> Self
    where
        F: Fn(&mut [u8], &[u8]) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(UnaryOpInner {
                name: name.into(),
                opcode: UnaryOpcode::User,
                xtype,
                ztype,
                func: UnaryImpl::User(Arc::new(func)),
            }),
        }
    }

    /// Operator name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Opcode
    #[inline]
    pub fn opcode(&self) -> UnaryOpcode {
        self.inner.opcode
    }

    /// Input type
    #[inline]
    pub fn xtype(&self) -> &Type {
        &self.inner.xtype
    }

    /// Result type
    #[inline]
    pub fn ztype(&self) -> &Type {
        &self.inner.ztype
    }

    /// Returns true for built-in operators
    #[inline]
    pub fn is_builtin(&self) -> bool {
        self.inner.opcode != UnaryOpcode::User
    }

    /// Apply to raw bytes
    #[inline]
    pub fn apply_bytes(&self, z: &mut [u8], x: &[u8]) {
        match &self.inner.func {
            UnaryImpl::Builtin(f) => f(z, x),
            UnaryImpl::User(f) => f(z, x),
        }
    }
}

impl fmt::Debug for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOp")
            .field("name", &self.inner.name)
            .field("opcode", &self.inner.opcode)
            .finish()
    }
}
