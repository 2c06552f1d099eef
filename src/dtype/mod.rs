//! Type system for gbkern matrices
//!
//! Two kinds of element types exist:
//!
//! - **Built-in** types ([`DType`]): booleans, fixed-width integers, IEEE
//!   floats and complex numbers. Only these are eligible for specialized
//!   kernels and device offload.
//! - **User-defined** opaque types ([`UserType`]): a name and a byte size.
//!   The engine never looks inside their bytes; it only moves them around
//!   and hands them to user-supplied operators through the generic path.
//!
//! Values of every type are stored as raw bytes in native layout. A [`Type`]
//! descriptor names which of the two kinds a buffer holds.

mod cast;
pub mod complex;
mod element;
mod scalar;

pub use cast::{Caster, compatible};
pub use complex::{Complex64, Complex128};
pub use element::{Element, Ordered};
pub use scalar::Scalar;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// DType Enum
// ============================================================================

/// Built-in element types
///
/// # Discriminant Values
///
/// The discriminant values are stable:
/// - Floats: 0-9 (F64=0, F32=1)
/// - Signed ints: 10-19 (I64=10, I32=11, I16=12, I8=13)
/// - Unsigned ints: 20-29 (U64=20, U32=21, U16=22, U8=23)
/// - Bool: 30
/// - Complex: 40-49 (Complex64=40, Complex128=41)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// 64-bit signed integer
    I64 = 10,
    /// 32-bit signed integer
    I32 = 11,
    /// 16-bit signed integer
    I16 = 12,
    /// 8-bit signed integer
    I8 = 13,
    /// 64-bit unsigned integer
    U64 = 20,
    /// 32-bit unsigned integer
    U32 = 21,
    /// 16-bit unsigned integer
    U16 = 22,
    /// 8-bit unsigned integer
    U8 = 23,
    /// Boolean, stored as one byte holding 0 or 1
    Bool = 30,
    /// Complex with f32 parts
    Complex64 = 40,
    /// Complex with f64 parts
    Complex128 = 41,
}

impl DType {
    /// Every built-in type, in discriminant order
    pub const ALL: [DType; 13] = [
        DType::F64,
        DType::F32,
        DType::I64,
        DType::I32,
        DType::I16,
        DType::I8,
        DType::U64,
        DType::U32,
        DType::U16,
        DType::U8,
        DType::Bool,
        DType::Complex64,
        DType::Complex128,
    ];

    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::Complex128 => 16,
            Self::F64 | Self::I64 | Self::U64 | Self::Complex64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::I16 | Self::U16 => 2,
            Self::I8 | Self::U8 | Self::Bool => 1,
        }
    }

    /// Returns true if this is a real floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }

    /// Returns true if this is a signed integer type
    #[inline]
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::I64 | Self::I32 | Self::I16 | Self::I8)
    }

    /// Returns true if this is an unsigned integer type
    #[inline]
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U64 | Self::U32 | Self::U16 | Self::U8)
    }

    /// Returns true if this is a complex type
    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Returns true if values of this type have a total order usable by
    /// min/max and the ordering comparisons
    #[inline]
    pub const fn is_ordered(self) -> bool {
        !self.is_complex()
    }

    /// Short name, e.g. `"fp64"`, `"int32"`
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "fp64",
            Self::F32 => "fp32",
            Self::I64 => "int64",
            Self::I32 => "int32",
            Self::I16 => "int16",
            Self::I8 => "int8",
            Self::U64 => "uint64",
            Self::U32 => "uint32",
            Self::U16 => "uint16",
            Self::U8 => "uint8",
            Self::Bool => "bool",
            Self::Complex64 => "fc32",
            Self::Complex128 => "fc64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// User-defined types
// ============================================================================

static NEXT_USER_TYPE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct UserTypeInner {
    id: u64,
    name: String,
    size: usize,
}

/// Opaque user-defined element type.
///
/// Two `UserType`s are equal only if one was cloned from the other; creating
/// a second type with the same name and size yields a distinct type.
#[derive(Clone, Debug)]
pub struct UserType {
    inner: Arc<UserTypeInner>,
}

impl UserType {
    /// Declare a new opaque type of `size` bytes
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        assert!(size > 0, "user-defined type must have a non-zero size");
        Self {
            inner: Arc::new(UserTypeInner {
                id: NEXT_USER_TYPE_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                size,
            }),
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Size of one value in bytes
    pub fn size(&self) -> usize {
        self.inner.size
    }
}

impl PartialEq for UserType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for UserType {}

impl std::hash::Hash for UserType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

// ============================================================================
// Type descriptor
// ============================================================================

/// Element type descriptor: built-in or user-defined
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// A built-in type
    Builtin(DType),
    /// An opaque user-defined type
    User(UserType),
}

impl Type {
    /// Size of one value in bytes
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            Type::Builtin(d) => d.size_in_bytes(),
            Type::User(u) => u.size(),
        }
    }

    /// The built-in type code, or `None` for user-defined types
    #[inline]
    pub fn builtin(&self) -> Option<DType> {
        match self {
            Type::Builtin(d) => Some(*d),
            Type::User(_) => None,
        }
    }

    /// Returns true for built-in types
    #[inline]
    pub fn is_builtin(&self) -> bool {
        matches!(self, Type::Builtin(_))
    }

    /// Returns true for opaque user-defined types
    #[inline]
    pub fn is_user_defined(&self) -> bool {
        matches!(self, Type::User(_))
    }
}

impl From<DType> for Type {
    fn from(d: DType) -> Self {
        Type::Builtin(d)
    }
}

impl From<UserType> for Type {
    fn from(u: UserType) -> Self {
        Type::User(u)
    }
}

impl PartialEq<DType> for Type {
    fn eq(&self, other: &DType) -> bool {
        matches!(self, Type::Builtin(d) if d == other)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Builtin(d) => write!(f, "{}", d),
            Type::User(u) => write!(f, "{}", u.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DType::Bool.size_in_bytes(), 1);
        assert_eq!(DType::I16.size_in_bytes(), 2);
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::Complex64.size_in_bytes(), 8);
        assert_eq!(DType::Complex128.size_in_bytes(), 16);
    }

    #[test]
    fn test_dtype_classes() {
        assert!(DType::F32.is_float());
        assert!(DType::I8.is_signed_int());
        assert!(DType::U64.is_unsigned_int());
        assert!(DType::Complex128.is_complex());
        assert!(!DType::Complex64.is_ordered());
        assert!(DType::Bool.is_ordered());
    }

    #[test]
    fn test_user_type_identity() {
        let a = UserType::new("pair", 16);
        let b = UserType::new("pair", 16);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(Type::from(a.clone()).size(), 16);
        assert!(Type::from(a).is_user_defined());
    }

    #[test]
    fn test_type_eq_dtype() {
        assert_eq!(Type::from(DType::I32), DType::I32);
        assert_ne!(Type::from(DType::I32), DType::I64);
        assert_eq!(Type::from(DType::F64).to_string(), "fp64");
    }
}
