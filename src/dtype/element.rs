//! Element trait for mapping Rust types to DType

use super::DType;
use super::complex::{Complex64, Complex128};
use std::fmt::Debug;

/// Trait for Rust types that back a built-in [`DType`].
///
/// Arithmetic methods carry the engine's exact semantics so every kernel
/// (specialized or generic) computes identical bits:
///
/// - integers wrap on overflow;
/// - integer division by zero yields `0` for `0/0`, the type's max for a
///   positive numerator and the type's min for a negative one;
/// - booleans treat `plus` as OR, `times` as AND, `minus` as XOR and
///   `divide` as "keep the left operand".
pub trait Element: Copy + Send + Sync + PartialEq + Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Read a value from the start of `bytes` (no alignment requirement)
    fn read(bytes: &[u8]) -> Self;

    /// Write this value to the start of `out`
    fn write(self, out: &mut [u8]);

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Truth value: `self != 0`
    fn is_nonzero(self) -> bool;

    /// 1 for `true`, 0 for `false`
    #[inline]
    fn from_bool(b: bool) -> Self {
        if b { Self::one() } else { Self::zero() }
    }

    /// `self + y`
    fn plus(self, y: Self) -> Self;

    /// `self - y`
    fn minus(self, y: Self) -> Self;

    /// `self * y`
    fn times(self, y: Self) -> Self;

    /// `self / y`
    fn divide(self, y: Self) -> Self;

    /// Additive inverse
    fn ainv(self) -> Self;

    /// Multiplicative inverse, `1 / self`
    #[inline]
    fn minv(self) -> Self {
        Self::one().divide(self)
    }
}

/// Element types with a total order (everything except complex)
pub trait Ordered: Element + PartialOrd {
    /// Smaller of two values; for floats a NaN operand is ignored
    fn minimum(self, y: Self) -> Self;

    /// Larger of two values; for floats a NaN operand is ignored
    fn maximum(self, y: Self) -> Self;

    /// Absolute value
    fn abs_val(self) -> Self;

    /// Smallest value (identity of `max`)
    fn lowest() -> Self;

    /// Largest value (identity of `min`)
    fn highest() -> Self;
}

macro_rules! impl_pod_io {
    () => {
        #[inline]
        fn read(bytes: &[u8]) -> Self {
            bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<Self>()])
        }

        #[inline]
        fn write(self, out: &mut [u8]) {
            out[..std::mem::size_of::<Self>()].copy_from_slice(bytemuck::bytes_of(&self));
        }
    };
}

macro_rules! impl_signed {
    ($($t:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            impl_pod_io!();

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn one() -> Self {
                1
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self.wrapping_add(y)
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self.wrapping_sub(y)
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self.wrapping_mul(y)
            }

            #[inline]
            fn divide(self, y: Self) -> Self {
                if y == -1 {
                    self.wrapping_neg()
                } else if y == 0 {
                    if self == 0 {
                        0
                    } else if self < 0 {
                        <$t>::MIN
                    } else {
                        <$t>::MAX
                    }
                } else {
                    self / y
                }
            }

            #[inline]
            fn ainv(self) -> Self {
                self.wrapping_neg()
            }
        }

        impl Ordered for $t {
            #[inline]
            fn minimum(self, y: Self) -> Self {
                if y < self { y } else { self }
            }

            #[inline]
            fn maximum(self, y: Self) -> Self {
                if y > self { y } else { self }
            }

            #[inline]
            fn abs_val(self) -> Self {
                self.wrapping_abs()
            }

            #[inline]
            fn lowest() -> Self {
                <$t>::MIN
            }

            #[inline]
            fn highest() -> Self {
                <$t>::MAX
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            impl_pod_io!();

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn one() -> Self {
                1
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self.wrapping_add(y)
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self.wrapping_sub(y)
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self.wrapping_mul(y)
            }

            #[inline]
            fn divide(self, y: Self) -> Self {
                if y == 0 {
                    if self == 0 { 0 } else { <$t>::MAX }
                } else {
                    self / y
                }
            }

            #[inline]
            fn ainv(self) -> Self {
                self.wrapping_neg()
            }
        }

        impl Ordered for $t {
            #[inline]
            fn minimum(self, y: Self) -> Self {
                if y < self { y } else { self }
            }

            #[inline]
            fn maximum(self, y: Self) -> Self {
                if y > self { y } else { self }
            }

            #[inline]
            fn abs_val(self) -> Self {
                self
            }

            #[inline]
            fn lowest() -> Self {
                <$t>::MIN
            }

            #[inline]
            fn highest() -> Self {
                <$t>::MAX
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            impl_pod_io!();

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0.0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self + y
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self - y
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self * y
            }

            #[inline]
            fn divide(self, y: Self) -> Self {
                self / y
            }

            #[inline]
            fn ainv(self) -> Self {
                -self
            }
        }

        impl Ordered for $t {
            #[inline]
            fn minimum(self, y: Self) -> Self {
                self.min(y)
            }

            #[inline]
            fn maximum(self, y: Self) -> Self {
                self.max(y)
            }

            #[inline]
            fn abs_val(self) -> Self {
                self.abs()
            }

            #[inline]
            fn lowest() -> Self {
                <$t>::NEG_INFINITY
            }

            #[inline]
            fn highest() -> Self {
                <$t>::INFINITY
            }
        }
    )*};
}

macro_rules! impl_complex_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            impl_pod_io!();

            #[inline]
            fn zero() -> Self {
                <$t>::ZERO
            }

            #[inline]
            fn one() -> Self {
                <$t>::ONE
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self.re != 0.0 || self.im != 0.0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self + y
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self - y
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self * y
            }

            #[inline]
            fn divide(self, y: Self) -> Self {
                self / y
            }

            #[inline]
            fn ainv(self) -> Self {
                -self
            }
        }
    )*};
}

impl_signed!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
impl_unsigned!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);
impl_float!(f32 => F32, f64 => F64);
impl_complex_element!(Complex64 => Complex64, Complex128 => Complex128);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn zero() -> Self {
        false
    }

    #[inline]
    fn one() -> Self {
        true
    }

    #[inline]
    fn is_nonzero(self) -> bool {
        self
    }

    #[inline]
    fn plus(self, y: Self) -> Self {
        self | y
    }

    #[inline]
    fn minus(self, y: Self) -> Self {
        self ^ y
    }

    #[inline]
    fn times(self, y: Self) -> Self {
        self & y
    }

    #[inline]
    fn divide(self, _y: Self) -> Self {
        self
    }

    #[inline]
    fn ainv(self) -> Self {
        self
    }
}

impl Ordered for bool {
    #[inline]
    fn minimum(self, y: Self) -> Self {
        self & y
    }

    #[inline]
    fn maximum(self, y: Self) -> Self {
        self | y
    }

    #[inline]
    fn abs_val(self) -> Self {
        self
    }

    #[inline]
    fn lowest() -> Self {
        false
    }

    #[inline]
    fn highest() -> Self {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_wraps() {
        assert_eq!(i8::MAX.plus(1), i8::MIN);
        assert_eq!(0u8.minus(1), u8::MAX);
        assert_eq!(i32::MIN.ainv(), i32::MIN);
    }

    #[test]
    fn test_integer_divide_by_zero() {
        assert_eq!(0i32.divide(0), 0);
        assert_eq!(5i32.divide(0), i32::MAX);
        assert_eq!((-5i32).divide(0), i32::MIN);
        assert_eq!(7u16.divide(0), u16::MAX);
        assert_eq!(i64::MIN.divide(-1), i64::MIN);
        assert_eq!(1i32.minv(), 1);
    }

    #[test]
    fn test_bool_arithmetic() {
        assert!(true.plus(false));
        assert!(!true.times(false));
        assert!(!true.minus(true));
        assert!(true.divide(false));
        assert!(true.minv());
    }

    #[test]
    fn test_float_min_ignores_nan() {
        assert_eq!(f64::NAN.minimum(2.0), 2.0);
        assert_eq!(3.0f32.maximum(f32::NAN), 3.0);
    }

    #[test]
    fn test_read_write_roundtrip_unaligned() {
        let mut buf = [0u8; 9];
        (-123_456i64).write(&mut buf[1..]);
        assert_eq!(i64::read(&buf[1..]), -123_456);
        true.write(&mut buf[..1]);
        assert_eq!(buf[0], 1);
    }
}
