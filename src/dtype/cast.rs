//! Typecasting between element types
//!
//! Every built-in value is widened into a small intermediate ([`Wide`]) and
//! narrowed into the target type. Widening is exact for every built-in type,
//! so going through the intermediate produces the same bits as a direct
//! Rust `as` conversion:
//!
//! | From \ To | bool | integer | float | complex |
//! |-----------|------|---------|-------|---------|
//! | bool      | copy | 0 / 1   | 0 / 1 | (0/1, 0) |
//! | integer   | `!= 0` | wrap  | round to nearest | (x, 0) |
//! | float     | `!= 0` | saturate, NaN → 0 | round | (x, 0) |
//! | complex   | re or im `!= 0` | real part | real part | parts |
//!
//! User-defined types are only compatible with themselves.

use super::complex::{Complex64, Complex128};
use super::{DType, Element, Type};

/// Exact widened representation of any built-in value
#[derive(Copy, Clone, Debug, PartialEq)]
enum Wide {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(f64, f64),
}

impl Wide {
    #[inline]
    fn load(dtype: DType, src: &[u8]) -> Self {
        match dtype {
            DType::Bool => Wide::Bool(bool::read(src)),
            DType::I8 => Wide::Int(i8::read(src) as i64),
            DType::I16 => Wide::Int(i16::read(src) as i64),
            DType::I32 => Wide::Int(i32::read(src) as i64),
            DType::I64 => Wide::Int(i64::read(src)),
            DType::U8 => Wide::UInt(u8::read(src) as u64),
            DType::U16 => Wide::UInt(u16::read(src) as u64),
            DType::U32 => Wide::UInt(u32::read(src) as u64),
            DType::U64 => Wide::UInt(u64::read(src)),
            DType::F32 => Wide::Float(f32::read(src) as f64),
            DType::F64 => Wide::Float(f64::read(src)),
            DType::Complex64 => {
                let z = Complex64::read(src);
                Wide::Complex(z.re as f64, z.im as f64)
            }
            DType::Complex128 => {
                let z = Complex128::read(src);
                Wide::Complex(z.re, z.im)
            }
        }
    }

    #[inline]
    fn truth(self) -> bool {
        match self {
            Wide::Bool(b) => b,
            Wide::Int(i) => i != 0,
            Wide::UInt(u) => u != 0,
            Wide::Float(f) => f != 0.0,
            Wide::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }
}

/// Narrow a widened value into the integer or float type `$t` with `as`
/// semantics. Complex values contribute their real part.
macro_rules! narrow {
    ($w:expr, $t:ty) => {
        match $w {
            Wide::Bool(b) => b as u8 as $t,
            Wide::Int(i) => i as $t,
            Wide::UInt(u) => u as $t,
            Wide::Float(f) => f as $t,
            Wide::Complex(re, _) => re as $t,
        }
    };
}

#[inline]
fn store(dtype: DType, w: Wide, out: &mut [u8]) {
    match dtype {
        DType::Bool => w.truth().write(out),
        DType::I8 => narrow!(w, i8).write(out),
        DType::I16 => narrow!(w, i16).write(out),
        DType::I32 => narrow!(w, i32).write(out),
        DType::I64 => narrow!(w, i64).write(out),
        DType::U8 => narrow!(w, u8).write(out),
        DType::U16 => narrow!(w, u16).write(out),
        DType::U32 => narrow!(w, u32).write(out),
        DType::U64 => narrow!(w, u64).write(out),
        DType::F32 => narrow!(w, f32).write(out),
        DType::F64 => narrow!(w, f64).write(out),
        DType::Complex64 => {
            let z = match w {
                Wide::Complex(re, im) => Complex64::new(re as f32, im as f32),
                other => Complex64::new(narrow!(other, f32), 0.0),
            };
            z.write(out)
        }
        DType::Complex128 => {
            let z = match w {
                Wide::Complex(re, im) => Complex128::new(re, im),
                other => Complex128::new(narrow!(other, f64), 0.0),
            };
            z.write(out)
        }
    }
}

/// Returns true if values of type `from` can be cast to type `to`.
///
/// All built-in types are mutually castable; a user-defined type is only
/// compatible with itself.
pub fn compatible(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Builtin(_), Type::Builtin(_)) => true,
        (Type::User(a), Type::User(b)) => a == b,
        _ => false,
    }
}

/// Precomputed conversion from one type to another.
///
/// Built once per kernel invocation and applied per entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Caster {
    /// Same type: copy `size` bytes
    Copy(usize),
    /// Built-in to built-in conversion
    Builtin {
        /// Source type
        from: DType,
        /// Target type
        to: DType,
    },
}

impl Caster {
    /// Conversion from `from` to `to`, or `None` if the types are incompatible
    pub fn new(from: &Type, to: &Type) -> Option<Self> {
        if from == to {
            return Some(Caster::Copy(from.size()));
        }
        match (from, to) {
            (Type::Builtin(f), Type::Builtin(t)) => Some(Caster::Builtin { from: *f, to: *t }),
            _ => None,
        }
    }

    /// Returns true if the conversion is a plain copy
    #[inline]
    pub fn is_copy(&self) -> bool {
        matches!(self, Caster::Copy(_))
    }

    /// Convert the value at the start of `src` into `out`
    #[inline]
    pub fn apply(&self, out: &mut [u8], src: &[u8]) {
        match *self {
            Caster::Copy(size) => out[..size].copy_from_slice(&src[..size]),
            Caster::Builtin { from, to } => store(to, Wide::load(from, src), out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast<S: Element, D: Element>(x: S) -> D {
        let mut src = [0u8; 16];
        let mut dst = [0u8; 16];
        x.write(&mut src);
        Caster::new(&S::DTYPE.into(), &D::DTYPE.into())
            .unwrap()
            .apply(&mut dst, &src);
        D::read(&dst)
    }

    #[test]
    fn test_int_to_int_wraps() {
        assert_eq!(cast::<i32, i8>(300), 300i32 as i8);
        assert_eq!(cast::<i64, u16>(-1), u16::MAX);
        assert_eq!(cast::<u64, i64>(u64::MAX), -1);
    }

    #[test]
    fn test_float_to_int_saturates() {
        assert_eq!(cast::<f64, i8>(1.0e9), i8::MAX);
        assert_eq!(cast::<f32, u32>(-4.0), 0);
        assert_eq!(cast::<f64, i32>(f64::NAN), 0);
        assert_eq!(cast::<f64, i32>(-2.7), -2);
    }

    #[test]
    fn test_real_to_complex_zero_fills_imaginary() {
        assert_eq!(cast::<f64, Complex64>(2.5), Complex64::new(2.5, 0.0));
        assert_eq!(cast::<i16, Complex128>(-3), Complex128::new(-3.0, 0.0));
        assert_eq!(cast::<bool, Complex128>(true), Complex128::ONE);
    }

    #[test]
    fn test_complex_to_real_takes_real_part() {
        assert_eq!(cast::<Complex128, f32>(Complex128::new(1.5, 9.0)), 1.5);
        assert_eq!(cast::<Complex64, i32>(Complex64::new(-7.9, 1.0)), -7);
    }

    #[test]
    fn test_truth_casts() {
        assert!(cast::<f64, bool>(-0.5));
        assert!(!cast::<u8, bool>(0));
        assert!(cast::<Complex64, bool>(Complex64::new(0.0, 1.0)));
        assert_eq!(cast::<bool, i64>(true), 1);
    }

    #[test]
    fn test_widening_matches_direct_as() {
        for &x in &[0.1f32, -1.5e20, f32::INFINITY, 16_777_217.0] {
            assert_eq!(cast::<f32, f64>(x), x as f64);
            assert_eq!(cast::<f32, i64>(x), x as i64);
        }
        for &x in &[i64::MAX, i64::MIN, 123_456_789_012] {
            assert_eq!(cast::<i64, f32>(x), x as f32);
        }
    }

    #[test]
    fn test_user_types_only_self_compatible() {
        let u = super::super::UserType::new("blob", 3);
        let t = Type::from(u.clone());
        assert!(compatible(&t, &t.clone()));
        assert!(!compatible(&t, &DType::U8.into()));
        assert_eq!(Caster::new(&t, &Type::from(u)), Some(Caster::Copy(3)));
        assert!(Caster::new(&t, &DType::F32.into()).is_none());
    }
}
