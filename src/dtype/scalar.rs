//! Typed single values

use super::{Caster, DType, Element, Type};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// A single value of any element type, held as raw bytes.
///
/// Used for monoid identities, reduction results and iso values. Built-in
/// values fit inline; larger user-defined values spill to the heap.
#[derive(Clone, PartialEq)]
pub struct Scalar {
    ty: Type,
    bytes: SmallVec<[u8; 16]>,
}

impl Scalar {
    /// Scalar holding a built-in value
    pub fn new<T: Element>(value: T) -> Self {
        let mut bytes = SmallVec::from_elem(0u8, T::DTYPE.size_in_bytes());
        value.write(&mut bytes);
        Self {
            ty: Type::Builtin(T::DTYPE),
            bytes,
        }
    }

    /// Scalar from raw bytes of the given type
    pub fn from_bytes(ty: Type, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ty.size() {
            return Err(Error::invalid_value(
                "bytes",
                format!("{} bytes given for type {} of size {}", bytes.len(), ty, ty.size()),
            ));
        }
        Ok(Self {
            ty,
            bytes: SmallVec::from_slice(bytes),
        })
    }

    /// All-zero value of the given type
    pub fn zeroed(ty: Type) -> Self {
        let bytes = SmallVec::from_elem(0u8, ty.size());
        Self { ty, bytes }
    }

    /// Element type of this value
    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Raw bytes of this value
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable raw bytes of this value
    #[inline]
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Read the value as `T`; the scalar's type must be exactly `T::DTYPE`
    pub fn get<T: Element>(&self) -> Result<T> {
        if self.ty != T::DTYPE {
            return Err(Error::domain_mismatch("Scalar::get", &self.ty, T::DTYPE));
        }
        Ok(T::read(&self.bytes))
    }

    /// Convert to another type using the engine's casting rules
    pub fn cast(&self, to: &Type) -> Result<Scalar> {
        let caster = Caster::new(&self.ty, to)
            .ok_or_else(|| Error::domain_mismatch("Scalar::cast", &self.ty, to))?;
        let mut out = Scalar::zeroed(to.clone());
        caster.apply(&mut out.bytes, &self.bytes);
        Ok(out)
    }

    /// Convert to the built-in type `T` and read it
    pub fn cast_to<T: Element>(&self) -> Result<T> {
        self.cast(&Type::Builtin(T::DTYPE))?.get::<T>()
    }

    /// Returns true if this is a built-in value with the given dtype
    #[inline]
    pub fn is(&self, dtype: DType) -> bool {
        self.ty == dtype
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({}: {:?})", self.ty, self.bytes.as_slice())
    }
}

impl<T: Element> From<T> for Scalar {
    fn from(value: T) -> Self {
        Scalar::new(value)
    }
}
