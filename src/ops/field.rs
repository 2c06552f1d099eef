//! Descriptor field queries
//!
//! Every descriptor answers [`Describe::field`] for the fields that exist on
//! its kind. Asking a descriptor for a field it does not have (the identity
//! of a plain binary operator, the y-type of a unary operator) returns
//! `InvalidValue` and has no effect on the descriptor.

use super::{BinaryOp, BinaryOpcode, Monoid, Semiring, Terminal, UnaryOp, UnaryOpcode};
use crate::dtype::{Scalar, Type};
use crate::error::{Error, Result};
use std::fmt;

/// Queryable descriptor fields
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// Descriptor name
    Name,
    /// Opcode
    Opcode,
    /// Type of the first operand
    XType,
    /// Type of the second operand
    YType,
    /// Result type
    ZType,
    /// Monoid identity
    Identity,
    /// Monoid terminal value
    Terminal,
    /// Additive monoid of a semiring
    AddMonoid,
    /// Multiplicative operator of a semiring
    MultiplyOp,
    /// Whether the descriptor is built-in
    IsBuiltin,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Value of a descriptor field
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// A name
    Name(String),
    /// A binary opcode
    BinaryOpcode(BinaryOpcode),
    /// A unary opcode
    UnaryOpcode(UnaryOpcode),
    /// A type descriptor
    Type(Type),
    /// A value
    Scalar(Scalar),
    /// A monoid descriptor
    Monoid(Monoid),
    /// A binary operator descriptor
    BinaryOp(BinaryOp),
    /// A flag
    Bool(bool),
}

/// Field access on descriptors
pub trait Describe {
    /// Kind name used in error messages
    const KIND: &'static str;

    /// Value of `field`, or `InvalidValue` if this kind has no such field
    fn field(&self, field: Field) -> Result<FieldValue>;
}

fn no_field(kind: &'static str, field: Field) -> Error {
    Error::invalid_value("field", format!("{} has no field {}", kind, field))
}

impl Describe for BinaryOp {
    const KIND: &'static str = "BinaryOp";

    fn field(&self, field: Field) -> Result<FieldValue> {
        Ok(match field {
            Field::Name => FieldValue::Name(self.name().to_string()),
            Field::Opcode => FieldValue::BinaryOpcode(self.opcode()),
            Field::XType => FieldValue::Type(self.xtype().clone()),
            Field::YType => FieldValue::Type(self.ytype().clone()),
            Field::ZType => FieldValue::Type(self.ztype().clone()),
            Field::IsBuiltin => FieldValue::Bool(self.is_builtin()),
            _ => return Err(no_field(Self::KIND, field)),
        })
    }
}

impl Describe for UnaryOp {
    const KIND: &'static str = "UnaryOp";

    fn field(&self, field: Field) -> Result<FieldValue> {
        Ok(match field {
            Field::Name => FieldValue::Name(self.name().to_string()),
            Field::Opcode => FieldValue::UnaryOpcode(self.opcode()),
            Field::XType => FieldValue::Type(self.xtype().clone()),
            Field::ZType => FieldValue::Type(self.ztype().clone()),
            Field::IsBuiltin => FieldValue::Bool(self.is_builtin()),
            _ => return Err(no_field(Self::KIND, field)),
        })
    }
}

impl Describe for Monoid {
    const KIND: &'static str = "Monoid";

    fn field(&self, field: Field) -> Result<FieldValue> {
        Ok(match field {
            Field::Name => FieldValue::Name(self.op().name().to_string()),
            Field::Opcode => FieldValue::BinaryOpcode(self.opcode()),
            Field::XType | Field::YType | Field::ZType => FieldValue::Type(self.ty().clone()),
            Field::Identity => FieldValue::Scalar(self.identity().clone()),
            Field::Terminal => match self.terminal() {
                Terminal::Value(t) => FieldValue::Scalar(t.clone()),
                _ => {
                    return Err(Error::invalid_value(
                        "field",
                        "monoid has no terminal value",
                    ));
                }
            },
            Field::IsBuiltin => FieldValue::Bool(self.is_builtin()),
            _ => return Err(no_field(Self::KIND, field)),
        })
    }
}

impl Describe for Semiring {
    const KIND: &'static str = "Semiring";

    fn field(&self, field: Field) -> Result<FieldValue> {
        Ok(match field {
            Field::Name => FieldValue::Name(self.to_string()),
            Field::AddMonoid => FieldValue::Monoid(self.add().clone()),
            Field::MultiplyOp => FieldValue::BinaryOp(self.multiply().clone()),
            Field::XType => FieldValue::Type(self.multiply().xtype().clone()),
            Field::YType => FieldValue::Type(self.multiply().ytype().clone()),
            Field::ZType => FieldValue::Type(self.ty().clone()),
            Field::IsBuiltin => FieldValue::Bool(self.is_builtin()),
            _ => return Err(no_field(Self::KIND, field)),
        })
    }
}
