//! Operator descriptors
//!
//! Operators, monoids and semirings are immutable, reference-counted
//! descriptors supplied by the caller and shared across every operation that
//! uses them. No matrix owns a descriptor.
//!
//! ```text
//! Semiring
//!   ├── Monoid (⊕)  ── BinaryOp + identity + terminal
//!   └── BinaryOp (⊗)
//! UnaryOp
//! ```
//!
//! A descriptor is either **built-in** (a known opcode over a built-in type,
//! eligible for specialized kernels and device offload) or **user-defined**
//! (an opaque function over arbitrary types, always run through the generic
//! kernel).

pub mod binary;
mod field;
mod monoid;
mod semiring;
pub mod unary;

pub use binary::{BinaryFn, BinaryOp, BinaryOpcode, BinaryScalar};
pub use field::{Describe, Field, FieldValue};
pub use monoid::{Monoid, Terminal};
pub use semiring::{Semiring, SemiringOp};
pub use unary::{UnaryFn, UnaryOp, UnaryOpcode, UnaryScalar};
