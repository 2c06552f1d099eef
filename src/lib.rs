//! # gbkern
//!
//! **Kernel engine for sparse matrix and graph algebra.**
//!
//! gbkern evaluates elementwise, transform and reduction operations over
//! matrices stored in one of four sparsity formats, with operators and
//! element types chosen at run time. Built-in operator and type
//! combinations run monomorphized kernels; everything else (user-defined
//! operators and types, operands that need casting) runs one boxed generic
//! kernel that produces the same results.
//!
//! ## Layers
//!
//! - **Format dispatch** ([`dispatch`]): one method body per combination of
//!   operand formats and mask shape, chosen once per call
//! - **Masks** ([`mask`]): structural and valued masks, complemented or not,
//!   applied through a three-state marker protocol on bitmap results
//! - **Kernel selection** ([`kernel`]): a read-only registry of specialized
//!   kernels with a generic fallback
//! - **Partition & Reduce** ([`parallel`]): deterministic contiguous chunks
//!   run on a rayon pool
//! - **Offload** ([`offload`]): a pluggable policy deciding whether a
//!   reduction goes to an accelerator, with host fallback on device failure
//!
//! ## Quick Start
//!
//! ```rust
//! use gbkern::prelude::*;
//!
//! # fn main() -> gbkern::error::Result<()> {
//! let ctx = Context::new();
//! let a = Matrix::bitmap_vector(&[Some(1i32), None, Some(3), None])?;
//! let b = Matrix::full(4, 1, &[10i32, 20, 30, 40])?;
//! let plus = BinaryOp::builtin(BinaryOpcode::Plus, DType::I32)?;
//!
//! let mut c = Matrix::new(DType::I32, 4, 1);
//! emult(&ctx, &mut c, None, &plus, &a, &b)?;
//! assert_eq!(c.to_tuples::<i32>()?, vec![(0, 0, 11), (2, 0, 33)]);
//!
//! let sum = Monoid::builtin(BinaryOpcode::Plus, DType::I32)?;
//! assert_eq!(reduce_to_scalar(&ctx, &sum, &c)?.get::<i32>()?, 44);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded host kernels; without it every chunk
//!   runs in order on the calling thread

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod dispatch;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod mask;
pub mod matrix;
pub mod offload;
pub mod ops;
pub mod parallel;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::dtype::{Complex64, Complex128, DType, Element, Scalar, Type, UserType};
    pub use crate::engine::{apply, emult, reduce_to_scalar};
    pub use crate::error::{Error, Result, Status};
    pub use crate::kernel::KernelConfig;
    pub use crate::mask::Mask;
    pub use crate::matrix::{Matrix, SparsityFormat};
    pub use crate::offload::{
        Accelerator, DeviceControl, DeviceSettings, OffloadDecision, OffloadPolicy,
        ThresholdPolicy,
    };
    pub use crate::ops::{
        BinaryOp, BinaryOpcode, Describe, Field, FieldValue, Monoid, Semiring, UnaryOp,
        UnaryOpcode,
    };
}
