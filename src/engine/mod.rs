//! Operation entry points and their method bodies
//!
//! Each operation validates its inputs, asks [`dispatch`](crate::dispatch)
//! for a method, asks the [`KernelRegistry`](crate::kernel::KernelRegistry)
//! for a kernel and then runs the method body with that kernel's cell over
//! the context's workers. The result replaces the output only after the
//! whole computation succeeded.

mod apply;
mod bitmap_emult;
mod emult;
mod reduce;
mod sparse_emult;

pub use apply::{ApplyJob, apply};
pub use emult::{EmultJob, emult};
pub use reduce::{ReduceJob, reduce_to_scalar};

pub(crate) use apply::execute as execute_apply;
pub(crate) use emult::execute as execute_emult;
pub(crate) use reduce::fold as execute_fold;
