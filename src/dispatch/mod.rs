//! Format dispatch
//!
//! Picks one structurally distinct method body per operation from the
//! sparsity formats of the operands and the shape of the mask. The result
//! format follows from the method; callers never choose it.
//!
//! New format combinations are added as a new [`EmultMethod`] tag, a row in
//! the decision procedure and a method body in `engine`.

mod emult;

pub use emult::{EmultMethod, MaskShape, bitmap_emult_method, emult_method, emult_result_format};
