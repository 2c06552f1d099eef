//! Error types for gbkern
//!
//! Every error maps onto a fixed [`Status`] code so that an outer API layer
//! can report numeric codes without inspecting error payloads.

use thiserror::Error;

/// Result type alias using gbkern's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Fixed status taxonomy returned to the calling layer.
///
/// Discriminants are stable and match the conventional GraphBLAS codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Operation completed
    Success = 0,
    /// Requested entry is not present
    NoValue = 1,
    /// A descriptor field or argument value is not valid for the object
    InvalidValue = -3,
    /// A matrix violates its own format invariant
    InvalidObject = -104,
    /// Neither a specialized nor a generic kernel applies
    NotImplemented = -7,
    /// Operand dimensions do not agree
    DimensionMismatch = -6,
    /// Operand types are not compatible with the operator
    DomainMismatch = -5,
    /// Unrecoverable internal failure
    Panic = -101,
}

impl Status {
    /// Numeric code of this status
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Errors that can occur in gbkern operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No kernel (specialized or generic) can run this operator
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unsupported operation
        feature: String,
    },

    /// A field or argument value is not valid for the given object kind
    #[error("Invalid value for '{arg}': {reason}")]
    InvalidValue {
        /// The field or argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Operand dimensions disagree
    #[error("Dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected (nrows, ncols)
        expected: (usize, usize),
        /// Actual (nrows, ncols)
        got: (usize, usize),
    },

    /// Operand type cannot be used with the operator
    #[error("Domain mismatch in '{op}': {from} cannot be used as {to}")]
    DomainMismatch {
        /// Operation or operator name
        op: String,
        /// Type supplied
        from: String,
        /// Type required
        to: String,
    },

    /// Matrix content does not satisfy its format invariant
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Accelerator could not complete the work
    #[error("Device error: {0}")]
    Device(String),

    /// Entry not present
    #[error("No value at ({row}, {col})")]
    NoValue {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },
}

impl Error {
    /// Create a not-implemented error
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create an invalid-value error
    pub fn invalid_value(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a domain mismatch error
    pub fn domain_mismatch(
        op: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::DomainMismatch {
            op: op.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Status code this error is reported as
    pub fn status(&self) -> Status {
        match self {
            Error::NotImplemented { .. } => Status::NotImplemented,
            Error::InvalidValue { .. } => Status::InvalidValue,
            Error::DimensionMismatch { .. } => Status::DimensionMismatch,
            Error::DomainMismatch { .. } => Status::DomainMismatch,
            Error::InvalidObject(_) => Status::InvalidObject,
            Error::NoValue { .. } => Status::NoValue,
            // Device failures are absorbed by the host fallback; one that
            // escapes is an internal fault.
            Error::Device(_) => Status::Panic,
        }
    }
}

/// Status of a `Result`, `Success` for `Ok`
pub fn status_of<T>(result: &Result<T>) -> Status {
    match result {
        Ok(_) => Status::Success,
        Err(e) => e.status(),
    }
}
