//! Offload decision for reduce-to-scalar
//!
//! Before a reduction runs, an [`OffloadPolicy`] looks at the work estimate,
//! the monoid and the operand and answers [`OffloadDecision::Host`] or
//! [`OffloadDecision::Device`] with an advisory unit count. The policy only
//! routes; it never reduces. The device itself is an external
//! [`Accelerator`], and a device failure is absorbed by the caller, which
//! reruns the reduction on the host.

use crate::dtype::{Scalar, Type};
use crate::error::Result;
use crate::matrix::Matrix;
use crate::ops::Monoid;
use std::fmt;

/// Default work units per device unit
pub const DEFAULT_DEVICE_CHUNK: usize = 1 << 20;

/// When reductions may leave the host
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceControl {
    /// Always reduce on the host
    #[default]
    Never,
    /// Use every device for any eligible reduction
    Always,
    /// One device unit per `chunk` units of work, up to the device count
    Auto,
}

impl DeviceControl {
    /// Parse `never`, `always` or `auto` (any case)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" | "off" => Some(Self::Never),
            "always" | "on" => Some(Self::Always),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Device configuration carried by the context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Offload mode
    pub control: DeviceControl,
    /// Number of device units available
    pub count: usize,
    /// Work units per device unit
    pub chunk: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            control: DeviceControl::Never,
            count: 0,
            chunk: DEFAULT_DEVICE_CHUNK,
        }
    }
}

/// Inputs to an offload decision
#[derive(Clone, Copy, Debug)]
pub struct OffloadRequest<'a> {
    /// Estimated work, monotonic in the number of entries
    pub work: usize,
    /// Reduction monoid
    pub monoid: &'a Monoid,
    /// Operand type
    pub ty: &'a Type,
    /// Whether the operand is iso
    pub iso: bool,
}

/// Routing verdict
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OffloadDecision {
    /// Reduce on the host
    Host,
    /// Reduce on the device with this many units
    Device {
        /// Advisory unit count
        units: usize,
    },
}

impl OffloadDecision {
    /// Returns true for a device verdict
    pub fn is_device(&self) -> bool {
        matches!(self, OffloadDecision::Device { .. })
    }

    /// Units chosen; zero for the host
    pub fn units(&self) -> usize {
        match *self {
            OffloadDecision::Host => 0,
            OffloadDecision::Device { units } => units,
        }
    }
}

/// Cost model deciding where a reduction runs.
///
/// Implementations must be pure: the same request and settings always give
/// the same verdict.
pub trait OffloadPolicy: Send + Sync + fmt::Debug {
    /// Decide where to reduce
    fn decide(&self, req: &OffloadRequest<'_>, devices: &DeviceSettings) -> OffloadDecision;
}

/// Static threshold model.
///
/// A reduction stays on the host if the operand is iso, the operand or
/// monoid type is user-defined, the monoid is not built-in, or its operator
/// is trivial. Otherwise the unit count comes from [`DeviceControl`], and a
/// count of zero means host.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThresholdPolicy;

impl ThresholdPolicy {
    /// Device units for `work` under `devices`, ignoring eligibility
    pub fn units(work: usize, devices: &DeviceSettings) -> usize {
        match devices.control {
            DeviceControl::Never => 0,
            DeviceControl::Always => devices.count,
            DeviceControl::Auto => (work / devices.chunk.max(1)).min(devices.count),
        }
    }

    /// Returns true if the reduction may run on a device at all
    pub fn eligible(req: &OffloadRequest<'_>) -> bool {
        // user-defined types stay on the host
        !req.iso
            && req.monoid.is_builtin()
            && !req.monoid.is_trivial()
            && !req.ty.is_user_defined()
            && !req.monoid.ty().is_user_defined()
    }
}

impl OffloadPolicy for ThresholdPolicy {
    fn decide(&self, req: &OffloadRequest<'_>, devices: &DeviceSettings) -> OffloadDecision {
        if !Self::eligible(req) {
            return OffloadDecision::Host;
        }
        match Self::units(req.work, devices) {
            0 => OffloadDecision::Host,
            units => OffloadDecision::Device { units },
        }
    }
}

/// Device execution path for reductions.
///
/// An error is not reported to the caller; the reduction reruns on the
/// host.
pub trait Accelerator: Send + Sync + fmt::Debug {
    /// Device name for traces
    fn name(&self) -> &str;

    /// Reduce `a` with `monoid` using `units` device units
    fn reduce_to_scalar(&self, monoid: &Monoid, a: &Matrix, units: usize) -> Result<Scalar>;
}
