//! Per-call execution context
//!
//! A [`Context`] carries everything an operation needs besides its operands:
//! thread-count hints, the verbose trace switch ("burble"), device offload
//! settings and the kernel selection switches.
//!
//! ```
//! use gbkern::prelude::*;
//!
//! let ctx = Context::new().with_nthreads(4).with_burble(true);
//! assert_eq!(ctx.nthreads_max(), 4);
//! ```
//!
//! # Environment
//!
//! [`Context::from_env`] starts from the defaults and applies:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `GBKERN_NTHREADS` | maximum worker threads |
//! | `GBKERN_CHUNK` | work units per thread |
//! | `GBKERN_BURBLE` | verbose trace on/off |
//! | `GBKERN_DEVICE_CONTROL` | `never`, `always` or `auto` |
//! | `GBKERN_DEVICE_COUNT` | device units available |
//! | `GBKERN_DEVICE_CHUNK` | work units per device unit |
//! | `GBKERN_FORCE_GENERIC` | use the generic kernels only |
//!
//! Booleans accept `1/true/yes/on` and `0/false/no/off`.

use crate::kernel::{KernelConfig, KernelRegistry};
use crate::offload::{Accelerator, DeviceControl, DeviceSettings, OffloadPolicy, ThresholdPolicy};
use crate::parallel::{DEFAULT_CHUNK, Workers, nthreads_for};
use log::{Level, info, log_enabled, trace};
use std::env;
use std::fmt;
use std::sync::Arc;
#[cfg(feature = "rayon")]
use std::sync::OnceLock;

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| parse_bool(&v))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.trim().parse::<usize>().ok())
}

fn default_nthreads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Execution settings shared by every operation in a call
#[derive(Clone)]
pub struct Context {
    nthreads_max: usize,
    chunk: usize,
    burble: bool,
    devices: DeviceSettings,
    accelerator: Option<Arc<dyn Accelerator>>,
    policy: Arc<dyn OffloadPolicy>,
    kernels: KernelConfig,
    registry: Arc<KernelRegistry>,
    #[cfg(feature = "rayon")]
    pool: Arc<OnceLock<Option<rayon::ThreadPool>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            nthreads_max: default_nthreads(),
            chunk: DEFAULT_CHUNK,
            burble: false,
            devices: DeviceSettings::default(),
            accelerator: None,
            policy: Arc::new(ThresholdPolicy),
            kernels: KernelConfig::default(),
            registry: KernelRegistry::global(),
            #[cfg(feature = "rayon")]
            pool: Arc::new(OnceLock::new()),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("nthreads_max", &self.nthreads_max)
            .field("chunk", &self.chunk)
            .field("burble", &self.burble)
            .field("devices", &self.devices)
            .field("accelerator", &self.accelerator.as_ref().map(|a| a.name().to_string()))
            .field("policy", &self.policy)
            .field("kernels", &self.kernels)
            .finish()
    }
}

impl Context {
    /// Default context: all cores, host-only reductions, specialized kernels
    pub fn new() -> Self {
        Self::default()
    }

    /// Default context with environment overrides applied
    pub fn from_env() -> Self {
        let mut ctx = Self::default();
        ctx.apply_env_overrides();
        ctx
    }

    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_usize("GBKERN_NTHREADS") {
            self.nthreads_max = n.max(1);
        }
        if let Some(chunk) = env_usize("GBKERN_CHUNK") {
            self.chunk = chunk.max(1);
        }
        if let Some(on) = env_bool("GBKERN_BURBLE") {
            self.burble = on;
        }
        if let Some(control) = env::var("GBKERN_DEVICE_CONTROL")
            .ok()
            .and_then(|v| DeviceControl::parse(&v))
        {
            self.devices.control = control;
        }
        if let Some(count) = env_usize("GBKERN_DEVICE_COUNT") {
            self.devices.count = count;
        }
        if let Some(chunk) = env_usize("GBKERN_DEVICE_CHUNK") {
            self.devices.chunk = chunk.max(1);
        }
        if let Some(on) = env_bool("GBKERN_FORCE_GENERIC") {
            self.kernels = std::mem::take(&mut self.kernels).force_generic(on);
        }
    }

    /// Use at most `n` worker threads (at least one)
    pub fn with_nthreads(mut self, n: usize) -> Self {
        self.nthreads_max = n.max(1);
        #[cfg(feature = "rayon")]
        {
            self.pool = Arc::new(OnceLock::new());
        }
        self
    }

    /// Work units per thread
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    /// Turn the verbose trace on or off
    pub fn with_burble(mut self, on: bool) -> Self {
        self.burble = on;
        self
    }

    /// Device offload settings
    pub fn with_devices(mut self, devices: DeviceSettings) -> Self {
        self.devices = devices;
        self
    }

    /// Attach a device execution path
    pub fn with_accelerator(mut self, accelerator: Arc<dyn Accelerator>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    /// Replace the offload cost model
    pub fn with_policy(mut self, policy: Arc<dyn OffloadPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Kernel selection switches
    pub fn with_kernels(mut self, kernels: KernelConfig) -> Self {
        self.kernels = kernels;
        self
    }

    /// Replace the kernel registry
    pub fn with_registry(mut self, registry: Arc<KernelRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Maximum worker threads
    #[inline]
    pub fn nthreads_max(&self) -> usize {
        self.nthreads_max
    }

    /// Work units per thread
    #[inline]
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Returns true if the verbose trace is on
    #[inline]
    pub fn is_burble(&self) -> bool {
        self.burble
    }

    /// Device offload settings
    #[inline]
    pub fn devices(&self) -> &DeviceSettings {
        &self.devices
    }

    /// Attached device execution path
    pub fn accelerator(&self) -> Option<&dyn Accelerator> {
        self.accelerator.as_deref()
    }

    /// Offload cost model
    pub fn policy(&self) -> &dyn OffloadPolicy {
        self.policy.as_ref()
    }

    /// Kernel selection switches
    #[inline]
    pub fn kernels(&self) -> &KernelConfig {
        &self.kernels
    }

    /// Kernel registry
    #[inline]
    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    /// Task count for `work` units
    #[inline]
    pub fn ntasks(&self, work: usize) -> usize {
        nthreads_for(work, self.chunk, self.nthreads_max)
    }

    /// Worker pool for this context, built on first use.
    ///
    /// Falls back to sequential execution if the pool cannot be built.
    pub fn workers(&self) -> Workers<'_> {
        #[cfg(feature = "rayon")]
        if self.nthreads_max > 1 {
            let pool = self.pool.get_or_init(|| {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.nthreads_max)
                    .thread_name(|i| format!("gbkern-{}", i))
                    .build()
                {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        log::warn!("gbkern: worker pool unavailable, running sequentially: {}", e);
                        None
                    }
                }
            });
            if let Some(pool) = pool {
                return Workers::pool(pool);
            }
        }
        Workers::sequential()
    }

    /// Emit a trace message; at `info` level when burble is on, otherwise at
    /// `trace` level. The message is only built if it will be logged.
    pub fn burble<F>(&self, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.burble {
            info!("{}", message());
        } else if log_enabled!(Level::Trace) {
            trace!("{}", message());
        }
    }
}
