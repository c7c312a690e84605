//! Description of the execution device backing a [`ComputeContext`].
//!
//! [`ComputeContext`]: crate::ComputeContext

use crate::dispatch::MAX_THREADS_PER_THREADGROUP;

/// Device facts recorded alongside benchmark results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name, e.g. "cpu-grid (x86_64-linux)".
    pub name: String,
    /// Workers executing threadgroups concurrently.
    pub worker_threads: usize,
    /// Largest threadgroup a dispatch accepts.
    pub max_threads_per_threadgroup: usize,
    /// Cores reported by the OS, if detectable.
    pub logical_cores: Option<usize>,
}

impl DeviceInfo {
    pub fn detect(worker_threads: usize) -> Self {
        Self {
            name: device_name(),
            worker_threads,
            max_threads_per_threadgroup: MAX_THREADS_PER_THREADGROUP,
            logical_cores: std::thread::available_parallelism().ok().map(|n| n.get()),
        }
    }

    /// Fraction of the machine's cores the context uses, as a percentage.
    pub fn core_utilization(&self) -> f64 {
        match self.logical_cores {
            Some(cores) if cores > 0 => self.worker_threads as f64 / cores as f64 * 100.0,
            _ => 0.0,
        }
    }
}

fn device_name() -> String {
    format!("cpu-grid ({}-{})", std::env::consts::ARCH, std::env::consts::OS)
}
