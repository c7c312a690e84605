//! Pass instrumentation.
//!
//! A [`PassObserver`] is notified once with the capacity plan and then after
//! every pass of an invocation. With `debug_synchronous` set and no observer
//! installed, [`TracingObserver`] reports to the `tracing` diagnostic stream.

use std::fmt;

use crate::config::ReduceByKeyConfig;
use crate::layout::{BatchPlan, ScratchLayout};

/// The passes of a device algorithm, in launch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    CountBoundaries,
    ScanOffsets,
    ReduceRuns,
    ScatterCarries,
    Transform,
}

impl Pass {
    /// Kernel name used for dispatch and diagnostics.
    pub fn kernel_name(&self) -> &'static str {
        match self {
            Pass::CountBoundaries => "count_boundaries",
            Pass::ScanOffsets => "scan_offsets",
            Pass::ReduceRuns => "reduce_runs",
            Pass::ScatterCarries => "scatter_carries",
            Pass::Transform => "transform",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kernel_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub pass: Pass,
    /// Elements (or blocks, for the scan passes) the pass covered.
    pub items: usize,
    pub elapsed_ms: f64,
}

pub trait PassObserver: Sync {
    fn plan(&self, _config: &ReduceByKeyConfig, _plan: &BatchPlan, _layout: &ScratchLayout) {}

    fn pass_complete(&self, report: &PassReport);
}

/// Emits `debug` events for the plan and for every pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PassObserver for TracingObserver {
    fn plan(&self, config: &ReduceByKeyConfig, plan: &BatchPlan, layout: &ScratchLayout) {
        tracing::debug!(
            block_size = config.reduce.block_size,
            items_per_thread = config.reduce.items_per_thread,
            blocks = plan.blocks,
            blocks_per_full_batch = plan.blocks_per_full_batch,
            full_batches = plan.full_batches,
            batches = plan.batches,
            storage_size = layout.total_bytes,
            "reduce_by_key plan"
        );
    }

    fn pass_complete(&self, report: &PassReport) {
        tracing::debug!(
            pass = %report.pass,
            items = report.items,
            elapsed_ms = report.elapsed_ms,
            "pass complete"
        );
    }
}

static TRACING_OBSERVER: TracingObserver = TracingObserver;

/// Observer an invocation reports to: the installed one, otherwise
/// [`TracingObserver`] when `debug_synchronous` is set.
pub(crate) fn select<'o>(
    installed: Option<&'o dyn PassObserver>,
    debug_synchronous: bool,
) -> Option<&'o dyn PassObserver> {
    match installed {
        Some(observer) => Some(observer),
        None if debug_synchronous => Some(&TRACING_OBSERVER),
        None => None,
    }
}
