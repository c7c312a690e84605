//! Compute context: worker pool, grid dispatch and sticky launch status.
//!
//! `ComputeContext` plays the role of a device plus its command queue. Each
//! [`ComputeContext::dispatch`] runs one kernel body per threadgroup on a
//! dedicated rayon pool and returns only after every group has retired, so
//! consecutive dispatches are separated by a full completion barrier.
//!
//! A panic inside a kernel body is caught, recorded as the context's status,
//! and refuses later launches until [`ComputeContext::clear_status`] is called.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::dispatch::{GridSize, Threadgroup, MAX_THREADS_PER_THREADGROUP};
use crate::hardware::DeviceInfo;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),
    #[error("kernel `{kernel}` dispatched with an empty grid")]
    EmptyGrid { kernel: String },
    #[error("kernel `{kernel}` requested {requested} threads per threadgroup (max {max})")]
    ThreadgroupTooLarge {
        kernel: String,
        requested: usize,
        max: usize,
    },
    #[error("kernel `{kernel}` faulted: {message}")]
    KernelFault { kernel: String, message: String },
}

/// Device handle: worker pool plus the status of past launches.
pub struct ComputeContext {
    pool: rayon::ThreadPool,
    status: Mutex<Option<DispatchError>>,
}

impl ComputeContext {
    /// Context with one worker per available core.
    pub fn new() -> Result<Self, DispatchError> {
        Self::build(rayon::ThreadPoolBuilder::new())
    }

    /// Context with exactly `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, DispatchError> {
        Self::build(rayon::ThreadPoolBuilder::new().num_threads(threads))
    }

    fn build(builder: rayon::ThreadPoolBuilder) -> Result<Self, DispatchError> {
        let pool = builder
            .thread_name(|i| format!("forge-worker-{i}"))
            .build()
            .map_err(|e| DispatchError::PoolBuild(e.to_string()))?;
        tracing::debug!(workers = pool.current_num_threads(), "compute context ready");
        Ok(Self {
            pool,
            status: Mutex::new(None),
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo::detect(self.worker_threads())
    }

    /// Run `kernel` once per threadgroup of `grid` and wait for all of them.
    pub fn dispatch<F>(&self, name: &str, grid: GridSize, kernel: F) -> Result<(), DispatchError>
    where
        F: Fn(Threadgroup) + Sync,
    {
        // A faulted context refuses further work.
        self.synchronize()?;

        if grid.is_empty() {
            return Err(DispatchError::EmptyGrid {
                kernel: name.to_string(),
            });
        }
        if grid.threads_per_threadgroup > MAX_THREADS_PER_THREADGROUP {
            return Err(DispatchError::ThreadgroupTooLarge {
                kernel: name.to_string(),
                requested: grid.threads_per_threadgroup,
                max: MAX_THREADS_PER_THREADGROUP,
            });
        }

        tracing::trace!(
            kernel = name,
            threadgroups = grid.threadgroups,
            threads_per_threadgroup = grid.threads_per_threadgroup,
            "dispatch"
        );

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                (0..grid.threadgroups)
                    .into_par_iter()
                    .for_each(|index| kernel(Threadgroup { index, grid }));
            })
        }));

        match result {
            Ok(()) => Ok(()),
            Err(payload) => {
                let err = DispatchError::KernelFault {
                    kernel: name.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                tracing::warn!(error = %err, "kernel fault recorded");
                self.record(err.clone());
                Err(err)
            }
        }
    }

    /// Status of every launch issued so far.
    ///
    /// Dispatches are synchronous, so this never blocks; it reports the first
    /// fault recorded since the last [`clear_status`](Self::clear_status).
    pub fn synchronize(&self) -> Result<(), DispatchError> {
        match self.lock_status().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Forget a recorded fault so the context accepts launches again.
    pub fn clear_status(&self) {
        *self.lock_status() = None;
    }

    fn record(&self, err: DispatchError) {
        let mut status = self.lock_status();
        if status.is_none() {
            *status = Some(err);
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Option<DispatchError>> {
        // Poisoning only means a panic happened while the guard was held; the
        // Option inside is still coherent.
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_runs_every_group_once() {
        let ctx = ComputeContext::with_threads(4).unwrap();
        let hits: Vec<AtomicUsize> = (0..37).map(|_| AtomicUsize::new(0)).collect();
        ctx.dispatch("count_groups", GridSize::new(37, 64), |tg| {
            hits[tg.index].fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
        assert!(ctx.synchronize().is_ok());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let ctx = ComputeContext::with_threads(1).unwrap();
        let err = ctx.dispatch("noop", GridSize::new(0, 256), |_| {}).unwrap_err();
        assert!(matches!(err, DispatchError::EmptyGrid { .. }));
        // Rejected launches are not faults.
        assert!(ctx.synchronize().is_ok());
    }

    #[test]
    fn test_oversized_threadgroup_rejected() {
        let ctx = ComputeContext::with_threads(1).unwrap();
        let err = ctx.dispatch("wide", GridSize::new(1, 2048), |_| {}).unwrap_err();
        assert_eq!(
            err,
            DispatchError::ThreadgroupTooLarge {
                kernel: "wide".into(),
                requested: 2048,
                max: MAX_THREADS_PER_THREADGROUP,
            }
        );
    }

    #[test]
    fn test_fault_is_sticky_until_cleared() {
        let ctx = ComputeContext::with_threads(2).unwrap();
        let err = ctx
            .dispatch("boom", GridSize::new(8, 32), |tg| {
                if tg.index == 5 {
                    panic!("group 5 exploded");
                }
            })
            .unwrap_err();
        match &err {
            DispatchError::KernelFault { kernel, message } => {
                assert_eq!(kernel, "boom");
                assert!(message.contains("group 5"), "message was {message}");
            }
            other => panic!("expected KernelFault, got {other:?}"),
        }
        assert_eq!(ctx.synchronize().unwrap_err(), err);

        // Later launches are refused without running.
        let ran = AtomicUsize::new(0);
        assert!(ctx
            .dispatch("after", GridSize::new(1, 32), |_| {
                ran.fetch_add(1, Ordering::Relaxed);
            })
            .is_err());
        assert_eq!(ran.load(Ordering::Relaxed), 0);

        ctx.clear_status();
        ctx.dispatch("after", GridSize::new(1, 32), |_| {
            ran.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_worker_threads() {
        let ctx = ComputeContext::with_threads(3).unwrap();
        assert_eq!(ctx.worker_threads(), 3);
        assert_eq!(ctx.info().worker_threads, 3);
    }
}
