//! Grid geometry for threadgroup dispatch.
//!
//! A launch is described by a [`GridSize`]: how many threadgroups run and how
//! many threads each group models. Kernels receive a [`Threadgroup`] handle
//! identifying which group of the grid they are executing.

/// Upper bound on threads per threadgroup accepted by a dispatch.
pub const MAX_THREADS_PER_THREADGROUP: usize = 1024;

/// Shape of a 1D threadgroup grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub threadgroups: usize,
    pub threads_per_threadgroup: usize,
}

impl GridSize {
    pub fn new(threadgroups: usize, threads_per_threadgroup: usize) -> Self {
        Self {
            threadgroups,
            threads_per_threadgroup,
        }
    }

    /// Grid covering `total_items` when every thread owns `items_per_thread`
    /// consecutive items.
    pub fn for_items(total_items: usize, threads_per_threadgroup: usize, items_per_thread: usize) -> Self {
        let items_per_group = threads_per_threadgroup * items_per_thread;
        Self {
            threadgroups: total_items.div_ceil(items_per_group.max(1)),
            threads_per_threadgroup,
        }
    }

    /// A single threadgroup, used by the tile-serial scan kernels.
    pub fn single(threads_per_threadgroup: usize) -> Self {
        Self::new(1, threads_per_threadgroup)
    }

    pub fn is_empty(&self) -> bool {
        self.threadgroups == 0 || self.threads_per_threadgroup == 0
    }
}

/// Identity of the threadgroup a kernel body is running as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threadgroup {
    pub index: usize,
    pub grid: GridSize,
}
