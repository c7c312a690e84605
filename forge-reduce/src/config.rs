//! Kernel tile shapes.
//!
//! Every device algorithm here is tuned by a threadgroup size and the number
//! of items each thread owns. `reduce_by_key` carries two shapes: one for the
//! per-block kernels and one for the single-group scan kernels. The scan
//! shape also caps the number of batches, which bounds scratch size.

use forge_primitives::MAX_THREADS_PER_THREADGROUP;

/// Threadgroup size and items per thread for one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub block_size: u32,
    pub items_per_thread: u32,
}

impl KernelConfig {
    pub const fn new(block_size: u32, items_per_thread: u32) -> Self {
        Self {
            block_size,
            items_per_thread,
        }
    }

    /// Items one threadgroup covers per tile.
    pub const fn items_per_block(&self) -> u32 {
        self.block_size * self.items_per_thread
    }

    fn validate(&self, kernel: &'static str) -> Result<(), ConfigError> {
        if self.block_size == 0 || self.items_per_thread == 0 {
            return Err(ConfigError::ZeroDimension {
                kernel,
                block_size: self.block_size,
                items_per_thread: self.items_per_thread,
            });
        }
        if self.block_size as usize > MAX_THREADS_PER_THREADGROUP {
            return Err(ConfigError::BlockTooLarge {
                kernel,
                block_size: self.block_size,
                max: MAX_THREADS_PER_THREADGROUP,
            });
        }
        if self.block_size.checked_mul(self.items_per_thread).is_none() {
            return Err(ConfigError::TileOverflow { kernel });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{kernel}: block_size={block_size} and items_per_thread={items_per_thread} must be non-zero")]
    ZeroDimension {
        kernel: &'static str,
        block_size: u32,
        items_per_thread: u32,
    },
    #[error("{kernel}: block_size={block_size} exceeds the threadgroup limit of {max}")]
    BlockTooLarge {
        kernel: &'static str,
        block_size: u32,
        max: usize,
    },
    #[error("{kernel}: tile size overflows u32")]
    TileOverflow { kernel: &'static str },
}

/// Tile shapes for the four reduce-by-key passes.
///
/// `reduce` shapes the boundary-count and run-reduce kernels, `scan` the
/// offset-scan and carry-fixup kernels. Both default to 256 threads x 7
/// items, i.e. 1792 items per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceByKeyConfig {
    pub reduce: KernelConfig,
    pub scan: KernelConfig,
}

impl ReduceByKeyConfig {
    pub const DEFAULT_BLOCK_SIZE: u32 = 256;
    pub const DEFAULT_ITEMS_PER_THREAD: u32 = 7;
    pub const DEFAULT_SCAN_BLOCK_SIZE: u32 = 256;
    pub const DEFAULT_SCAN_ITEMS_PER_THREAD: u32 = 7;

    pub const fn new(reduce: KernelConfig, scan: KernelConfig) -> Self {
        Self { reduce, scan }
    }

    pub fn with_reduce(mut self, block_size: u32, items_per_thread: u32) -> Self {
        self.reduce = KernelConfig::new(block_size, items_per_thread);
        self
    }

    pub fn with_scan(mut self, block_size: u32, items_per_thread: u32) -> Self {
        self.scan = KernelConfig::new(block_size, items_per_thread);
        self
    }

    pub const fn items_per_block(&self) -> u32 {
        self.reduce.items_per_block()
    }

    /// Upper bound on the number of batches.
    pub const fn scan_items_per_block(&self) -> u32 {
        self.scan.items_per_block()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reduce.validate("reduce")?;
        self.scan.validate("scan")
    }
}

impl Default for ReduceByKeyConfig {
    fn default() -> Self {
        Self::new(
            KernelConfig::new(Self::DEFAULT_BLOCK_SIZE, Self::DEFAULT_ITEMS_PER_THREAD),
            KernelConfig::new(Self::DEFAULT_SCAN_BLOCK_SIZE, Self::DEFAULT_SCAN_ITEMS_PER_THREAD),
        )
    }
}

/// Tile shape for [`transform`](crate::transform::transform).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    pub kernel: KernelConfig,
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kernel.validate("transform")
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::new(256, 8),
        }
    }
}
