//! forge-primitives: execution substrate and building blocks for device-wide algorithms.
//!
//! Provides [`ComputeContext`] (a grid-dispatch queue backed by a dedicated
//! worker pool), aligned [`DeviceBuffer`] scratch memory, range capabilities
//! for kernel inputs and outputs, and the block-level tile helpers the
//! kernels in `forge-reduce` are written against.

pub mod block;
pub mod buffer;
pub mod buffer_pool;
pub mod context;
pub mod dispatch;
pub mod hardware;
pub mod range;
pub mod slice;
pub mod timing;

pub use buffer::{align_size, AllocError, DeviceBuffer, BUFFER_ALIGNMENT};
pub use buffer_pool::BufferPool;
pub use context::{ComputeContext, DispatchError};
pub use dispatch::{GridSize, Threadgroup, MAX_THREADS_PER_THREADGROUP};
pub use hardware::DeviceInfo;
pub use range::{
    ConstantInput, CountingInput, DiscardOutput, InputRange, OutputRange, SliceOutput,
    TransformInput,
};
pub use slice::DeviceSlice;
pub use timing::{throughput_meps, BenchTimer};
