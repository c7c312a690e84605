//! forge-reduce: device-wide reduce-by-key and transform.
//!
//! [`reduce_by_key`] collapses every maximal run of equivalent adjacent keys
//! into one `(key, aggregate)` pair using four dispatches on a
//! [`ComputeContext`](forge_primitives::ComputeContext):
//!
//! 1. `count_boundaries`: run heads per block
//! 2. `scan_offsets`: block counts to output offsets, plus the run count
//! 3. `reduce_runs`: keys and aggregates of runs contained in one batch
//! 4. `scatter_carries`: aggregates of runs crossing batch boundaries
//!
//! Scratch memory is sized by a first call without a buffer and borrowed from
//! the caller on the second call:
//!
//! ```
//! use forge_primitives::{ComputeContext, DeviceBuffer, SliceOutput};
//! use forge_reduce::reduce_by_key;
//!
//! let ctx = ComputeContext::new().unwrap();
//! let keys = [1, 1, 1, 2, 10, 10, 10, 88];
//! let values = [1, 2, 3, 4, 5, 6, 7, 8];
//! let (mut unique, mut aggregates, mut count) = ([0; 8], [0; 8], [0usize]);
//!
//! let mut bytes = 0;
//! let sum = |a: i32, b: i32| a + b;
//! let eq = |a: &i32, b: &i32| a == b;
//! let (u, a, c) = (
//!     SliceOutput::new(&mut unique),
//!     SliceOutput::new(&mut aggregates),
//!     SliceOutput::new(&mut count),
//! );
//! reduce_by_key(None, &mut bytes, &keys[..], &values[..], 8, &u, &a, &c, sum, eq, &ctx, false).unwrap();
//! let mut scratch = DeviceBuffer::alloc(bytes).unwrap();
//! reduce_by_key(Some(&mut scratch), &mut bytes, &keys[..], &values[..], 8, &u, &a, &c, sum, eq, &ctx, false)
//!     .unwrap();
//! drop((u, a, c));
//!
//! assert_eq!(count[0], 4);
//! assert_eq!(&unique[..4], &[1, 2, 10, 88]);
//! assert_eq!(&aggregates[..4], &[6, 4, 18, 8]);
//! ```

pub mod config;
mod kernels;
pub mod layout;
pub mod observer;
pub mod reduce_by_key;
pub mod transform;

use forge_primitives::{AllocError, DispatchError};

pub use config::{ConfigError, KernelConfig, ReduceByKeyConfig, TransformConfig};
pub use layout::{BatchPlan, CarryOut, ScratchLayout, ScratchRegion};
pub use observer::{Pass, PassObserver, PassReport, TracingObserver};
pub use reduce_by_key::{reduce_by_key, reduce_by_key_to_vec, ReduceByKey};
pub use transform::{transform, Transform};

#[derive(Debug, thiserror::Error)]
pub enum ReduceByKeyError {
    #[error("invalid kernel configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("input of {size} elements exceeds the maximum of {max}")]
    InputTooLarge { size: usize, max: usize },
    #[error("inputs shorter than size={size}: keys={keys}, values={values}")]
    InputTooShort {
        size: usize,
        keys: usize,
        values: usize,
    },
    #[error("length mismatch: keys={keys}, values={values}")]
    LengthMismatch { keys: usize, values: usize },
    #[error("scratch buffer too small: required {required} bytes, provided {provided}")]
    ScratchTooSmall { required: usize, provided: usize },
    #[error("{output} holds {provided} elements but {required} are written")]
    OutputTooSmall {
        output: &'static str,
        required: usize,
        provided: usize,
    },
    #[error("value alignment of {align} bytes exceeds the scratch alignment")]
    UnsupportedAlignment { align: usize },
    #[error("scratch allocation failed: {0}")]
    Alloc(#[from] AllocError),
    #[error("device execution failed: {0}")]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("invalid kernel configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("input holds {provided} elements, size={size}")]
    InputTooShort { size: usize, provided: usize },
    #[error("output holds {provided} elements, size={size}")]
    OutputTooSmall { size: usize, provided: usize },
    #[error("device execution failed: {0}")]
    Dispatch(#[from] DispatchError),
}
