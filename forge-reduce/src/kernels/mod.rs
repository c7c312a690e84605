//! Kernel bodies and launchers for the reduce-by-key passes.
//!
//! Each submodule exposes a `launch` that dispatches one pass on a
//! [`ComputeContext`](forge_primitives::ComputeContext) and the per-threadgroup
//! body it runs. Passes communicate only through the bound scratch views.

pub(crate) mod count_boundaries;
pub(crate) mod reduce_runs;
pub(crate) mod scan_offsets;
pub(crate) mod scatter_carries;

use std::marker::PhantomData;

/// Caller ranges and operators shared by the passes of one invocation.
pub(crate) struct Operands<'a, K, V, KI: ?Sized, VI: ?Sized, UO: ?Sized, AO: ?Sized, R, E> {
    pub keys: &'a KI,
    pub values: &'a VI,
    pub unique_out: &'a UO,
    pub aggregates_out: &'a AO,
    pub reduce_op: &'a R,
    pub key_eq: &'a E,
    pub _marker: PhantomData<fn() -> (K, V)>,
}
