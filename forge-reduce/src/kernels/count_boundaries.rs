//! Pass 1: run heads per block.
//!
//! One threadgroup per batch walks the batch's blocks, loads each key tile
//! with the key just before it, and stores the number of heads at global
//! positions >= 1. Position 0 is the implicit first head added back by
//! `scan_offsets`.

use forge_primitives::block::{flag_heads, load_tile};
use forge_primitives::{ComputeContext, DeviceSlice, DispatchError, GridSize, InputRange, Threadgroup};

use crate::config::KernelConfig;
use crate::layout::BatchPlan;
use crate::observer::Pass;

pub(crate) fn launch<K, KI, E>(
    ctx: &ComputeContext,
    plan: &BatchPlan,
    config: KernelConfig,
    keys: &KI,
    key_eq: &E,
    counts: &DeviceSlice<'_, u32>,
) -> Result<(), DispatchError>
where
    KI: InputRange<K> + ?Sized,
    E: Fn(&K, &K) -> bool + Sync,
{
    let grid = GridSize::new(plan.batches as usize, config.block_size as usize);
    ctx.dispatch(Pass::CountBoundaries.kernel_name(), grid, |tg| {
        count_boundaries(tg, plan, keys, key_eq, counts)
    })
}

fn count_boundaries<K, KI, E>(
    tg: Threadgroup,
    plan: &BatchPlan,
    keys: &KI,
    key_eq: &E,
    counts: &DeviceSlice<'_, u32>,
) where
    KI: InputRange<K> + ?Sized,
    E: Fn(&K, &K) -> bool,
{
    let capacity = plan.items_per_block as usize;
    let mut tile = Vec::with_capacity(capacity);
    let mut heads = Vec::with_capacity(capacity);

    for block in plan.batch_blocks(tg.index as u32) {
        let items = plan.block_items(block);
        load_tile(keys, items.start, items.len(), &mut tile);
        let predecessor = items.start.checked_sub(1).map(|i| keys.get(i));
        flag_heads(&tile, predecessor.as_ref(), key_eq, &mut heads);

        let mut count = heads.iter().filter(|&&h| h).count() as u32;
        if items.start == 0 {
            count -= 1;
        }
        // SAFETY: each block belongs to exactly one batch.
        unsafe { counts.write(block as usize, count) };
    }
}
