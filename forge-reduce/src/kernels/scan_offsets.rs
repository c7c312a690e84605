//! Pass 2: block counts to block output offsets.
//!
//! A single threadgroup scans the boundary counts tile by tile, carrying the
//! running total from one tile into the next, and writes the exclusive prefix
//! back in place. The total plus the implicit head at position 0 is the run
//! count.

use std::sync::atomic::{AtomicUsize, Ordering};

use forge_primitives::block::exclusive_scan;
use forge_primitives::{ComputeContext, DeviceSlice, DispatchError, GridSize, OutputRange};

use crate::config::KernelConfig;
use crate::layout::BatchPlan;
use crate::observer::Pass;

/// Returns the run count, which is also stored to `unique_count_out[0]`.
pub(crate) fn launch<CO>(
    ctx: &ComputeContext,
    plan: &BatchPlan,
    config: KernelConfig,
    offsets: &DeviceSlice<'_, u32>,
    unique_count_out: &CO,
) -> Result<usize, DispatchError>
where
    CO: OutputRange<usize> + ?Sized,
{
    let runs = AtomicUsize::new(0);
    let tile_items = config.items_per_block() as usize;
    ctx.dispatch(
        Pass::ScanOffsets.kernel_name(),
        GridSize::single(config.block_size as usize),
        |_tg| {
            let total = scan_offsets(plan.blocks as usize, tile_items, offsets);
            // SAFETY: single threadgroup; the caller checked the output holds a slot.
            unsafe { unique_count_out.put(0, total) };
            runs.store(total, Ordering::Release);
        },
    )?;
    Ok(runs.load(Ordering::Acquire))
}

fn scan_offsets(blocks: usize, tile_items: usize, offsets: &DeviceSlice<'_, u32>) -> usize {
    let mut tile = Vec::with_capacity(tile_items.min(blocks));
    let mut running = 0u32;

    for start in (0..blocks).step_by(tile_items) {
        let end = (start + tile_items).min(blocks);
        tile.clear();
        // SAFETY: counts were written by count_boundaries, which has retired.
        tile.extend((start..end).map(|b| unsafe { offsets.read(b) }));
        running = exclusive_scan(&mut tile, running);
        for (block, &offset) in (start..end).zip(&tile) {
            unsafe { offsets.write(block, offset) };
        }
    }

    running as usize + 1
}
