//! Pass 4: resolve runs that cross batch boundaries.
//!
//! A single threadgroup walks the carry-outs in batch order holding the open
//! run, a `(destination, aggregate)` pair. A batch that continues the open
//! run folds its leading aggregate into it, and keeps it open if the run
//! covers the whole batch. Otherwise the open run is complete and written,
//! and the batch's trailing run becomes the new open run. Partial aggregates
//! are always combined in batch order.

use forge_primitives::{ComputeContext, DeviceSlice, DispatchError, GridSize, OutputRange};

use crate::config::KernelConfig;
use crate::layout::{BatchPlan, CarryOut, Scratch};
use crate::observer::Pass;

pub(crate) fn launch<V, AO, R>(
    ctx: &ComputeContext,
    plan: &BatchPlan,
    config: KernelConfig,
    reduce_op: &R,
    aggregates_out: &AO,
    scratch: &Scratch<'_, V>,
) -> Result<(), DispatchError>
where
    V: Copy + Send + Sync,
    AO: OutputRange<V> + ?Sized,
    R: Fn(V, V) -> V + Sync,
{
    let tile_items = config.items_per_block() as usize;
    ctx.dispatch(
        Pass::ScatterCarries.kernel_name(),
        GridSize::single(config.block_size as usize),
        |_tg| {
            scatter_carries(
                plan.batches as usize,
                tile_items,
                reduce_op,
                aggregates_out,
                &scratch.carry_outs,
                &scratch.leading,
            )
        },
    )
}

fn scatter_carries<V, AO, R>(
    batches: usize,
    tile_items: usize,
    reduce_op: &R,
    aggregates_out: &AO,
    carry_outs: &DeviceSlice<'_, CarryOut<V>>,
    leading: &DeviceSlice<'_, V>,
) where
    V: Copy,
    AO: OutputRange<V> + ?Sized,
    R: Fn(V, V) -> V,
{
    let mut carries = Vec::with_capacity(tile_items.min(batches));
    let mut leads = Vec::with_capacity(tile_items.min(batches));
    let mut open: Option<(u32, V)> = None;

    // SAFETY (all writes below): every run crossing a batch boundary is the
    // trailing run of exactly one batch, so it is opened and written once.
    let finish = |(destination, aggregate): (u32, V)| unsafe {
        aggregates_out.put(destination as usize, aggregate)
    };

    for start in (0..batches).step_by(tile_items) {
        let end = (start + tile_items).min(batches);
        carries.clear();
        leads.clear();
        // SAFETY: written by reduce_runs, which has retired.
        carries.extend((start..end).map(|g| unsafe { carry_outs.read(g) }));
        leads.extend((start..end).map(|g| unsafe { leading.read(g) }));

        for (carry, &lead) in carries.iter().zip(&leads) {
            if carry.continues_previous {
                if let Some((destination, acc)) = open.take() {
                    let acc = reduce_op(acc, lead);
                    if carry.spans_batch {
                        open = Some((destination, acc));
                        continue;
                    }
                    finish((destination, acc));
                }
            } else if let Some(done) = open.take() {
                finish(done);
            }
            open = Some((carry.destination, carry.value));
        }
    }

    if let Some(done) = open {
        finish(done);
    }
}
