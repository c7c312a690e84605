//! Pass 3: reduce runs inside each batch.
//!
//! One threadgroup per batch walks its blocks in order. At every block start
//! the run rank is reloaded from the scanned block offset, so ranks agree
//! with the global numbering no matter which group computes them. The group
//! writes:
//!
//! - `unique_out[rank]` for every run head in the batch
//! - `aggregates_out[rank]` for every run that starts and ends inside the
//!   batch, except the batch's trailing run
//! - `leading[batch]`: the batch's share of the run at its first element
//! - `carry_outs[batch]`: the trailing run, resolved by `scatter_carries`
//!
//! Ranks assigned inside block `b` must stay within `(offsets[b], offsets[b + 1]]`,
//! the slots counted for it by pass 1. A `key_eq` that reports more heads
//! here than it did there faults the dispatch instead of writing outside
//! the block's slots.

use forge_primitives::block::{flag_heads, load_tile};
use forge_primitives::{ComputeContext, DispatchError, GridSize, InputRange, OutputRange, Threadgroup};

use crate::config::KernelConfig;
use crate::kernels::Operands;
use crate::layout::{BatchPlan, CarryOut, Scratch};
use crate::observer::Pass;

pub(crate) fn launch<K, V, KI, VI, UO, AO, R, E>(
    ctx: &ComputeContext,
    plan: &BatchPlan,
    config: KernelConfig,
    ops: &Operands<'_, K, V, KI, VI, UO, AO, R, E>,
    scratch: &Scratch<'_, V>,
    runs: usize,
) -> Result<(), DispatchError>
where
    K: Copy,
    V: Copy + Send + Sync,
    KI: InputRange<K> + ?Sized,
    VI: InputRange<V> + ?Sized,
    UO: OutputRange<K> + ?Sized,
    AO: OutputRange<V> + ?Sized,
    R: Fn(V, V) -> V + Sync,
    E: Fn(&K, &K) -> bool + Sync,
{
    let grid = GridSize::new(plan.batches as usize, config.block_size as usize);
    ctx.dispatch(Pass::ReduceRuns.kernel_name(), grid, |tg| {
        reduce_runs(tg, plan, ops, scratch, runs)
    })
}

fn reduce_runs<K, V, KI, VI, UO, AO, R, E>(
    tg: Threadgroup,
    plan: &BatchPlan,
    ops: &Operands<'_, K, V, KI, VI, UO, AO, R, E>,
    scratch: &Scratch<'_, V>,
    runs: usize,
) where
    K: Copy,
    V: Copy,
    KI: InputRange<K> + ?Sized,
    VI: InputRange<V> + ?Sized,
    UO: OutputRange<K> + ?Sized,
    AO: OutputRange<V> + ?Sized,
    R: Fn(V, V) -> V,
    E: Fn(&K, &K) -> bool,
{
    let batch = tg.index as u32;
    let batch_start = plan.batch_items(batch).start;
    let capacity = plan.items_per_block as usize;
    let mut key_tile = Vec::with_capacity(capacity);
    let mut value_tile = Vec::with_capacity(capacity);
    let mut heads = Vec::with_capacity(capacity);

    let mut continues_previous = false;
    // Aggregate of the batch's first run, set once that run ends in the batch.
    let mut leading: Option<V> = None;
    let mut current: Option<V> = None;
    let mut rank = 0u32;

    for block in plan.batch_blocks(batch) {
        let items = plan.block_items(block);
        load_tile(ops.keys, items.start, items.len(), &mut key_tile);
        load_tile(ops.values, items.start, items.len(), &mut value_tile);
        let predecessor = items.start.checked_sub(1).map(|i| ops.keys.get(i));
        flag_heads(&key_tile, predecessor.as_ref(), ops.key_eq, &mut heads);

        // Rank of the run holding the element just before this block, and
        // the highest rank this block may assign.
        // SAFETY: offsets were finalised by scan_offsets, which has retired.
        rank = unsafe { scratch.offsets.read(block as usize) };
        let last_rank = if block + 1 < plan.blocks {
            unsafe { scratch.offsets.read(block as usize + 1) }
        } else {
            (runs - 1) as u32
        };

        let tile = heads.iter().zip(&key_tile).zip(&value_tile);
        for (j, ((&head, &key), &value)) in tile.enumerate() {
            let index = items.start + j;

            if index == batch_start {
                continues_previous = !head;
            } else if head {
                if let Some(aggregate) = current.take() {
                    let write_now = match leading {
                        None => {
                            leading = Some(aggregate);
                            !continues_previous
                        }
                        Some(_) => true,
                    };
                    if write_now {
                        // SAFETY: run `rank` starts and ends in this batch;
                        // no other group writes its slot.
                        unsafe { ops.aggregates_out.put(rank as usize, aggregate) };
                    }
                }
            }

            if head {
                if index > 0 {
                    rank += 1;
                }
                assert!(
                    rank <= last_rank,
                    "block {block} found more run heads than were counted (rank {rank} > {last_rank})"
                );
                // SAFETY: each head is owned by the batch containing it.
                unsafe { ops.unique_out.put(rank as usize, key) };
                current = Some(value);
            } else {
                current = Some(match current {
                    Some(acc) => (ops.reduce_op)(acc, value),
                    None => value,
                });
            }
        }
    }

    let Some(trailing) = current else {
        return;
    };
    let carry = CarryOut {
        value: trailing,
        destination: rank,
        continues_previous,
        spans_batch: leading.is_none(),
    };
    // SAFETY: slot `batch` belongs to this group.
    unsafe {
        scratch.leading.write(batch as usize, leading.unwrap_or(trailing));
        scratch.carry_outs.write(batch as usize, carry);
    }
}
