//! Capacity planning for reduce-by-key.
//!
//! The input is cut into blocks of `items_per_block` elements and the blocks
//! into at most `scan_items_per_block` batches, so the single-group scan and
//! fixup kernels always see every batch in one tile. The first
//! `full_batches` batches own `blocks_per_full_batch` blocks, the remaining
//! ones own one block fewer.
//!
//! Scratch memory holds three regions, each starting on a 256-byte boundary:
//!
//! | region               | elements | type          |
//! |----------------------|----------|---------------|
//! | boundary counts      | blocks   | `u32`         |
//! | carry-outs           | batches  | `CarryOut<V>` |
//! | leading aggregates   | batches  | `V`           |

use std::mem::{align_of, size_of};
use std::ops::Range;

use forge_primitives::{align_size, DeviceBuffer, DeviceSlice, BUFFER_ALIGNMENT};

use crate::config::ReduceByKeyConfig;
use crate::ReduceByKeyError;

/// Grid decomposition for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub size: u32,
    pub items_per_block: u32,
    pub blocks: u32,
    pub blocks_per_full_batch: u32,
    pub full_batches: u32,
    pub batches: u32,
}

impl BatchPlan {
    pub fn new(size: usize, config: &ReduceByKeyConfig) -> Result<Self, ReduceByKeyError> {
        let size = u32::try_from(size).map_err(|_| ReduceByKeyError::InputTooLarge {
            size,
            max: u32::MAX as usize,
        })?;
        let items_per_block = config.items_per_block();

        if size == 0 {
            return Ok(Self {
                size,
                items_per_block,
                blocks: 0,
                blocks_per_full_batch: 0,
                full_batches: 0,
                batches: 0,
            });
        }

        let max_batches = config.scan_items_per_block();
        let blocks = size.div_ceil(items_per_block);
        let blocks_per_full_batch = blocks.div_ceil(max_batches);
        let full_batches = match blocks % max_batches {
            0 => max_batches,
            rem => rem,
        };
        let batches = if blocks_per_full_batch == 1 {
            full_batches
        } else {
            max_batches
        };

        Ok(Self {
            size,
            items_per_block,
            blocks,
            blocks_per_full_batch,
            full_batches,
            batches,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Blocks owned by `batch`.
    pub fn batch_blocks(&self, batch: u32) -> Range<u32> {
        let start = batch * self.blocks_per_full_batch - batch.saturating_sub(self.full_batches);
        let len = if batch < self.full_batches {
            self.blocks_per_full_batch
        } else {
            self.blocks_per_full_batch - 1
        };
        start..start + len
    }

    /// Element range of `block`; the last block may be partial.
    pub fn block_items(&self, block: u32) -> Range<usize> {
        let start = block as usize * self.items_per_block as usize;
        let end = (start + self.items_per_block as usize).min(self.size as usize);
        start..end
    }

    /// Element range of `batch`.
    pub fn batch_items(&self, batch: u32) -> Range<usize> {
        let blocks = self.batch_blocks(batch);
        self.block_items(blocks.start).start..self.block_items(blocks.end - 1).end
    }
}

/// Per-batch record handed from the run reducer to the carry fixup.
///
/// Describes the batch's trailing run: its partial aggregate over this batch,
/// its output rank, whether the batch's first element continues the previous
/// batch's trailing run, and whether one run covers the entire batch.
/// The run's key is not carried: the group owning the run's head has
/// already written it to `unique_out`, and `continues_previous` was decided
/// there with `key_eq`, so the fixup never compares keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarryOut<V> {
    pub value: V,
    pub destination: u32,
    pub continues_previous: bool,
    pub spans_batch: bool,
}

/// Byte range of one scratch region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchRegion {
    pub offset: usize,
    pub bytes: usize,
}

impl ScratchRegion {
    fn after(prev: Option<&ScratchRegion>, bytes: usize) -> Self {
        let offset = prev.map_or(0, |p| p.offset + p.bytes);
        Self {
            offset,
            bytes: align_size(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchLayout {
    pub boundary_counts: ScratchRegion,
    pub carry_outs: ScratchRegion,
    pub leading_aggregates: ScratchRegion,
    pub total_bytes: usize,
}

/// Typed views over a bound scratch buffer.
pub(crate) struct Scratch<'a, V> {
    /// Boundary counts, scanned in place into block offsets.
    pub offsets: DeviceSlice<'a, u32>,
    pub carry_outs: DeviceSlice<'a, CarryOut<V>>,
    pub leading: DeviceSlice<'a, V>,
}

impl ScratchLayout {
    pub fn new<V>(plan: &BatchPlan) -> Result<Self, ReduceByKeyError> {
        let align = align_of::<CarryOut<V>>();
        if align > BUFFER_ALIGNMENT {
            return Err(ReduceByKeyError::UnsupportedAlignment { align });
        }

        let batches = plan.batches as usize;
        let boundary_counts = ScratchRegion::after(None, plan.blocks as usize * size_of::<u32>());
        let carry_outs = ScratchRegion::after(Some(&boundary_counts), batches * size_of::<CarryOut<V>>());
        let leading_aggregates = ScratchRegion::after(Some(&carry_outs), batches * size_of::<V>());
        let total_bytes = leading_aggregates.offset + leading_aggregates.bytes;

        Ok(Self {
            boundary_counts,
            carry_outs,
            leading_aggregates,
            total_bytes,
        })
    }

    /// Carve typed views out of `storage`.
    ///
    /// `storage` must hold at least `total_bytes`; callers check this first.
    pub(crate) fn bind<'a, V: Copy>(&self, plan: &BatchPlan, storage: &'a mut DeviceBuffer) -> Scratch<'a, V> {
        debug_assert!(storage.len() >= self.total_bytes);
        let base = storage.as_mut_ptr();
        // SAFETY: the three regions are disjoint, lie inside `storage`, and
        // start on 256-byte boundaries of a 256-byte aligned allocation.
        unsafe {
            Scratch {
                offsets: DeviceSlice::from_raw_parts(
                    base.add(self.boundary_counts.offset).cast::<u32>(),
                    plan.blocks as usize,
                ),
                carry_outs: DeviceSlice::from_raw_parts(
                    base.add(self.carry_outs.offset).cast::<CarryOut<V>>(),
                    plan.batches as usize,
                ),
                leading: DeviceSlice::from_raw_parts(
                    base.add(self.leading_aggregates.offset).cast::<V>(),
                    plan.batches as usize,
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ReduceByKeyConfig {
        // 8 items per block, at most 4 batches.
        ReduceByKeyConfig::default().with_reduce(4, 2).with_scan(2, 2)
    }

    #[test]
    fn test_plan_defaults_single_block() {
        let plan = BatchPlan::new(8, &ReduceByKeyConfig::default()).unwrap();
        assert_eq!(plan.blocks, 1);
        assert_eq!(plan.blocks_per_full_batch, 1);
        assert_eq!(plan.full_batches, 1);
        assert_eq!(plan.batches, 1);
        assert_eq!(plan.block_items(0), 0..8);
    }

    #[test]
    fn test_plan_defaults_large() {
        // 10M items -> 5581 blocks -> 4 blocks per full batch.
        let plan = BatchPlan::new(10_000_000, &ReduceByKeyConfig::default()).unwrap();
        assert_eq!(plan.blocks, 5581);
        assert_eq!(plan.blocks_per_full_batch, 4);
        assert_eq!(plan.full_batches, 5581 % 1792);
        assert_eq!(plan.batches, 1792);
    }

    #[test]
    fn test_plan_empty() {
        let plan = BatchPlan::new(0, &ReduceByKeyConfig::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.blocks, 0);
        assert_eq!(plan.batches, 0);
    }

    #[test]
    fn test_plan_too_large() {
        let err = BatchPlan::new(u32::MAX as usize + 1, &ReduceByKeyConfig::default()).unwrap_err();
        assert!(matches!(err, ReduceByKeyError::InputTooLarge { .. }));
    }

    #[test]
    fn test_batches_cover_every_block_once() {
        let config = small_config();
        for size in 1..=200usize {
            let plan = BatchPlan::new(size, &config).unwrap();
            assert!(plan.batches <= config.scan_items_per_block());
            assert!(plan.batches <= plan.blocks);
            let mut next = 0;
            for batch in 0..plan.batches {
                let blocks = plan.batch_blocks(batch);
                assert_eq!(blocks.start, next, "size={size} batch={batch} not contiguous");
                assert!(!blocks.is_empty(), "size={size} batch={batch} empty");
                next = blocks.end;
            }
            assert_eq!(next, plan.blocks, "size={size} blocks not covered");
            assert_eq!(plan.batch_items(plan.batches - 1).end, size);
        }
    }

    #[test]
    fn test_uneven_batches() {
        // 80 items / 8 = 10 blocks over 4 batches: 3, 3, 2, 2.
        let plan = BatchPlan::new(80, &small_config()).unwrap();
        assert_eq!(plan.blocks, 10);
        assert_eq!(plan.blocks_per_full_batch, 3);
        assert_eq!(plan.full_batches, 2);
        assert_eq!(plan.batches, 4);
        let sizes: Vec<u32> = (0..4).map(|b| plan.batch_blocks(b).len() as u32).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        assert_eq!(plan.batch_blocks(3), 8..10);
        assert_eq!(plan.batch_items(2), 48..64);
    }

    #[test]
    fn test_partial_last_block() {
        let plan = BatchPlan::new(13, &small_config()).unwrap();
        assert_eq!(plan.blocks, 2);
        assert_eq!(plan.block_items(1), 8..13);
    }

    #[test]
    fn test_scratch_layout_regions_aligned() {
        let plan = BatchPlan::new(10_000_000, &ReduceByKeyConfig::default()).unwrap();
        let layout = ScratchLayout::new::<f64>(&plan).unwrap();
        assert_eq!(layout.boundary_counts.offset, 0);
        assert_eq!(layout.boundary_counts.bytes, align_size(5581 * 4));
        assert_eq!(layout.carry_outs.offset % BUFFER_ALIGNMENT, 0);
        assert_eq!(layout.leading_aggregates.offset % BUFFER_ALIGNMENT, 0);
        assert_eq!(
            layout.carry_outs.bytes,
            align_size(1792 * size_of::<CarryOut<f64>>())
        );
        assert_eq!(layout.leading_aggregates.bytes, align_size(1792 * 8));
        assert_eq!(
            layout.total_bytes,
            layout.leading_aggregates.offset + layout.leading_aggregates.bytes
        );
    }

    #[test]
    fn test_scratch_layout_empty() {
        let plan = BatchPlan::new(0, &ReduceByKeyConfig::default()).unwrap();
        let layout = ScratchLayout::new::<u32>(&plan).unwrap();
        assert_eq!(layout.total_bytes, 0);
    }

    #[test]
    fn test_scratch_layout_rejects_overaligned() {
        #[derive(Clone, Copy)]
        #[repr(align(512))]
        struct Wide(u8);

        let plan = BatchPlan::new(10, &ReduceByKeyConfig::default()).unwrap();
        let err = ScratchLayout::new::<Wide>(&plan).unwrap_err();
        assert!(matches!(err, ReduceByKeyError::UnsupportedAlignment { align: 512 }));
    }

    #[test]
    fn test_bind_views_match_plan() {
        let plan = BatchPlan::new(80, &small_config()).unwrap();
        let layout = ScratchLayout::new::<u64>(&plan).unwrap();
        let mut storage = DeviceBuffer::alloc(layout.total_bytes).unwrap();
        let scratch = layout.bind::<u64>(&plan, &mut storage);
        assert_eq!(scratch.offsets.len(), 10);
        assert_eq!(scratch.carry_outs.len(), 4);
        assert_eq!(scratch.leading.len(), 4);
        unsafe {
            scratch.leading.write(3, 42);
            assert_eq!(scratch.leading.read(3), 42);
        }
    }
}
