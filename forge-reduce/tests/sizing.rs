mod common;

use common::{ctx, small_config};
use forge_primitives::{BufferPool, DeviceBuffer, DiscardOutput, SliceOutput, BUFFER_ALIGNMENT};
use forge_reduce::{ReduceByKey, ReduceByKeyConfig, ReduceByKeyError};

fn sizing_call(launcher: &ReduceByKey<'_>, keys: &[u32], bytes: &mut usize) {
    launcher
        .run(
            None,
            bytes,
            keys,
            keys,
            keys.len(),
            &DiscardOutput,
            &DiscardOutput,
            &DiscardOutput,
            |a: u32, b: u32| a + b,
            |a: &u32, b: &u32| a == b,
            &ctx(),
        )
        .unwrap();
}

#[test]
fn test_sizing_is_idempotent() {
    let keys = vec![3u32; 100_000];
    let launcher = ReduceByKey::default();
    let mut first = 0;
    sizing_call(&launcher, &keys, &mut first);
    for _ in 0..5 {
        let mut again = 0;
        sizing_call(&launcher, &keys, &mut again);
        assert_eq!(again, first);
    }
    assert_eq!(first, launcher.scratch_bytes::<u32>(keys.len()).unwrap());
}

#[test]
fn test_sizing_ignores_key_contents() {
    let launcher = ReduceByKey::default();
    let same = vec![1u32; 50_000];
    let distinct: Vec<u32> = (0..50_000).collect();
    let (mut a, mut b) = (0, 0);
    sizing_call(&launcher, &same, &mut a);
    sizing_call(&launcher, &distinct, &mut b);
    assert_eq!(a, b);
}

#[test]
fn test_scratch_is_aligned_and_grows_with_size() {
    let launcher = ReduceByKey::new(small_config());
    let mut previous = 0;
    for n in [1usize, 8, 9, 80, 1_000, 100_000] {
        let bytes = launcher.scratch_bytes::<u64>(n).unwrap();
        assert_eq!(bytes % BUFFER_ALIGNMENT, 0, "n={n}");
        assert!(bytes >= previous, "scratch shrank at n={n}");
        previous = bytes;
    }
    assert_eq!(launcher.scratch_bytes::<u64>(0).unwrap(), 0);
}

#[test]
fn test_wider_values_need_more_scratch() {
    let launcher = ReduceByKey::default();
    let n = 10_000_000;
    let narrow = launcher.scratch_bytes::<u8>(n).unwrap();
    let wide = launcher.scratch_bytes::<[u64; 8]>(n).unwrap();
    assert!(wide > narrow);
}

#[test]
fn test_oversized_scratch_accepted() {
    let keys: Vec<u32> = (0..5_000).map(|i| i / 4).collect();
    let launcher = ReduceByKey::default();
    let mut bytes = 0;
    sizing_call(&launcher, &keys, &mut bytes);

    let mut storage = DeviceBuffer::alloc(bytes * 3 + 256).unwrap();
    let mut unique = vec![0u32; keys.len()];
    let mut aggregates = vec![0u32; keys.len()];
    let mut count = [0usize];
    launcher
        .run(
            Some(&mut storage),
            &mut bytes,
            &keys,
            &keys,
            keys.len(),
            &SliceOutput::new(&mut unique),
            &SliceOutput::new(&mut aggregates),
            &SliceOutput::new(&mut count),
            |a: u32, b: u32| a + b,
            |a: &u32, b: &u32| a == b,
            &ctx(),
        )
        .unwrap();
    assert_eq!(count[0], 1_250);
    assert_eq!(aggregates[7], 7 * 4);
}

#[test]
fn test_undersized_scratch_rejected() {
    let keys = vec![0u32; 5_000];
    let launcher = ReduceByKey::default();
    let required = launcher.scratch_bytes::<u32>(keys.len()).unwrap();
    let mut storage = DeviceBuffer::alloc(required / 2).unwrap();
    let mut bytes = required;
    let mut count = [usize::MAX];
    let err = launcher
        .run(
            Some(&mut storage),
            &mut bytes,
            &keys,
            &keys,
            keys.len(),
            &DiscardOutput,
            &DiscardOutput,
            &SliceOutput::new(&mut count),
            |a: u32, b: u32| a + b,
            |a: &u32, b: &u32| a == b,
            &ctx(),
        )
        .unwrap_err();
    assert!(matches!(err, ReduceByKeyError::ScratchTooSmall { .. }));
    assert_eq!(count[0], usize::MAX, "nothing written on a rejected call");
}

#[test]
fn test_invalid_config_rejected_at_sizing() {
    let launcher = ReduceByKey::new(ReduceByKeyConfig::default().with_reduce(0, 7));
    let err = launcher.scratch_bytes::<u32>(10).unwrap_err();
    assert!(matches!(err, ReduceByKeyError::Config(_)));

    let launcher = ReduceByKey::new(ReduceByKeyConfig::default().with_scan(4096, 1));
    assert!(matches!(launcher.scratch_bytes::<u32>(10), Err(ReduceByKeyError::Config(_))));
}

#[test]
fn test_pooled_scratch_reuse() {
    // One pooled buffer serves several calls of the same size; the pool hands
    // it back zeroed, and results do not depend on previous contents.
    let launcher = ReduceByKey::new(small_config());
    let c = ctx();
    let mut pool = BufferPool::new();
    let n = 777;
    let bytes = launcher.scratch_bytes::<u64>(n).unwrap();

    let mut results = Vec::new();
    for round in 0..3u32 {
        let keys: Vec<u32> = (0..n as u32).map(|i| i / (round + 2)).collect();
        let values = vec![1u64; n];
        let mut storage = pool.alloc(bytes).unwrap();
        let mut unique = vec![0u32; n];
        let mut aggregates = vec![0u64; n];
        let mut count = [0usize];
        let mut reported = bytes;
        launcher
            .run(
                Some(&mut storage),
                &mut reported,
                &keys,
                &values,
                n,
                &SliceOutput::new(&mut unique),
                &SliceOutput::new(&mut aggregates),
                &SliceOutput::new(&mut count),
                |a: u64, b: u64| a + b,
                |a: &u32, b: &u32| a == b,
                &c,
            )
            .unwrap();
        pool.recycle(storage);
        aggregates.truncate(count[0]);
        results.push(aggregates);
    }

    assert_eq!(pool.available_count(), 1);
    assert!(results[0][..results[0].len() - 1].iter().all(|&a| a == 2));
    assert!(results[1][..results[1].len() - 1].iter().all(|&a| a == 3));
    assert!(results[2][..results[2].len() - 1].iter().all(|&a| a == 4));
}
