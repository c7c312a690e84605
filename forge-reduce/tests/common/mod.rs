#![allow(dead_code)]

use forge_primitives::{ComputeContext, DeviceBuffer, SliceOutput};
use forge_reduce::{ReduceByKey, ReduceByKeyConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

pub fn ctx() -> ComputeContext {
    ComputeContext::with_threads(4).unwrap()
}

/// 8 items per block and at most 4 batches, so small inputs already have
/// multi-block batches and batch boundaries.
pub fn small_config() -> ReduceByKeyConfig {
    ReduceByKeyConfig::default().with_reduce(4, 2).with_scan(2, 2)
}

/// Sequential reduce-by-key: the expected output for every device run.
pub fn reference_reduce_by_key<K: Copy, V: Copy>(
    keys: &[K],
    values: &[V],
    reduce_op: impl Fn(V, V) -> V,
    key_eq: impl Fn(&K, &K) -> bool,
) -> (Vec<K>, Vec<V>) {
    let mut unique = Vec::new();
    let mut aggregates: Vec<V> = Vec::new();
    for (i, (&k, &v)) in keys.iter().zip(values).enumerate() {
        if i > 0 && key_eq(&keys[i - 1], &k) {
            let last = aggregates.len() - 1;
            aggregates[last] = reduce_op(aggregates[last], v);
        } else {
            unique.push(k);
            aggregates.push(v);
        }
    }
    (unique, aggregates)
}

/// Keys made of runs with lengths drawn from `1..=max_run`, each run taking a
/// fresh key different from the previous one.
pub fn random_runs(rng: &mut ChaCha8Rng, n: usize, max_run: usize) -> Vec<u32> {
    let mut keys = Vec::with_capacity(n);
    let mut key = 0u32;
    while keys.len() < n {
        let len = rng.gen_range(1..=max_run).min(n - keys.len());
        keys.extend(std::iter::repeat(key).take(len));
        key += rng.gen_range(1..4);
    }
    keys
}

/// Run the two-call protocol with outputs sized to the input, checking that
/// slots past the run count are left untouched.
pub fn device_reduce<K, V>(
    launcher: &ReduceByKey<'_>,
    keys: &[K],
    values: &[V],
    sentinel: (K, V),
    reduce_op: impl Fn(V, V) -> V + Sync,
    key_eq: impl Fn(&K, &K) -> bool + Sync,
) -> (Vec<K>, Vec<V>)
where
    K: Copy + Send + Sync + PartialEq + std::fmt::Debug,
    V: Copy + Send + Sync + PartialEq + std::fmt::Debug,
{
    let c = ctx();
    let n = keys.len();
    let mut bytes = 0;
    let mut unique = vec![sentinel.0; n];
    let mut aggregates = vec![sentinel.1; n];
    let mut count = [usize::MAX];

    launcher
        .run(
            None,
            &mut bytes,
            keys,
            values,
            n,
            &SliceOutput::new(&mut unique),
            &SliceOutput::new(&mut aggregates),
            &SliceOutput::new(&mut count),
            &reduce_op,
            &key_eq,
            &c,
        )
        .unwrap();
    assert_eq!(count[0], usize::MAX, "sizing call must not write outputs");

    let mut storage = DeviceBuffer::alloc(bytes).unwrap();
    launcher
        .run(
            Some(&mut storage),
            &mut bytes,
            keys,
            values,
            n,
            &SliceOutput::new(&mut unique),
            &SliceOutput::new(&mut aggregates),
            &SliceOutput::new(&mut count),
            &reduce_op,
            &key_eq,
            &c,
        )
        .unwrap();

    let runs = count[0];
    assert!(runs <= n, "run count {runs} exceeds input length {n}");
    assert!(
        unique[runs..].iter().all(|k| *k == sentinel.0),
        "unique keys written past run count"
    );
    assert!(
        aggregates[runs..].iter().all(|v| *v == sentinel.1),
        "aggregates written past run count"
    );
    unique.truncate(runs);
    aggregates.truncate(runs);
    (unique, aggregates)
}

/// Device result for u32 keys summed as u64 must match the reference.
pub fn check_sum(config: ReduceByKeyConfig, keys: &[u32]) {
    let values: Vec<u64> = (0..keys.len() as u64).map(|i| i % 13 + 1).collect();
    let launcher = ReduceByKey::new(config);
    let actual = device_reduce(
        &launcher,
        keys,
        &values,
        (u32::MAX, u64::MAX),
        |a, b| a + b,
        |a, b| a == b,
    );
    let expected = reference_reduce_by_key(keys, &values, |a, b| a + b, |a, b| a == b);
    assert_eq!(actual.0.len(), expected.0.len(), "run count mismatch at n={}", keys.len());
    assert_eq!(actual.0, expected.0, "unique keys mismatch at n={}", keys.len());
    assert_eq!(
        actual.1,
        expected.1,
        "aggregates mismatch at n={}. First diff at run {}",
        keys.len(),
        actual.1.iter().zip(&expected.1).position(|(a, b)| a != b).unwrap_or(actual.1.len())
    );
}
