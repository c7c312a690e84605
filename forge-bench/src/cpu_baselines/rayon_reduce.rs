//! Rayon-based parallel CPU baselines.
//!
//! Reduce-by-key splits the input into one chunk per task, reduces each
//! chunk sequentially, then stitches chunk edges: a chunk whose first key
//! continues its predecessor's last run folds its first aggregate into it.

use rayon::prelude::*;

use super::sequential::sequential_reduce_by_key;

struct Chunk<K, V> {
    unique: Vec<K>,
    aggregates: Vec<V>,
    first_key: K,
    last_key: K,
}

/// Parallel reduce-by-key over `chunks` contiguous slices.
pub fn par_reduce_by_key<K, V, R, E>(
    keys: &[K],
    values: &[V],
    chunks: usize,
    reduce_op: R,
    key_eq: E,
) -> (Vec<K>, Vec<V>)
where
    K: Copy + Send + Sync,
    V: Copy + Send + Sync,
    R: Fn(V, V) -> V + Sync,
    E: Fn(&K, &K) -> bool + Sync,
{
    let n = keys.len().min(values.len());
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let chunk_len = n.div_ceil(chunks.max(1));

    let parts: Vec<Chunk<K, V>> = keys[..n]
        .par_chunks(chunk_len)
        .zip(values[..n].par_chunks(chunk_len))
        .map(|(k, v)| {
            let (unique, aggregates) = sequential_reduce_by_key(k, v, &reduce_op, &key_eq);
            Chunk {
                unique,
                aggregates,
                first_key: k[0],
                last_key: k[k.len() - 1],
            }
        })
        .collect();

    let mut unique = Vec::with_capacity(parts.iter().map(|p| p.unique.len()).sum());
    let mut aggregates: Vec<V> = Vec::with_capacity(unique.capacity());
    let mut prev_last: Option<K> = None;
    for part in parts {
        let mut skip = 0;
        if let (Some(prev), Some(last)) = (prev_last, aggregates.last_mut()) {
            if key_eq(&prev, &part.first_key) {
                *last = reduce_op(*last, part.aggregates[0]);
                skip = 1;
            }
        }
        unique.extend_from_slice(&part.unique[skip..]);
        aggregates.extend_from_slice(&part.aggregates[skip..]);
        prev_last = Some(part.last_key);
    }
    (unique, aggregates)
}

/// Parallel `output[i] = op(value)`.
pub fn par_fill_with<T, U>(output: &mut [U], value: T, op: impl Fn(T) -> U + Sync)
where
    T: Copy + Sync,
    U: Send,
{
    output.par_iter_mut().for_each(|o| *o = op(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_sequential_across_chunk_counts() {
        let keys: Vec<u32> = (0..10_000u32).map(|i| i / 37).collect();
        let values: Vec<u64> = (0..10_000u64).collect();
        let expected = sequential_reduce_by_key(&keys, &values, |a, b| a + b, |a, b| a == b);
        for chunks in [1, 2, 3, 16, 271, 10_000, 20_000] {
            let actual = par_reduce_by_key(&keys, &values, chunks, |a, b| a + b, |a, b| a == b);
            assert_eq!(actual, expected, "chunks={chunks}");
        }
    }

    #[test]
    fn test_single_run_over_every_chunk() {
        let keys = vec![4u8; 1_000];
        let (u, a) = par_reduce_by_key(&keys, &vec![1u32; 1_000], 7, |a, b| a + b, |a, b| a == b);
        assert_eq!(u, vec![4]);
        assert_eq!(a, vec![1_000]);
    }

    #[test]
    fn test_empty() {
        let (u, a) = par_reduce_by_key::<u32, u32, _, _>(&[], &[], 4, |a, b| a + b, |a, b| a == b);
        assert!(u.is_empty() && a.is_empty());
    }

    #[test]
    fn test_fill_with() {
        let mut out = vec![0u64; 1_000];
        par_fill_with(&mut out, 21u32, |x| u64::from(x) * 2);
        assert!(out.iter().all(|&v| v == 42));
    }
}
