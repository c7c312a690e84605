//! Sequential reduce-by-key: one pass, no scratch.

/// Reduce every run of `key_eq`-equivalent adjacent keys with `reduce_op`.
/// Each run reports its first key.
pub fn sequential_reduce_by_key<K, V>(
    keys: &[K],
    values: &[V],
    reduce_op: impl Fn(V, V) -> V,
    key_eq: impl Fn(&K, &K) -> bool,
) -> (Vec<K>, Vec<V>)
where
    K: Copy,
    V: Copy,
{
    let mut unique = Vec::new();
    let mut aggregates = Vec::new();
    let mut pairs = keys.iter().zip(values);
    let Some((&first_key, &first_value)) = pairs.next() else {
        return (unique, aggregates);
    };

    let mut run_key = first_key;
    let mut prev_key = first_key;
    let mut acc = first_value;
    for (&key, &value) in pairs {
        if key_eq(&prev_key, &key) {
            acc = reduce_op(acc, value);
        } else {
            unique.push(run_key);
            aggregates.push(acc);
            run_key = key;
            acc = value;
        }
        prev_key = key;
    }
    unique.push(run_key);
    aggregates.push(acc);
    (unique, aggregates)
}
