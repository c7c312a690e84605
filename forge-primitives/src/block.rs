//! Block-level building blocks shared by the device kernels.
//!
//! A threadgroup works on one tile at a time: it loads `block_size *
//! items_per_thread` consecutive items into group-local storage, derives
//! per-item flags, and scans or reduces them. The last tile of an input is
//! usually partial; these helpers only ever touch the valid prefix, so no
//! padding value is needed and nothing past the end of the input is read.

use crate::range::InputRange;

/// Load `input[offset..offset + valid]` into `tile`, replacing its contents.
///
/// `tile` is group-local scratch reused across the tiles a group processes.
pub fn load_tile<T, R>(input: &R, offset: usize, valid: usize, tile: &mut Vec<T>)
where
    R: InputRange<T> + ?Sized,
{
    tile.clear();
    tile.extend((offset..offset + valid).map(|i| input.get(i)));
}

/// Mark the first item of every run of `key_eq`-equivalent keys in `tile`.
///
/// `predecessor` is the key immediately before the tile in the input, if
/// any. Without one the tile's first item is always a head. `key_eq` is only
/// ever called on adjacent pairs `(tile[i - 1], tile[i])`.
pub fn flag_heads<K, E>(tile: &[K], predecessor: Option<&K>, key_eq: &E, flags: &mut Vec<bool>)
where
    E: Fn(&K, &K) -> bool,
{
    flags.clear();
    let Some(first) = tile.first() else {
        return;
    };
    flags.push(predecessor.map_or(true, |prev| !key_eq(prev, first)));
    flags.extend(tile.windows(2).map(|pair| !key_eq(&pair[0], &pair[1])));
}

/// Exclusive prefix sum of `items` in place, seeded with `init`.
///
/// Returns `init` plus the sum of all items, the seed for the next tile.
pub fn exclusive_scan(items: &mut [u32], init: u32) -> u32 {
    let mut running = init;
    for item in items.iter_mut() {
        let count = *item;
        *item = running;
        running += count;
    }
    running
}
