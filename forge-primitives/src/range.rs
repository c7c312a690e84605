//! Input and output range capabilities for kernels.
//!
//! Kernels never see concrete containers. They read through [`InputRange`]
//! (random-access `get`) and write through [`OutputRange`] (random-access
//! `put` on disjoint indices), so a slice, a constant, a counting sequence or
//! a discarding sink can all feed the same kernel.

use std::marker::PhantomData;

use crate::slice::DeviceSlice;

/// Random-access readable range shared by every threadgroup of a launch.
pub trait InputRange<T>: Sync {
    fn len(&self) -> usize;

    /// Element at `index`. Panics if `index >= len()`.
    fn get(&self, index: usize) -> T;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Random-access writable range shared by every threadgroup of a launch.
pub trait OutputRange<T>: Sync {
    fn len(&self) -> usize;

    /// Store `value` at `index`.
    ///
    /// # Safety
    /// `index < len()`, and no other threadgroup writes `index` during the
    /// same dispatch.
    unsafe fn put(&self, index: usize, value: T);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy + Sync> InputRange<T> for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self[index]
    }
}

impl<T: Copy + Sync> InputRange<T> for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self[index]
    }
}

impl<T, R: InputRange<T> + ?Sized> InputRange<T> for &R {
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        (**self).get(index)
    }
}

/// `len` copies of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantInput<T> {
    value: T,
    len: usize,
}

impl<T: Copy> ConstantInput<T> {
    pub fn new(value: T, len: usize) -> Self {
        Self { value, len }
    }

    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: Copy + Sync> InputRange<T> for ConstantInput<T> {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        assert!(index < self.len, "index {index} out of range for constant input of {}", self.len);
        self.value
    }
}

/// `start, start + 1, ...` for `len` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingInput<T> {
    start: T,
    len: usize,
}

impl<T: Copy> CountingInput<T> {
    pub fn new(start: T, len: usize) -> Self {
        Self { start, len }
    }
}

macro_rules! counting_input {
    ($($t:ty),*) => {$(
        impl InputRange<$t> for CountingInput<$t> {
            fn len(&self) -> usize {
                self.len
            }

            #[inline]
            fn get(&self, index: usize) -> $t {
                assert!(index < self.len, "index {index} out of range for counting input of {}", self.len);
                self.start.wrapping_add(index as $t)
            }
        }
    )*};
}

counting_input!(u32, u64, usize, i32, i64);

/// Applies `op` to every element of an inner range as it is read.
pub struct TransformInput<R, F, T> {
    inner: R,
    op: F,
    _marker: PhantomData<fn(T)>,
}

impl<R, F, T> TransformInput<R, F, T> {
    pub fn new(inner: R, op: F) -> Self {
        Self {
            inner,
            op,
            _marker: PhantomData,
        }
    }
}

impl<T, U, R, F> InputRange<U> for TransformInput<R, F, T>
where
    R: InputRange<T>,
    F: Fn(T) -> U + Sync,
{
    fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    fn get(&self, index: usize) -> U {
        (self.op)(self.inner.get(index))
    }
}

/// Writes into a caller-owned mutable slice.
pub struct SliceOutput<'a, T> {
    slots: DeviceSlice<'a, T>,
}

impl<'a, T: Copy> SliceOutput<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            slots: DeviceSlice::new(slice),
        }
    }
}

impl<T: Copy + Send + Sync> OutputRange<T> for SliceOutput<'_, T> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    unsafe fn put(&self, index: usize, value: T) {
        self.slots.write(index, value);
    }
}

/// Accepts and drops every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardOutput;

impl<T> OutputRange<T> for DiscardOutput {
    fn len(&self) -> usize {
        usize::MAX
    }

    #[inline]
    unsafe fn put(&self, _index: usize, _value: T) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_range<R: InputRange<u64> + ?Sized>(range: &R) -> u64 {
        (0..range.len()).map(|i| range.get(i)).sum()
    }

    #[test]
    fn test_slice_and_vec_inputs() {
        let v = vec![1u64, 2, 3, 4];
        assert_eq!(sum_range(&v), 10);
        assert_eq!(sum_range(v.as_slice()), 10);
        assert_eq!(sum_range(&&v[1..]), 9);
    }

    #[test]
    fn test_constant_input() {
        let c = ConstantInput::new(7u64, 5);
        assert_eq!(c.len(), 5);
        assert_eq!(c.get(4), 7);
        assert_eq!(sum_range(&c), 35);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_constant_input_bounds() {
        ConstantInput::new(1u32, 3).get(3);
    }

    #[test]
    fn test_counting_input() {
        let c = CountingInput::new(10u64, 4);
        assert_eq!((0..4).map(|i| c.get(i)).collect::<Vec<_>>(), vec![10, 11, 12, 13]);
        let neg = CountingInput::new(-2i32, 3);
        assert_eq!(neg.get(0), -2);
        assert_eq!(neg.get(2), 0);
    }

    #[test]
    fn test_transform_input() {
        let base = CountingInput::new(0u32, 4);
        let squared = TransformInput::<_, _, u32>::new(base, |x: u32| u64::from(x) * u64::from(x));
        assert_eq!(sum_range(&squared), 14);
    }

    #[test]
    fn test_slice_output() {
        let mut out = vec![0i32; 3];
        {
            let sink = SliceOutput::new(&mut out);
            assert_eq!(OutputRange::<i32>::len(&sink), 3);
            unsafe {
                sink.put(0, 5);
                sink.put(2, -1);
            }
        }
        assert_eq!(out, vec![5, 0, -1]);
    }

    #[test]
    fn test_discard_output() {
        let sink = DiscardOutput;
        unsafe { sink.put(123_456, 1.5f32) };
        assert_eq!(OutputRange::<f32>::len(&sink), usize::MAX);
    }
}
