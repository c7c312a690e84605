//! Shared typed views over device memory.
//!
//! A kernel body receives `&DeviceSlice<T>` and every threadgroup writes its
//! own indices concurrently. Nothing tracks which group owns which index, so
//! reads and writes are `unsafe`: callers guarantee that no index is written
//! by two groups in the same dispatch and that an index is only read after
//! the dispatch that wrote it has retired. Indices are bounds checked; an
//! out-of-range access panics, which a dispatch reports as a kernel fault.

use std::marker::PhantomData;

pub struct DeviceSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: access is raw-pointer based and governed by the disjoint-write
// contract documented above.
unsafe impl<T: Send> Send for DeviceSlice<'_, T> {}
unsafe impl<T: Send + Sync> Sync for DeviceSlice<'_, T> {}

impl<'a, T: Copy> DeviceSlice<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// View `len` elements starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be aligned for `T` and valid for reads and writes of `len`
    /// elements for the lifetime `'a`, with no other live references to it.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Self {
        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// No other threadgroup accesses `index` during the current dispatch.
    ///
    /// # Panics
    /// If `index >= len`.
    #[inline]
    pub unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "write at {index} past len {}", self.len);
        self.ptr.add(index).write(value);
    }

    /// # Safety
    /// The slot was initialised by an earlier write, and no threadgroup
    /// writes it during the current dispatch.
    ///
    /// # Panics
    /// If `index >= len`.
    #[inline]
    pub unsafe fn read(&self, index: usize) -> T {
        assert!(index < self.len, "read at {index} past len {}", self.len);
        self.ptr.add(index).read()
    }
}
