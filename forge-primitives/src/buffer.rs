//! Aligned device buffers for kernel scratch memory.
//!
//! Every allocation starts on a [`BUFFER_ALIGNMENT`] boundary and is zero
//! filled, mirroring a shared-storage device buffer. Regions carved out of a
//! buffer at offsets produced by [`align_size`] are therefore suitably aligned
//! for any element type with alignment up to 256 bytes.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every buffer and of every scratch sub-region.
pub const BUFFER_ALIGNMENT: usize = 256;

/// Only its alignment is used: empty buffers point at its dangling address.
#[allow(dead_code)]
#[repr(align(256))]
struct AlignedBlock;

const _: () = assert!(std::mem::align_of::<AlignedBlock>() == BUFFER_ALIGNMENT);

/// Round `size` up to the next multiple of [`BUFFER_ALIGNMENT`].
pub fn align_size(size: usize) -> usize {
    (size + BUFFER_ALIGNMENT - 1) & !(BUFFER_ALIGNMENT - 1)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("buffer of {bytes} bytes exceeds the addressable size")]
    SizeOverflow { bytes: usize },
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },
}

/// Owned, zero-initialised, 256-byte aligned byte buffer.
pub struct DeviceBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: DeviceBuffer uniquely owns its allocation; shared access only hands
// out `&[u8]`.
unsafe impl Send for DeviceBuffer {}
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    /// Allocate `len` zeroed bytes. A zero-length buffer does not allocate.
    pub fn alloc(len: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Ok(Self {
                ptr: Self::dangling(),
                len: 0,
            });
        }
        let layout = Self::layout(len)?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory { bytes: len })?;
        Ok(Self { ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialised bytes (or dangling with len 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Zero the whole buffer.
    pub fn clear(&mut self) {
        self.as_mut_slice().fill(0);
    }

    fn layout(len: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(len, BUFFER_ALIGNMENT)
            .map_err(|_| AllocError::SizeOverflow { bytes: len })
    }

    fn dangling() -> NonNull<u8> {
        NonNull::<AlignedBlock>::dangling().cast()
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Ok(layout) = Self::layout(self.len) {
            // SAFETY: allocated in `alloc` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer").field("len", &self.len).finish()
    }
}
