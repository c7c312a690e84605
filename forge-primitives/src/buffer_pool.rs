//! Recycling pool of aligned [`DeviceBuffer`]s with peak tracking.
//!
//! Repeated invocations of a device algorithm with the same input size ask
//! for the same scratch size; the pool hands the previous buffer back instead
//! of allocating again.

use crate::buffer::{align_size, AllocError, DeviceBuffer};

pub struct BufferPool {
    /// Buffers available for reuse, keyed by aligned size.
    free: Vec<(usize, DeviceBuffer)>,
    allocated_bytes: usize,
    peak_bytes: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            allocated_bytes: 0,
            peak_bytes: 0,
        }
    }

    /// Allocate (or recycle) a buffer of at least `size` bytes.
    ///
    /// Recycled buffers are zeroed before they are returned.
    pub fn alloc(&mut self, size: usize) -> Result<DeviceBuffer, AllocError> {
        let aligned = align_size(size);

        if let Some(pos) = self.free.iter().position(|(s, _)| *s == aligned) {
            let (_, mut buffer) = self.free.swap_remove(pos);
            buffer.clear();
            return Ok(buffer);
        }

        let buffer = DeviceBuffer::alloc(aligned)?;
        self.allocated_bytes += aligned;
        self.peak_bytes = self.peak_bytes.max(self.allocated_bytes);
        Ok(buffer)
    }

    /// Return a buffer for later reuse.
    pub fn recycle(&mut self, buffer: DeviceBuffer) {
        self.free.push((buffer.len(), buffer));
    }

    /// Drop every pooled buffer.
    pub fn release(&mut self) {
        let freed: usize = self.free.drain(..).map(|(size, _)| size).sum();
        self.allocated_bytes -= freed;
    }

    /// Bytes currently owned through this pool (in use or pooled).
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    pub fn available_count(&self) -> usize {
        self.free.len()
    }
}
