//! Grow-only payload buffer for the demultiplexer.
//!
//! Frames are often small but occasionally large. The buffer starts at
//! [`BASE_BUF_SIZE`] bytes and grows to exactly the length of any frame
//! that does not fit. It never shrinks, so a burst of large frames costs
//! one allocation instead of one per frame.
//!
//! # Example
//!
//! ```
//! use docker_attach::protocol::{FrameBuffer, BASE_BUF_SIZE};
//!
//! let mut buffer = FrameBuffer::new();
//! assert_eq!(buffer.capacity(), BASE_BUF_SIZE);
//!
//! buffer.payload_mut(4096);
//! buffer.payload_mut(10);
//! assert_eq!(buffer.capacity(), 4096);
//! ```

use bytes::BytesMut;

/// Initial buffer size in bytes.
pub const BASE_BUF_SIZE: usize = 2048;

/// Capacity-tracked byte buffer reused across frames.
///
/// Owned by the reader task only.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Backing storage; its length is the tracked capacity.
    buf: BytesMut,
}

impl FrameBuffer {
    /// Create a new buffer of [`BASE_BUF_SIZE`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(BASE_BUF_SIZE)
    }

    /// Create a new buffer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::zeroed(capacity),
        }
    }

    /// Current capacity. Monotonically non-decreasing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow exactly `len` bytes for the next payload, growing first if needed.
    pub fn payload_mut(&mut self, len: usize) -> &mut [u8] {
        if len > self.buf.len() {
            tracing::trace!(from = self.buf.len(), to = len, "growing frame buffer");
            self.buf.resize(len, 0);
        }
        &mut self.buf[..len]
    }

    /// Borrow the first `len` bytes as filled by the last read.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the current capacity.
    #[inline]
    pub fn payload(&self, len: usize) -> &[u8] {
        &self.buf[..len]
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity() {
        let buffer = FrameBuffer::new();
        assert_eq!(buffer.capacity(), BASE_BUF_SIZE);
    }

    #[test]
    fn test_small_frame_does_not_grow() {
        let mut buffer = FrameBuffer::new();
        assert_eq!(buffer.payload_mut(5).len(), 5);
        assert_eq!(buffer.capacity(), BASE_BUF_SIZE);
    }

    #[test]
    fn test_grows_to_exact_length() {
        let mut buffer = FrameBuffer::new();
        let len = BASE_BUF_SIZE + 123;
        assert_eq!(buffer.payload_mut(len).len(), len);
        assert_eq!(buffer.capacity(), len);
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut buffer = FrameBuffer::with_capacity(16);
        let mut high_water = buffer.capacity();

        for len in [8, 100, 3, 4096, 0, 50, 5000, 1] {
            buffer.payload_mut(len);
            high_water = high_water.max(len);
            assert_eq!(buffer.capacity(), high_water);
            assert!(buffer.capacity() >= len);
        }
    }

    #[test]
    fn test_payload_reads_back_written_bytes() {
        let mut buffer = FrameBuffer::new();
        buffer.payload_mut(3).copy_from_slice(b"abc");
        assert_eq!(buffer.payload(3), b"abc");
    }

    #[test]
    fn test_zero_length_payload() {
        let mut buffer = FrameBuffer::with_capacity(0);
        assert!(buffer.payload_mut(0).is_empty());
        assert_eq!(buffer.capacity(), 0);
    }
}
