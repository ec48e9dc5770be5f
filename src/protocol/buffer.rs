//! Payload buffer allocation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use bytes::BytesMut;

// ============================================================================
// BufferFactory
// ============================================================================

/// Allocates payload buffers for outbound messages.
///
/// Transports with pooled or direct memory can supply their own factory;
/// [`DefaultBufferFactory`] allocates on the heap.
pub trait BufferFactory: Send + Sync + fmt::Debug {
    /// Allocates an empty buffer with at least `capacity` bytes reserved.
    fn allocate(&self, capacity: usize) -> BytesMut;
}

// ============================================================================
// DefaultBufferFactory
// ============================================================================

/// Heap-backed [`BufferFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBufferFactory {
    /// Capacity used when callers ask for zero bytes.
    default_capacity: usize,
}

impl DefaultBufferFactory {
    /// Default initial capacity in bytes.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a factory with the given default capacity.
    #[inline]
    #[must_use]
    pub const fn new(default_capacity: usize) -> Self {
        Self { default_capacity }
    }
}

impl Default for DefaultBufferFactory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl BufferFactory for DefaultBufferFactory {
    fn allocate(&self, capacity: usize) -> BytesMut {
        if capacity == 0 {
            BytesMut::with_capacity(self.default_capacity)
        } else {
            BytesMut::with_capacity(capacity)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
