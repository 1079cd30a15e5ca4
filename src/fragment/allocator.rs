//! Frame identity allocation for outbound artifacts.

use std::sync::atomic::{AtomicU16, Ordering};

use super::FrameId;

/// Issues one [`FrameId`] per transferred artifact.
///
/// Identifiers start at 1 and increase by one per call, wrapping from
/// `u16::MAX` to 0. The counter is atomic so overlapping fragmentation
/// attempts never draw the same value within one wrap of the space.
#[derive(Debug)]
pub struct FrameIdAllocator {
    next: AtomicU16,
}

impl FrameIdAllocator {
    /// Create an allocator whose first identifier is 1.
    #[must_use]
    pub const fn new() -> Self { Self::with_start(FrameId::new(1)) }

    /// Create an allocator whose first identifier is `start`.
    #[must_use]
    pub const fn with_start(start: FrameId) -> Self {
        Self {
            next: AtomicU16::new(start.get()),
        }
    }

    /// Draw the next identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkcast::fragment::{FrameId, FrameIdAllocator};
    /// let ids = FrameIdAllocator::with_start(FrameId::new(u16::MAX));
    /// assert_eq!(ids.next_id(), FrameId::new(u16::MAX));
    /// assert_eq!(ids.next_id(), FrameId::new(0));
    /// ```
    #[must_use]
    pub fn next_id(&self) -> FrameId {
        // `fetch_add` wraps on overflow for atomics.
        FrameId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Return the identifier the next call to [`next_id`](Self::next_id)
    /// will hand out.
    #[must_use]
    pub fn peek(&self) -> FrameId { FrameId::new(self.next.load(Ordering::Relaxed)) }
}

impl Default for FrameIdAllocator {
    fn default() -> Self { Self::new() }
}
