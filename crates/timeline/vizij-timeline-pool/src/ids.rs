//! Identifiers and the allocator that hands them out.

use serde::{Deserialize, Serialize};

/// Stable identity of one timeline for its whole lifetime.
///
/// Pools and the registry key their membership on this id, so two handles
/// to the same `Rc` always compare equal here.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelineId(pub u32);

impl std::fmt::Display for TimelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tl#{}", self.0)
    }
}

/// Monotonic allocator for TimelineId.
/// Ids are never recycled by a global reset; a stale handle can never alias a new timeline.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> TimelineId {
        let id = TimelineId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Number of ids handed out so far.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
