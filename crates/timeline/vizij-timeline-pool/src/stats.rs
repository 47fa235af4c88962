//! Point-in-time snapshot of pool occupancy.

use serde::{Deserialize, Serialize};

/// Counts returned by [`TimelinePool::stats`](crate::pool::TimelinePool::stats).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Global resets performed so far.
    pub epoch: u64,
    /// Timelines in the lifecycle registry.
    pub tracked: usize,
    /// Timelines in the anonymous free-list.
    pub idle: usize,
    /// Entries in the keyed cache.
    pub keyed: usize,
    /// Releases waiting for a completion notification.
    pub pending: usize,
}

impl PoolStats {
    /// Tracked timelines outside the free-list and the keyed cache: anonymous or
    /// tracked-only timelines held by callers or waiting on a deferred release.
    /// Keyed timelines always count as cached, even while a caller uses them.
    #[inline]
    pub fn checked_out(&self) -> usize {
        self.tracked.saturating_sub(self.idle + self.keyed)
    }
}
