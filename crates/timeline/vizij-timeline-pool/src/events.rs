//! Inbound lifecycle signals from the hosting application.
//!
//! Hosts translate their own navigation hooks into these events and pass
//! them to [`TimelinePool::handle_event`](crate::pool::TimelinePool::handle_event).

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// The current view is about to be replaced.
    BeforeSwap,
    /// A new view finished mounting.
    AfterSwap,
    /// The host is tearing down entirely.
    Unload,
}

impl LifecycleEvent {
    /// Whether this event terminates every tracked timeline.
    #[inline]
    pub fn triggers_reset(&self) -> bool {
        matches!(self, Self::BeforeSwap | Self::Unload)
    }

    /// Parse a host event name, ignoring any `namespace:` prefix (e.g. "astro:before-swap").
    pub fn from_host_name(name: &str) -> Option<Self> {
        let bare = name.rsplit(':').next().unwrap_or(name);
        match bare {
            "before-swap" => Some(Self::BeforeSwap),
            "after-swap" => Some(Self::AfterSwap),
            "unload" | "beforeunload" => Some(Self::Unload),
            _ => None,
        }
    }
}
