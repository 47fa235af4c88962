//! Pool configuration and the timeline construction record.

use serde::{Deserialize, Serialize};

/// When a reused timeline gets its old steps cleared.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetPolicy {
    /// Clear on the first mutating call made through the wrapper.
    #[default]
    Deferred,
    /// Clear immediately on acquisition.
    Eager,
}

/// Configuration for a [`TimelinePool`](crate::pool::TimelinePool).
/// Keep this minimal; capacities are hints only.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    pub reset_policy: ResetPolicy,
    /// Initial capacity hint for the anonymous free-list.
    pub idle_capacity: usize,
    /// Initial capacity hint for the keyed cache.
    pub keyed_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reset_policy: ResetPolicy::Deferred,
            idle_capacity: 16,
            keyed_capacity: 64,
        }
    }
}

/// Construction options handed to the engine when a timeline is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineOptions {
    /// Start paused. The pool forces this to `true` for every pooled timeline.
    pub paused: bool,
    /// Extra passes after the first one; negative loops forever.
    pub repeat: i32,
    /// Playback rate multiplier.
    pub time_scale: f32,
    /// Free-form label, useful in logs.
    pub label: Option<String>,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            paused: false,
            repeat: 0,
            time_scale: 1.0,
            label: None,
        }
    }
}

impl TimelineOptions {
    /// Copy of these options with `paused` forced on.
    pub fn forced_paused(&self) -> Self {
        Self {
            paused: true,
            ..self.clone()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_repeat(mut self, repeat: i32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}
