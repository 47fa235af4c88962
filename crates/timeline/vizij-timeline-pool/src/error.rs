//! Error types surfaced by timeline engines.
//!
//! The pool itself never fails: exhaustion, double release and stale handles
//! are reported through [`ReleaseOutcome`](crate::pool::ReleaseOutcome).
//! Only construction failures from the engine reach the caller, unchanged.

use serde::{Deserialize, Serialize};

/// Failure raised by a [`TimelineEngine`](crate::timeline::TimelineEngine) while constructing a timeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EngineError {
    /// The engine refuses to hold more live timelines.
    #[error("Timeline capacity exceeded: {live} live (limit: {limit})")]
    CapacityExceeded { live: usize, limit: usize },

    /// Options were rejected by the engine.
    #[error("Invalid timeline options: {reason}")]
    InvalidOptions { reason: String },

    /// Engine-specific construction failure.
    #[error("Timeline construction failed: {message}")]
    Construction { message: String },
}

impl EngineError {
    /// Create a new generic construction error
    pub fn new(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "capacity",
            Self::InvalidOptions { .. } => "validation",
            Self::Construction { .. } => "engine",
        }
    }
}
