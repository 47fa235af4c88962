//! Vizij Timeline Pool (engine-agnostic)
//!
//! Reuse of expensive animation timelines: an anonymous free-list and a keyed
//! cache, a deferred-reset wrapper that clears reused timelines on first
//! mutation, completion-triggered return to the pool, and a lifecycle registry
//! that kills everything on a global navigation event.
//!
//! The playback engine is external and reached through the [`Timeline`] and
//! [`TimelineEngine`] traits. [`SteppedEngine`] is a small reference engine
//! driven by explicit ticks.

pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod ids;
pub mod keys;
pub mod pool;
pub mod registry;
pub mod stats;
pub mod step;
pub mod stepped;
pub mod timeline;

// Re-exports for consumers (adapters)
pub use config::{PoolConfig, ResetPolicy, TimelineOptions};
pub use deferred::DeferredReset;
pub use error::EngineError;
pub use events::LifecycleEvent;
pub use ids::TimelineId;
pub use keys::{key_for_str, key_for_target};
pub use pool::{ReleaseOutcome, TimelinePool};
pub use registry::LifecycleRegistry;
pub use stats::PoolStats;
pub use step::Step;
pub use stepped::{SteppedConfig, SteppedEngine, SteppedTimeline};
pub use timeline::{CompletionHandler, Shared, Timeline, TimelineEngine};
