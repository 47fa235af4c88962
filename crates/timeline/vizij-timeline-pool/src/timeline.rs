//! Contract with the external playback engine.
//!
//! The pool never drives time itself. It only needs an engine that can
//! construct timelines and timelines that can be cleared, paused, played,
//! queried for activity, killed and subscribed to for completion.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::TimelineOptions;
use crate::error::EngineError;
use crate::ids::TimelineId;
use crate::step::Step;

/// Shared single-threaded handle to a timeline.
pub type Shared<T> = Rc<RefCell<T>>;

/// One-shot completion subscription. Receives the id of the timeline that finished.
pub type CompletionHandler = Box<dyn FnOnce(TimelineId)>;

/// An ordered, mutable program of animation steps.
///
/// Implementations must uphold:
/// - each handler passed to [`on_complete`](Timeline::on_complete) runs at most once;
/// - [`kill`](Timeline::kill) drops pending handlers and stops playback;
/// - after `kill`, every mutating method is a silent no-op.
///
/// Engines must invoke completion handlers only after releasing any borrow
/// of the timeline, since handlers re-enter it through the pool.
pub trait Timeline {
    fn id(&self) -> TimelineId;

    /// Append a step.
    fn add(&mut self, step: Step);

    /// Remove every step and rewind the playhead.
    fn clear(&mut self);

    fn pause(&mut self);

    fn play(&mut self);

    /// True while playing and the playhead has not reached the end.
    fn is_active(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Number of steps currently scheduled.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe a one-shot handler to the next completion.
    fn on_complete(&mut self, handler: CompletionHandler);

    /// Forcibly terminate: stop, drop steps and detach every handler.
    fn kill(&mut self);

    fn is_killed(&self) -> bool;
}

/// Factory for timelines.
pub trait TimelineEngine {
    type Timeline: Timeline;

    /// Construct a new timeline. Failures propagate to the pool's caller unchanged.
    fn create(&mut self, options: &TimelineOptions) -> Result<Shared<Self::Timeline>, EngineError>;
}

/// Stable id of a shared timeline.
#[inline]
pub fn id_of<T: Timeline>(timeline: &Shared<T>) -> TimelineId {
    timeline.borrow().id()
}
