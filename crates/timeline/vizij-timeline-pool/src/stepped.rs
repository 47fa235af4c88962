//! SteppedEngine: in-process reference engine driven by explicit `tick(dt)` calls.
//!
//! Methods:
//! - new, create (via TimelineEngine), tick (advance → complete → notify), live_count

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::TimelineOptions;
use crate::error::EngineError;
use crate::ids::{IdAllocator, TimelineId};
use crate::step::Step;
use crate::timeline::{CompletionHandler, Shared, Timeline, TimelineEngine};

/// Configuration for the reference engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SteppedConfig {
    /// Refuse to construct more than this many live timelines.
    pub max_timelines: Option<usize>,
}

/// A step resolved to an absolute start time.
#[derive(Clone, Debug)]
struct Scheduled {
    start: f32,
    step: Step,
}

impl Scheduled {
    #[inline]
    fn end(&self) -> f32 {
        self.start + self.step.duration
    }
}

/// Timeline owned by a [`SteppedEngine`].
pub struct SteppedTimeline {
    id: TimelineId,
    label: Option<String>,
    steps: Vec<Scheduled>,
    /// Playhead in timeline seconds, across all repeats.
    time: f32,
    time_scale: f32,
    repeat: i32,
    paused: bool,
    completed: bool,
    killed: bool,
    handlers: Vec<CompletionHandler>,
}

impl std::fmt::Debug for SteppedTimeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteppedTimeline")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("steps", &self.steps.len())
            .field("time", &self.time)
            .field("paused", &self.paused)
            .field("completed", &self.completed)
            .field("killed", &self.killed)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl SteppedTimeline {
    fn new(id: TimelineId, options: &TimelineOptions) -> Self {
        Self {
            id,
            label: options.label.clone(),
            steps: Vec::new(),
            time: 0.0,
            time_scale: options.time_scale,
            repeat: options.repeat,
            paused: options.paused,
            completed: false,
            killed: false,
            handlers: Vec::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Steps in insertion order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().map(|s| &s.step)
    }

    /// End of the last step, i.e. the length of one pass.
    pub fn span(&self) -> f32 {
        self.steps.iter().map(Scheduled::end).fold(0.0f32, f32::max)
    }

    /// Length of every pass together; infinite when repeating forever.
    pub fn total_duration(&self) -> f32 {
        if self.repeat < 0 {
            return f32::INFINITY;
        }
        self.span() * (self.repeat as f32 + 1.0)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Progress of the whole timeline in [0, 1]. Infinite timelines report progress within the current pass.
    pub fn progress(&self) -> f32 {
        let total = self.total_duration();
        if total.is_infinite() {
            let span = self.span();
            if span <= 0.0 {
                return 0.0;
            }
            return (self.time % span) / span;
        }
        if total <= 0.0 {
            return if self.completed { 1.0 } else { 0.0 };
        }
        (self.time / total).clamp(0.0, 1.0)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Number of completion handlers waiting to fire.
    pub fn pending_handlers(&self) -> usize {
        self.handlers.len()
    }

    /// Advance the playhead; returns the handlers to invoke if this call completed the timeline.
    fn advance(&mut self, dt: f32) -> Vec<CompletionHandler> {
        if self.killed || self.paused || self.completed {
            return Vec::new();
        }
        self.time = (self.time + dt * self.time_scale).max(0.0);
        let total = self.total_duration();
        if self.time >= total {
            self.time = total;
            self.completed = true;
            return std::mem::take(&mut self.handlers);
        }
        Vec::new()
    }
}

impl Timeline for SteppedTimeline {
    fn id(&self) -> TimelineId {
        self.id
    }

    fn add(&mut self, step: Step) {
        if self.killed {
            trace!("{}: add ignored on killed timeline", self.id);
            return;
        }
        let start = step.position.unwrap_or_else(|| self.span());
        self.steps.push(Scheduled { start, step });
        if self.time < self.total_duration() {
            self.completed = false;
        }
    }

    fn clear(&mut self) {
        if self.killed {
            return;
        }
        self.steps.clear();
        self.time = 0.0;
        self.completed = false;
    }

    fn pause(&mut self) {
        if self.killed {
            return;
        }
        self.paused = true;
    }

    /// Resume playback; a completed timeline restarts from the beginning.
    fn play(&mut self) {
        if self.killed {
            return;
        }
        if self.completed {
            self.time = 0.0;
            self.completed = false;
        }
        self.paused = false;
    }

    fn is_active(&self) -> bool {
        !self.killed && !self.paused && !self.completed && self.time < self.total_duration()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn len(&self) -> usize {
        self.steps.len()
    }

    fn on_complete(&mut self, handler: CompletionHandler) {
        if self.killed {
            return;
        }
        self.handlers.push(handler);
    }

    fn kill(&mut self) {
        self.killed = true;
        self.paused = true;
        self.steps.clear();
        self.handlers.clear();
    }

    fn is_killed(&self) -> bool {
        self.killed
    }
}

/// Reference engine. Holds weak references only; timelines die with their last handle.
#[derive(Debug, Default)]
pub struct SteppedEngine {
    cfg: SteppedConfig,
    ids: IdAllocator,
    live: Vec<Weak<RefCell<SteppedTimeline>>>,
}

impl SteppedEngine {
    pub fn new(cfg: SteppedConfig) -> Self {
        Self {
            cfg,
            ids: IdAllocator::new(),
            live: Vec::new(),
        }
    }

    /// Timelines that are still referenced and not killed.
    pub fn live_count(&self) -> usize {
        self.live
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|tl| !tl.borrow().is_killed())
            .count()
    }

    /// Total timelines ever constructed by this engine.
    pub fn created_count(&self) -> u32 {
        self.ids.allocated()
    }

    /// Step every playing timeline by `dt` seconds and notify completions.
    /// Returns how many timelines completed during this tick.
    pub fn tick(&mut self, dt: f32) -> usize {
        self.live.retain(|w| w.strong_count() > 0);

        let mut fired: Vec<(TimelineId, Vec<CompletionHandler>)> = Vec::new();
        let mut completed = 0;
        for weak in &self.live {
            let Some(tl) = weak.upgrade() else {
                continue;
            };
            let mut tl = tl.borrow_mut();
            let was_completed = tl.completed;
            let handlers = tl.advance(dt);
            if !was_completed && tl.completed {
                completed += 1;
                trace!("{} completed at t={}", tl.id, tl.time);
            }
            if !handlers.is_empty() {
                fired.push((tl.id, handlers));
            }
        }

        // Borrows are released; handlers may re-enter their timeline.
        for (id, handlers) in fired {
            for handler in handlers {
                handler(id);
            }
        }
        completed
    }
}

impl TimelineEngine for SteppedEngine {
    type Timeline = SteppedTimeline;

    fn create(&mut self, options: &TimelineOptions) -> Result<Shared<SteppedTimeline>, EngineError> {
        if !options.time_scale.is_finite() || options.time_scale <= 0.0 {
            return Err(EngineError::InvalidOptions {
                reason: format!("time_scale must be finite and > 0, got {}", options.time_scale),
            });
        }
        if let Some(limit) = self.cfg.max_timelines {
            let live = self.live_count();
            if live >= limit {
                return Err(EngineError::CapacityExceeded { live, limit });
            }
        }
        self.live.retain(|w| w.strong_count() > 0);

        let id = self.ids.alloc();
        let tl = Rc::new(RefCell::new(SteppedTimeline::new(id, options)));
        self.live.push(Rc::downgrade(&tl));
        debug!("engine created {} (label={:?})", id, options.label);
        Ok(tl)
    }
}
