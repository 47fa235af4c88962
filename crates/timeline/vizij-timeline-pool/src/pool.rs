//! TimelinePool: explicit context owning the engine, free-list, keyed cache and registry.
//!
//! Methods:
//! - new, acquire / acquire_wrapped (reuse or create), create_tracked,
//!   release (pool now or defer to completion), with_timeline, reset_all, handle_event
//!
//! All state lives behind one `Rc<RefCell<_>>` so completion handlers fired
//! later by the engine can return timelines to the pool. Handlers hold weak
//! references only and compare the reset epoch before touching anything.
//! A completion that arrives while the state is borrowed goes to a backlog
//! that the next pool call settles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use hashbrown::{HashMap, HashSet};
use log::{debug, trace, warn};

use crate::config::{PoolConfig, ResetPolicy, TimelineOptions};
use crate::deferred::DeferredReset;
use crate::error::EngineError;
use crate::events::LifecycleEvent;
use crate::ids::TimelineId;
use crate::registry::LifecycleRegistry;
use crate::stats::PoolStats;
use crate::timeline::{id_of, Shared, Timeline, TimelineEngine};

/// What `release` did with a timeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Paused, cleared and inserted into the anonymous free-list.
    Pooled,
    /// Paused and cleared; stays in the keyed cache under its key.
    Retained,
    /// Still playing; will be released when the engine reports completion.
    Deferred,
    /// Already in the free-list; nothing changed.
    AlreadyIdle,
    /// A deferred release is already waiting for completion.
    AlreadyPending,
    /// Not tracked: destroyed by a global reset or created elsewhere.
    Stale,
}

/// A completion that could not be applied when it fired.
struct Backlogged<T> {
    timeline: Weak<RefCell<T>>,
    epoch: u64,
    id: TimelineId,
}

type Backlog<T> = Rc<RefCell<Vec<Backlogged<T>>>>;

impl ReleaseOutcome {
    /// True when the timeline is available for reuse right now.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Pooled | Self::Retained | Self::AlreadyIdle)
    }
}

struct PoolState<T: Timeline> {
    idle: HashMap<TimelineId, Shared<T>>,
    keyed: HashMap<String, Shared<T>>,
    /// Reverse index of `keyed`, used to route releases.
    keyed_ids: HashMap<TimelineId, String>,
    /// Timelines with a completion-triggered release attached.
    pending: HashSet<TimelineId>,
    registry: LifecycleRegistry<T>,
}

impl<T: Timeline> PoolState<T> {
    fn new(cfg: &PoolConfig) -> Self {
        Self {
            idle: HashMap::with_capacity(cfg.idle_capacity),
            keyed: HashMap::with_capacity(cfg.keyed_capacity),
            keyed_ids: HashMap::with_capacity(cfg.keyed_capacity),
            pending: HashSet::new(),
            registry: LifecycleRegistry::new(),
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            epoch: self.registry.generation(),
            tracked: self.registry.len(),
            idle: self.idle.len(),
            keyed: self.keyed.len(),
            pending: self.pending.len(),
        }
    }

    /// Pause, clear and return a timeline to availability.
    fn settle(&mut self, timeline: &Shared<T>) -> ReleaseOutcome {
        if !self.registry.holds(timeline) {
            return ReleaseOutcome::Stale;
        }
        let id = id_of(timeline);
        self.pending.remove(&id);
        {
            let mut tl = timeline.borrow_mut();
            tl.pause();
            tl.clear();
        }
        if self.keyed_ids.contains_key(&id) {
            return ReleaseOutcome::Retained;
        }
        if self.idle.contains_key(&id) {
            return ReleaseOutcome::AlreadyIdle;
        }
        self.idle.insert(id, timeline.clone());
        ReleaseOutcome::Pooled
    }

    fn is_idle(&self, timeline: &Shared<T>) -> bool {
        matches!(self.idle.get(&id_of(timeline)), Some(t) if Rc::ptr_eq(t, timeline))
    }

    /// Apply a completion-triggered release. The handle must still be the
    /// registered one, with its release pending, in the epoch it was armed in.
    fn finish_release(&mut self, timeline: &Shared<T>, epoch: u64, done: TimelineId) {
        if self.registry.generation() != epoch {
            trace!("{}: completion from before global reset ignored", done);
            return;
        }
        if !self.pending.contains(&done) {
            trace!("{}: duplicate completion ignored", done);
            return;
        }
        if !self.registry.holds(timeline) {
            warn!("{}: completed after leaving the registry", done);
            self.pending.remove(&done);
            return;
        }
        let outcome = self.settle(timeline);
        debug!("{}: completed, released ({:?})", done, outcome);
    }

    fn clear_all(&mut self) -> usize {
        let terminated = self.registry.reset_all();
        self.idle.clear();
        self.keyed.clear();
        self.keyed_ids.clear();
        self.pending.clear();
        terminated
    }
}

/// Pooling context for one engine.
pub struct TimelinePool<E: TimelineEngine> {
    engine: E,
    cfg: PoolConfig,
    state: Rc<RefCell<PoolState<E::Timeline>>>,
    backlog: Backlog<E::Timeline>,
}

impl<E: TimelineEngine + std::fmt::Debug> std::fmt::Debug for TimelinePool<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelinePool")
            .field("engine", &self.engine)
            .field("cfg", &self.cfg)
            .field("stats", &self.state.borrow().stats())
            .field("backlog", &self.backlog.borrow().len())
            .finish()
    }
}

impl<E> TimelinePool<E>
where
    E: TimelineEngine,
    E::Timeline: 'static,
{
    /// Create a pool around an engine.
    pub fn new(engine: E, cfg: PoolConfig) -> Self {
        let state = PoolState::new(&cfg);
        Self {
            engine,
            cfg,
            state: Rc::new(RefCell::new(state)),
            backlog: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Apply completions and kills that were postponed by a busy borrow.
    fn catch_up(&self) {
        let Ok(mut st) = self.state.try_borrow_mut() else {
            return;
        };
        st.registry.sweep();
        let queued = match self.backlog.try_borrow_mut() {
            Ok(mut backlog) => std::mem::take(&mut *backlog),
            Err(_) => return,
        };
        for entry in queued {
            match entry.timeline.upgrade() {
                Some(timeline) => st.finish_release(&timeline, entry.epoch, entry.id),
                None => {
                    st.pending.remove(&entry.id);
                }
            }
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.cfg
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access, e.g. to drive a reference engine's clock.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Construct through the engine and register for global teardown.
    fn create_registered(
        &mut self,
        options: &TimelineOptions,
    ) -> Result<Shared<E::Timeline>, EngineError> {
        let timeline = self.engine.create(options)?;
        self.state.borrow_mut().registry.track(&timeline);
        Ok(timeline)
    }

    /// Get a timeline: the cached one for `key`, or any idle one, or a new paused one.
    ///
    /// `options.paused` is forced on; pooled timelines never auto-start.
    /// Engine construction failures propagate unchanged.
    pub fn acquire(
        &mut self,
        key: Option<&str>,
        options: &TimelineOptions,
    ) -> Result<Shared<E::Timeline>, EngineError> {
        self.catch_up();
        match key {
            Some(key) => self.acquire_keyed(key, options),
            None => self.acquire_anonymous(options),
        }
    }

    fn acquire_anonymous(
        &mut self,
        options: &TimelineOptions,
    ) -> Result<Shared<E::Timeline>, EngineError> {
        let reused = {
            let mut st = self.state.borrow_mut();
            let any = st.idle.keys().next().copied();
            any.and_then(|id| st.idle.remove(&id))
        };
        if let Some(timeline) = reused {
            debug!("reusing idle {}", id_of(&timeline));
            return Ok(timeline);
        }
        let timeline = self.create_registered(&options.forced_paused())?;
        debug!("pool empty, created {}", id_of(&timeline));
        Ok(timeline)
    }

    fn acquire_keyed(
        &mut self,
        key: &str,
        options: &TimelineOptions,
    ) -> Result<Shared<E::Timeline>, EngineError> {
        let cached = self.state.borrow().keyed.get(key).cloned();
        if let Some(timeline) = cached {
            trace!("cache hit '{}' -> {}", key, id_of(&timeline));
            return Ok(timeline);
        }
        let timeline = self.create_registered(&options.forced_paused())?;
        let id = id_of(&timeline);
        {
            let mut st = self.state.borrow_mut();
            st.keyed.insert(key.to_string(), timeline.clone());
            st.keyed_ids.insert(id, key.to_string());
        }
        debug!("cache miss '{}', created {}", key, id);
        Ok(timeline)
    }

    /// Acquire and wrap according to the configured reset policy.
    pub fn acquire_wrapped(
        &mut self,
        key: Option<&str>,
        options: &TimelineOptions,
    ) -> Result<DeferredReset<E::Timeline>, EngineError> {
        let timeline = self.acquire(key, options)?;
        Ok(match self.cfg.reset_policy {
            ResetPolicy::Deferred => DeferredReset::new(timeline),
            ResetPolicy::Eager => {
                timeline.borrow_mut().clear();
                DeferredReset::settled(timeline)
            }
        })
    }

    /// Create a timeline that is tracked for global teardown but never pooled.
    /// Options are passed through as given.
    pub fn create_tracked(
        &mut self,
        options: &TimelineOptions,
    ) -> Result<Shared<E::Timeline>, EngineError> {
        self.catch_up();
        let timeline = self.create_registered(options)?;
        debug!("created tracked {}", id_of(&timeline));
        Ok(timeline)
    }

    /// Return a timeline to availability.
    ///
    /// An active timeline is not touched now: a one-shot completion handler
    /// pauses, clears and pools it once the engine reports completion.
    /// Repeated calls are no-ops and never duplicate pool membership.
    pub fn release(&self, timeline: &Shared<E::Timeline>) -> ReleaseOutcome {
        self.catch_up();
        let id = id_of(timeline);
        let epoch = {
            let mut st = self.state.borrow_mut();
            if !st.registry.holds(timeline) {
                trace!("{}: release of untracked timeline ignored", id);
                return ReleaseOutcome::Stale;
            }
            if st.idle.contains_key(&id) {
                return ReleaseOutcome::AlreadyIdle;
            }
            if st.pending.contains(&id) {
                return ReleaseOutcome::AlreadyPending;
            }
            if !timeline.borrow().is_active() {
                let outcome = st.settle(timeline);
                debug!("{}: released ({:?})", id, outcome);
                return outcome;
            }
            st.pending.insert(id);
            st.registry.generation()
        };

        let state = Rc::downgrade(&self.state);
        let backlog = Rc::downgrade(&self.backlog);
        let weak_tl = Rc::downgrade(timeline);
        timeline.borrow_mut().on_complete(Box::new(move |done: TimelineId| {
            complete_release(state, backlog, weak_tl, epoch, done)
        }));
        debug!("{}: active, release deferred to completion", id);
        ReleaseOutcome::Deferred
    }

    /// Release the timeline behind a wrapper.
    pub fn release_wrapped(&self, wrapper: DeferredReset<E::Timeline>) -> ReleaseOutcome {
        self.release(wrapper.timeline())
    }

    /// Run `f` with a wrapped timeline, then release it (deferred if `f` left it playing).
    pub fn with_timeline<R, F>(
        &mut self,
        key: Option<&str>,
        options: &TimelineOptions,
        f: F,
    ) -> Result<R, EngineError>
    where
        F: FnOnce(&mut DeferredReset<E::Timeline>) -> R,
    {
        let mut wrapper = self.acquire_wrapped(key, options)?;
        let result = f(&mut wrapper);
        let outcome = self.release_wrapped(wrapper);
        trace!("with_timeline finished ({:?})", outcome);
        Ok(result)
    }

    /// Kill every tracked timeline and empty the free-list, cache and registry.
    /// Pending completion handlers are detached by the kill and ignored if they still fire.
    pub fn reset_all(&self) -> usize {
        if let Ok(mut backlog) = self.backlog.try_borrow_mut() {
            backlog.clear();
        }
        let terminated = self.state.borrow_mut().clear_all();
        debug!("global reset: {} timelines terminated", terminated);
        terminated
    }

    /// Dispatch a host lifecycle event. Returns the number of terminated timelines.
    pub fn handle_event(&self, event: LifecycleEvent) -> usize {
        if event.triggers_reset() {
            self.reset_all()
        } else {
            trace!("lifecycle event {:?} ignored", event);
            0
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.catch_up();
        self.state.borrow().stats()
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().registry.generation()
    }

    pub fn idle_len(&self) -> usize {
        self.catch_up();
        self.state.borrow().idle.len()
    }

    pub fn keyed_len(&self) -> usize {
        self.state.borrow().keyed.len()
    }

    pub fn tracked_len(&self) -> usize {
        self.state.borrow().registry.len()
    }

    pub fn pending_len(&self) -> usize {
        self.catch_up();
        self.state.borrow().pending.len()
    }

    /// Timelines evicted by a reset while borrowed, not yet killed.
    pub fn lingering_len(&self) -> usize {
        self.catch_up();
        self.state.borrow().registry.lingering_len()
    }

    /// The cached timeline for `key`, without creating one.
    pub fn cached(&self, key: &str) -> Option<Shared<E::Timeline>> {
        self.state.borrow().keyed.get(key).cloned()
    }

    pub fn is_idle(&self, timeline: &Shared<E::Timeline>) -> bool {
        self.catch_up();
        self.state.borrow().is_idle(timeline)
    }

    pub fn is_pending(&self, timeline: &Shared<E::Timeline>) -> bool {
        self.catch_up();
        let st = self.state.borrow();
        st.registry.holds(timeline) && st.pending.contains(&id_of(timeline))
    }

    pub fn is_tracked(&self, timeline: &Shared<E::Timeline>) -> bool {
        self.state.borrow().registry.holds(timeline)
    }
}

/// Completion side of a deferred release.
fn complete_release<T: Timeline>(
    state: Weak<RefCell<PoolState<T>>>,
    backlog: Weak<RefCell<Vec<Backlogged<T>>>>,
    timeline: Weak<RefCell<T>>,
    epoch: u64,
    done: TimelineId,
) {
    let (Some(state), Some(strong)) = (state.upgrade(), timeline.upgrade()) else {
        trace!("{}: completion after pool or timeline dropped", done);
        return;
    };
    if let Ok(mut st) = state.try_borrow_mut() {
        st.finish_release(&strong, epoch, done);
        return;
    }
    let queued = backlog
        .upgrade()
        .and_then(|backlog| {
            let mut backlog = backlog.try_borrow_mut().ok()?;
            backlog.push(Backlogged {
                timeline,
                epoch,
                id: done,
            });
            Some(())
        })
        .is_some();
    if queued {
        debug!("{}: completion while pool state borrowed, queued", done);
    } else {
        warn!("{}: completion while pool busy, release dropped", done);
    }
}
