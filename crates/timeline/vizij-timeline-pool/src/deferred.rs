//! Deferred reset: clear a reused timeline on its first mutation, not on acquisition.
//!
//! Building a timeline is usually "add N steps, then play". Callers that only
//! inspect a timeline, or abandon it without adding anything, never pay for
//! the clear. Every mutating method checks the pending flag first; queries
//! forward untouched. `play` rearms the flag so the next build cycle on the
//! same wrapper starts from an empty timeline again.

use log::trace;

use crate::ids::TimelineId;
use crate::step::Step;
use crate::timeline::{CompletionHandler, Shared, Timeline};

/// Wrapper around an acquired timeline. Mutators return `&mut Self` so calls chain.
pub struct DeferredReset<T: Timeline> {
    inner: Shared<T>,
    reset_pending: bool,
}

impl<T: Timeline> std::fmt::Debug for DeferredReset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredReset")
            .field("id", &self.id())
            .field("reset_pending", &self.reset_pending)
            .finish()
    }
}

impl<T: Timeline> DeferredReset<T> {
    /// Wrap with a reset pending.
    pub fn new(inner: Shared<T>) -> Self {
        Self {
            inner,
            reset_pending: true,
        }
    }

    /// Wrap a timeline that was just cleared; the first mutation forwards directly.
    pub fn settled(inner: Shared<T>) -> Self {
        Self {
            inner,
            reset_pending: false,
        }
    }

    #[inline]
    fn reset_if_pending(&mut self) {
        if self.reset_pending {
            let mut tl = self.inner.borrow_mut();
            trace!("{}: deferred clear of {} stale steps", tl.id(), tl.len());
            tl.clear();
            self.reset_pending = false;
        }
    }

    pub fn add(&mut self, step: Step) -> &mut Self {
        self.reset_if_pending();
        self.inner.borrow_mut().add(step);
        self
    }

    pub fn add_all<I: IntoIterator<Item = Step>>(&mut self, steps: I) -> &mut Self {
        self.reset_if_pending();
        let mut tl = self.inner.borrow_mut();
        for step in steps {
            tl.add(step);
        }
        drop(tl);
        self
    }

    /// Start playback and rearm the pending reset.
    pub fn play(&mut self) -> &mut Self {
        self.reset_if_pending();
        self.inner.borrow_mut().play();
        self.reset_pending = true;
        self
    }

    pub fn pause(&mut self) -> &mut Self {
        self.reset_if_pending();
        self.inner.borrow_mut().pause();
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.reset_if_pending();
        self.inner.borrow_mut().clear();
        self
    }

    pub fn on_complete(&mut self, handler: CompletionHandler) -> &mut Self {
        self.reset_if_pending();
        self.inner.borrow_mut().on_complete(handler);
        self
    }

    pub fn id(&self) -> TimelineId {
        self.inner.borrow().id()
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.borrow().is_paused()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// True until the next mutating call performs the clear.
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// The wrapped handle, for handing back to the pool.
    pub fn timeline(&self) -> &Shared<T> {
        &self.inner
    }

    pub fn into_inner(self) -> Shared<T> {
        self.inner
    }
}
