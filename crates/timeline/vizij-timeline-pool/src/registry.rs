//! LifecycleRegistry: every timeline created through a pool since the last global reset.

use std::rc::Rc;

use hashbrown::HashMap;
use log::{debug, trace, warn};

use crate::ids::TimelineId;
use crate::timeline::{id_of, Shared, Timeline};

/// Set of live timelines, keyed by id. Superset of every pool and cache built on it.
pub struct LifecycleRegistry<T: Timeline> {
    members: HashMap<TimelineId, Shared<T>>,
    /// Evicted by a reset while borrowed; killed on the next `sweep`.
    lingering: Vec<Shared<T>>,
    generation: u64,
}

impl<T: Timeline> Default for LifecycleRegistry<T> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
            lingering: Vec::new(),
            generation: 0,
        }
    }
}

impl<T: Timeline> std::fmt::Debug for LifecycleRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("members", &self.members.len())
            .field("lingering", &self.lingering.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T: Timeline> LifecycleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a timeline. Returns false if it was already tracked.
    pub fn track(&mut self, timeline: &Shared<T>) -> bool {
        let id = id_of(timeline);
        if self.members.contains_key(&id) {
            return false;
        }
        self.members.insert(id, timeline.clone());
        true
    }

    #[inline]
    pub fn contains(&self, id: TimelineId) -> bool {
        self.members.contains_key(&id)
    }

    /// True only for this exact handle. Ids are per engine, so a timeline from
    /// another engine may share an id with a member without being one.
    pub fn holds(&self, timeline: &Shared<T>) -> bool {
        matches!(self.members.get(&id_of(timeline)), Some(m) if Rc::ptr_eq(m, timeline))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of global resets performed so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ids(&self) -> impl Iterator<Item = TimelineId> + '_ {
        self.members.keys().copied()
    }

    /// Evicted timelines still waiting for their kill.
    #[inline]
    pub fn lingering_len(&self) -> usize {
        self.lingering.len()
    }

    /// Kill every tracked timeline and forget them all. Returns how many were tracked.
    ///
    /// A timeline borrowed elsewhere at this moment is evicted now and killed
    /// by the next [`sweep`](Self::sweep).
    pub fn reset_all(&mut self) -> usize {
        self.sweep();
        let count = self.members.len();
        for (id, timeline) in self.members.drain() {
            if !try_kill(&timeline) {
                warn!("{}: borrowed during global reset, kill postponed", id);
                self.lingering.push(timeline);
            }
        }
        self.generation = self.generation.wrapping_add(1);
        debug!(
            "registry reset: {} timelines terminated (generation {})",
            count, self.generation
        );
        count
    }

    /// Retry kills postponed by `reset_all`. Returns how many are still waiting.
    pub fn sweep(&mut self) -> usize {
        if self.lingering.is_empty() {
            return 0;
        }
        self.lingering.retain(|timeline| !try_kill(timeline));
        trace!("sweep: {} kills still postponed", self.lingering.len());
        self.lingering.len()
    }
}

fn try_kill<T: Timeline>(timeline: &Shared<T>) -> bool {
    match timeline.try_borrow_mut() {
        Ok(mut tl) => {
            tl.kill();
            true
        }
        Err(_) => false,
    }
}
