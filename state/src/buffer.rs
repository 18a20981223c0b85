use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};

use cinnabar_common::Height;

use crate::Transition;

/// Message-bearing transition kinds: propose, pre-vote, pre-commit.
const TRANSITION_KINDS: usize = 3;

/// Reorders out-of-order transitions so the state machine only ever sees
/// messages for its current height.
///
/// Stale transitions are dropped on enqueue; future-height transitions stay
/// buffered until the machine reaches their height. Per height there is
/// room for one message per validator per transition kind.
#[derive(Clone, Debug)]
pub struct TransitionBuffer {
    capacity: usize,
    queues: BTreeMap<Height, VecDeque<Transition>>,
}

impl TransitionBuffer {
    /// `capacity` is the shard size.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queues: BTreeMap::new(),
        }
    }

    /// Store a transition, dropping it if it is already stale. Ticks are
    /// ageless and must not be enqueued.
    pub fn enqueue(&mut self, transition: Transition, current_height: Height) {
        let Some(height) = transition.height() else {
            debug!("Ticks are ageless, refusing to buffer");
            return;
        };

        if height < current_height {
            debug!(%height, %current_height, "Stale transition, dropping");
            return;
        }

        let queue = self.queues.entry(height).or_default();
        if queue.len() >= self.capacity * TRANSITION_KINDS {
            warn!(%height, "Transition buffer full, dropping");
            return;
        }
        queue.push_back(transition);
    }

    /// The next transition for `current_height`, in FIFO order. Transitions
    /// for greater heights remain buffered.
    pub fn dequeue(&mut self, current_height: Height) -> Option<Transition> {
        let queue = self.queues.get_mut(&current_height)?;
        let transition = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(&current_height);
        }
        transition
    }

    /// Evict every transition buffered strictly below `from_height`.
    pub fn drop_below(&mut self, from_height: Height) {
        self.queues = self.queues.split_off(&from_height);
    }

    /// Total number of buffered transitions, across all heights.
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
