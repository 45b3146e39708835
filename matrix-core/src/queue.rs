//! Bounded FIFO of settled key transitions

use heapless::Deque;

use crate::types::{OverflowPolicy, TransitionEvent};

/// Transition queue drained by the downstream (USB/keycode) consumer
pub struct EventQueue<const N: usize> {
    events: Deque<TransitionEvent, N>,
    policy: OverflowPolicy,
    dropped: u16,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            events: Deque::new(),
            policy,
            dropped: 0,
        }
    }

    /// Append an event, applying the overflow policy when full.
    /// Returns false if `event` itself was discarded.
    pub fn push(&mut self, event: TransitionEvent) -> bool {
        if self.events.is_full() {
            self.dropped = self.dropped.saturating_add(1);
            match self.policy {
                OverflowPolicy::DropNewest => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("event queue full, dropping {}", event);
                    return false;
                }
                OverflowPolicy::DropOldest => {
                    let _evicted = self.events.pop_front();
                    #[cfg(feature = "defmt")]
                    defmt::warn!("event queue full, dropping {}", _evicted);
                }
            }
        }
        self.events.push_back(event).is_ok()
    }

    /// Oldest unread event
    pub fn pop(&mut self) -> Option<TransitionEvent> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&TransitionEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost to overflow since creation or the last `clear`
    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionEvent> {
        self.events.iter()
    }
}
