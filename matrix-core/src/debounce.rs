//! Per-key debounce state machine
//!
//! A raw change only becomes a candidate; the candidate settles into a
//! reported transition once the raw reading has held for the debounce time.
//! Any opposite reading while a candidate is pending aborts it.

use crate::types::{Edge, Tick};

/// Debounce state of one key
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// Released and stable
    Idle,
    /// Raw press seen, waiting for it to hold
    CandidatePressed,
    /// Pressed and stable
    Pressed,
    /// Raw release seen, waiting for it to hold
    CandidateReleased,
}

/// Debounce bookkeeping for one (row, column)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCell {
    state: DebounceState,
    pending_since: Tick,
}

impl KeyCell {
    pub const fn new() -> Self {
        Self {
            state: DebounceState::Idle,
            pending_since: Tick::ZERO,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Debounced view: a key awaiting release still counts as pressed
    pub fn is_pressed(&self) -> bool {
        matches!(self.state, DebounceState::Pressed | DebounceState::CandidateReleased)
    }

    /// Feed one raw reading taken at `now`.
    ///
    /// Returns the settled edge exactly once per transition.
    pub fn update(&mut self, raw_pressed: bool, now: Tick, debounce_ticks: u16) -> Option<Edge> {
        match (self.state, raw_pressed) {
            (DebounceState::Idle, true) => {
                self.state = DebounceState::CandidatePressed;
                self.pending_since = now;
                None
            }
            (DebounceState::CandidatePressed, true) => {
                if now.elapsed_since(self.pending_since) >= debounce_ticks {
                    self.state = DebounceState::Pressed;
                    Some(Edge::Pressed)
                } else {
                    None
                }
            }
            (DebounceState::CandidatePressed, false) => {
                self.state = DebounceState::Idle;
                None
            }
            (DebounceState::Pressed, false) => {
                self.state = DebounceState::CandidateReleased;
                self.pending_since = now;
                None
            }
            (DebounceState::CandidateReleased, false) => {
                if now.elapsed_since(self.pending_since) >= debounce_ticks {
                    self.state = DebounceState::Idle;
                    Some(Edge::Released)
                } else {
                    None
                }
            }
            (DebounceState::CandidateReleased, true) => {
                self.state = DebounceState::Pressed;
                None
            }
            (DebounceState::Idle, false) | (DebounceState::Pressed, true) => None,
        }
    }

    /// Forget any pending or settled press
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for KeyCell {
    fn default() -> Self {
        Self::new()
    }
}
