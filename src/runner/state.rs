//! # Runner State
//!
//! The four states a runner moves through during one run-cycle:
//!
//! ```text
//! Stopped -> Booting -> Running -> Closing -> Stopped
//! ```
//!
//! The current state lives in an [`AtomicState`] so it can be peeked without a lock.
//! That peek is only ever used to reject early; every decision that changes the state
//! re-reads it while holding the phase lock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// The lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum State {
    /// No run-cycle in flight. The only state in which `run()` is accepted.
    Stopped = 0,
    /// `before_running` is executing under the exclusive phase lock.
    Booting = 1,
    /// The body is executing; `while_running` operations are admitted.
    Running = 2,
    /// `after_running` is executing under the exclusive phase lock.
    Closing = 3,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Stopped => "stopped",
            State::Booting => "booting",
            State::Running => "running",
            State::Closing => "closing",
        }
    }

    fn from_raw(raw: u32) -> Self {
        match raw {
            0 => State::Stopped,
            1 => State::Booting,
            2 => State::Running,
            3 => State::Closing,
            other => unreachable!("invalid runner state tag {other}"),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`State`] cell with atomic load/store and no lock of its own.
///
/// Stores use `Release` and loads use `Acquire`: whatever was written before a state
/// was published is visible to anyone who observes that state.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU32);

impl AtomicState {
    pub(crate) fn new(state: State) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    pub(crate) fn load(&self) -> State {
        State::from_raw(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: State) {
        self.0.store(state as u32, Ordering::Release);
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(State::Stopped)
    }
}
