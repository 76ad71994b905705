//! # Runner Errors
//!
//! Every failure a runner reports is a [`RunnerError`]:
//!
//! - **Unexpected state**: the operation needs a state the runner is not in
//!   (e.g. `run()` while a cycle is in flight, `close()` while stopped).
//! - **Shutting down**: a context-style `while_running` found its scope already cancelled.
//! - **Phase errors**: whatever the bound body returned from `before_running`,
//!   `running` or `after_running`, tagged with the phase it came from.
//!
//! `RunnerError` is `Clone` because one close-phase error is handed to two callers:
//! the task driving `run()` and any task blocked in `close()`.

use super::state::State;
use std::fmt;
use std::sync::Arc;

/// A type-erased error returned by a service body.
pub type BodyError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The runner was asked to do something its current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.actual, .expected))]
pub struct UnexpectedState {
    actual: State,
    expected: Vec<State>,
}

impl UnexpectedState {
    pub fn new(actual: State, expected: impl Into<Vec<State>>) -> Self {
        Self {
            actual,
            expected: expected.into(),
        }
    }

    /// The state the runner was in.
    pub fn actual(&self) -> State {
        self.actual
    }

    /// The states that would have been accepted. Empty when no state would do.
    pub fn expected(&self) -> &[State] {
        &self.expected
    }
}

fn describe(actual: &State, expected: &[State]) -> String {
    match expected {
        [] => format!("unexpected state {actual}"),
        [one] => format!("expected state {one} but got {actual}"),
        many => {
            let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
            format!(
                "expected one of states [{}] but got {actual}",
                names.join(", ")
            )
        }
    }
}

/// The body phase an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeRunning,
    Running,
    AfterRunning,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::BeforeRunning => "before_running",
            Phase::Running => "running",
            Phase::AfterRunning => "after_running",
        })
    }
}

/// Errors returned by runner operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    UnexpectedState(#[from] UnexpectedState),

    #[error("runner is shutting down")]
    ShuttingDown,

    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: BodyError,
    },
}

impl RunnerError {
    /// An unexpected-state error naming the single state that was required.
    pub fn expected_state(actual: State, expected: State) -> Self {
        UnexpectedState::new(actual, [expected]).into()
    }

    /// An unexpected-state error with no acceptable state.
    pub fn unexpected_state(actual: State) -> Self {
        UnexpectedState::new(actual, Vec::new()).into()
    }

    pub(crate) fn phase<E>(phase: Phase, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RunnerError::Phase {
            phase,
            source: Arc::new(source),
        }
    }

    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, RunnerError::UnexpectedState(_))
    }

    /// The failed phase, if this error came from the body.
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            RunnerError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
