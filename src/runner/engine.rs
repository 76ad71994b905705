//! # Shared Engine
//!
//! The transition protocol both front-ends run on. It is generic over [`Hooks`], the five
//! callbacks of one run-cycle:
//!
//! | Hook      | Lock held           | Front-end meaning                       |
//! |-----------|---------------------|-----------------------------------------|
//! | `prepare` | phase, exclusive    | create this cycle's shutdown handle     |
//! | `boot`    | phase, exclusive    | `before_running`                        |
//! | `run`     | phase, **shared**   | `running`                               |
//! | `trigger` | phase, shared (try) | fire the handle (at most once)          |
//! | `close`   | phase, exclusive    | `after_running`                         |
//!
//! ## Locks
//!
//! - **Phase lock** (`RwLock`, owns the bound hooks): writers are the boot and close
//!   transitions and `bind`; readers are the body itself and every `while_running`
//!   operation. The closing transition has to wait for all readers to leave, so shutdown
//!   is a graceful drain.
//! - **Run-cycle lock** (`Mutex`, owns the terminal error): held by `run()` for the whole
//!   cycle. `close()` waits on it to know the cycle is over.
//! - **Signal slot** (`std::sync::Mutex`): the current cycle's handle, its number and its
//!   once-guard. `Booting` is only ever published while this slot is held.
//!
//! ## Ordering
//!
//! Arming a cycle installs the fresh handle, bumps the cycle number and publishes
//! `Booting` in one critical section. `close_async` reads the state and the cycle number in
//! the same critical section, then fires only that cycle's handle. A stop request decided
//! against one cycle therefore never reaches the next one, and it never has to wait for a
//! transition to finish.
//!
//! ## Abandoned cycles
//!
//! If the `run()` future is dropped mid-cycle, the handle is fired and the engine goes back
//! to `Stopped` once no shared holder is left. While some are, the state stays `Closing`
//! and the cycle is marked abandoned; the next `run()` or `bind` clears it under the
//! exclusive lock, after the holders have drained.

use super::error::RunnerError;
use super::signal::ShutdownHandle;
use super::state::{AtomicState, State};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as CycleLock, RwLock};
use tracing::{debug, info, warn};

/// The per-cycle callbacks a front-end plugs into the engine.
///
/// `trigger` is not listed here: it is [`ShutdownHandle::trigger`] on whatever `prepare`
/// returned, guarded by the engine so it runs once per cycle.
#[async_trait]
pub(crate) trait Hooks: Send + Sync + 'static {
    type Signal: ShutdownHandle;

    fn prepare(&self) -> Self::Signal;

    async fn boot(&self, signal: Self::Signal) -> Result<(), RunnerError>;

    async fn run(&self, signal: Self::Signal) -> Result<(), RunnerError>;

    async fn close(&self) -> Result<(), RunnerError>;
}

/// The handle of the most recently armed cycle.
struct Armed<S> {
    cycle: u64,
    handle: Option<S>,
    fired: bool,
}

pub(crate) struct Engine<H: Hooks> {
    name: String,
    state: AtomicState,
    phase: RwLock<Option<H>>,
    armed: Mutex<Armed<H::Signal>>,
    abandoned: AtomicBool,
    cycle: CycleLock<Option<RunnerError>>,
}

impl<H: Hooks> Engine<H> {
    pub(crate) fn new(name: impl Into<String>, hooks: Option<H>) -> Self {
        Self {
            name: name.into(),
            state: AtomicState::default(),
            phase: RwLock::new(hooks),
            armed: Mutex::new(Armed {
                cycle: 0,
                handle: None,
                fired: false,
            }),
            abandoned: AtomicBool::new(false),
            cycle: CycleLock::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Direct access to the bound hooks while the engine is exclusively owned.
    pub(crate) fn hooks_mut(&mut self) -> &mut Option<H> {
        self.phase.get_mut()
    }

    pub(crate) fn state(&self) -> State {
        self.state.load()
    }

    /// `Stopped`, or the `Closing` an abandoned cycle left behind.
    ///
    /// Only a decision under the exclusive lock may rely on the second case: by then every
    /// shared holder of the abandoned cycle has left.
    fn is_idle(&self, state: State) -> bool {
        state == State::Stopped
            || (state == State::Closing && self.abandoned.load(Ordering::Acquire))
    }

    /// Replaces the bound hooks. Only allowed while stopped.
    pub(crate) async fn bind(&self, hooks: H) -> Result<(), RunnerError> {
        let state = self.state.load();
        if !self.is_idle(state) {
            return Err(RunnerError::expected_state(state, State::Stopped));
        }

        let mut slot = self.phase.write().await;
        let state = self.state.load();
        if !self.is_idle(state) {
            return Err(RunnerError::expected_state(state, State::Stopped));
        }
        if self.abandoned.swap(false, Ordering::AcqRel) {
            self.state.store(State::Stopped);
        }
        *slot = Some(hooks);
        debug!(runner = %self.name, "bound");
        Ok(())
    }

    /// Drives one full run-cycle.
    ///
    /// Returns the first error among boot, run and close, in that order. The close error
    /// is also kept as the terminal error handed to [`Engine::close`] callers.
    pub(crate) async fn run(&self) -> Result<(), RunnerError> {
        let state = self.state.load();
        if !self.is_idle(state) {
            return Err(RunnerError::expected_state(state, State::Stopped));
        }

        let mut terminal = self.cycle.lock().await;
        // Declared ahead of the phase guards, so a dropped cycle releases them before it runs.
        let mut abandon = AbandonGuard {
            engine: self,
            cycle: 0,
            armed: false,
        };

        // Stopped -> Booting -> Running
        let exclusive = self.phase.write().await;
        let state = self.state.load();
        if !self.is_idle(state) {
            return Err(RunnerError::expected_state(state, State::Stopped));
        }
        self.abandoned.store(false, Ordering::Release);
        *terminal = None;

        let signal = exclusive.as_ref().map(H::prepare).unwrap_or_default();
        let cycle = self.arm(signal.clone());
        abandon.cycle = cycle;
        abandon.armed = true;
        info!(runner = %self.name, cycle, "run-cycle started");

        let booted = match exclusive.as_ref() {
            Some(hooks) => hooks.boot(signal.clone()).await,
            None => Ok(()),
        };
        // Advances even when boot failed, so the close phase always pairs with a boot attempt.
        self.state.store(State::Running);
        drop(exclusive);
        debug!(runner = %self.name, booted = booted.is_ok(), "running");

        // Running, shared with every while_running caller
        let ran = if booted.is_ok() {
            let shared = self.phase.read().await;
            match shared.as_ref() {
                Some(hooks) if self.state.load() == State::Running => {
                    hooks.run(signal.clone()).await
                }
                _ => Ok(()),
            }
        } else {
            Ok(())
        };

        // Running -> Closing -> Stopped, after every shared holder has left
        let exclusive = self.phase.write().await;
        self.state.store(State::Closing);
        self.fire(cycle);
        debug!(runner = %self.name, "closing");

        let closed = match exclusive.as_ref() {
            Some(hooks) => hooks.close().await,
            None => Ok(()),
        };
        *terminal = closed.clone().err();
        self.state.store(State::Stopped);
        abandon.armed = false;
        drop(exclusive);
        drop(terminal);

        let result = booted.and(ran).and(closed);
        match &result {
            Ok(()) => info!(runner = %self.name, "run-cycle finished"),
            Err(e) => warn!(runner = %self.name, error = %e, "run-cycle finished with error"),
        }
        result
    }

    /// Requests shutdown without waiting for it.
    ///
    /// Shares the phase lock when it can. If a transition holds it (or is queued for it),
    /// the request is decided from the published state and the cycle armed with it,
    /// instead of waiting behind the transition.
    pub(crate) fn close_async(&self) -> Result<(), RunnerError> {
        if self.state.load() == State::Stopped {
            return Err(RunnerError::unexpected_state(State::Stopped));
        }

        let _shared = self.phase.try_read().ok();
        let (cycle, state) = self.stop_target()?;
        if self.fire(cycle) {
            debug!(runner = %self.name, cycle, %state, "shutdown requested");
        }
        Ok(())
    }

    /// Requests shutdown and waits for the run-cycle to end.
    ///
    /// Must not be called from the body or from inside `while_running`: the cycle cannot
    /// end while its caller is one of the holders it waits for.
    pub(crate) async fn close(&self) -> Result<(), RunnerError> {
        self.close_async()?;

        let terminal = self.cycle.lock().await;
        match terminal.as_ref() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Runs `op` while the runner is `Running`, holding the phase lock shared.
    ///
    /// The closing transition waits for `op` to return.
    pub(crate) async fn while_running<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(H::Signal) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RunnerError>,
    {
        let _shared = self.phase.read().await;
        let state = self.state.load();
        if state != State::Running {
            return Err(RunnerError::expected_state(state, State::Running).into());
        }

        let signal = self.lock_armed().handle.clone().unwrap_or_default();
        op(signal).await
    }

    /// The cycle a stop request issued now is aimed at, with the state it was decided on.
    fn stop_target(&self) -> Result<(u64, State), RunnerError> {
        let armed = self.lock_armed();
        let state = self.state.load();
        if state == State::Stopped {
            return Err(RunnerError::unexpected_state(State::Stopped));
        }
        Ok((armed.cycle, state))
    }

    /// Installs the handle for a new cycle and publishes `Booting`. Returns the cycle number.
    fn arm(&self, handle: H::Signal) -> u64 {
        let mut armed = self.lock_armed();
        armed.cycle += 1;
        armed.handle = Some(handle);
        armed.fired = false;
        self.state.store(State::Booting);
        armed.cycle
    }

    /// Fires `cycle`'s handle unless it already fired or a newer cycle has been armed.
    /// Returns whether it fired.
    fn fire(&self, cycle: u64) -> bool {
        let mut armed = self.lock_armed();
        if armed.cycle != cycle || armed.fired {
            return false;
        }
        armed.fired = true;
        if let Some(handle) = &armed.handle {
            handle.trigger();
        }
        true
    }

    fn lock_armed(&self) -> MutexGuard<'_, Armed<H::Signal>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cleans up after a run-cycle that is dropped or unwinds before `after_running`.
struct AbandonGuard<'a, H: Hooks> {
    engine: &'a Engine<H>,
    cycle: u64,
    armed: bool,
}

impl<H: Hooks> Drop for AbandonGuard<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let engine = self.engine;
        engine.fire(self.cycle);

        match engine.phase.try_write() {
            Ok(_exclusive) => {
                engine.state.store(State::Stopped);
                warn!(runner = %engine.name, "run-cycle abandoned before after_running");
            }
            Err(_) => {
                engine.abandoned.store(true, Ordering::Release);
                engine.state.store(State::Closing);
                warn!(
                    runner = %engine.name,
                    "run-cycle abandoned while operations were in flight; left closing"
                );
            }
        }
    }
}
