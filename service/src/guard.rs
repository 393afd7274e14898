use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Once, OnceState};

/// The observable state of a [Guard].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// The procedure has not been started yet.
    New,
    /// A thread is currently running the procedure.
    InProgress,
    /// The procedure ran to completion.
    Done,
    /// The procedure panicked. It will never run again.
    Poisoned,
}

/// How a call to [Guard::ensure_performed] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Performed,
    Poisoned,
}

/// Runs a procedure at most once, and makes every caller wait until it has
/// completed.
///
/// Unlike [std::sync::Once], a panicking procedure is not retried by the next
/// caller: the guard records the poisoning and every later call returns
/// [Outcome::Poisoned] immediately. Writes done by the procedure happen-before
/// the return of every [Guard::ensure_performed] call observing completion.
#[derive(Debug, Default)]
pub struct Guard {
    once: Once,
    poisoned: AtomicBool,
}

impl Guard {
    pub const fn new() -> Self {
        Self {
            once: Once::new(),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Runs `procedure` if no call did so before, otherwise blocks until the
    /// call that does has finished.
    pub fn ensure_performed(&self, procedure: impl FnOnce()) -> Outcome {
        self.once.call_once_force(|state| {
            if state.poisoned() {
                // the first attempt unwound, mark it instead of trying again
                self.poisoned.store(true, Ordering::Release);
            } else {
                procedure();
            }
        });

        if self.poisoned.load(Ordering::Acquire) {
            Outcome::Poisoned
        } else {
            Outcome::Performed
        }
    }

    pub fn state(&self) -> GuardState {
        match self.once.state() {
            OnceState::New => GuardState::New,
            OnceState::InProgress => GuardState::InProgress,
            OnceState::Poisoned => GuardState::Poisoned,
            OnceState::Done if self.poisoned.load(Ordering::Acquire) => GuardState::Poisoned,
            OnceState::Done => GuardState::Done,
        }
    }
}
