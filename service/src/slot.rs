use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, debug_span, info, trace, warn};

use crate::graph::ServiceName;
use crate::guard::{Guard, GuardState, Outcome};
use crate::Error;

/// The lifecycle of a single service slot.
///
/// Resolved and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

/// Holds the outcome of constructing one service.
///
/// The [Guard] decides which thread constructs; the cell only stores what
/// that thread produced, so reads after completion take no lock.
pub(crate) struct Slot<T: ?Sized> {
    name: ServiceName,
    guard: Guard,
    value: OnceLock<Result<Arc<T>, Error>>,
}

impl<T: ?Sized + Send + Sync> Slot<T> {
    pub(crate) const fn new(name: ServiceName) -> Self {
        Self {
            name,
            guard: Guard::new(),
            value: OnceLock::new(),
        }
    }

    /// Returns the instance stored in the slot, running `construct` first if
    /// nobody did so yet. A failed construction is stored as well and
    /// returned to every later caller.
    ///
    /// `dependencies` runs before this slot's guard is entered, so a
    /// dependency that panics or blocks never holds or poisons this slot.
    /// Its error is stored like a failed construction.
    pub(crate) fn get_or_resolve<D>(
        &self,
        dependencies: impl FnOnce() -> Result<D, Error>,
        construct: impl FnOnce(D) -> Result<Arc<T>, Error>,
    ) -> Result<Arc<T>, Error> {
        if let Some(res) = self.value.get() {
            trace!(service = %self.name, "service already resolved");
            return res.clone();
        }

        let _span = debug_span!("resolve", service = %self.name).entered();
        let deps = dependencies();

        let outcome = self.guard.ensure_performed(|| {
            debug!("resolving service");

            let start = Instant::now();
            let res = deps.and_then(construct);
            match &res {
                Ok(_) => info!(elapsed = ?start.elapsed(), "service resolved"),
                Err(e) => warn!(err = %e, "service failed to resolve"),
            }

            // the guard admits a single writer, so this never finds the cell set
            let _ = self.value.set(res);
        });

        match outcome {
            Outcome::Poisoned => Err(Error::Poisoned(self.name)),
            Outcome::Performed => self
                .value
                .get()
                .cloned()
                .unwrap_or(Err(Error::Poisoned(self.name))),
        }
    }

    /// Returns the instance if the slot resolved successfully, without
    /// triggering construction.
    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.value.get().and_then(|res| res.as_ref().ok().cloned())
    }

    pub(crate) fn state(&self) -> ResolveState {
        match self.guard.state() {
            GuardState::New => ResolveState::Unresolved,
            GuardState::InProgress => ResolveState::Resolving,
            GuardState::Poisoned => ResolveState::Failed,
            GuardState::Done => match self.value.get() {
                Some(Ok(_)) => ResolveState::Resolved,
                _ => ResolveState::Failed,
            },
        }
    }
}
