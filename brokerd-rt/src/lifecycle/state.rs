// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// Layer 3: Internal module imports
// (none)

/// The four lifecycle states a loaded module passes through
/// (`spec.md §4.3`). Numeric codes are normative at the broker RPC
/// interface (`spec.md §6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleStatus {
    Init,
    Running,
    Finalizing,
    Exited,
}

impl ModuleStatus {
    /// Numeric code fixed by the broker protocol (`spec.md §6`).
    pub fn as_code(self) -> i32 {
        match self {
            ModuleStatus::Init => 0,
            ModuleStatus::Running => 1,
            ModuleStatus::Finalizing => 2,
            ModuleStatus::Exited => 3,
        }
    }

    /// `EXITED` is terminal; no transition leaves it (`spec.md §4.3`).
    pub fn is_terminal(self) -> bool {
        matches!(self, ModuleStatus::Exited)
    }
}

impl Default for ModuleStatus {
    fn default() -> Self {
        ModuleStatus::Init
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleStatus::Init => "INIT",
            ModuleStatus::Running => "RUNNING",
            ModuleStatus::Finalizing => "FINALIZING",
            ModuleStatus::Exited => "EXITED",
        };
        write!(f, "{s}")
    }
}

/// Illegal-transition error (`spec.md §4.3`: "Transition to `INIT` is
/// illegal; transition out of `EXITED` is illegal. Both are
/// asserted.").
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal lifecycle transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: ModuleStatus,
    pub to: ModuleStatus,
}

/// The only forward path a module's lifecycle may take
/// (`spec.md §4.3`): `INIT -> RUNNING -> FINALIZING -> EXITED`, with
/// no backward step and no re-entering `INIT`.
fn is_legal_transition(from: ModuleStatus, to: ModuleStatus) -> bool {
    use ModuleStatus::*;
    matches!(
        (from, to),
        (Init, Running) | (Running, Finalizing) | (Finalizing, Exited)
    )
}

type StatusCallback = Box<dyn FnMut(ModuleStatus, ModuleStatus) + Send>;

/// Tracks one module's lifecycle state and invokes a registered
/// callback on every transition (`spec.md §4.3`).
///
/// Grounded on the same state-plus-timestamp-plus-callback shape the
/// corpus uses for actor lifecycles, adapted to this module's strict
/// four-state, monotone-only machine.
pub struct ModuleLifecycle {
    status: ModuleStatus,
    last_transition: DateTime<Utc>,
    on_transition: Option<StatusCallback>,
}

impl ModuleLifecycle {
    /// A freshly created lifecycle starts at `INIT`
    /// (`spec.md §3`, `§4.3`).
    pub fn new() -> Self {
        Self {
            status: ModuleStatus::Init,
            last_transition: Utc::now(),
            on_transition: None,
        }
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn last_transition(&self) -> DateTime<Utc> {
        self.last_transition
    }

    /// Register (or replace) the status callback invoked with
    /// `(previous, current)` on every transition (`spec.md §4.3`,
    /// host API `set_status_cb`).
    pub fn set_status_cb(&mut self, cb: impl FnMut(ModuleStatus, ModuleStatus) + Send + 'static) {
        self.on_transition = Some(Box::new(cb));
    }

    /// Attempt the one legal transition from the current state.
    /// Illegal transitions are asserted per `spec.md §4.3` rather than
    /// silently ignored.
    pub fn transition_to(&mut self, new_status: ModuleStatus) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.status, new_status) {
            return Err(IllegalTransition {
                from: self.status,
                to: new_status,
            });
        }
        let previous = self.status;
        self.status = new_status;
        self.last_transition = Utc::now();
        info!(from = %previous, to = %new_status, "module lifecycle transition");
        if let Some(cb) = self.on_transition.as_mut() {
            cb(previous, new_status);
        }
        Ok(())
    }

    /// Forced transition to `EXITED`, bypassing the normal
    /// `FINALIZING` step (`spec.md §4.3`, `destroy`). Still invokes
    /// the status callback and still refuses to re-leave `EXITED`.
    pub fn force_exited(&mut self) -> Result<(), IllegalTransition> {
        if self.status.is_terminal() {
            return Ok(());
        }
        let previous = self.status;
        self.status = ModuleStatus::Exited;
        self.last_transition = Utc::now();
        info!(from = %previous, to = %ModuleStatus::Exited, forced = true, "module lifecycle transition");
        if let Some(cb) = self.on_transition.as_mut() {
            cb(previous, ModuleStatus::Exited);
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Default for ModuleLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLifecycle")
            .field("status", &self.status)
            .field("last_transition", &self.last_transition)
            .finish_non_exhaustive()
    }
}
