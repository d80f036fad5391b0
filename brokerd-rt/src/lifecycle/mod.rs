//! The `INIT -> RUNNING -> FINALIZING -> EXITED` state machine every
//! loaded module's record tracks (`spec.md §4.3`).

pub mod state;

pub use state::{IllegalTransition, ModuleLifecycle, ModuleStatus};
