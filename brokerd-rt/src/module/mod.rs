//! The module record (ownership root) and the module-owned thread
//! runtime it spawns (`spec.md §3`, `§4.4`).

pub mod handle;
pub mod record;
pub mod runtime;

pub use handle::ModuleHandle;
pub use record::ModuleRecord;
pub use runtime::{ModuleThreadContext, ModuleThreadOutcome, CONNECTION_RESET_ERRNO};
