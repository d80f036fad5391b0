//! Dynamic loading of a module's shared-object artifact and the
//! packed argument vector passed to its entry point
//! (`spec.md §4.5`, `§6`, `§9`).

pub mod argz;
pub mod dso;
pub mod error;

pub use argz::{ArgvGuard, Argz};
pub use dso::{DsoHandle, ModMainFn};
pub use error::LoadError;
