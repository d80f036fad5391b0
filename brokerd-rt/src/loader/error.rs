// Layer 1: Standard library imports
use std::path::PathBuf;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors from opening a loadable artifact and resolving its entry
/// points (`spec.md §4.5`, `create`).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open loadable artifact at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("artifact at {path} is missing required entry symbol `mod_main`")]
    EntryPointMissing { path: PathBuf },

    #[error("legacy symbol `mod_name` = {found:?} does not match requested name {expected:?}")]
    NameMismatch { expected: String, found: String },

    #[error("out of memory constructing module record for {path}")]
    NoMemory { path: PathBuf },
}

impl LoadError {
    /// All three map to the host API's documented `create` error
    /// taxonomy (`spec.md §4.5`): not-found, invalid, no-memory.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            LoadError::EntryPointMissing { .. } | LoadError::NameMismatch { .. }
        )
    }
}
