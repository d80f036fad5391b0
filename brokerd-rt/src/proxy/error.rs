// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors from the proxy service-registration interface
/// (`spec.md §6`, external collaborator).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// `remove` or `disconnect` referenced a name with no registered
    /// owner.
    #[error("service {name} not found")]
    NotFound { name: String },

    /// `remove` was attempted by a uuid that does not own the
    /// registration (`spec.md §6`: "remove fails if the caller's uuid
    /// does not match the owner").
    #[error("service {name} is not owned by the requesting module")]
    OwnerMismatch { name: String },

    /// `add` for a name that already has a different owner
    /// (`spec.md §6`: "registrations are unique by name").
    #[error("service {name} is already registered")]
    AlreadyRegistered { name: String },
}
