// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::channel::ChannelError;
use crate::loader::LoadError;
use crate::routing::RoutingError;

/// The top-level error returned by the host API (`spec.md §4.5`),
/// wrapping each component layer's own error type the way the
/// corpus's top-level `BrokerError`/`SystemError` wrap narrower
/// per-subsystem errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// `send`/`receive`/`subscribe`/... attempted on a uuid with no
    /// corresponding record.
    #[error("no module registered with uuid {0}")]
    ModuleNotFound(String),

    /// `spec.md §4.5`: "All API entries validate arguments and fail
    /// with invalid-argument rather than crashing on
    /// NULL-equivalents."
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `start` could not spawn the module's thread
    /// (`spec.md §4.5`, `§7`: thread errors).
    #[error("failed to spawn module thread: {0}")]
    ThreadSpawnFailed(String),
}

impl HostError {
    /// Mirrors the corpus's `SystemError::is_fatal` /
    /// `BrokerError` helper-method pattern so a surrounding broker can
    /// make retry decisions without matching on every variant
    /// (`spec.md §7`: "Fatal-to-the-broker conditions are: failure to
    /// spawn a module thread the broker considers essential (caller
    /// decides); otherwise nothing here aborts the broker.").
    pub fn is_fatal_to_caller(&self) -> bool {
        matches!(self, HostError::ThreadSpawnFailed(_))
    }

    /// Routing and channel errors are scoped to a single message or
    /// call and never indicate the record itself is unusable
    /// (`spec.md §7`).
    pub fn is_transient(&self) -> bool {
        match self {
            HostError::Routing(err) => err.is_transient(),
            HostError::Channel(err) => err.is_transient(),
            HostError::ModuleNotFound(_) | HostError::InvalidArgument(_) => true,
            HostError::Load(_) | HostError::ThreadSpawnFailed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_spawn_failure_is_fatal_to_caller() {
        let err = HostError::ThreadSpawnFailed("out of threads".into());
        assert!(err.is_fatal_to_caller());
    }

    #[test]
    fn module_not_found_is_transient_and_not_fatal() {
        let err = HostError::ModuleNotFound("abc".into());
        assert!(err.is_transient());
        assert!(!err.is_fatal_to_caller());
    }

    #[test]
    fn channel_error_wraps_through_from() {
        let err: HostError = ChannelError::Closed.into();
        assert!(matches!(err, HostError::Channel(ChannelError::Closed)));
    }
}
