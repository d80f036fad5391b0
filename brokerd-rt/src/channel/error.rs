// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors from the bidirectional broker↔module carrier
/// (`spec.md §4.1`).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer endpoint has been dropped; no further messages will
    /// ever be delivered in this direction.
    #[error("channel endpoint closed")]
    Closed,

    /// The bounded broker→module direction is full; the broker must
    /// not block its reactor thread waiting on a slow module
    /// (`spec.md §5`).
    #[error("channel full, send would block")]
    WouldBlock,

    /// No message arrived within the requested wait.
    #[error("channel receive timed out")]
    Timeout,

    /// Registering the reactor watcher for this channel failed
    /// (`spec.md §4.5`, `create` error: channel bind/watcher).
    #[error("failed to register reactor watcher: {0}")]
    WatcherRegistrationFailed(String),
}

impl ChannelError {
    /// `Closed` and `WouldBlock`/`Timeout` are all per-call and never
    /// indicate the broker itself is compromised.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ChannelError::WatcherRegistrationFailed(_))
    }
}
