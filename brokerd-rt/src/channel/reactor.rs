// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::ChannelError;

/// Registration handle for a reactor watcher on a broker-end channel.
///
/// Dropping a `WatcherToken` does not itself deregister anything —
/// the surrounding broker reactor (out of scope, `spec.md §1`) owns
/// that; this token exists only so the host has something concrete to
/// hold and release on `destroy` (`spec.md §4.5`).
#[derive(Debug)]
pub struct WatcherToken {
    id: u64,
}

impl WatcherToken {
    fn new(id: u64) -> Self {
        Self { id }
    }

    /// Opaque identifier assigned by the registrar, useful for log
    /// correlation.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for WatcherToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.id)
    }
}

/// The broker reactor registration seam (`spec.md §1`: "the host only
/// registers one readable-channel watcher into it").
///
/// The real reactor lives outside this core; callers provide an
/// implementation that wires the watcher into whatever event loop the
/// broker runs.
pub trait ReactorRegistrar: Send + Sync {
    /// Register interest in readability of a broker-end channel,
    /// identified by `module_uuid`. The registrar is responsible for
    /// invoking the broker's poller callback when data arrives.
    fn register(&self, module_uuid: &str) -> Result<WatcherToken, ChannelError>;

    /// Deregister a previously registered watcher.
    fn unregister(&self, token: &WatcherToken);
}

/// A `ReactorRegistrar` that always succeeds and does nothing further;
/// used in unit tests and wherever the enclosing broker's reactor is
/// not under test.
#[derive(Debug, Default)]
pub struct NoopReactorRegistrar {
    next_id: std::sync::atomic::AtomicU64,
}

impl NoopReactorRegistrar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReactorRegistrar for NoopReactorRegistrar {
    fn register(&self, _module_uuid: &str) -> Result<WatcherToken, ChannelError> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(WatcherToken::new(id))
    }

    fn unregister(&self, _token: &WatcherToken) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_registrar_assigns_increasing_ids() {
        let registrar = NoopReactorRegistrar::new();
        let a = registrar.register("mod-a").unwrap();
        let b = registrar.register("mod-b").unwrap();
        assert!(b.id() > a.id());
    }

    #[test]
    fn unregister_does_not_panic() {
        let registrar = NoopReactorRegistrar::new();
        let token = registrar.register("mod-a").unwrap();
        registrar.unregister(&token);
    }
}
