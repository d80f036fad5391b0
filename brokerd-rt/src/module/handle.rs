// Layer 1: Standard library imports
use std::ffi::c_void;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::channel::{ChannelError, ModuleEnd};
use crate::config::BrokerConfigSnapshot;
use crate::msg::Envelope;

/// The broker handle a module's entry point receives
/// (`spec.md §4.4` step 1: "Open a broker handle using a URI that
/// binds to the broker-end endpoint via the module's `uuid`").
///
/// The wire protocol a loaded artifact uses against this handle is
/// out of scope (`spec.md §1`): this type is opaque from the
/// artifact's side (passed as `*mut c_void`) but concrete to the
/// module thread runtime, which keeps using it after `entry_point`
/// returns to drain residual requests (`spec.md §4.4` step 9).
pub struct ModuleHandle {
    channel_uri: String,
    channel: ModuleEnd,
    config: BrokerConfigSnapshot,
    module_name: String,
}

impl ModuleHandle {
    /// Bind a handle to `channel_uri` with the module's own independent
    /// config copy attached (`spec.md §4.4` steps 1 and 4).
    pub fn new(
        channel_uri: String,
        channel: ModuleEnd,
        module_name: String,
        config: BrokerConfigSnapshot,
    ) -> Self {
        Self {
            channel_uri,
            channel,
            config,
            module_name,
        }
    }

    pub fn channel_uri(&self) -> &str {
        &self.channel_uri
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn config(&self) -> &BrokerConfigSnapshot {
        &self.config
    }

    /// Mutable access to the module's independent config copy
    /// (`spec.md §3`: "the module thread is given an independent copy
    /// so it can mutate its own view without racing the broker").
    pub fn config_mut(&mut self) -> &mut BrokerConfigSnapshot {
        &mut self.config
    }

    pub fn send(&self, envelope: Envelope) -> Result<(), ChannelError> {
        self.channel.send(envelope)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Envelope, ChannelError> {
        self.channel.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Envelope, ChannelError> {
        self.channel.try_recv()
    }

    /// Raw pointer to pass as the `handle` argument of `mod_main`
    /// (`spec.md §6`). The returned pointer is valid only for as long
    /// as `self` remains alive and unmoved, which holds for the
    /// duration of the synchronous `entry_point` call
    /// (`spec.md §4.4` step 7).
    pub fn as_raw(&mut self) -> *mut c_void {
        self as *mut ModuleHandle as *mut c_void
    }
}
