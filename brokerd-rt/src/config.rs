//! The broker's configuration snapshot handed to a module thread as an
//! independent, mutable-by-the-module copy (`spec.md §3`, field
//! `conf`; `§4.4` step 4).

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::util::serde_helpers::duration_serde;

/// Default broker→module channel capacity (`spec.md §4.1`).
pub const DEFAULT_ADMIN_QUEUE_DEPTH: usize = 256;

/// Default module→broker close linger (`spec.md §4.1`).
pub const DEFAULT_CLOSE_LINGER: Duration = Duration::from_secs(3);

/// The handful of values a module thread needs independently of the
/// broker (`spec.md §3`): "the module thread is given an independent
/// copy so it can mutate its own view without racing the broker."
///
/// Modeled as a plain, `Default`-able, serde-(de)serializable struct,
/// the same way the corpus's system configuration type is modeled, so
/// a broker can persist and reload it across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfigSnapshot {
    /// URI scheme/prefix used to construct a module's channel URI
    /// (`spec.md §6`: `shmem://<uuid>`).
    pub channel_uri_scheme: String,

    /// Bound on the broker→module direction of a module's channel.
    pub admin_queue_depth: usize,

    /// How long the broker-end receiver lingers after close so a
    /// departing module can flush its terminal status report
    /// (`spec.md §4.1`).
    #[serde(with = "duration_serde")]
    pub close_linger: Duration,
}

impl Default for BrokerConfigSnapshot {
    fn default() -> Self {
        Self {
            channel_uri_scheme: "shmem".to_string(),
            admin_queue_depth: DEFAULT_ADMIN_QUEUE_DEPTH,
            close_linger: DEFAULT_CLOSE_LINGER,
        }
    }
}

/// Builder for [`BrokerConfigSnapshot`], mirroring the small
/// builder-over-`Default` pattern the corpus uses for its system
/// configuration type.
#[derive(Debug, Default)]
pub struct BrokerConfigSnapshotBuilder {
    inner: BrokerConfigSnapshot,
}

impl BrokerConfigSnapshotBuilder {
    pub fn new() -> Self {
        Self {
            inner: BrokerConfigSnapshot::default(),
        }
    }

    pub fn channel_uri_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.inner.channel_uri_scheme = scheme.into();
        self
    }

    pub fn admin_queue_depth(mut self, depth: usize) -> Self {
        self.inner.admin_queue_depth = depth;
        self
    }

    pub fn close_linger(mut self, linger: Duration) -> Self {
        self.inner.close_linger = linger;
        self
    }

    pub fn build(self) -> BrokerConfigSnapshot {
        self.inner
    }
}
