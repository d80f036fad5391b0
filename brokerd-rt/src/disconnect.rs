//! Per-peer outstanding-interaction tracking so that a vanished peer
//! can be followed by synthetic disconnect notifications
//! (`spec.md §2` component 1, `§4.6`).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
// (none)

/// A recorded `(sender, matchtag)` tuple awaiting a synthetic
/// disconnect notification (`spec.md §4.6`).
struct ArmedEntry {
    sender: String,
    matchtag: u64,
    callback: Box<dyn FnMut(&str, u64) + Send>,
}

impl std::fmt::Debug for ArmedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmedEntry")
            .field("sender", &self.sender)
            .field("matchtag", &self.matchtag)
            .finish_non_exhaustive()
    }
}

/// Tracks armed disconnect callbacks for one module record.
///
/// Constructed lazily: a record holds `Option<DisconnectTracker>` and
/// only allocates one on the first call to `arm` (`spec.md §4.6`:
/// "lazily constructs a disconnect tracker").
#[derive(Debug, Default)]
pub struct DisconnectTracker {
    entries: Vec<ArmedEntry>,
}

impl DisconnectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(sender, matchtag)` with its callback, to be fired on
    /// `fire_all` (normally invoked from `destroy`, `spec.md §4.6`).
    pub fn arm(
        &mut self,
        sender: impl Into<String>,
        matchtag: u64,
        callback: impl FnMut(&str, u64) + Send + 'static,
    ) {
        self.entries.push(ArmedEntry {
            sender: sender.into(),
            matchtag,
            callback: Box::new(callback),
        });
    }

    /// Fire every armed callback with its recorded tuple, then clear
    /// the tracker. Called once, from `destroy` (`spec.md §4.6`).
    pub fn fire_all(&mut self) {
        debug!(count = self.entries.len(), "firing synthetic disconnects");
        for mut entry in self.entries.drain(..) {
            (entry.callback)(&entry.sender, entry.matchtag);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lazily-constructing arm helper mirroring `disconnect_arm(record,
/// msg, callback, arg)` (`spec.md §4.6`): a record passes its
/// `Option<DisconnectTracker>` slot, which is created on first use.
pub fn disconnect_arm(
    slot: &mut Option<DisconnectTracker>,
    sender: impl Into<String>,
    matchtag: u64,
    callback: impl FnMut(&str, u64) + Send + 'static,
) {
    slot.get_or_insert_with(DisconnectTracker::new)
        .arm(sender, matchtag, callback);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn arm_then_fire_invokes_callback_with_recorded_tuple() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = DisconnectTracker::new();
        let seen_clone = Arc::clone(&seen);
        tracker.arm("client-1", 42, move |sender, matchtag| {
            seen_clone.lock().unwrap().push((sender.to_string(), matchtag));
        });
        tracker.fire_all();
        assert_eq!(seen.lock().unwrap().as_slice(), &[("client-1".to_string(), 42)]);
    }

    #[test]
    fn fire_all_clears_entries() {
        let mut tracker = DisconnectTracker::new();
        tracker.arm("client-1", 1, |_, _| {});
        tracker.fire_all();
        assert!(tracker.is_empty());
    }

    #[test]
    fn lazy_arm_creates_tracker_on_first_use() {
        let mut slot: Option<DisconnectTracker> = None;
        disconnect_arm(&mut slot, "client-1", 1, |_, _| {});
        assert!(slot.is_some());
        assert_eq!(slot.unwrap().len(), 1);
    }

    #[test]
    fn multiple_entries_fire_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = DisconnectTracker::new();
        for i in 0..3 {
            let order_clone = Arc::clone(&order);
            tracker.arm(format!("client-{i}"), i as u64, move |sender, _| {
                order_clone.lock().unwrap().push(sender.to_string());
            });
        }
        tracker.fire_all();
        assert_eq!(
            order.lock().unwrap().as_slice(),
            &["client-0".to_string(), "client-1".to_string(), "client-2".to_string()]
        );
    }
}
