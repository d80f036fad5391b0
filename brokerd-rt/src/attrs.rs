//! The broker's attribute table, referenced read-only by a module
//! after its priming step (`spec.md §3`, field `attrs`; `§4.4` step 2).

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
// (none)

/// A key-value table of broker-known-immutable attribute strings.
///
/// Owned by the broker; a module thread primes its own read-only cache
/// from a snapshot at startup (`spec.md §4.4` step 2) and never
/// mutates this table directly (`spec.md §3`: "reference to the
/// broker's attribute table (read-only from the module side after a
/// priming step)").
#[derive(Debug, Default)]
pub struct AttrTable {
    values: RwLock<HashMap<String, String>>,
}

impl AttrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker-side write. Not exposed to module code.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// A read-only snapshot suitable for priming a module's own cache
    /// (`spec.md §4.4` step 2).
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let attrs = AttrTable::new();
        attrs.set("cluster.rank", "0");
        assert_eq!(attrs.get("cluster.rank"), Some("0".to_string()));
    }

    #[test]
    fn missing_key_is_none() {
        let attrs = AttrTable::new();
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let attrs = AttrTable::new();
        attrs.set("a", "1");
        let snap = attrs.snapshot();
        attrs.set("a", "2");
        assert_eq!(snap.get("a"), Some(&"1".to_string()));
        assert_eq!(attrs.get("a"), Some("2".to_string()));
    }
}
