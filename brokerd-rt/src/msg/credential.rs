// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Sentinel userid meaning "no known identity"; receive-side rewriting
/// (`spec.md §4.2`) substitutes the channel's own userid whenever a
/// message arrives carrying this value.
pub const UNKNOWN_USERID: u32 = u32::MAX;

/// Privileged rolemask bits (`spec.md GLOSSARY`).
///
/// `OWNER` marks the sender as the instance owner, trusted to assert
/// other users' credentials — required for connector-style modules
/// (`spec.md §4.2`). `LOCAL` marks a connection that originates on the
/// local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMask(u32);

impl RoleMask {
    /// Instance-owner privilege.
    pub const OWNER: RoleMask = RoleMask(0b01);
    /// Local-connection privilege.
    pub const LOCAL: RoleMask = RoleMask(0b10);
    /// No privileges at all; used to detect an empty rolemask on
    /// receive (`spec.md §4.2`).
    pub const NONE: RoleMask = RoleMask(0);

    /// Combine with another mask.
    pub fn union(self, other: RoleMask) -> RoleMask {
        RoleMask(self.0 | other.0)
    }

    /// Whether every bit in `other` is set in `self`.
    pub fn contains(self, other: RoleMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for RoleMask {
    type Output = RoleMask;
    fn bitor(self, rhs: RoleMask) -> RoleMask {
        self.union(rhs)
    }
}

impl fmt::Display for RoleMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(RoleMask::OWNER) {
            parts.push("OWNER");
        }
        if self.contains(RoleMask::LOCAL) {
            parts.push("LOCAL");
        }
        if parts.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", parts.join("|"))
        }
    }
}

/// `(userid, rolemask)` credential carried on every message
/// (`spec.md §3`, `§6`).
///
/// The channel's own credential is fixed at creation as
/// `{uid = process uid, rolemask = OWNER|LOCAL}` and is asserted on
/// every receive to retain the `OWNER` bit (`spec.md §3` invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub userid: u32,
    pub rolemask: RoleMask,
}

impl Credential {
    /// The fixed credential assigned to a module's channel at
    /// creation: process owner, `OWNER|LOCAL` (`spec.md §3`, `§6`).
    pub fn channel_owner(process_uid: u32) -> Self {
        Self {
            userid: process_uid,
            rolemask: RoleMask::OWNER | RoleMask::LOCAL,
        }
    }

    /// Receive-side credential normalization (`spec.md §4.2`):
    /// substitute the channel's userid when the message's is unknown,
    /// and the channel's rolemask when the message's is empty.
    pub fn normalize(self, channel_cred: Credential) -> Credential {
        Credential {
            userid: if self.userid == UNKNOWN_USERID {
                channel_cred.userid
            } else {
                self.userid
            },
            rolemask: if self.rolemask.is_empty() {
                channel_cred.rolemask
            } else {
                self.rolemask
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolemask_union_and_contains() {
        let m = RoleMask::OWNER | RoleMask::LOCAL;
        assert!(m.contains(RoleMask::OWNER));
        assert!(m.contains(RoleMask::LOCAL));
        assert!(!RoleMask::OWNER.contains(RoleMask::LOCAL));
    }

    #[test]
    fn rolemask_none_is_empty() {
        assert!(RoleMask::NONE.is_empty());
        assert!(!RoleMask::OWNER.is_empty());
    }

    #[test]
    fn rolemask_display() {
        assert_eq!((RoleMask::OWNER | RoleMask::LOCAL).to_string(), "OWNER|LOCAL");
        assert_eq!(RoleMask::NONE.to_string(), "NONE");
    }

    #[test]
    fn channel_owner_has_owner_bit() {
        let cred = Credential::channel_owner(1000);
        assert!(cred.rolemask.contains(RoleMask::OWNER));
        assert_eq!(cred.userid, 1000);
    }

    #[test]
    fn normalize_substitutes_unknown_userid() {
        let channel_cred = Credential::channel_owner(1000);
        let incoming = Credential {
            userid: UNKNOWN_USERID,
            rolemask: RoleMask::OWNER,
        };
        let normalized = incoming.normalize(channel_cred);
        assert_eq!(normalized.userid, 1000);
        assert_eq!(normalized.rolemask, RoleMask::OWNER);
    }

    #[test]
    fn normalize_substitutes_empty_rolemask() {
        let channel_cred = Credential::channel_owner(1000);
        let incoming = Credential {
            userid: 42,
            rolemask: RoleMask::NONE,
        };
        let normalized = incoming.normalize(channel_cred);
        assert_eq!(normalized.userid, 42);
        assert_eq!(normalized.rolemask, channel_cred.rolemask);
    }

    #[test]
    fn normalize_keeps_known_values() {
        let channel_cred = Credential::channel_owner(1000);
        let incoming = Credential {
            userid: 7,
            rolemask: RoleMask::LOCAL,
        };
        let normalized = incoming.normalize(channel_cred);
        assert_eq!(normalized.userid, 7);
        assert_eq!(normalized.rolemask, RoleMask::LOCAL);
    }
}
