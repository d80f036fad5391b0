// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Unique identifier for a loaded module.
///
/// Freshly generated at `create` time (`spec.md §3`). Its stringified
/// form is used verbatim as the route-stack identity the broker uses
/// to address the module, and as the `shmem://<uuid>` channel URI
/// (`spec.md §6`).
///
/// # Examples
///
/// ```rust
/// use brokerd_rt::util::ModuleUuid;
///
/// let a = ModuleUuid::new();
/// let b = ModuleUuid::new();
/// assert_ne!(a, b);
/// assert!(a.channel_uri().starts_with("shmem://"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleUuid(Uuid);

impl ModuleUuid {
    /// Generate a fresh, random module identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (used when the broker's own identity is
    /// reused as a module's `parent_uuid`).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID value.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The `shmem://<uuid>` channel URI the module thread binds its
    /// broker handle to (`spec.md §6`).
    pub fn channel_uri(&self) -> String {
        format!("shmem://{}", self.0)
    }

    /// The route-stack identity string for this module, i.e. the
    /// stringified UUID (`spec.md §3`).
    pub fn route_identity(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ModuleUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ModuleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_per_instance() {
        assert_ne!(ModuleUuid::new(), ModuleUuid::new());
    }

    #[test]
    fn channel_uri_is_shmem_scheme() {
        let id = ModuleUuid::new();
        let uri = id.channel_uri();
        assert!(uri.starts_with("shmem://"));
        assert!(uri.ends_with(&id.route_identity()));
    }

    #[test]
    fn route_identity_round_trips_through_uuid() {
        let raw = Uuid::new_v4();
        let id = ModuleUuid::from_uuid(raw);
        assert_eq!(id.route_identity(), raw.to_string());
    }

    #[test]
    fn display_matches_route_identity() {
        let id = ModuleUuid::new();
        assert_eq!(format!("{id}"), id.route_identity());
    }
}
