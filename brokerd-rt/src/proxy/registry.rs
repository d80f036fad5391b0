// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::error::ProxyError;
use crate::msg::Envelope;
use crate::util::ModuleUuid;

/// The proxy service-registration interface (`spec.md §1`: "a separate
/// proxy service-registration subsystem that tracks pending add/remove
/// futures for downstream clients; specified briefly in §6 only as an
/// interface"). Its real implementation lives outside this core; this
/// trait is the seam the host's `destroy` path calls into so that a
/// module's registered service names are released.
pub trait ServiceRegistry: Send + Sync {
    /// Register `name` as owned by `uuid`. Fails if `name` is already
    /// registered to a different owner (`spec.md §6`).
    fn add(&self, name: &str, uuid: ModuleUuid, msg: &Envelope) -> Result<(), ProxyError>;

    /// Unregister `name`, only if `uuid` is its current owner
    /// (`spec.md §6`, `§8` boundary behavior).
    fn remove(&self, name: &str, uuid: ModuleUuid, msg: &Envelope) -> Result<(), ProxyError>;

    /// Resolve the owning module uuid for a message, by whatever
    /// addressing scheme the implementation uses (named `match` in
    /// `spec.md §6`; renamed here because `match` is a reserved word).
    fn resolve(&self, msg: &Envelope) -> Option<ModuleUuid>;

    /// Release every registration owned by `uuid`, as `destroy` does
    /// for a torn-down module (`spec.md §4.5`, `§6`).
    fn disconnect(&self, uuid: ModuleUuid);
}

/// In-memory reference implementation, grounded on the corpus's
/// DashMap-backed registry: cheap `Clone` via `Arc`, concurrent
/// lookups without a single coarse lock.
///
/// Does not implement the open-loop-unregister guarantee from
/// `spec.md §6` ("when it is torn down while service-add or
/// service-remove is still pending upstream, an open-loop unregister
/// is sent so the upstream broker's state is not leaked") — that
/// guarantee belongs to the real, out-of-core proxy implementation
/// this trait stands in for; this reference implementation exists
/// only so host tests have something to register against.
#[derive(Clone)]
pub struct InMemoryServiceRegistry {
    owners: Arc<DashMap<String, ModuleUuid>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self {
            owners: Arc::new(DashMap::new()),
        }
    }

    pub fn registered_count(&self) -> usize {
        self.owners.len()
    }
}

impl Default for InMemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn add(&self, name: &str, uuid: ModuleUuid, _msg: &Envelope) -> Result<(), ProxyError> {
        if let Some(existing) = self.owners.get(name) {
            if *existing != uuid {
                return Err(ProxyError::AlreadyRegistered {
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        self.owners.insert(name.to_string(), uuid);
        info!(name, %uuid, "service registered");
        Ok(())
    }

    fn remove(&self, name: &str, uuid: ModuleUuid, _msg: &Envelope) -> Result<(), ProxyError> {
        let Some(entry) = self.owners.get(name) else {
            return Err(ProxyError::NotFound {
                name: name.to_string(),
            });
        };
        if *entry != uuid {
            return Err(ProxyError::OwnerMismatch {
                name: name.to_string(),
            });
        }
        drop(entry);
        self.owners.remove(name);
        info!(name, %uuid, "service unregistered");
        Ok(())
    }

    fn resolve(&self, msg: &Envelope) -> Option<ModuleUuid> {
        self.owners.get(&msg.topic).map(|entry| *entry)
    }

    fn disconnect(&self, uuid: ModuleUuid) {
        let before = self.owners.len();
        self.owners.retain(|_, owner| *owner != uuid);
        let removed = before - self.owners.len();
        if removed > 0 {
            warn!(%uuid, removed, "released service registrations on disconnect");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Credential;

    fn msg(topic: &str) -> Envelope {
        let mut env = Envelope::request(Credential::channel_owner(1000), vec![]);
        env.topic = topic.to_string();
        env
    }

    #[test]
    fn add_then_resolve_finds_owner() {
        let registry = InMemoryServiceRegistry::new();
        let owner = ModuleUuid::new();
        registry.add("svc.echo", owner, &msg("svc.echo")).unwrap();
        assert_eq!(registry.resolve(&msg("svc.echo")), Some(owner));
    }

    #[test]
    fn add_duplicate_name_different_owner_fails() {
        let registry = InMemoryServiceRegistry::new();
        let a = ModuleUuid::new();
        let b = ModuleUuid::new();
        registry.add("svc.echo", a, &msg("svc.echo")).unwrap();
        let err = registry.add("svc.echo", b, &msg("svc.echo")).unwrap_err();
        assert_eq!(err, ProxyError::AlreadyRegistered { name: "svc.echo".into() });
    }

    #[test]
    fn remove_with_wrong_owner_fails() {
        let registry = InMemoryServiceRegistry::new();
        let owner = ModuleUuid::new();
        let impostor = ModuleUuid::new();
        registry.add("svc.echo", owner, &msg("svc.echo")).unwrap();
        let err = registry.remove("svc.echo", impostor, &msg("svc.echo")).unwrap_err();
        assert_eq!(err, ProxyError::OwnerMismatch { name: "svc.echo".into() });
    }

    #[test]
    fn remove_nonexistent_fails_not_found() {
        let registry = InMemoryServiceRegistry::new();
        let err = registry
            .remove("svc.missing", ModuleUuid::new(), &msg("svc.missing"))
            .unwrap_err();
        assert_eq!(err, ProxyError::NotFound { name: "svc.missing".into() });
    }

    #[test]
    fn disconnect_releases_all_owned_services() {
        let registry = InMemoryServiceRegistry::new();
        let owner = ModuleUuid::new();
        registry.add("svc.a", owner, &msg("svc.a")).unwrap();
        registry.add("svc.b", owner, &msg("svc.b")).unwrap();
        registry.disconnect(owner);
        assert_eq!(registry.registered_count(), 0);
    }

    #[test]
    fn disconnect_does_not_touch_other_owners() {
        let registry = InMemoryServiceRegistry::new();
        let a = ModuleUuid::new();
        let b = ModuleUuid::new();
        registry.add("svc.a", a, &msg("svc.a")).unwrap();
        registry.add("svc.b", b, &msg("svc.b")).unwrap();
        registry.disconnect(a);
        assert_eq!(registry.registered_count(), 1);
        assert_eq!(registry.resolve(&msg("svc.b")), Some(b));
    }
}
