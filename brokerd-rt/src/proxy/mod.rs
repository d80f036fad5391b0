//! Seam for the proxy service-registration subsystem
//! (`spec.md §1`, `§6`) — a separate collaborator whose implementation
//! lives outside this core.

pub mod error;
pub mod registry;

pub use error::ProxyError;
pub use registry::{InMemoryServiceRegistry, ServiceRegistry};
