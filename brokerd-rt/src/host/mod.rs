//! The broker-side module host (`spec.md §2`, `§4.5`): the component
//! that owns every loaded module's record and exposes the operations
//! the surrounding broker calls.

pub mod api;
pub mod error;

pub use api::ModuleHost;
pub use error::HostError;
