//! Route-stack and credential rewriting that lets a point-to-point
//! channel emulate ROUTER/DEALER semantics to the broker.

pub mod error;
pub mod rewrite;

pub use error::RoutingError;
pub use rewrite::{receive_rewrite, send_rewrite, MODULE_STATUS_TOPIC};
