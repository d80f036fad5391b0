// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// The four message kinds the broker and a module thread exchange
/// over the bidirectional carrier (`spec.md §3`, `§4.2`).
///
/// `Request`/`Response` are paired by the route stack; `Event` is
/// fan-out delivery keyed by topic prefix (`spec.md §4.2`); `Control`
/// carries host-internal signaling such as the `FINALIZING` handshake
/// (`spec.md §4.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Request,
    Response,
    Event,
    Control,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Event => "event",
            MessageType::Control => "control",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(MessageType::Request.to_string(), "request");
        assert_eq!(MessageType::Response.to_string(), "response");
        assert_eq!(MessageType::Event.to_string(), "event");
        assert_eq!(MessageType::Control.to_string(), "control");
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(MessageType::Event, MessageType::Event);
        assert_ne!(MessageType::Event, MessageType::Request);
    }
}
