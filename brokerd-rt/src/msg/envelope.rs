// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::credential::Credential;
use super::types::MessageType;

/// A message crossing the broker/module boundary (`spec.md §3`).
///
/// `route` is the route stack: for a `Request` it is the breadcrumb
/// trail of identities a `Response` must retrace in reverse
/// (`spec.md §4.2`); for an `Event` it is unused. `topic` carries the
/// subscription-prefix key for `Event` messages (`spec.md §4.2`) and is
/// empty otherwise. `payload` is opaque to this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub msg_type: MessageType,
    pub route: Vec<String>,
    pub topic: String,
    pub credential: Credential,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Construct a `Request` envelope with an empty route stack ready
    /// for broker-side identity pushes (`spec.md §4.2`).
    pub fn request(credential: Credential, payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::Request,
            route: Vec::new(),
            topic: String::new(),
            credential,
            payload,
        }
    }

    /// Construct a `Response` envelope carrying the route stack popped
    /// from the originating `Request` (`spec.md §4.2`).
    pub fn response(route: Vec<String>, credential: Credential, payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::Response,
            route,
            topic: String::new(),
            credential,
            payload,
        }
    }

    /// Construct an `Event` envelope addressed by topic
    /// (`spec.md §4.2`).
    pub fn event(topic: impl Into<String>, credential: Credential, payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::Event,
            route: Vec::new(),
            topic: topic.into(),
            credential,
            payload,
        }
    }

    /// Construct a `Control` envelope with no payload beyond what the
    /// caller supplies (`spec.md §4.3`).
    pub fn control(credential: Credential, payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::Control,
            route: Vec::new(),
            topic: String::new(),
            credential,
            payload,
        }
    }

    /// Push an identity onto the route stack (receive-side rewrite on
    /// the way into a module, `spec.md §4.2`).
    pub fn push_route(&mut self, identity: impl Into<String>) {
        self.route.push(identity.into());
    }

    /// Pop the most recently pushed identity from the route stack
    /// (send-side rewrite on the way out of a module, `spec.md §4.2`).
    /// Returns `None` on an empty stack — callers must treat this as a
    /// routing error (`spec.md §4.2`, `§7`), never silently ignore it.
    pub fn pop_route(&mut self) -> Option<String> {
        self.route.pop()
    }

    /// Whether this envelope matches a subscribed topic prefix
    /// (`spec.md §4.2`, `§4.5`): any subscription topic that is a
    /// prefix of the message topic matches, `.`-separated or not.
    pub fn topic_matches(&self, prefix: &str) -> bool {
        self.topic.starts_with(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::credential::Credential;

    fn cred() -> Credential {
        Credential::channel_owner(1000)
    }

    #[test]
    fn request_starts_with_empty_route() {
        let env = Envelope::request(cred(), vec![1, 2, 3]);
        assert!(env.route.is_empty());
        assert_eq!(env.msg_type, MessageType::Request);
    }

    #[test]
    fn push_then_pop_route_round_trips() {
        let mut env = Envelope::request(cred(), vec![]);
        env.push_route("broker");
        env.push_route("module-a");
        assert_eq!(env.pop_route(), Some("module-a".to_string()));
        assert_eq!(env.pop_route(), Some("broker".to_string()));
        assert_eq!(env.pop_route(), None);
    }

    #[test]
    fn topic_matches_exact_and_prefix() {
        let env = Envelope::event("sensors/temp", cred(), vec![]);
        assert!(env.topic_matches("sensors/temp"));
        assert!(env.topic_matches("sensors"));
        assert!(!env.topic_matches("sensors/humidity"));
        assert!(!env.topic_matches("sens"));
    }

    #[test]
    fn control_has_no_topic_or_route() {
        let env = Envelope::control(cred(), vec![]);
        assert!(env.topic.is_empty());
        assert!(env.route.is_empty());
        assert_eq!(env.msg_type, MessageType::Control);
    }
}
