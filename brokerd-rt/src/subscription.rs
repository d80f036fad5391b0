//! Ordered set of topic prefixes a module has asked to receive as
//! events (`spec.md §2` component 2, `§4.5`).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::msg::Envelope;

/// Subscription set for one module.
///
/// Duplicates are permitted — they exist only to simplify a caller's
/// own reference counting (`spec.md §4.5`) — but a single
/// `unsubscribe` removes only the first matching entry, leaving any
/// duplicates registered.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionSet {
    topics: Vec<String>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic prefix. Duplicates are allowed.
    pub fn subscribe(&mut self, topic: impl Into<String>) {
        self.topics.push(topic.into());
    }

    /// Remove the first occurrence of `topic`; a non-present topic is
    /// a no-op (`spec.md §8`, boundary behaviors).
    pub fn unsubscribe(&mut self, topic: &str) {
        if let Some(pos) = self.topics.iter().position(|t| t == topic) {
            self.topics.remove(pos);
        }
    }

    /// Whether any registered prefix matches the envelope's topic
    /// (`spec.md §4.2`, `event_cast`).
    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.topics.iter().any(|prefix| envelope.topic_matches(prefix))
    }

    /// Current subscription count, including duplicates.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Iterate registered topic prefixes in subscribe order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }
}
