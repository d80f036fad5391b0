// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors from rewriting a message's route stack or credentials on
/// send or receive (`spec.md §4.2`, `§7`).
///
/// Routing errors are scoped to a single message: the surrounding
/// `ModuleRecord` remains viable and the caller simply drops the
/// offending message (`spec.md §7`: "the individual message is
/// dropped, the record remains viable").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// A `RESPONSE` arrived (or was about to be sent) with an empty
    /// route stack — there is no hop to pop (`spec.md §4.2`).
    #[error("route stack underflow on {direction} {msg_type} rewrite")]
    RouteStackUnderflow {
        direction: &'static str,
        msg_type: &'static str,
    },

    /// `send` was attempted on a muted record with a message other
    /// than a RESPONSE to the module-status topic (`spec.md §3`,
    /// `§4.2`).
    #[error("operation unsupported while module is muted: {reason}")]
    MutedUnsupported { reason: String },
}

impl RoutingError {
    /// Routing errors never indicate broker-fatal conditions
    /// (`spec.md §7`); they're always scoped to the one message.
    pub fn is_transient(&self) -> bool {
        true
    }
}
