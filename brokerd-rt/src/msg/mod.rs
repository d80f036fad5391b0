//! Message envelope, credential, and type vocabulary exchanged between
//! the broker and a loaded module's thread.

pub mod credential;
pub mod envelope;
pub mod types;

pub use credential::{Credential, RoleMask, UNKNOWN_USERID};
pub use envelope::Envelope;
pub use types::MessageType;
