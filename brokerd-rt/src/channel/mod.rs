//! The bidirectional, in-process carrier between the broker thread and
//! a module's thread.

pub mod endpoint;
pub mod error;
pub mod reactor;

pub use endpoint::{
    BrokerEnd, ModuleChannel, ModuleEnd, DEFAULT_BROKER_TO_MODULE_CAPACITY, DEFAULT_CLOSE_LINGER,
};
pub use error::ChannelError;
pub use reactor::{NoopReactorRegistrar, ReactorRegistrar, WatcherToken};
