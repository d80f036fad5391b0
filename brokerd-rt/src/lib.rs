//! # brokerd-rt - Broker-Side Dynamic Module Host
//!
//! Loads shared-object modules into their own OS thread, isolated by
//! deep-bind `dlopen` and a point-to-point channel that emulates
//! ROUTER/DEALER addressing toward the surrounding broker
//! (`spec.md §1`-`§2`).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use brokerd_rt::host::ModuleHost;
//! use brokerd_rt::channel::NoopReactorRegistrar;
//! use brokerd_rt::proxy::InMemoryServiceRegistry;
//! use brokerd_rt::{attrs::AttrTable, config::BrokerConfigSnapshot, util::ModuleUuid};
//! use std::sync::Arc;
//!
//! let process_uid = 1000;
//! let host = ModuleHost::new(
//!     ModuleUuid::new(),
//!     process_uid,
//!     Arc::new(BrokerConfigSnapshot::default()),
//!     Arc::new(AttrTable::new()),
//!     Arc::new(NoopReactorRegistrar::new()),
//!     Arc::new(InMemoryServiceRegistry::new()),
//! );
//!
//! let uuid = host.create(None, "mod_echo.so".into(), 0, vec![])?;
//! host.start(uuid)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! ## Module Host
//! - [`host`] - `ModuleHost`: create/start/stop/destroy and the rest of the broker-facing API
//! - [`module`] - `ModuleRecord` (ownership root) and the module thread runtime
//! - [`loader`] - Deep-bind `dlopen` loading and the `mod_main` ABI
//!
//! ## Messaging
//! - [`msg`] - `Envelope`, `Credential`, `MessageType`
//! - [`routing`] - Route-stack rewriting that emulates ROUTER/DEALER over a point-to-point channel
//! - [`channel`] - The bidirectional broker/module channel and the reactor registration seam
//! - [`subscription`] - Topic-prefix subscriptions for `event_cast`
//! - [`disconnect`] - Synthetic peer-vanish notifications on `destroy`
//!
//! ## State and Configuration
//! - [`lifecycle`] - The `INIT -> RUNNING -> FINALIZING -> EXITED` state machine
//! - [`config`] - Broker configuration snapshot handed to each module
//! - [`attrs`] - The broker's read-only attribute table
//!
//! ## Collaborating Subsystems
//! - [`proxy`] - Seam for service name registration (implementation lives outside this core)
//!
//! ## Infrastructure
//! - [`util`] - Utilities (`ModuleUuid`)
//!
//! # Standards Compliance
//!
//! This crate follows the same workspace standards as its sibling crates:
//! - **§2.1**: 3-layer import organization (std → third-party → internal)
//! - **§3.2**: chrono DateTime<Utc> for all timestamps
//! - **§4.3**: Module architecture (mod.rs only declarations)
//! - **§7.2-§7.3**: Professional documentation (Diátaxis framework)

pub mod attrs;
pub mod channel;
pub mod config;
pub mod disconnect;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod msg;
pub mod proxy;
pub mod routing;
pub mod subscription;
pub mod util;

// Re-export commonly used types
pub use attrs::AttrTable;
pub use channel::{BrokerEnd, ChannelError, ModuleChannel, ModuleEnd, ReactorRegistrar, WatcherToken};
pub use config::BrokerConfigSnapshot;
pub use host::{HostError, ModuleHost};
pub use lifecycle::{IllegalTransition, ModuleLifecycle, ModuleStatus};
pub use loader::{ArgvGuard, Argz, DsoHandle, LoadError, ModMainFn};
pub use module::{ModuleHandle, ModuleRecord, ModuleThreadContext, ModuleThreadOutcome};
pub use msg::{Credential, Envelope, MessageType, RoleMask};
pub use proxy::{InMemoryServiceRegistry, ProxyError, ServiceRegistry};
pub use routing::{receive_rewrite, send_rewrite, RoutingError};
pub use subscription::SubscriptionSet;
pub use util::ModuleUuid;
