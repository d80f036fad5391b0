//! Operations exposed to the surrounding broker (`spec.md §4.5`).

// Layer 1: Standard library imports
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::error::HostError;
use crate::attrs::AttrTable;
use crate::channel::{ChannelError, ModuleChannel, ModuleEnd, ReactorRegistrar};
use crate::config::BrokerConfigSnapshot;
use crate::disconnect::disconnect_arm;
use crate::lifecycle::ModuleStatus;
use crate::loader::{Argz, DsoHandle};
use crate::module::record::ModuleRecord;
use crate::module::runtime::{self, ModuleThreadContext};
use crate::msg::{Credential, Envelope, RoleMask};
use crate::proxy::ServiceRegistry;
use crate::routing::{receive_rewrite, send_rewrite};
use crate::util::ModuleUuid;

/// Default wait for the `FINALIZING` handshake's synchronous
/// acknowledgment (`spec.md §4.3`).
const DEFAULT_FINALIZING_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Derive a module name from the artifact path basename, stripping a
/// shared-object suffix (`spec.md §3`, field `name`).
fn derive_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    stem
}

fn not_found(uuid: ModuleUuid) -> HostError {
    HostError::ModuleNotFound(uuid.route_identity())
}

/// The broker-side module host (`spec.md §2`, component 8): owns every
/// loaded module's [`ModuleRecord`], keyed by its `uuid`, and exposes
/// the operations the surrounding broker calls.
///
/// Grounded on the corpus's `ActorRegistry`: a `DashMap`-backed table
/// behind cheap, `Arc`-cloned shared state, so multiple call sites on
/// the broker thread (or a small number of cooperating threads) can
/// hold a `ModuleHost` without a single coarse lock serializing every
/// operation.
pub struct ModuleHost<R: ReactorRegistrar> {
    records: DashMap<ModuleUuid, ModuleRecord>,
    /// The module-owned channel end, held here between `create` and
    /// `start` (once a module thread takes ownership of it, the host
    /// no longer needs to track it).
    pending_module_ends: DashMap<ModuleUuid, ModuleEnd>,
    reactor: Arc<R>,
    conf: Arc<BrokerConfigSnapshot>,
    attrs: Arc<AttrTable>,
    registry: Arc<dyn ServiceRegistry>,
    own_uuid: ModuleUuid,
    process_uid: u32,
}

impl<R: ReactorRegistrar> ModuleHost<R> {
    /// `own_uuid` becomes every created module's `parent_uuid`
    /// (`spec.md §3`).
    pub fn new(
        own_uuid: ModuleUuid,
        process_uid: u32,
        conf: Arc<BrokerConfigSnapshot>,
        attrs: Arc<AttrTable>,
        reactor: Arc<R>,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Self {
        Self {
            records: DashMap::new(),
            pending_module_ends: DashMap::new(),
            reactor,
            conf,
            attrs,
            registry,
            own_uuid,
            process_uid,
        }
    }

    /// `create(parent_uuid, name?, path, rank, attrs, args)`
    /// (`spec.md §4.5`): loads the artifact, resolves `mod_main`,
    /// validates the legacy `mod_name` symbol, generates `uuid`, binds
    /// the broker-end of the channel, installs the reactor watcher.
    pub fn create(
        &self,
        name: Option<String>,
        path: PathBuf,
        rank: u32,
        args: Vec<String>,
    ) -> Result<ModuleUuid, HostError> {
        if path.as_os_str().is_empty() {
            return Err(HostError::InvalidArgument("path must not be empty".into()));
        }
        let derived_name = name.unwrap_or_else(|| derive_name_from_path(&path));
        // Safety: the caller is trusted to have authorized loading
        // this artifact (`spec.md §9`).
        let dso_handle = unsafe { DsoHandle::load(&path, Some(&derived_name))? };
        let argz = Argz::new(args).map_err(|e| HostError::InvalidArgument(e.to_string()))?;

        let uuid = ModuleUuid::new();
        let (broker_end, module_end) = ModuleChannel::pair(self.conf.admin_queue_depth);
        let watcher = self
            .reactor
            .register(&uuid.route_identity())
            .map_err(HostError::Channel)?;
        let cred = Credential::channel_owner(self.process_uid);

        let record = ModuleRecord::new(
            derived_name,
            path,
            uuid,
            self.own_uuid,
            dso_handle,
            argz,
            rank,
            Arc::clone(&self.attrs),
            Arc::clone(&self.conf),
            broker_end,
            watcher,
            cred,
        );

        self.records.insert(uuid, record);
        self.pending_module_ends.insert(uuid, module_end);
        info!(%uuid, "module record created");
        Ok(uuid)
    }

    /// `start(record)` (`spec.md §4.5`): spawns the module thread and
    /// transitions `INIT -> RUNNING`.
    pub fn start(&self, uuid: ModuleUuid) -> Result<(), HostError> {
        let module_end = self
            .pending_module_ends
            .remove(&uuid)
            .map(|(_, end)| end)
            .ok_or_else(|| HostError::InvalidArgument("module already started".into()))?;

        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        let entry_point = record
            .dso_handle
            .as_ref()
            .ok_or_else(|| HostError::InvalidArgument("module has no loaded artifact".into()))?
            .entry_point();

        let ctx = ModuleThreadContext {
            module_uuid: uuid,
            parent_uuid: record.parent_uuid,
            module_name: record.name.clone(),
            channel_uri: uuid.channel_uri(),
            channel: module_end,
            config: (*record.conf).clone(),
            attrs_snapshot: record.attrs.snapshot(),
            entry_point,
            argz: record.argz.clone(),
            synchronous_ack_timeout: DEFAULT_FINALIZING_ACK_TIMEOUT,
        };

        let thread = std::thread::Builder::new()
            .name(format!("module-{}", record.name))
            .spawn(move || {
                runtime::run(ctx);
            })
            .map_err(|err| HostError::ThreadSpawnFailed(err.to_string()))?;

        record.thread = Some(thread);
        record.lifecycle.transition_to(ModuleStatus::Running).map_err(|err| {
            HostError::InvalidArgument(err.to_string())
        })?;
        Ok(())
    }

    /// `stop(record, handle)` (`spec.md §4.5`): fire-and-forget
    /// `<name>.shutdown` request. Does not wait.
    pub fn stop(&self, uuid: ModuleUuid) -> Result<(), HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        let topic = format!("{}.shutdown", record.name);
        let envelope = Envelope::event(topic, record.cred, vec![]);
        let rewritten = send_rewrite(envelope, &record.parent_uuid.route_identity(), record.muted)?;
        record
            .channel_broker_end
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .send(rewritten)?;
        Ok(())
    }

    /// `cancel(record, error_out)` (`spec.md §4.5`, `§5`): the host
    /// has no OS-level thread-cancellation primitive available in
    /// safe Rust, so cancellation is cooperative — a `Control`
    /// envelope is sent best-effort and the module's own entry point
    /// is expected to notice it at its next suspension point
    /// (`spec.md §5`). A module with no thread at all (already
    /// exited) is tolerated as success (`spec.md §8`).
    pub fn cancel(&self, uuid: ModuleUuid) -> Result<(), HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        if record.thread.is_none() {
            return Ok(());
        }
        let envelope = Envelope::control(record.cred, b"cancel".to_vec());
        if let Some(channel) = record.channel_broker_end.as_ref() {
            if let Err(err) = channel.send(envelope) {
                warn!(%uuid, error = %err, "best-effort cancel signal failed to send");
            }
        }
        Ok(())
    }

    /// `destroy(record)` (`spec.md §4.5`): joins the thread if still
    /// running, forces `EXITED` if not already terminal, releases the
    /// disconnect tracker, watcher, channel, dynamic handle, and
    /// service registrations.
    pub fn destroy(&self, uuid: ModuleUuid) -> Result<(), HostError> {
        let (_, mut record) = self.records.remove(&uuid).ok_or_else(|| not_found(uuid))?;

        if let Some(thread) = record.thread.take() {
            if thread.join().is_err() {
                warn!(%uuid, "module thread panicked during destroy");
            }
        }

        if !record.lifecycle.is_terminal() {
            // `spec.md §4.3`: forcing EXITED here — not a cleanup
            // nicety but the fix for a disconnect racing another
            // module's destruction and resolving to this record.
            let _ = record.lifecycle.force_exited();
        }

        if let Some(mut tracker) = record.disconnect.take() {
            tracker.fire_all();
        }

        if let Some(watcher) = record.broker_watcher.take() {
            self.reactor.unregister(&watcher);
        }

        self.registry.disconnect(uuid);

        // Dropping these releases the channel, the dynamic handle
        // (unless leak-on-destroy was selected), argz, and the
        // subscription/admin-queue state along with the record itself
        // (`spec.md §4.5`).
        record.channel_broker_end = None;
        record.dso_handle = None;

        info!(%uuid, "module destroyed");
        Ok(())
    }

    /// `send(record, msg)` (`spec.md §4.2`, `§4.5`).
    pub fn send(&self, uuid: ModuleUuid, envelope: Envelope) -> Result<(), HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        let rewritten = send_rewrite(envelope, &record.parent_uuid.route_identity(), record.muted)?;
        record
            .channel_broker_end
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .send(rewritten)?;
        Ok(())
    }

    /// `receive(record)` (`spec.md §4.2`, `§4.5`): pulls one message,
    /// rewrites, validates credentials.
    pub fn receive(&self, uuid: ModuleUuid) -> Result<Envelope, HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        debug_assert!(
            record.cred.rolemask.contains(RoleMask::OWNER),
            "channel credential must retain OWNER bit (spec invariant)"
        );
        let raw = record
            .channel_broker_end
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .try_recv()?;
        let rewritten = receive_rewrite(raw, &record.uuid.route_identity(), record.cred)?;
        record.last_seen = Utc::now();
        Ok(rewritten)
    }

    /// `subscribe(record, topic)` (`spec.md §4.5`).
    pub fn subscribe(&self, uuid: ModuleUuid, topic: impl Into<String>) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.subs.subscribe(topic);
        Ok(())
    }

    /// `unsubscribe(record, topic)` (`spec.md §4.5`, `§8`: a
    /// non-present topic is a no-op).
    pub fn unsubscribe(&self, uuid: ModuleUuid, topic: &str) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.subs.unsubscribe(topic);
        Ok(())
    }

    /// `event_cast(record, msg)` (`spec.md §4.5`): delivers iff a
    /// subscription topic prefixes the message topic. Returns whether
    /// delivery occurred.
    pub fn event_cast(&self, uuid: ModuleUuid, envelope: Envelope) -> Result<bool, HostError> {
        let matches = {
            let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
            record.subs.matches(&envelope)
        };
        if !matches {
            return Ok(false);
        }
        self.send(uuid, envelope)?;
        Ok(true)
    }

    /// `push_rmmod(record, msg)` (`spec.md §4.5`).
    pub fn push_rmmod(&self, uuid: ModuleUuid, msg: Envelope) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.push_rmmod(msg);
        Ok(())
    }

    /// `pop_rmmod(record) -> msg?` (`spec.md §4.5`).
    pub fn pop_rmmod(&self, uuid: ModuleUuid) -> Result<Option<Envelope>, HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.pop_rmmod())
    }

    /// `push_insmod(record, msg)` (`spec.md §4.5`, `§8`: replaces any
    /// prior pending request).
    pub fn push_insmod(&self, uuid: ModuleUuid, msg: Envelope) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.push_insmod(msg);
        Ok(())
    }

    /// `pop_insmod(record) -> msg?` (`spec.md §4.5`).
    pub fn pop_insmod(&self, uuid: ModuleUuid) -> Result<Option<Envelope>, HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.pop_insmod())
    }

    /// `set_poller_cb(record, cb)` (`spec.md §4.5`).
    pub fn set_poller_cb(
        &self,
        uuid: ModuleUuid,
        cb: impl FnMut() + Send + 'static,
    ) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.poller_cb = Some(Box::new(cb));
        Ok(())
    }

    /// `set_status_cb(record, cb)` (`spec.md §4.3`, `§4.5`).
    pub fn set_status_cb(
        &self,
        uuid: ModuleUuid,
        cb: impl FnMut(ModuleStatus, ModuleStatus) + Send + 'static,
    ) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.lifecycle.set_status_cb(cb);
        Ok(())
    }

    /// `set_errnum(record, errnum)` (`spec.md §4.5`).
    pub fn set_errnum(&self, uuid: ModuleUuid, errnum: i32) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.errnum = errnum;
        Ok(())
    }

    /// `get_errnum(record)` (`spec.md §4.5`).
    pub fn get_errnum(&self, uuid: ModuleUuid) -> Result<i32, HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.errnum)
    }

    /// `get_last_seen(record)` (`spec.md §4.5`).
    pub fn get_last_seen(&self, uuid: ModuleUuid) -> Result<DateTime<Utc>, HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.last_seen)
    }

    /// `get_name(record)` (`spec.md §4.5`).
    pub fn get_name(&self, uuid: ModuleUuid) -> Result<String, HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.name.clone())
    }

    /// `get_path(record)` (`spec.md §4.5`).
    pub fn get_path(&self, uuid: ModuleUuid) -> Result<PathBuf, HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.path.clone())
    }

    /// `get_uuid(record)` (`spec.md §4.5`) — trivially the key itself,
    /// kept for interface parity.
    pub fn get_uuid(&self, uuid: ModuleUuid) -> Result<ModuleUuid, HostError> {
        self.records
            .get(&uuid)
            .map(|record| record.uuid)
            .ok_or_else(|| not_found(uuid))
    }

    /// `get_status(record)` (`spec.md §4.5`).
    pub fn get_status(&self, uuid: ModuleUuid) -> Result<ModuleStatus, HostError> {
        let record = self.records.get(&uuid).ok_or_else(|| not_found(uuid))?;
        Ok(record.lifecycle.status())
    }

    /// `mute(record, muted)` (`spec.md §3`, `§4.5`).
    pub fn mute(&self, uuid: ModuleUuid, muted: bool) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        record.muted = muted;
        Ok(())
    }

    /// `disconnect_arm(record, msg, callback, arg)` (`spec.md §4.6`).
    pub fn disconnect_arm(
        &self,
        uuid: ModuleUuid,
        sender: impl Into<String>,
        matchtag: u64,
        callback: impl FnMut(&str, u64) + Send + 'static,
    ) -> Result<(), HostError> {
        let mut record = self.records.get_mut(&uuid).ok_or_else(|| not_found(uuid))?;
        disconnect_arm(&mut record.disconnect, sender, matchtag, callback);
        Ok(())
    }

    /// Number of live module records, useful for diagnostics and
    /// tests.
    pub fn module_count(&self) -> usize {
        self.records.len()
    }
}
