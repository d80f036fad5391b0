// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use crate::attrs::AttrTable;
use crate::channel::{BrokerEnd, WatcherToken};
use crate::config::BrokerConfigSnapshot;
use crate::disconnect::DisconnectTracker;
use crate::lifecycle::ModuleLifecycle;
use crate::loader::{Argz, DsoHandle};
use crate::msg::{Credential, Envelope};
use crate::subscription::SubscriptionSet;
use crate::util::ModuleUuid;

/// The ownership root for one loaded module (`spec.md §3`).
///
/// Owned exclusively by the broker thread: every field the module
/// thread reads (`uuid`, `name`, `parent_uuid`, `attrs`, `conf`,
/// `argz`) is written only before `start` and is immutable afterward
/// (`spec.md §5`). The module thread never touches this struct
/// directly — it communicates through RPCs the broker handles on its
/// own thread (`spec.md §9`).
pub struct ModuleRecord {
    pub name: String,
    pub path: PathBuf,
    pub uuid: ModuleUuid,
    pub parent_uuid: ModuleUuid,
    pub dso_handle: Option<DsoHandle>,
    pub argz: Argz,
    pub rank: u32,
    pub attrs: Arc<AttrTable>,
    pub conf: Arc<BrokerConfigSnapshot>,
    pub channel_broker_end: Option<BrokerEnd>,
    pub broker_watcher: Option<WatcherToken>,
    pub last_seen: DateTime<Utc>,
    pub cred: Credential,
    pub muted: bool,
    pub lifecycle: ModuleLifecycle,
    pub errnum: i32,
    pub rmmod_queue: VecDeque<Envelope>,
    pub insmod_slot: Option<Envelope>,
    pub subs: SubscriptionSet,
    pub disconnect: Option<DisconnectTracker>,
    pub thread: Option<JoinHandle<()>>,
    /// Invoked by the broker reactor callback whenever the broker-end
    /// channel becomes readable, alongside the `last_seen` bump
    /// (`spec.md §4.1`, `§4.5` `set_poller_cb`).
    pub poller_cb: Option<Box<dyn FnMut() + Send>>,
}

impl ModuleRecord {
    /// Construct a freshly created record at `INIT`
    /// (`spec.md §3`, `§4.3`). Fields set here (`uuid`, `name`,
    /// `parent_uuid`, `attrs`, `conf`, `argz`, `cred`) are the ones
    /// that become immutable once `start` runs (`spec.md §5`).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        path: PathBuf,
        uuid: ModuleUuid,
        parent_uuid: ModuleUuid,
        dso_handle: DsoHandle,
        argz: Argz,
        rank: u32,
        attrs: Arc<AttrTable>,
        conf: Arc<BrokerConfigSnapshot>,
        channel_broker_end: BrokerEnd,
        broker_watcher: WatcherToken,
        cred: Credential,
    ) -> Self {
        Self {
            name,
            path,
            uuid,
            parent_uuid,
            dso_handle: Some(dso_handle),
            argz,
            rank,
            attrs,
            conf,
            channel_broker_end: Some(channel_broker_end),
            broker_watcher: Some(broker_watcher),
            last_seen: Utc::now(),
            cred,
            muted: false,
            lifecycle: ModuleLifecycle::new(),
            errnum: 0,
            rmmod_queue: VecDeque::new(),
            insmod_slot: None,
            subs: SubscriptionSet::new(),
            disconnect: None,
            thread: None,
            poller_cb: None,
        }
    }

    /// Broker reactor callback on readability (`spec.md §4.1`): bumps
    /// `last_seen` and invokes the registered poller callback, if any.
    pub fn on_reactor_readable(&mut self) {
        self.last_seen = Utc::now();
        if let Some(cb) = self.poller_cb.as_mut() {
            cb();
        }
    }

    /// `rmmod_queue` push (`spec.md §4.5`, `push_rmmod`): FIFO, tied to
    /// the record's own lifetime (`spec.md §3` invariant).
    pub fn push_rmmod(&mut self, msg: Envelope) {
        self.rmmod_queue.push_back(msg);
    }

    /// `rmmod_queue` pop (`spec.md §4.5`, `pop_rmmod`).
    pub fn pop_rmmod(&mut self) -> Option<Envelope> {
        self.rmmod_queue.pop_front()
    }

    /// `insmod_slot` push: replaces any prior pending request
    /// (`spec.md §4.5`, `§8` boundary behaviors).
    pub fn push_insmod(&mut self, msg: Envelope) {
        self.insmod_slot = Some(msg);
    }

    /// `insmod_slot` pop, clearing it.
    pub fn pop_insmod(&mut self) -> Option<Envelope> {
        self.insmod_slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ModuleChannel, NoopReactorRegistrar, ReactorRegistrar};
    use crate::msg::MessageType;

    fn new_test_record() -> ModuleRecord {
        let (broker_end, _module_end) = ModuleChannel::pair(4);
        let registrar = NoopReactorRegistrar::new();
        let watcher = registrar.register("test-module").unwrap();
        // Safety: no real artifact loaded in unit tests; DsoHandle
        // requires a path, so these tests exercise the queue/slot
        // logic directly via a stub built from a failed-load path
        // guard is avoided by constructing the record fields inline
        // instead of going through `DsoHandle::load`.
        let argz = Argz::new(Vec::<&str>::new()).unwrap();
        let dso_handle = match unsafe { DsoHandle::load(std::path::Path::new("/nonexistent"), None) } {
            Ok(handle) => handle,
            Err(_) => return new_test_record_without_dso(broker_end, watcher, argz),
        };
        ModuleRecord::new(
            "mod_echo".into(),
            PathBuf::from("/nonexistent"),
            ModuleUuid::new(),
            ModuleUuid::new(),
            dso_handle,
            argz,
            0,
            Arc::new(AttrTable::new()),
            Arc::new(BrokerConfigSnapshot::default()),
            broker_end,
            watcher,
            Credential::channel_owner(1000),
        )
    }

    fn new_test_record_without_dso(
        broker_end: BrokerEnd,
        watcher: WatcherToken,
        argz: Argz,
    ) -> ModuleRecord {
        ModuleRecord {
            name: "mod_echo".into(),
            path: PathBuf::from("/nonexistent"),
            uuid: ModuleUuid::new(),
            parent_uuid: ModuleUuid::new(),
            dso_handle: None,
            argz,
            rank: 0,
            attrs: Arc::new(AttrTable::new()),
            conf: Arc::new(BrokerConfigSnapshot::default()),
            channel_broker_end: Some(broker_end),
            broker_watcher: Some(watcher),
            last_seen: Utc::now(),
            cred: Credential::channel_owner(1000),
            muted: false,
            lifecycle: ModuleLifecycle::new(),
            errnum: 0,
            rmmod_queue: VecDeque::new(),
            insmod_slot: None,
            subs: SubscriptionSet::new(),
            disconnect: None,
            thread: None,
            poller_cb: None,
        }
    }

    fn sample_envelope() -> Envelope {
        Envelope::request(Credential::channel_owner(1000), vec![])
    }

    #[test]
    fn rmmod_queue_is_fifo() {
        let mut record = new_test_record();
        let mut first = sample_envelope();
        first.msg_type = MessageType::Request;
        first.payload = vec![1];
        let mut second = sample_envelope();
        second.payload = vec![2];
        record.push_rmmod(first);
        record.push_rmmod(second);
        assert_eq!(record.pop_rmmod().unwrap().payload, vec![1]);
        assert_eq!(record.pop_rmmod().unwrap().payload, vec![2]);
        assert!(record.pop_rmmod().is_none());
    }

    #[test]
    fn insmod_push_replaces_prior() {
        let mut record = new_test_record();
        let mut first = sample_envelope();
        first.payload = vec![1];
        let mut second = sample_envelope();
        second.payload = vec![2];
        record.push_insmod(first);
        record.push_insmod(second);
        assert_eq!(record.pop_insmod().unwrap().payload, vec![2]);
        assert!(record.pop_insmod().is_none());
    }

    #[test]
    fn fresh_record_starts_at_init() {
        let record = new_test_record();
        assert_eq!(record.lifecycle.status(), crate::lifecycle::ModuleStatus::Init);
        assert!(!record.muted);
    }
}
