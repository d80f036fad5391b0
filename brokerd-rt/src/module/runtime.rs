//! The code executed on a module-owned thread (`spec.md §4.4`).

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// Layer 3: Internal module imports
use super::handle::ModuleHandle;
use crate::channel::{ChannelError, ModuleEnd};
use crate::config::BrokerConfigSnapshot;
use crate::lifecycle::ModuleStatus;
use crate::loader::{Argz, ModMainFn};
use crate::msg::{Credential, Envelope, MessageType};
use crate::routing::MODULE_STATUS_TOPIC;
use crate::util::ModuleUuid;

/// Substitute errno used when the entry point reports failure without
/// setting one (`spec.md §4.4` step 7): the POSIX value for
/// `ECONNRESET`, chosen because a zero-errnum failure here means the
/// module's own channel to its peers broke without a specific cause.
pub const CONNECTION_RESET_ERRNO: i32 = 104;

/// Everything the module thread needs to run, handed over by `start`
/// (`spec.md §4.5`) and otherwise untouched by the broker thread while
/// the module thread owns it.
pub struct ModuleThreadContext {
    pub module_uuid: ModuleUuid,
    pub parent_uuid: ModuleUuid,
    pub module_name: String,
    pub channel_uri: String,
    pub channel: ModuleEnd,
    pub config: BrokerConfigSnapshot,
    pub attrs_snapshot: HashMap<String, String>,
    pub entry_point: ModMainFn,
    pub argz: Argz,
    pub synchronous_ack_timeout: Duration,
}

/// The outcome handed back to whatever observes the thread's join
/// (`spec.md §4.4` steps 10-11): the terminal errno the broker should
/// surface in its diagnostics (`spec.md §7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleThreadOutcome {
    pub errnum: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModuleStatusReport {
    status: i32,
    errnum: i32,
}

/// Run the full module thread body (`spec.md §4.4`, steps 1-11).
///
/// Failures in steps 1-5 are logged and jump straight to step 11
/// without invoking the entry point (`spec.md §4.4`, failure
/// semantics); none of those steps can currently fail in this
/// implementation (there is no real OS-level bind or service
/// registration to fail), so the jump is modeled but never taken —
/// it is kept because a future host extension (e.g. a real built-in
/// service registration that can fail) must preserve it.
pub fn run(ctx: ModuleThreadContext) -> ModuleThreadOutcome {
    let ModuleThreadContext {
        module_uuid,
        parent_uuid,
        module_name,
        channel_uri,
        channel,
        config,
        attrs_snapshot,
        entry_point,
        argz,
        synchronous_ack_timeout,
    } = ctx;

    debug!(module = %module_name, step = 1, "opening broker handle");
    let mut handle = ModuleHandle::new(channel_uri, channel, module_name.clone(), config);

    debug!(module = %module_name, step = 2, attrs = attrs_snapshot.len(), "priming attribute cache");
    // Attribute values are immutable once primed; nothing further to
    // do beyond having taken the snapshot (`spec.md §4.4` step 2).
    let _ = &attrs_snapshot;

    debug!(module = %module_name, step = 3, "setting logging application name");
    info!(module = %module_name, "module thread starting");

    debug!(module = %module_name, step = 4, "config already attached to handle");

    debug!(module = %module_name, step = 5, "registering built-in per-module services");
    // stats / ping / shutdown / subscribe / unsubscribe / debug are
    // broker collaborators out of this core's scope (`spec.md §4.4`).

    debug!(module = %module_name, step = 6, "blocking signals on module thread");
    block_all_signals();

    debug!(module = %module_name, step = 7, "invoking entry point");
    let (ret, mut errnum) = invoke_entry_point(entry_point, &mut handle, &argz);
    if ret != 0 && errnum == 0 {
        warn!(module = %module_name, "entry point failed with no errno, substituting connection-reset");
        errnum = CONNECTION_RESET_ERRNO;
    }

    debug!(module = %module_name, step = 8, "sending synchronous FINALIZING status report");
    let pre_drained = match send_status_report_sync(
        &handle,
        &parent_uuid,
        ModuleStatus::Finalizing,
        errnum,
        synchronous_ack_timeout,
    ) {
        Ok(pre_drained) => pre_drained,
        Err(err) => {
            error!(module = %module_name, error = %err, "FINALIZING handshake failed, continuing to drain");
            Vec::new()
        }
    };

    debug!(module = %module_name, step = 9, "draining residual requests");
    drain_residual_requests(&handle, &module_uuid, pre_drained);

    debug!(module = %module_name, step = 10, "sending fire-and-forget EXITED status report");
    if let Err(err) = send_status_report_async(&handle, &parent_uuid, ModuleStatus::Exited, errnum)
    {
        error!(module = %module_name, error = %err, "terminal EXITED status report failed");
    }

    debug!(module = %module_name, step = 11, "closing handle");
    info!(module = %module_name, errnum, "module thread exiting");
    ModuleThreadOutcome { errnum }
}

#[cfg(target_family = "unix")]
fn block_all_signals() {
    use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow};
    let all = SigSet::all();
    if let Err(err) = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&all), None) {
        warn!(error = %err, "failed to block signals on module thread");
    }
}

#[cfg(not(target_family = "unix"))]
fn block_all_signals() {
    warn!("signal blocking not implemented on this platform");
}

fn invoke_entry_point(entry_point: ModMainFn, handle: &mut ModuleHandle, argz: &Argz) -> (i32, i32) {
    let guard = argz.as_argv();
    let raw_handle = handle.as_raw();
    // Safety: `raw_handle` stays valid for this call because `handle`
    // outlives it, and `guard`'s argv buffer outlives the call for the
    // same reason (`spec.md §4.4` step 7).
    let ret = unsafe { entry_point(raw_handle, guard.argc(), guard.argv()) };
    let errnum = if ret != 0 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    } else {
        0
    };
    (ret as i32, errnum)
}

/// Sends the synchronous FINALIZING status report and blocks for the
/// broker's ack (`spec.md §4.3`: "the broker must acknowledge before
/// the module proceeds", establishing the FINALIZING happens-before
/// edge, `spec.md §5`).
///
/// The ack is specifically the broker's `RESPONSE` to this request,
/// not merely the next message on the queue: a residual `REQUEST`
/// dispatched before the broker acknowledges must not be mistaken for
/// the ack (`spec.md §4.4` step 9 is where those belong). Any such
/// `REQUEST`s seen while waiting are returned so the drain step can
/// still answer them instead of losing them.
fn send_status_report_sync(
    handle: &ModuleHandle,
    parent_uuid: &ModuleUuid,
    status: ModuleStatus,
    errnum: i32,
    ack_timeout: Duration,
) -> Result<Vec<Envelope>, ChannelError> {
    let report = ModuleStatusReport {
        status: status.as_code(),
        errnum,
    };
    let payload = serde_json::to_vec(&report).unwrap_or_default();
    let mut envelope = Envelope::request(
        Credential::channel_owner(0),
        payload,
    );
    envelope.topic = MODULE_STATUS_TOPIC.to_string();
    envelope.push_route(parent_uuid.route_identity());
    handle.send(envelope)?;

    let deadline = std::time::Instant::now() + ack_timeout;
    let mut residual = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        if remaining.is_zero() {
            return Err(ChannelError::Timeout);
        }
        let received = handle.recv_timeout(remaining)?;
        if received.msg_type == MessageType::Response {
            return Ok(residual);
        }
        residual.push(received);
    }
}

fn send_status_report_async(
    handle: &ModuleHandle,
    parent_uuid: &ModuleUuid,
    status: ModuleStatus,
    errnum: i32,
) -> Result<(), ChannelError> {
    let report = ModuleStatusReport {
        status: status.as_code(),
        errnum,
    };
    let payload = serde_json::to_vec(&report).unwrap_or_default();
    let mut envelope = Envelope::event(MODULE_STATUS_TOPIC, Credential::channel_owner(0), payload);
    envelope.push_route(parent_uuid.route_identity());
    handle.send(envelope)
}

/// Step 9: answer every residual `REQUEST` left in the module's
/// receive queue with an unsupported-operation error, per the
/// FINALIZING happens-before edge (`spec.md §4.4` step 9, `§5`).
///
/// `pre_drained` carries any `REQUEST`s the FINALIZING handshake
/// already pulled off the queue while waiting for the broker's ack
/// (`spec.md §4.4` step 8) — they must still be answered here rather
/// than lost.
fn drain_residual_requests(
    handle: &ModuleHandle,
    module_uuid: &ModuleUuid,
    pre_drained: Vec<Envelope>,
) {
    let mut drained = 0;
    for envelope in pre_drained {
        if envelope.msg_type == MessageType::Request {
            drained += 1;
            answer_unsupported(handle, module_uuid, envelope);
        }
    }
    loop {
        match handle.try_recv() {
            Ok(envelope) if envelope.msg_type == MessageType::Request => {
                drained += 1;
                answer_unsupported(handle, module_uuid, envelope);
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    debug!(drained, "drain step complete");
}

fn answer_unsupported(handle: &ModuleHandle, module_uuid: &ModuleUuid, envelope: Envelope) {
    let mut route = envelope.route.clone();
    route.push(module_uuid.route_identity());
    let response = Envelope::response(
        route,
        envelope.credential,
        b"unsupported-operation: module finalizing".to_vec(),
    );
    if let Err(err) = handle.send(response) {
        warn!(error = %err, "failed to answer drained request");
    }
}
