// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::RoutingError;
use crate::msg::{Credential, Envelope, MessageType};

/// Topic the broker uses for the module-status RPC (`spec.md §6`);
/// the sole message a muted module is permitted to send.
pub const MODULE_STATUS_TOPIC: &str = "broker.module-status";

/// Receive-side rewrite (`spec.md §4.2`): adjust the route stack so a
/// point-to-point channel looks like a DEALER peer to the broker, then
/// normalize credentials.
///
/// - `RESPONSE`: pop the module's own identity off the top of the
///   stack.
/// - `REQUEST` / `EVENT`: push `module_uuid` so the broker knows the
///   origin.
/// - `CONTROL`: passed through untouched.
pub fn receive_rewrite(
    mut env: Envelope,
    module_uuid: &str,
    channel_cred: Credential,
) -> Result<Envelope, RoutingError> {
    match env.msg_type {
        MessageType::Response => {
            env.pop_route().ok_or(RoutingError::RouteStackUnderflow {
                direction: "receive",
                msg_type: "response",
            })?;
        }
        MessageType::Request | MessageType::Event => {
            env.push_route(module_uuid);
        }
        MessageType::Control => {}
    }
    env.credential = env.credential.normalize(channel_cred);
    Ok(env)
}

/// Send-side rewrite (`spec.md §4.2`): adjust the route stack on the
/// way into the module, and enforce the muted restriction.
///
/// - `REQUEST`: push `parent_uuid` as the outbound hop.
/// - `RESPONSE`: pop the last route entry.
/// - Others: transmitted verbatim.
///
/// When `muted` is true, only a `RESPONSE` whose topic is
/// [`MODULE_STATUS_TOPIC`] may pass; anything else is rejected
/// (`spec.md §3`, `§4.2`).
pub fn send_rewrite(
    mut env: Envelope,
    parent_uuid: &str,
    muted: bool,
) -> Result<Envelope, RoutingError> {
    if muted {
        let is_status_response =
            env.msg_type == MessageType::Response && env.topic == MODULE_STATUS_TOPIC;
        if !is_status_response {
            return Err(RoutingError::MutedUnsupported {
                reason: format!(
                    "only {MODULE_STATUS_TOPIC} responses may be sent while muted"
                ),
            });
        }
    }

    match env.msg_type {
        MessageType::Request => {
            env.push_route(parent_uuid);
        }
        MessageType::Response => {
            env.pop_route().ok_or(RoutingError::RouteStackUnderflow {
                direction: "send",
                msg_type: "response",
            })?;
        }
        MessageType::Event | MessageType::Control => {}
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{credential::UNKNOWN_USERID, RoleMask};

    fn channel_cred() -> Credential {
        Credential::channel_owner(1000)
    }

    #[test]
    fn receive_request_pushes_module_uuid() {
        let env = Envelope::request(channel_cred(), vec![]);
        let rewritten = receive_rewrite(env, "module-1", channel_cred()).unwrap();
        assert_eq!(rewritten.route, vec!["module-1".to_string()]);
    }

    #[test]
    fn receive_event_pushes_module_uuid() {
        let env = Envelope::event("job.state", channel_cred(), vec![]);
        let rewritten = receive_rewrite(env, "module-1", channel_cred()).unwrap();
        assert_eq!(rewritten.route, vec!["module-1".to_string()]);
    }

    #[test]
    fn receive_response_pops_last_entry() {
        let mut env = Envelope::response(vec!["broker".into()], channel_cred(), vec![]);
        env.push_route("module-1");
        let rewritten = receive_rewrite(env, "module-1", channel_cred()).unwrap();
        assert_eq!(rewritten.route, vec!["broker".to_string()]);
    }

    #[test]
    fn receive_response_on_empty_stack_is_underflow() {
        let env = Envelope::response(vec![], channel_cred(), vec![]);
        let err = receive_rewrite(env, "module-1", channel_cred()).unwrap_err();
        assert_eq!(
            err,
            RoutingError::RouteStackUnderflow {
                direction: "receive",
                msg_type: "response",
            }
        );
    }

    #[test]
    fn receive_normalizes_unknown_userid() {
        let mut env = Envelope::control(channel_cred(), vec![]);
        env.credential = Credential {
            userid: UNKNOWN_USERID,
            rolemask: RoleMask::OWNER,
        };
        let rewritten = receive_rewrite(env, "module-1", channel_cred()).unwrap();
        assert_eq!(rewritten.credential.userid, 1000);
    }

    #[test]
    fn receive_control_passes_through_route() {
        let env = Envelope::control(channel_cred(), vec![]);
        let rewritten = receive_rewrite(env, "module-1", channel_cred()).unwrap();
        assert!(rewritten.route.is_empty());
    }

    #[test]
    fn send_request_pushes_parent_uuid() {
        let env = Envelope::request(channel_cred(), vec![]);
        let rewritten = send_rewrite(env, "broker-root", false).unwrap();
        assert_eq!(rewritten.route, vec!["broker-root".to_string()]);
    }

    #[test]
    fn send_response_pops_last_entry() {
        let env = Envelope::response(vec!["a".into(), "b".into()], channel_cred(), vec![]);
        let rewritten = send_rewrite(env, "broker-root", false).unwrap();
        assert_eq!(rewritten.route, vec!["a".to_string()]);
    }

    #[test]
    fn send_response_on_empty_stack_is_underflow() {
        let env = Envelope::response(vec![], channel_cred(), vec![]);
        let err = send_rewrite(env, "broker-root", false).unwrap_err();
        assert_eq!(
            err,
            RoutingError::RouteStackUnderflow {
                direction: "send",
                msg_type: "response",
            }
        );
    }

    #[test]
    fn muted_blocks_non_status_request() {
        let mut env = Envelope::request(channel_cred(), vec![]);
        env.topic = "x.y".into();
        let err = send_rewrite(env, "broker-root", true).unwrap_err();
        assert!(matches!(err, RoutingError::MutedUnsupported { .. }));
    }

    #[test]
    fn muted_allows_status_response() {
        let mut env = Envelope::response(vec!["a".into()], channel_cred(), vec![]);
        env.topic = MODULE_STATUS_TOPIC.into();
        let rewritten = send_rewrite(env, "broker-root", true).unwrap();
        assert!(rewritten.route.is_empty());
    }
}
