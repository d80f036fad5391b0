// Layer 1: Standard library imports
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use super::error::ChannelError;
use crate::msg::Envelope;

/// Default bound on the broker→module direction (`spec.md §4.1`
/// describes only the module→broker side as unbounded; the other
/// direction is bounded so a stuck module cannot grow broker memory
/// without limit).
pub const DEFAULT_BROKER_TO_MODULE_CAPACITY: usize = 256;

/// Default linger applied to the module→broker receiver after the
/// broker-end begins closing, so a departing module can flush its
/// final status report (`spec.md §4.1`).
pub const DEFAULT_CLOSE_LINGER: Duration = Duration::from_secs(3);

/// The broker-owned endpoint of the bidirectional channel
/// (`spec.md §3`, field `channel_broker_end`).
pub struct BrokerEnd {
    to_module: SyncSender<Envelope>,
    from_module: Receiver<Envelope>,
}

/// The module-owned endpoint, held by the module thread runtime
/// (`spec.md §4.4` step 1).
pub struct ModuleEnd {
    to_broker: Sender<Envelope>,
    from_broker: Receiver<Envelope>,
}

/// A fresh bidirectional channel pair (`spec.md §4.1`): unbounded
/// module→broker, bounded broker→module.
pub struct ModuleChannel;

impl ModuleChannel {
    /// Construct a connected `(BrokerEnd, ModuleEnd)` pair bound to the
    /// given broker→module capacity.
    pub fn pair(broker_to_module_capacity: usize) -> (BrokerEnd, ModuleEnd) {
        let (to_module, from_broker) = mpsc::sync_channel(broker_to_module_capacity);
        let (to_broker, from_module) = mpsc::channel();
        (
            BrokerEnd {
                to_module,
                from_module,
            },
            ModuleEnd {
                to_broker,
                from_broker,
            },
        )
    }
}

impl BrokerEnd {
    /// Non-blocking send to the module; the broker reactor thread must
    /// never block on a slow module (`spec.md §5`).
    pub fn send(&self, envelope: Envelope) -> Result<(), ChannelError> {
        self.to_module.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => ChannelError::WouldBlock,
            TrySendError::Disconnected(_) => ChannelError::Closed,
        })
    }

    /// Non-blocking poll, used by the reactor callback once readability
    /// has been signaled (`spec.md §4.1`).
    pub fn try_recv(&self) -> Result<Envelope, ChannelError> {
        self.from_module.try_recv().map_err(|err| match err {
            TryRecvError::Empty => ChannelError::Timeout,
            TryRecvError::Disconnected => ChannelError::Closed,
        })
    }

    /// Drain residual messages for up to `linger` before giving up,
    /// so a closing module's final status report is not lost
    /// (`spec.md §4.1`).
    pub fn drain_with_linger(&self, linger: Duration) -> Vec<Envelope> {
        let mut drained = Vec::new();
        let deadline = std::time::Instant::now() + linger;
        loop {
            match self.from_module.try_recv() {
                Ok(envelope) => drained.push(envelope),
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {
                    if std::time::Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
        debug!(drained = drained.len(), "channel close linger drained residual messages");
        drained
    }
}

impl ModuleEnd {
    /// Send to the broker. The module→broker direction is unbounded
    /// (`spec.md §4.1`) so this never blocks on backpressure — only a
    /// dropped `BrokerEnd` can fail it.
    pub fn send(&self, envelope: Envelope) -> Result<(), ChannelError> {
        self.to_broker
            .send(envelope)
            .map_err(|_| ChannelError::Closed)
    }

    /// Blocking receive with a timeout, used by the module thread's
    /// own event loop (`spec.md §4.4`, §5 suspension points).
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Envelope, ChannelError> {
        self.from_broker.recv_timeout(timeout).map_err(|err| {
            use std::sync::mpsc::RecvTimeoutError;
            match err {
                RecvTimeoutError::Timeout => ChannelError::Timeout,
                RecvTimeoutError::Disconnected => ChannelError::Closed,
            }
        })
    }

    /// Non-blocking poll variant, used during the drain step
    /// (`spec.md §4.4` step 9).
    pub fn try_recv(&self) -> Result<Envelope, ChannelError> {
        self.from_broker.try_recv().map_err(|err| match err {
            TryRecvError::Empty => ChannelError::Timeout,
            TryRecvError::Disconnected => ChannelError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Credential;

    fn cred() -> Credential {
        Credential::channel_owner(1000)
    }

    #[test]
    fn broker_to_module_round_trip() {
        let (broker, module) = ModuleChannel::pair(4);
        broker.send(Envelope::request(cred(), vec![1])).unwrap();
        let received = module.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received.payload, vec![1]);
    }

    #[test]
    fn module_to_broker_round_trip() {
        let (broker, module) = ModuleChannel::pair(4);
        module.send(Envelope::event("t", cred(), vec![2])).unwrap();
        let received = broker.try_recv().unwrap();
        assert_eq!(received.payload, vec![2]);
    }

    #[test]
    fn broker_send_fails_when_module_end_dropped() {
        let (broker, module) = ModuleChannel::pair(4);
        drop(module);
        let err = broker.send(Envelope::request(cred(), vec![])).unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[test]
    fn module_send_fails_when_broker_end_dropped() {
        let (broker, module) = ModuleChannel::pair(4);
        drop(broker);
        let err = module.send(Envelope::event("t", cred(), vec![])).unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[test]
    fn broker_send_is_bounded() {
        let (broker, _module) = ModuleChannel::pair(1);
        broker.send(Envelope::request(cred(), vec![])).unwrap();
        let err = broker.send(Envelope::request(cred(), vec![])).unwrap_err();
        assert!(matches!(err, ChannelError::WouldBlock));
    }

    #[test]
    fn drain_with_linger_collects_residual_messages() {
        let (broker, module) = ModuleChannel::pair(4);
        module.send(Envelope::control(cred(), vec![9])).unwrap();
        let drained = broker.drain_with_linger(Duration::from_millis(50));
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].payload, vec![9]);
    }
}
