//! # Network Module
//!
//! Broadcast transport for [`Envelope`]s. The physical link is lossy and unordered, so each
//! message is sent several times (`redundancy`) and receivers use a [`DedupLedger`] to process
//! only one copy.
//!
//! The link itself is abstracted behind the [`Datagram`] trait, implemented by [`UdpBroadcast`]
//! for the real network and by [`LoopbackPort`] for tests and simulation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod dedup;
mod loopback;
mod stamp;
mod udp;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use serde::Deserialize;
use std::io;

use crate::msg::{CarId, Envelope, Message};

pub use dedup::DedupLedger;
pub use loopback::{LoopbackBus, LoopbackPort};
pub use stamp::StampClock;
pub use udp::UdpBroadcast;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum size of a single encoded envelope, in bytes.
pub const MAX_DATAGRAM_SIZE: usize = 2000;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A connectionless link able to broadcast and receive whole datagrams.
pub trait Datagram: Send + Sized {
    /// Broadcast one datagram.
    fn send_datagram(&self, data: &[u8]) -> io::Result<()>;

    /// Receive one datagram into `buf`, blocking at most the link's receive timeout.
    ///
    /// Returns `Ok(None)` if the timeout expired with nothing received.
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Create a second handle on the same link, used to receive from another thread.
    fn try_clone(&self) -> io::Result<Self>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, found in the `[net]` table of the executable's parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetParams {
    /// UDP port used for both sending and receiving
    pub port: u16,

    /// Receive timeout in milliseconds
    pub recv_timeout_ms: u64,

    /// Number of copies sent for every message
    pub redundancy: usize,
}

/// Sending half of the transport.
pub struct Transport<D: Datagram> {
    link: D,
    own_id: CarId,
    redundancy: usize,
    clock: StampClock,
}

/// Receiving half of the transport, usually moved onto a background thread.
pub struct TransportReceiver<D: Datagram> {
    link: D,
    buf: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not open the network link: {0}")]
    LinkOpenError(io::Error),

    #[error("Could not encode the envelope: {0}")]
    EncodeError(serde_json::Error),

    #[error("Encoded envelope is {0} bytes long, the maximum is {}", MAX_DATAGRAM_SIZE)]
    DatagramTooLarge(usize),

    #[error("All {0} copies of the message failed to send, last error: {1}")]
    SendFailed(usize, io::Error),

    #[error("Redundancy must be at least 1")]
    ZeroRedundancy,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            port: 5000,
            recv_timeout_ms: 100,
            redundancy: 2,
        }
    }
}

impl<D: Datagram> Transport<D> {
    /// Create a new transport sending as `own_id`.
    pub fn new(link: D, own_id: CarId, redundancy: usize) -> Result<Self, TransportError> {
        if redundancy == 0 {
            return Err(TransportError::ZeroRedundancy);
        }

        Ok(Self {
            link,
            own_id,
            redundancy,
            clock: StampClock::new(),
        })
    }

    /// The id this transport sends as.
    pub fn own_id(&self) -> CarId {
        self.own_id
    }

    /// Get a receiver on the same link.
    pub fn receiver(&self) -> Result<TransportReceiver<D>, TransportError> {
        let link = self.link.try_clone().map_err(TransportError::LinkOpenError)?;

        Ok(TransportReceiver::new(link))
    }

    /// Send a message to a car or a train.
    ///
    /// The envelope is stamped once and transmitted `redundancy` times. Failures of single copies
    /// are logged, an error is only returned if no copy could be sent. On success the stamp of the
    /// envelope is returned.
    pub fn send(&mut self, to: CarId, message: Message) -> Result<u64, TransportError> {
        let envelope = Envelope {
            from: self.own_id,
            to,
            sent_at: self.clock.next(),
            message,
        };

        let bytes = envelope.to_bytes().map_err(TransportError::EncodeError)?;

        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::DatagramTooLarge(bytes.len()));
        }

        let mut last_err = None;
        let mut num_sent = 0;

        for copy in 0..self.redundancy {
            match self.link.send_datagram(&bytes) {
                Ok(()) => num_sent += 1,
                Err(e) => {
                    warn!(
                        "Copy {} of {} to {} failed to send: {}",
                        copy + 1,
                        envelope.message.tag(),
                        to,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if num_sent == 0 => Err(TransportError::SendFailed(self.redundancy, e)),
            _ => {
                debug!(
                    "Sent {} to {} ({} copies, stamp {})",
                    envelope.message.tag(),
                    to,
                    num_sent,
                    envelope.sent_at
                );
                Ok(envelope.sent_at)
            }
        }
    }
}

impl<D: Datagram> TransportReceiver<D> {
    pub fn new(link: D) -> Self {
        Self {
            link,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Receive the next envelope.
    ///
    /// Blocks at most the link's receive timeout. Timeouts, link errors and undecodable datagrams
    /// all return `None`.
    pub fn try_receive(&mut self) -> Option<Envelope> {
        let len = match self.link.recv_datagram(&mut self.buf) {
            Ok(Some(len)) => len,
            Ok(None) => return None,
            Err(e) => {
                debug!("Receive error: {}", e);
                return None;
            }
        };

        match Envelope::from_bytes(&self.buf[..len]) {
            Ok(env) => {
                trace!("Received {} from {} to {}", env.message.tag(), env.from, env.to);
                Some(env)
            }
            Err(e) => {
                warn!("Could not decode a {} byte datagram: {}", len, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Role;
    use std::time::Duration;

    #[test]
    fn test_redundant_sends() {
        let bus = LoopbackBus::new();
        let sender_port = bus.attach(Duration::from_millis(10));
        let listener = bus.attach(Duration::from_millis(10));

        let leader = CarId::new(1, Role::Leader);
        let mut tx = Transport::new(sender_port, leader, 3).unwrap();
        let mut rx = TransportReceiver::new(listener);

        let stamp = tx.send(leader.train_group(), Message::Speed(40.0)).unwrap();
        assert_eq!(bus.datagrams_sent(), 3);

        // All three copies carry the same stamp
        for _ in 0..3 {
            let env = rx.try_receive().unwrap();
            assert_eq!(env.sent_at, stamp);
            assert_eq!(env.from, leader);
            assert_eq!(env.message, Message::Speed(40.0));
        }
        assert!(rx.try_receive().is_none());

        // The next message gets a new stamp
        let next = tx.send(leader.train_group(), Message::InCrossing).unwrap();
        assert!(next > stamp);
    }

    #[test]
    fn test_zero_redundancy() {
        let bus = LoopbackBus::new();
        let port = bus.attach(Duration::from_millis(10));
        assert!(matches!(
            Transport::new(port, CarId::new(1, Role::Queue), 0),
            Err(TransportError::ZeroRedundancy)
        ));
    }

    #[test]
    fn test_garbage_ignored() {
        let bus = LoopbackBus::new();
        let port = bus.attach(Duration::from_millis(10));
        let mut rx = TransportReceiver::new(bus.attach(Duration::from_millis(10)));

        port.send_datagram(b"{\"not\": \"an envelope\"}").unwrap();
        assert!(rx.try_receive().is_none());
    }

    #[test]
    fn test_default_params() {
        let p = NetParams::default();
        assert_eq!(p.port, 5000);
        assert_eq!(p.redundancy, 2);
        assert_eq!(p.recv_timeout_ms, 100);
    }
}
