//! In-memory broadcast link

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::Datagram;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A broadcast medium shared by several [`LoopbackPort`]s.
///
/// Every datagram sent by any port is delivered to every attached port, the sender included. The
/// bus can be told to lose upcoming datagrams.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Arc<Mutex<BusInner>>,
}

/// One car's attachment to a [`LoopbackBus`].
pub struct LoopbackPort {
    bus: LoopbackBus,
    rx: Arc<Mutex<Receiver<Vec<u8>>>>,
    recv_timeout: Duration,
}

#[derive(Default)]
struct BusInner {
    ports: Vec<Sender<Vec<u8>>>,
    drop_next: usize,
    num_sent: usize,
    num_dropped: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new port to the bus.
    pub fn attach(&self, recv_timeout: Duration) -> LoopbackPort {
        let (tx, rx) = channel();
        self.lock().ports.push(tx);

        LoopbackPort {
            bus: self.clone(),
            rx: Arc::new(Mutex::new(rx)),
            recv_timeout,
        }
    }

    /// Lose the next `n` datagrams sent on the bus.
    pub fn drop_next(&self, n: usize) {
        self.lock().drop_next = n;
    }

    /// Number of datagrams sent on the bus, lost ones included.
    pub fn datagrams_sent(&self) -> usize {
        self.lock().num_sent
    }

    /// Number of datagrams lost by the bus.
    pub fn datagrams_dropped(&self) -> usize {
        self.lock().num_dropped
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        // A panicking test thread must not take the whole bus down with it
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Datagram for LoopbackPort {
    fn send_datagram(&self, data: &[u8]) -> io::Result<()> {
        let mut bus = self.bus.lock();
        bus.num_sent += 1;

        if bus.drop_next > 0 {
            bus.drop_next -= 1;
            bus.num_dropped += 1;
            return Ok(());
        }

        // Ports whose receiver has gone are forgotten
        bus.ports.retain(|p| p.send(data.to_vec()).is_ok());

        Ok(())
    }

    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        let rx = self
            .rx
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "loopback receiver poisoned"))?;

        match rx.recv_timeout(self.recv_timeout) {
            Ok(data) => {
                if data.len() > buf.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("datagram of {} bytes exceeds the buffer", data.len()),
                    ));
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok(Some(data.len()))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "loopback bus disconnected",
            )),
        }
    }

    fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            bus: self.bus.clone(),
            rx: self.rx.clone(),
            recv_timeout: self.recv_timeout,
        })
    }
}
