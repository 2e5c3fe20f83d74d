//! UDP broadcast link

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use super::{Datagram, NetParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A UDP socket sending to the local broadcast address.
///
/// Every car binds the same port, so broadcasts are also received by the sender.
pub struct UdpBroadcast {
    socket: UdpSocket,
    dest: SocketAddr,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl UdpBroadcast {
    /// Bind the broadcast socket described by the parameters.
    pub fn bind(params: &NetParams) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, params.port))?;
        socket.set_broadcast(true)?;

        // A zero duration is rejected by the socket, treat it as the smallest timeout instead
        let timeout = Duration::from_millis(params.recv_timeout_ms.max(1));
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;

        let dest = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, params.port));

        info!("UDP broadcast link bound on port {}", params.port);

        Ok(Self { socket, dest })
    }
}

impl Datagram for UdpBroadcast {
    fn send_datagram(&self, data: &[u8]) -> io::Result<()> {
        self.socket.send_to(data, self.dest).map(|_| ())
    }

    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((len, _)) => Ok(Some(len)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            dest: self.dest,
        })
    }
}
