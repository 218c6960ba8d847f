//! Dual-stack multicast connection.
//!
//! The client reaches the network only through the [`DatagramSocket`] and
//! [`SocketFactory`] traits. [`Connection`] owns one socket per address
//! family, joins the mDNS group on each and multiplexes sends and receives
//! over both.

#[cfg(test)]
pub(crate) mod connection_test;

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use shared::error::{Error, Result};

use crate::config::{
    MDNS_DEST_ADDR_IPV4, MDNS_DEST_ADDR_IPV6, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT,
    MdnsConfig,
};

/// IP address family of a socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// The mDNS multicast group of this family.
    pub fn multicast_group(&self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(MDNS_MULTICAST_IPV4),
            AddressFamily::Ipv6 => IpAddr::V6(MDNS_MULTICAST_IPV6),
        }
    }

    /// Where queries of this family are sent.
    pub fn dest_addr(&self) -> SocketAddr {
        match self {
            AddressFamily::Ipv4 => MDNS_DEST_ADDR_IPV4,
            AddressFamily::Ipv6 => MDNS_DEST_ADDR_IPV6,
        }
    }

    /// The unspecified address of this family on the mDNS port.
    pub fn bind_addr(&self) -> SocketAddr {
        match self {
            AddressFamily::Ipv4 => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), MDNS_PORT),
            AddressFamily::Ipv6 => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), MDNS_PORT),
        }
    }
}

/// A datagram socket able to take part in multicast.
///
/// Sockets are created unbound; [`Connection`] configures them in the order
/// `allow_address_reuse`, `listen`, `set_multicast_loopback_mode`,
/// `join_group`. `recv_from` must not block: it returns
/// [`io::ErrorKind::WouldBlock`] when no datagram is pending.
pub trait DatagramSocket {
    fn allow_address_reuse(&mut self) -> io::Result<()>;
    fn listen(&mut self, addr: SocketAddr) -> io::Result<()>;
    fn set_multicast_loopback_mode(&mut self, enabled: bool) -> io::Result<()>;
    fn join_group(&mut self, group: IpAddr) -> io::Result<()>;
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
}

/// Creates the sockets a [`Connection`] binds.
pub trait SocketFactory {
    fn create_socket(&mut self, family: AddressFamily) -> io::Result<Box<dyn DatagramSocket>>;
}

/// One bound socket of a [`Connection`].
struct SocketHandler {
    family: AddressFamily,
    socket: Box<dyn DatagramSocket>,
}

impl SocketHandler {
    fn bind(
        family: AddressFamily,
        factory: &mut dyn SocketFactory,
        multicast_loopback: bool,
    ) -> io::Result<Self> {
        let mut socket = factory.create_socket(family)?;
        socket.allow_address_reuse()?;
        socket.listen(family.bind_addr())?;
        socket.set_multicast_loopback_mode(multicast_loopback)?;
        socket.join_group(family.multicast_group())?;
        Ok(Self { family, socket })
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.family.dest_addr())
    }

    /// Next non-empty datagram, or `None` when nothing is pending.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        loop {
            match self.socket.recv_from(buf) {
                Ok((0, _)) => continue,
                Ok((n, src)) => return Ok(Some((n, src))),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Multicast connection over both address families.
pub struct Connection {
    handlers: Vec<SocketHandler>,
    // Handler read first by the next recv_next.
    next_handler: usize,
    recv_buf: Vec<u8>,
}

impl Connection {
    /// Creates and binds one socket per family. Fails if either family fails.
    pub fn init(factory: &mut dyn SocketFactory, config: &MdnsConfig) -> Result<Self> {
        let mut handlers = Vec::with_capacity(2);
        for family in [AddressFamily::Ipv4, AddressFamily::Ipv6] {
            match SocketHandler::bind(family, factory, config.multicast_loopback) {
                Ok(handler) => handlers.push(handler),
                Err(err) => {
                    log::warn!("mdns: failed to bind {family:?} socket: {err}");
                    return Err(err.into());
                }
            }
        }

        Ok(Self {
            handlers,
            next_handler: 0,
            recv_buf: vec![0u8; config.max_packet_size],
        })
    }

    /// Sends `buf` to the mDNS group of every family.
    ///
    /// Succeeds when at least one family accepted the datagram.
    pub fn send(&mut self, buf: &[u8]) -> Result<()> {
        let mut last_err = None;
        let mut sent = false;
        for handler in &mut self.handlers {
            match handler.send(buf) {
                Ok(_) => sent = true,
                Err(err) => {
                    log::warn!("mdns: send on {:?} failed: {err}", handler.family);
                    last_err = Some(err);
                }
            }
        }

        if sent {
            Ok(())
        } else if let Some(err) = last_err {
            Err(err.into())
        } else {
            Err(Error::ErrSendFailed)
        }
    }

    /// Receives the next pending datagram, taking turns between the
    /// families so a busy one cannot starve the other.
    ///
    /// Returns `Ok(None)` once every socket would block.
    pub fn recv_next(&mut self) -> Result<Option<(&[u8], SocketAddr)>> {
        let count = self.handlers.len();
        for i in 0..count {
            let idx = (self.next_handler + i) % count;
            if let Some((n, src)) = self.handlers[idx].recv(&mut self.recv_buf)? {
                self.next_handler = (idx + 1) % count;
                return Ok(Some((&self.recv_buf[..n], src)));
            }
        }
        Ok(None)
    }
}
