//! OS-backed multicast sockets.
//!
//! [`MulticastSocket`] implements [`DatagramSocket`] on top of `socket2`, and
//! [`UdpSocketFactory`] is the [`SocketFactory`] an
//! [`MdnsClient`](crate::MdnsClient) uses unless told otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdns_client::{AddressFamily, DatagramSocket, MulticastSocket};
//!
//! let mut socket = MulticastSocket::new(AddressFamily::Ipv4)?;
//! socket.allow_address_reuse()?;
//! socket.listen(AddressFamily::Ipv4.bind_addr())?;
//! socket.join_group(AddressFamily::Ipv4.multicast_group())?;
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::MdnsConfig;
use crate::connection::{AddressFamily, DatagramSocket, SocketFactory};

enum SocketState {
    Unbound(Socket),
    Bound(UdpSocket),
}

/// A non-blocking UDP socket suitable for mDNS.
///
/// Once configured by a [`Connection`](crate::connection::Connection) the
/// socket is:
///
/// - Bound to the unspecified address of its family
/// - Configured with `SO_REUSEADDR` enabled
/// - Configured with `SO_REUSEPORT` enabled (on supported platforms)
/// - IPv6 only, for IPv6 sockets
/// - Non-blocking
/// - Joined to the mDNS multicast group of its family
pub struct MulticastSocket {
    family: AddressFamily,
    interface_v4: Ipv4Addr,
    interface_v6: u32,
    state: SocketState,
}

impl MulticastSocket {
    /// Creates an unbound socket of the given family.
    pub fn new(family: AddressFamily) -> io::Result<Self> {
        let domain = match family {
            AddressFamily::Ipv4 => Domain::IPV4,
            AddressFamily::Ipv6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if family == AddressFamily::Ipv6 {
            socket.set_only_v6(true)?;
        }

        Ok(Self {
            family,
            interface_v4: Ipv4Addr::UNSPECIFIED,
            interface_v6: 0,
            state: SocketState::Unbound(socket),
        })
    }

    /// Sets the IPv4 interface used to join the group.
    pub fn with_interface_v4(mut self, interface: Ipv4Addr) -> Self {
        self.interface_v4 = interface;
        self
    }

    /// Sets the IPv6 interface index used to join the group.
    pub fn with_interface_v6(mut self, index: u32) -> Self {
        self.interface_v6 = index;
        self
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// The bound address, once `listen` succeeded.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.state {
            SocketState::Bound(socket) => socket.local_addr(),
            SocketState::Unbound(_) => Err(not_bound()),
        }
    }

    /// Hands over the underlying socket, e.g. to register it with an async
    /// runtime.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        match self.state {
            SocketState::Bound(socket) => Ok(socket),
            SocketState::Unbound(_) => Err(not_bound()),
        }
    }

    fn raw(&self) -> socket2::SockRef<'_> {
        match &self.state {
            SocketState::Unbound(socket) => socket2::SockRef::from(socket),
            SocketState::Bound(socket) => socket2::SockRef::from(socket),
        }
    }

    fn bound(&self) -> io::Result<&UdpSocket> {
        match &self.state {
            SocketState::Bound(socket) => Ok(socket),
            SocketState::Unbound(_) => Err(not_bound()),
        }
    }
}

fn not_bound() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not bound")
}

impl DatagramSocket for MulticastSocket {
    fn allow_address_reuse(&mut self) -> io::Result<()> {
        let socket = self.raw();
        socket.set_reuse_address(true)?;

        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        Ok(())
    }

    fn listen(&mut self, addr: SocketAddr) -> io::Result<()> {
        let socket = match &self.state {
            SocketState::Unbound(socket) => socket.try_clone()?,
            SocketState::Bound(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "socket is already bound",
                ));
            }
        };
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;
        self.state = SocketState::Bound(socket.into());
        Ok(())
    }

    fn set_multicast_loopback_mode(&mut self, enabled: bool) -> io::Result<()> {
        let socket = self.raw();
        match self.family {
            AddressFamily::Ipv4 => socket.set_multicast_loop_v4(enabled),
            AddressFamily::Ipv6 => socket.set_multicast_loop_v6(enabled),
        }
    }

    fn join_group(&mut self, group: IpAddr) -> io::Result<()> {
        let socket = self.raw();
        match group {
            IpAddr::V4(group) => socket.join_multicast_v4(&group, &self.interface_v4),
            IpAddr::V6(group) => socket.join_multicast_v6(&group, self.interface_v6),
        }
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.bound()?.recv_from(buf)
    }

    fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.bound()?.send_to(buf, target)
    }
}

/// Creates [`MulticastSocket`]s, optionally pinned to an interface.
#[derive(Debug, Clone, Default)]
pub struct UdpSocketFactory {
    interface_v4: Option<Ipv4Addr>,
    interface_v6: u32,
}

impl UdpSocketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the interface selection from `config`.
    pub fn from_config(config: &MdnsConfig) -> Self {
        Self {
            interface_v4: config.interface_v4,
            interface_v6: config.interface_v6,
        }
    }

    pub fn with_interface_v4(mut self, interface: Ipv4Addr) -> Self {
        self.interface_v4 = Some(interface);
        self
    }

    pub fn with_interface_v6(mut self, index: u32) -> Self {
        self.interface_v6 = index;
        self
    }
}

impl SocketFactory for UdpSocketFactory {
    fn create_socket(&mut self, family: AddressFamily) -> io::Result<Box<dyn DatagramSocket>> {
        let mut socket = MulticastSocket::new(family)?.with_interface_v6(self.interface_v6);
        if let Some(interface) = self.interface_v4 {
            socket = socket.with_interface_v4(interface);
        }
        Ok(Box::new(socket))
    }
}
