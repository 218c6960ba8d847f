//! A tokio-backed [`SocketFactory`] for the demos.
//!
//! Sockets are configured with [`MulticastSocket`] and then registered with
//! the tokio reactor, so the event loop can await readiness while the client
//! keeps doing non-blocking reads and writes.

use std::cell::RefCell;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::rc::{Rc, Weak};

use mdns_client::{AddressFamily, DatagramSocket, MulticastSocket, SocketFactory};
use tokio::net::UdpSocket;

/// Weak handles on every bound socket, for readiness polling.
#[derive(Clone, Default)]
pub struct SocketRegistry {
    sockets: Rc<RefCell<Vec<Weak<UdpSocket>>>>,
}

impl SocketRegistry {
    /// Sockets the client still owns.
    pub fn sockets(&self) -> Vec<Rc<UdpSocket>> {
        let mut sockets = self.sockets.borrow_mut();
        sockets.retain(|socket| socket.strong_count() > 0);
        sockets.iter().filter_map(Weak::upgrade).collect()
    }

    fn register(&self, socket: &Rc<UdpSocket>) {
        self.sockets.borrow_mut().push(Rc::downgrade(socket));
    }
}

/// Resolves once any of `sockets` is readable; never resolves if there are
/// none.
pub async fn readable(sockets: &[Rc<UdpSocket>]) -> io::Result<()> {
    match sockets {
        [] => std::future::pending().await,
        [only] => only.readable().await,
        [first, second, ..] => tokio::select! {
            ready = first.readable() => ready,
            ready = second.readable() => ready,
        },
    }
}

pub struct TokioSocketFactory {
    registry: SocketRegistry,
}

impl TokioSocketFactory {
    pub fn new(registry: SocketRegistry) -> Self {
        Self { registry }
    }
}

impl SocketFactory for TokioSocketFactory {
    fn create_socket(&mut self, family: AddressFamily) -> io::Result<Box<dyn DatagramSocket>> {
        Ok(Box::new(TokioSocket {
            family,
            unbound: Some(MulticastSocket::new(family)?),
            bound: None,
            registry: self.registry.clone(),
        }))
    }
}

struct TokioSocket {
    family: AddressFamily,
    unbound: Option<MulticastSocket>,
    bound: Option<Rc<UdpSocket>>,
    registry: SocketRegistry,
}

fn not_bound() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not bound")
}

impl TokioSocket {
    fn bound(&self) -> io::Result<&UdpSocket> {
        self.bound.as_deref().ok_or_else(not_bound)
    }
}

impl DatagramSocket for TokioSocket {
    fn allow_address_reuse(&mut self) -> io::Result<()> {
        match self.unbound.as_mut() {
            Some(socket) => socket.allow_address_reuse(),
            None => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "socket is already bound",
            )),
        }
    }

    fn listen(&mut self, addr: SocketAddr) -> io::Result<()> {
        let mut socket = self.unbound.take().ok_or_else(not_bound)?;
        socket.listen(addr)?;
        let socket = Rc::new(UdpSocket::from_std(socket.into_std()?)?);
        self.registry.register(&socket);
        self.bound = Some(socket);
        Ok(())
    }

    fn set_multicast_loopback_mode(&mut self, enabled: bool) -> io::Result<()> {
        let socket = self.bound()?;
        match self.family {
            AddressFamily::Ipv4 => socket.set_multicast_loop_v4(enabled),
            AddressFamily::Ipv6 => socket.set_multicast_loop_v6(enabled),
        }
    }

    fn join_group(&mut self, group: IpAddr) -> io::Result<()> {
        let socket = self.bound()?;
        match group {
            IpAddr::V4(group) => socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(group) => socket.join_multicast_v6(&group, 0),
        }
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.bound()?.try_recv_from(buf)
    }

    fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.bound()?.try_send_to(buf, target)
    }
}

/// Parses a record type name such as `A`, `aaaa` or `PTR`.
pub fn parse_type(s: &str) -> Result<mdns_client::DnsType, String> {
    use mdns_client::DnsType;

    let typ = match s.to_ascii_uppercase().as_str() {
        "A" => DnsType::A,
        "AAAA" => DnsType::Aaaa,
        "PTR" => DnsType::Ptr,
        "SRV" => DnsType::Srv,
        "TXT" => DnsType::Txt,
        "CNAME" => DnsType::Cname,
        "NSEC" => DnsType::Nsec,
        other => return Err(format!("unsupported record type {other}")),
    };
    Ok(typ)
}
