use super::*;

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub(crate) enum Inbound {
    Datagram(Vec<u8>),
    Error(io::ErrorKind),
}

/// In-memory network shared by every socket a [`FakeFactory`] creates.
#[derive(Default)]
pub(crate) struct FakeNet {
    pub(crate) created: Vec<AddressFamily>,
    pub(crate) bound: Vec<SocketAddr>,
    pub(crate) joined: Vec<IpAddr>,
    pub(crate) loopback: Vec<bool>,
    pub(crate) reuse: usize,
    pub(crate) sent: Vec<(AddressFamily, Vec<u8>, SocketAddr)>,
    pub(crate) inbound: HashMap<AddressFamily, VecDeque<Inbound>>,
    pub(crate) fail_create: Option<AddressFamily>,
    pub(crate) fail_join: Option<AddressFamily>,
    pub(crate) fail_send: Vec<AddressFamily>,
}

impl FakeNet {
    pub(crate) fn push(&mut self, family: AddressFamily, datagram: &[u8]) {
        self.inbound
            .entry(family)
            .or_default()
            .push_back(Inbound::Datagram(datagram.to_vec()));
    }

    pub(crate) fn push_error(&mut self, family: AddressFamily, kind: io::ErrorKind) {
        self.inbound
            .entry(family)
            .or_default()
            .push_back(Inbound::Error(kind));
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeFactory {
    pub(crate) net: Rc<RefCell<FakeNet>>,
}

impl SocketFactory for FakeFactory {
    fn create_socket(&mut self, family: AddressFamily) -> io::Result<Box<dyn DatagramSocket>> {
        let mut net = self.net.borrow_mut();
        if net.fail_create == Some(family) {
            return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no such family"));
        }
        net.created.push(family);
        Ok(Box::new(FakeSocket {
            family,
            net: Rc::clone(&self.net),
        }))
    }
}

struct FakeSocket {
    family: AddressFamily,
    net: Rc<RefCell<FakeNet>>,
}

impl DatagramSocket for FakeSocket {
    fn allow_address_reuse(&mut self) -> io::Result<()> {
        self.net.borrow_mut().reuse += 1;
        Ok(())
    }

    fn listen(&mut self, addr: SocketAddr) -> io::Result<()> {
        self.net.borrow_mut().bound.push(addr);
        Ok(())
    }

    fn set_multicast_loopback_mode(&mut self, enabled: bool) -> io::Result<()> {
        self.net.borrow_mut().loopback.push(enabled);
        Ok(())
    }

    fn join_group(&mut self, group: IpAddr) -> io::Result<()> {
        let mut net = self.net.borrow_mut();
        if net.fail_join == Some(self.family) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "join refused"));
        }
        net.joined.push(group);
        Ok(())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut net = self.net.borrow_mut();
        let next = net
            .inbound
            .get_mut(&self.family)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Inbound::Datagram(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok((n, self.family.dest_addr()))
            }
            Some(Inbound::Error(kind)) => Err(io::Error::new(kind, "injected")),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        let mut net = self.net.borrow_mut();
        if net.fail_send.contains(&self.family) {
            return Err(io::Error::new(io::ErrorKind::NetworkUnreachable, "unreachable"));
        }
        net.sent.push((self.family, buf.to_vec(), target));
        Ok(buf.len())
    }
}

#[test]
fn test_init_binds_both_families() {
    let mut factory = FakeFactory::default();
    let conn = Connection::init(&mut factory, &MdnsConfig::default());
    assert!(conn.is_ok());

    let net = factory.net.borrow();
    assert_eq!(net.created, vec![AddressFamily::Ipv4, AddressFamily::Ipv6]);
    assert_eq!(net.reuse, 2);
    assert_eq!(
        net.bound,
        vec![
            "0.0.0.0:5353".parse::<SocketAddr>().unwrap(),
            "[::]:5353".parse::<SocketAddr>().unwrap(),
        ]
    );
    assert_eq!(net.loopback, vec![false, false]);
    assert_eq!(
        net.joined,
        vec![
            IpAddr::V4(MDNS_MULTICAST_IPV4),
            IpAddr::V6(MDNS_MULTICAST_IPV6)
        ]
    );
}

#[test]
fn test_init_honors_loopback_setting() {
    let mut factory = FakeFactory::default();
    let config = MdnsConfig::default().with_multicast_loopback(true);
    assert!(Connection::init(&mut factory, &config).is_ok());
    assert_eq!(factory.net.borrow().loopback, vec![true, true]);
}

#[test]
fn test_init_fails_when_one_family_fails() {
    let mut factory = FakeFactory::default();
    factory.net.borrow_mut().fail_create = Some(AddressFamily::Ipv6);
    assert!(Connection::init(&mut factory, &MdnsConfig::default()).is_err());

    let mut factory = FakeFactory::default();
    factory.net.borrow_mut().fail_join = Some(AddressFamily::Ipv4);
    let err = Connection::init(&mut factory, &MdnsConfig::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        Error::from(io::Error::from(io::ErrorKind::PermissionDenied))
    );
}

#[test]
fn test_send_to_both_groups() {
    let mut factory = FakeFactory::default();
    let mut conn = Connection::init(&mut factory, &MdnsConfig::default()).unwrap();

    conn.send(b"query").unwrap();

    let net = factory.net.borrow();
    assert_eq!(net.sent.len(), 2);
    assert_eq!(net.sent[0].2, MDNS_DEST_ADDR_IPV4);
    assert_eq!(net.sent[1].2, MDNS_DEST_ADDR_IPV6);
    assert_eq!(net.sent[1].1, b"query".to_vec());
}

#[test]
fn test_send_is_best_effort() {
    let mut factory = FakeFactory::default();
    let mut conn = Connection::init(&mut factory, &MdnsConfig::default()).unwrap();

    factory.net.borrow_mut().fail_send = vec![AddressFamily::Ipv4];
    assert!(conn.send(b"query").is_ok());
    assert_eq!(factory.net.borrow().sent.len(), 1);
    assert_eq!(factory.net.borrow().sent[0].0, AddressFamily::Ipv6);

    factory.net.borrow_mut().fail_send = vec![AddressFamily::Ipv4, AddressFamily::Ipv6];
    assert!(conn.send(b"query").is_err());
}

#[test]
fn test_recv_skips_empty_datagrams() {
    let mut factory = FakeFactory::default();
    let mut conn = Connection::init(&mut factory, &MdnsConfig::default()).unwrap();
    {
        let mut net = factory.net.borrow_mut();
        net.push(AddressFamily::Ipv6, b"six");
        net.push(AddressFamily::Ipv4, b"");
        net.push(AddressFamily::Ipv4, b"four");
    }

    let (data, _) = conn.recv_next().unwrap().unwrap();
    assert_eq!(data, b"four");
    let (data, src) = conn.recv_next().unwrap().unwrap();
    assert_eq!(data, b"six");
    assert_eq!(src, MDNS_DEST_ADDR_IPV6);
    assert!(conn.recv_next().unwrap().is_none());
}

#[test]
fn test_recv_alternates_families() {
    let mut factory = FakeFactory::default();
    let mut conn = Connection::init(&mut factory, &MdnsConfig::default()).unwrap();
    {
        let mut net = factory.net.borrow_mut();
        net.push(AddressFamily::Ipv4, b"four-1");
        net.push(AddressFamily::Ipv4, b"four-2");
        net.push(AddressFamily::Ipv4, b"four-3");
        net.push(AddressFamily::Ipv6, b"six-1");
        net.push(AddressFamily::Ipv6, b"six-2");
    }

    let mut order = vec![];
    while let Some((data, _)) = conn.recv_next().unwrap() {
        order.push(String::from_utf8(data.to_vec()).unwrap());
    }
    assert_eq!(order, ["four-1", "six-1", "four-2", "six-2", "four-3"]);
}

#[test]
fn test_recv_truncates_to_max_packet_size() {
    let mut factory = FakeFactory::default();
    let config = MdnsConfig::default().with_max_packet_size(4);
    let mut conn = Connection::init(&mut factory, &config).unwrap();
    factory
        .net
        .borrow_mut()
        .push(AddressFamily::Ipv4, b"0123456789");

    let (data, _) = conn.recv_next().unwrap().unwrap();
    assert_eq!(data, b"0123");
}

#[test]
fn test_recv_error_is_returned() {
    let mut factory = FakeFactory::default();
    let mut conn = Connection::init(&mut factory, &MdnsConfig::default()).unwrap();
    {
        let mut net = factory.net.borrow_mut();
        net.push_error(AddressFamily::Ipv4, io::ErrorKind::Interrupted);
        net.push(AddressFamily::Ipv4, b"after");
        net.push_error(AddressFamily::Ipv6, io::ErrorKind::ConnectionReset);
    }

    let (data, _) = conn.recv_next().unwrap().unwrap();
    assert_eq!(data, b"after");
    assert!(conn.recv_next().is_err());
}
