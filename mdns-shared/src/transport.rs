use bytes::BytesMut;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

/// Addresses of a received datagram.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransportContext {
    /// Local socket address, either IPv4 or IPv6
    pub local_addr: SocketAddr,
    /// Sender of the datagram
    pub peer_addr: SocketAddr,
}

impl TransportContext {
    pub fn new(local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            peer_addr,
        }
    }
}

impl Default for TransportContext {
    fn default() -> Self {
        let unspecified = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        Self::new(unspecified, unspecified)
    }
}

/// A datagram together with its reception time and [TransportContext]
pub struct TransportMessage<T> {
    /// Reception time; stamps the records parsed from the message
    pub now: Instant,
    /// Where the message came from
    pub transport: TransportContext,
    /// Message body with generic type
    pub message: T,
}

/// BytesMut type datagram with [TransportContext]
pub type TaggedBytesMut = TransportMessage<BytesMut>;
