//! Configuration for the mDNS client.
//!
//! This module provides the [`MdnsConfig`] struct and the well-known mDNS
//! constants (port and multicast groups).
//!
//! # Examples
//!
//! ```rust
//! use mdns_client::MdnsConfig;
//! use std::time::Duration;
//!
//! let config = MdnsConfig::default()
//!     .with_transaction_timeout(Duration::from_secs(5))
//!     .with_multicast_loopback(true);
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

/// Standard mDNS port.
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 multicast group (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// mDNS IPv6 link-local multicast group (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Destination of IPv4 queries.
pub const MDNS_DEST_ADDR_IPV4: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// Destination of IPv6 queries.
pub const MDNS_DEST_ADDR_IPV6: SocketAddr = SocketAddr::new(IpAddr::V6(MDNS_MULTICAST_IPV6), MDNS_PORT);

/// How long a network transaction waits for answers before it reports
/// [`TransactionResult::Done`](crate::TransactionResult::Done) or
/// [`TransactionResult::NoResults`](crate::TransactionResult::NoResults).
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest datagram the client will read (jumbo frame sized).
pub const MAX_MULTICAST_SIZE: usize = 9000;

/// Configuration for an [`MdnsClient`](crate::MdnsClient).
///
/// Use the builder pattern to construct a configuration:
///
/// ```rust
/// use mdns_client::MdnsConfig;
/// use std::net::Ipv4Addr;
///
/// let config = MdnsConfig::new()
///     .with_interface_v4(Ipv4Addr::new(192, 168, 1, 10))
///     .with_max_packet_size(1500);
/// ```
#[derive(Clone, Debug)]
pub struct MdnsConfig {
    /// How long a network transaction stays open after its query is sent.
    ///
    /// Default: 3 seconds
    pub transaction_timeout: Duration,

    /// Size of the receive buffer. Longer datagrams are truncated by the
    /// socket and then usually fail to parse.
    ///
    /// Default: 9000 bytes
    pub max_packet_size: usize,

    /// Whether queries sent by this host are looped back to its own sockets.
    ///
    /// Default: false
    pub multicast_loopback: bool,

    /// IPv4 interface used to join the multicast group. `None` lets the
    /// operating system pick.
    pub interface_v4: Option<Ipv4Addr>,

    /// IPv6 interface index used to join the multicast group. `0` lets the
    /// operating system pick.
    pub interface_v6: u32,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            max_packet_size: MAX_MULTICAST_SIZE,
            multicast_loopback: false,
            interface_v4: None,
            interface_v6: 0,
        }
    }
}

impl MdnsConfig {
    /// Create a new configuration with default values.
    ///
    /// Equivalent to [`MdnsConfig::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transaction timeout.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mdns_client::MdnsConfig;
    /// use std::time::Duration;
    ///
    /// let config = MdnsConfig::default()
    ///     .with_transaction_timeout(Duration::from_millis(1500));
    /// assert_eq!(config.transaction_timeout, Duration::from_millis(1500));
    /// ```
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Set the receive buffer size.
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Enable or disable multicast loopback on the client's sockets.
    pub fn with_multicast_loopback(mut self, enabled: bool) -> Self {
        self.multicast_loopback = enabled;
        self
    }

    /// Join the IPv4 group on a specific interface.
    pub fn with_interface_v4(mut self, interface: Ipv4Addr) -> Self {
        self.interface_v4 = Some(interface);
        self
    }

    /// Join the IPv6 group on a specific interface index.
    pub fn with_interface_v6(mut self, index: u32) -> Self {
        self.interface_v6 = index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MdnsConfig::default();
        assert_eq!(config.transaction_timeout, Duration::from_secs(3));
        assert_eq!(config.max_packet_size, 9000);
        assert!(!config.multicast_loopback);
        assert!(config.interface_v4.is_none());
        assert_eq!(config.interface_v6, 0);
    }

    #[test]
    fn test_builder_chain() {
        let config = MdnsConfig::new()
            .with_transaction_timeout(Duration::from_secs(1))
            .with_max_packet_size(1500)
            .with_multicast_loopback(true)
            .with_interface_v4(Ipv4Addr::new(10, 0, 0, 1))
            .with_interface_v6(3);
        assert_eq!(config.transaction_timeout, Duration::from_secs(1));
        assert_eq!(config.max_packet_size, 1500);
        assert!(config.multicast_loopback);
        assert_eq!(config.interface_v4, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(config.interface_v6, 3);
    }

    #[test]
    fn test_multicast_constants() {
        assert_eq!(MDNS_MULTICAST_IPV4, Ipv4Addr::new(224, 0, 0, 251));
        assert_eq!(MDNS_DEST_ADDR_IPV4.to_string(), "224.0.0.251:5353");
        assert_eq!(MDNS_DEST_ADDR_IPV6.to_string(), "[ff02::fb]:5353");
        assert!(MDNS_MULTICAST_IPV6.is_multicast());
    }
}
