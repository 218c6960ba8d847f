//! # mdns-client
//!
//! A sans-I/O mDNS (Multicast DNS) querier for Rust.
//!
//! The crate keeps a cache of the records heard on the local link and lets
//! applications follow it in two ways:
//!
//! - **Listeners** stay registered for a `(type, name)` pair and report every
//!   record that is added, changed or expires.
//! - **Transactions** look a record up once: in the cache, on the network, or
//!   both, and report each result and then their end.
//!
//! Multicast sockets (224.0.0.251:5353 and \[ff02::fb\]:5353) are opened when
//! the first listener starts and closed once nothing listens any more. The
//! client never answers queries.
//!
//! ## Sans-I/O Design
//!
//! [`MdnsClient`] implements [`sansio::Protocol`]. It spawns no threads and
//! arms no timers; the caller:
//!
//! 1. Calls [`MdnsClient::handle_readable()`] when a socket is readable
//! 2. Calls `handle_timeout()` when `poll_timeout()` expires
//! 3. Processes events from `poll_event()`
//!
//! Sockets are reached through the [`DatagramSocket`] and [`SocketFactory`]
//! traits, so the client can run over `std` sockets ([`UdpSocketFactory`], the
//! default), an async runtime, or an in-memory network in tests.
//!
//! ## Quick Start
//!
//! A cache-only transaction finishes synchronously, without touching the
//! network:
//!
//! ```rust
//! use mdns_client::{
//!     DnsType, MdnsClient, MdnsConfig, MdnsEvent, TransactionFlags, TransactionResult,
//! };
//! use sansio::Protocol;
//! use std::time::Instant;
//!
//! let mut client = MdnsClient::new(MdnsConfig::default());
//! let id = client
//!     .create_transaction(DnsType::A, "printer.local", TransactionFlags::QUERY_CACHE)
//!     .unwrap();
//! client.start_transaction(id, Instant::now()).unwrap();
//!
//! match client.poll_event() {
//!     Some(MdnsEvent::TransactionResult { result, .. }) => {
//!         assert_eq!(result, TransactionResult::Done);
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert!(!client.is_listening());
//! ```
//!
//! ## Event Loop Pattern
//!
//! ```text
//! loop {
//!     select! {
//!         _ = sockets_readable() => {
//!             client.handle_readable(Instant::now())?;
//!         }
//!         _ = sleep_until(client.poll_timeout()) => {
//!             client.handle_timeout(Instant::now())?;
//!         }
//!     }
//!
//!     while let Some(event) = client.poll_event() {
//!         match event {
//!             MdnsEvent::RecordUpdate { listener, update, record } => { /* ... */ }
//!             MdnsEvent::TransactionResult { transaction, result, record } => { /* ... */ }
//!         }
//!     }
//! }
//! ```
//!
//! See `examples/mdns_listen.rs` and `examples/mdns_transaction.rs` for
//! complete tokio integrations.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub(crate) mod cache;
pub(crate) mod client;
pub(crate) mod config;
pub(crate) mod connection;
pub(crate) mod message;
pub(crate) mod socket;

pub use cache::{CacheKey, MdnsCache, UpdateType};
pub use client::{
    ListenerId, ListenerUpdate, MdnsClient, MdnsEvent, TransactionFlags, TransactionId,
    TransactionResult,
};
pub use config::{
    DEFAULT_TRANSACTION_TIMEOUT, MAX_MULTICAST_SIZE, MDNS_DEST_ADDR_IPV4, MDNS_DEST_ADDR_IPV6,
    MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT, MdnsConfig,
};
pub use connection::{AddressFamily, DatagramSocket, SocketFactory};
pub use message::rdata::{RecordRdata, SrvRdata};
pub use message::record::RecordParsed;
pub use message::{DNSCLASS_INET, DnsClass, DnsType};
pub use socket::{MulticastSocket, UdpSocketFactory};
