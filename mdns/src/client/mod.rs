//! Sans-I/O mDNS client.
//!
//! [`MdnsClient`] multiplexes long-lived listeners and one-shot transactions
//! over a shared record cache and one multicast socket per address family.
//! It implements [`sansio::Protocol`]: the embedding event loop feeds it
//! readiness and time, and drains [`MdnsEvent`]s.


mod core;
mod listener;
mod transaction;

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use shared::TaggedBytesMut;
use shared::error::{Error, Result};

use crate::config::MdnsConfig;
use crate::connection::SocketFactory;
use crate::message::DnsType;
use crate::message::name::trim_root;
use crate::message::parser::Parser;
use crate::message::record::RecordParsed;
use crate::socket::UdpSocketFactory;

use self::core::Core;
use self::listener::{Listener, ListenerKey, ListenerOwner};
pub use self::listener::{ListenerId, ListenerUpdate};
use self::transaction::Transaction;
pub use self::transaction::{TransactionFlags, TransactionId, TransactionResult};

/// Notifications produced by an [`MdnsClient`].
///
/// Poll for events using [`poll_event()`](sansio::Protocol::poll_event) after
/// calling [`handle_readable()`](MdnsClient::handle_readable),
/// [`handle_read()`](sansio::Protocol::handle_read),
/// [`handle_timeout()`](sansio::Protocol::handle_timeout) or
/// [`start_transaction()`](MdnsClient::start_transaction).
#[derive(Debug, Clone, PartialEq)]
pub enum MdnsEvent {
    /// A record matching a started listener was added, changed or removed.
    RecordUpdate {
        listener: ListenerId,
        update: ListenerUpdate,
        record: RecordParsed,
    },

    /// A transaction produced a record or finished.
    ///
    /// `record` is set for [`TransactionResult::Record`] only.
    TransactionResult {
        transaction: TransactionId,
        result: TransactionResult,
        record: Option<RecordParsed>,
    },
}

/// Sans-I/O mDNS client.
///
/// Sockets are opened lazily when the first listener (or network
/// transaction) starts and closed once nothing listens any more. Closing is
/// deferred to the next [`handle_timeout()`](sansio::Protocol::handle_timeout)
/// so a listener started in the meantime keeps the sockets and the cache.
///
/// # Example
///
/// ```rust,ignore
/// use mdns_client::{DnsType, MdnsClient, MdnsConfig, MdnsEvent, TransactionFlags};
/// use sansio::Protocol;
/// use std::time::Instant;
///
/// let mut client = MdnsClient::new(MdnsConfig::default());
/// let id = client.create_transaction(
///     DnsType::A,
///     "printer.local",
///     TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK,
/// )?;
/// client.start_transaction(id, Instant::now())?;
///
/// // when a socket is readable
/// client.handle_readable(Instant::now())?;
/// while let Some(event) = client.poll_event() {
///     println!("{event:?}");
/// }
/// ```
pub struct MdnsClient {
    config: MdnsConfig,
    socket_factory: Box<dyn SocketFactory>,
    core: Option<Core>,
    listen_refs: usize,
    /// Set when the last listen reference is released. The next
    /// `handle_timeout` closes the sockets if nothing listens by then.
    shutdown_pending: bool,
    /// Latest time handed in by the caller.
    last_now: Option<Instant>,

    listeners: HashMap<ListenerId, Listener>,
    transactions: HashMap<TransactionId, Transaction>,
    next_id: u64,

    event_outs: VecDeque<MdnsEvent>,
    closed: bool,
}

fn normalize_name(name: &str) -> &str {
    trim_root(name)
}

impl MdnsClient {
    /// Create a client that opens real multicast sockets.
    pub fn new(config: MdnsConfig) -> Self {
        let factory = UdpSocketFactory::from_config(&config);
        Self::with_socket_factory(config, Box::new(factory))
    }

    /// Create a client over any socket implementation.
    pub fn with_socket_factory(config: MdnsConfig, socket_factory: Box<dyn SocketFactory>) -> Self {
        Self {
            config,
            socket_factory,
            core: None,
            listen_refs: 0,
            shutdown_pending: false,
            last_now: None,
            listeners: HashMap::new(),
            transactions: HashMap::new(),
            next_id: 1,
            event_outs: VecDeque::new(),
            closed: false,
        }
    }

    /// Whether sockets are open (or their teardown is still pending).
    pub fn is_listening(&self) -> bool {
        self.core.is_some()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create an unstarted listener for records of `typ` named `name`.
    ///
    /// An empty `name` listens to every record of the type.
    pub fn create_listener(&mut self, typ: DnsType, name: &str) -> ListenerId {
        self.create_listener_for(typ, name, ListenerOwner::User)
    }

    fn create_listener_for(&mut self, typ: DnsType, name: &str, owner: ListenerOwner) -> ListenerId {
        let id = self.allocate_id();
        self.listeners
            .insert(id, Listener::new(typ, normalize_name(name), owner));
        id
    }

    /// Start delivering [`MdnsEvent::RecordUpdate`]s for a listener.
    ///
    /// Opens the sockets if this is the first active listener; fails when
    /// they cannot be opened.
    pub fn start_listener(&mut self, id: ListenerId) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let key = match self.listeners.get(&id) {
            Some(listener) if listener.started => return Err(Error::ErrAlreadyStarted),
            Some(listener) => listener.key.clone(),
            None => return Err(Error::ErrListenerNotFound),
        };

        self.add_listen_ref()?;
        if let Some(core) = self.core.as_mut() {
            core.add_listener(key, id);
        }
        if let Some(listener) = self.listeners.get_mut(&id) {
            listener.started = true;
        }
        Ok(())
    }

    /// Destroy a listener. Its queued events are discarded.
    pub fn destroy_listener(&mut self, id: ListenerId) {
        if self
            .listeners
            .get(&id)
            .is_some_and(|listener| listener.owner == ListenerOwner::User)
        {
            self.remove_listener(id);
        }
    }

    fn remove_listener(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.remove(&id) else {
            return;
        };
        if listener.started {
            if let Some(core) = self.core.as_mut() {
                core.remove_listener(&listener.key, id);
            }
            self.subtract_listen_ref();
        }
        self.event_outs.retain(|event| {
            !matches!(event, MdnsEvent::RecordUpdate { listener, .. } if *listener == id)
        });
    }

    fn add_listen_ref(&mut self) -> Result<()> {
        if self.core.is_none() {
            let mut core = Core::new();
            core.init(self.socket_factory.as_mut(), &self.config)?;
            log::debug!("mdns: sockets opened");
            self.core = Some(core);
        }
        self.listen_refs += 1;
        Ok(())
    }

    fn subtract_listen_ref(&mut self) {
        self.listen_refs = self.listen_refs.saturating_sub(1);
        if self.listen_refs == 0 {
            self.shutdown_pending = true;
        }
    }

    fn observe(&mut self, now: Instant) {
        self.last_now = Some(self.last_now.map_or(now, |last| last.max(now)));
    }

    /// Create an unstarted transaction.
    ///
    /// `flags` must contain [`TransactionFlags::QUERY_CACHE`],
    /// [`TransactionFlags::QUERY_NETWORK`] or both.
    pub fn create_transaction(
        &mut self,
        typ: DnsType,
        name: &str,
        flags: TransactionFlags,
    ) -> Result<TransactionId> {
        if !flags.intersects(TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK) {
            return Err(Error::ErrInvalidTransactionFlags);
        }
        let id = self.allocate_id();
        self.transactions
            .insert(id, Transaction::new(typ, normalize_name(name), flags));
        Ok(id)
    }

    /// Start a transaction.
    ///
    /// Cached records are reported right away. A network transaction then
    /// sends its query and reports answers until
    /// [`MdnsConfig::transaction_timeout`] passes; a cache-only transaction
    /// reports its end immediately. An error means the network phase could
    /// not start and the transaction reports nothing more.
    pub fn start_transaction(&mut self, id: TransactionId, now: Instant) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.observe(now);
        let (typ, name, flags) = match self.transactions.get_mut(&id) {
            Some(t) if t.started => return Err(Error::ErrAlreadyStarted),
            Some(t) => {
                t.started = true;
                t.active = true;
                (t.typ, t.name.clone(), t.flags)
            }
            None => return Err(Error::ErrTransactionNotFound),
        };

        if flags.contains(TransactionFlags::QUERY_CACHE) {
            for record in self.query_cache(typ, &name, now) {
                if !self.is_transaction_active(id) {
                    break;
                }
                self.trigger_transaction(id, TransactionResult::Record, Some(record));
            }
            if !self.is_transaction_active(id) {
                return Ok(());
            }
        }

        if flags.contains(TransactionFlags::QUERY_NETWORK) {
            if let Err(err) = self.query_and_listen(id, typ, &name, now) {
                log::debug!("mdns: transaction for {name} ({typ}) failed to start: {err}");
                self.reset_transaction(id);
                return Err(err);
            }
        } else {
            self.signal_transaction_over(id);
        }
        Ok(())
    }

    fn query_and_listen(
        &mut self,
        id: TransactionId,
        typ: DnsType,
        name: &str,
        now: Instant,
    ) -> Result<()> {
        let listener = self.create_listener_for(typ, name, ListenerOwner::Transaction(id));
        if let Some(t) = self.transactions.get_mut(&id) {
            t.listener = Some(listener);
        }
        self.start_listener(listener)?;

        let core = self.core.as_mut().ok_or(Error::ErrNotListening)?;
        core.send_query(typ, name)?;

        if let Some(t) = self.transactions.get_mut(&id) {
            t.timeout = Some(now + self.config.transaction_timeout);
        }
        Ok(())
    }

    /// Destroy a transaction. It reports nothing more and its queued events
    /// are discarded.
    pub fn destroy_transaction(&mut self, id: TransactionId) {
        self.reset_transaction(id);
        self.transactions.remove(&id);
        self.event_outs.retain(|event| {
            !matches!(event, MdnsEvent::TransactionResult { transaction, .. } if *transaction == id)
        });
    }

    fn is_transaction_active(&self, id: TransactionId) -> bool {
        self.transactions.get(&id).is_some_and(|t| t.active)
    }

    fn trigger_transaction(
        &mut self,
        id: TransactionId,
        result: TransactionResult,
        record: Option<RecordParsed>,
    ) {
        let Some(t) = self.transactions.get(&id) else {
            return;
        };
        if !t.active {
            return;
        }
        if t.flags.contains(TransactionFlags::SINGLE_RESULT) || result != TransactionResult::Record
        {
            self.reset_transaction(id);
        }
        self.event_outs.push_back(MdnsEvent::TransactionResult {
            transaction: id,
            result,
            record,
        });
    }

    fn signal_transaction_over(&mut self, id: TransactionId) {
        if let Some(result) = self.transactions.get(&id).map(|t| t.over_result()) {
            self.trigger_transaction(id, result, None);
        }
    }

    fn reset_transaction(&mut self, id: TransactionId) {
        let listener = match self.transactions.get_mut(&id) {
            Some(t) => {
                t.active = false;
                t.timeout = None;
                t.listener.take()
            }
            None => None,
        };
        if let Some(listener) = listener {
            self.remove_listener(listener);
        }
    }

    /// Unexpired cached records of `typ` named `name` (any name if empty).
    pub fn query_cache(&self, typ: DnsType, name: &str, now: Instant) -> Vec<RecordParsed> {
        match &self.core {
            Some(core) => core.query_cache(typ, normalize_name(name), now),
            None => vec![],
        }
    }

    /// Read and process every datagram waiting on the sockets.
    ///
    /// Call this when a socket reports readiness. An error means the
    /// connection failed; the cache keeps answering but sockets are no
    /// longer read.
    pub fn handle_readable(&mut self, now: Instant) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.observe(now);
        loop {
            let Some(core) = self.core.as_mut() else {
                return Ok(());
            };
            match core.recv_next()? {
                Some(datagram) => self.handle_packet(&datagram, now),
                None => return Ok(()),
            }
        }
    }

    fn handle_packet(&mut self, data: &[u8], now: Instant) {
        if self.core.is_none() {
            return;
        }
        let mut parser = match Parser::start_without_query(data) {
            Ok(parser) => parser,
            Err(err) => {
                log::warn!("mdns: dropping unreadable packet: {err}");
                return;
            }
        };
        if !parser.header().response {
            return;
        }

        let answers = usize::from(parser.answer_count());
        let total = answers + usize::from(parser.additional_count());
        for i in 0..total {
            if i == answers {
                for _ in 0..parser.authority_count() {
                    if let Err(err) = parser.skip_record() {
                        log::debug!("mdns: abandoning packet in authority section: {err}");
                        return;
                    }
                }
            }

            let offset = parser.offset();
            let record = match parser.record(now) {
                Ok(record) => record,
                Err(err) => {
                    if parser.offset() == offset {
                        log::debug!("mdns: abandoning packet at record {i}: {err}");
                        return;
                    }
                    log::debug!("mdns: skipping unreadable record {i}: {err}");
                    continue;
                }
            };

            if !record.class().is_inet() {
                log::trace!("mdns: ignoring non-IN record {record}");
                continue;
            }

            let Some(core) = self.core.as_mut() else {
                return;
            };
            let update = core.update_record(record.clone());
            if let Some(update) = ListenerUpdate::from_cache_update(update) {
                self.alert_listeners(update, &record);
            }
        }
    }

    fn alert_listeners(&mut self, update: ListenerUpdate, record: &RecordParsed) {
        let exact = ListenerKey::new(record.typ(), record.name());
        let wildcard = ListenerKey::wildcard(record.typ());
        for key in [exact, wildcard] {
            let ids = match &self.core {
                Some(core) => core.listeners_for(&key),
                None => return,
            };
            for id in ids {
                self.deliver(id, update, record);
            }
        }
    }

    fn deliver(&mut self, id: ListenerId, update: ListenerUpdate, record: &RecordParsed) {
        let owner = match self.listeners.get(&id) {
            Some(listener) if listener.started => listener.owner,
            _ => return,
        };
        match owner {
            ListenerOwner::User => self.event_outs.push_back(MdnsEvent::RecordUpdate {
                listener: id,
                update,
                record: record.clone(),
            }),
            ListenerOwner::Transaction(transaction) => {
                if update != ListenerUpdate::Removed {
                    self.trigger_transaction(
                        transaction,
                        TransactionResult::Record,
                        Some(record.clone()),
                    );
                }
            }
        }
    }

    fn handle_cleanup(&mut self, now: Instant) {
        let removed = match self.core.as_mut() {
            Some(core) if core.scheduled_cleanup().is_some_and(|at| at <= now) => {
                core.cleanup(now)
            }
            _ => return,
        };
        for record in &removed {
            self.alert_listeners(ListenerUpdate::Removed, record);
        }
    }

    fn handle_transaction_timeouts(&mut self, now: Instant) {
        let mut expired: Vec<TransactionId> = self
            .transactions
            .iter()
            .filter(|(_, t)| t.timeout.is_some_and(|at| at <= now))
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();
        for id in expired {
            self.signal_transaction_over(id);
        }
    }

    fn handle_shutdown(&mut self) {
        if !self.shutdown_pending {
            return;
        }
        self.shutdown_pending = false;
        if self.listen_refs == 0 && self.core.take().is_some() {
            log::debug!("mdns: sockets closed");
        }
    }

    #[cfg(test)]
    fn core(&self) -> Option<&Core> {
        self.core.as_ref()
    }
}

impl sansio::Protocol<TaggedBytesMut, (), ()> for MdnsClient {
    type Rout = ();
    type Wout = ();
    type Eout = MdnsEvent;
    type Error = Error;
    type Time = Instant;

    /// Process one datagram the embedder read itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrConnectionClosed`] after [`close()`](sansio::Protocol::close)
    /// and [`Error::ErrNotListening`] when no listener is active, since there
    /// is no cache to feed.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if self.core.is_none() {
            return Err(Error::ErrNotListening);
        }
        log::trace!(
            "mdns: {} bytes from {}",
            msg.message.len(),
            msg.transport.peer_addr
        );
        self.observe(msg.now);
        self.handle_packet(&msg.message, msg.now);
        Ok(())
    }

    /// Records are delivered through `poll_event()`.
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Queries are sent by transactions directly on the sockets.
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        None
    }

    fn handle_event(&mut self, _evt: ()) -> Result<()> {
        Ok(())
    }

    /// Get the next listener or transaction notification.
    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_outs.pop_front()
    }

    /// Evict expired records, end timed-out transactions and close idle
    /// sockets, in that order.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.observe(now);
        self.handle_cleanup(now);
        self.handle_transaction_timeouts(now);
        self.handle_shutdown();
        Ok(())
    }

    /// The earliest of the cache cleanup deadline and the transaction
    /// timeouts. A pending socket teardown is due at the latest time the
    /// caller handed in, so any later `handle_timeout` performs it.
    fn poll_timeout(&mut self) -> Option<Self::Time> {
        let cleanup = self.core.as_ref().and_then(|core| core.scheduled_cleanup());
        let timeouts = self.transactions.values().filter_map(|t| t.timeout);
        let shutdown = self
            .shutdown_pending
            .then(|| self.last_now.unwrap_or_else(Instant::now));
        cleanup.into_iter().chain(timeouts).chain(shutdown).min()
    }

    /// Close the sockets and drop every listener, transaction and queued
    /// event. Further calls fail with [`Error::ErrConnectionClosed`].
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.core = None;
        self.listen_refs = 0;
        self.shutdown_pending = false;
        self.listeners.clear();
        self.transactions.clear();
        self.event_outs.clear();
        Ok(())
    }
}
