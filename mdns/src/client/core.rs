use std::collections::HashMap;
use std::time::Instant;

use bytes::BytesMut;
use shared::error::{Error, Result};

use crate::cache::{MdnsCache, UpdateType};
use crate::config::MdnsConfig;
use crate::connection::{Connection, SocketFactory};
use crate::message::DnsType;
use crate::message::build_query;
use crate::message::record::RecordParsed;

use super::listener::{ListenerId, ListenerKey};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CoreState {
    Uninitialized,
    Active,
    /// The connection failed. The cache still answers but sockets are no
    /// longer read.
    Defunct,
}

/// Sockets, cache and listener registry. Lives while anything listens.
pub(crate) struct Core {
    state: CoreState,
    connection: Option<Connection>,
    cache: MdnsCache,
    listeners: HashMap<ListenerKey, Vec<ListenerId>>,
    scheduled_cleanup: Option<Instant>,
}

impl Core {
    pub(crate) fn new() -> Self {
        Self {
            state: CoreState::Uninitialized,
            connection: None,
            cache: MdnsCache::new(),
            listeners: HashMap::new(),
            scheduled_cleanup: None,
        }
    }

    pub(crate) fn init(
        &mut self,
        factory: &mut dyn SocketFactory,
        config: &MdnsConfig,
    ) -> Result<()> {
        let connection = Connection::init(factory, config)?;
        self.connection = Some(connection);
        self.state = CoreState::Active;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CoreState {
        self.state
    }

    pub(crate) fn send_query(&mut self, typ: DnsType, name: &str) -> Result<()> {
        let packet = build_query(typ, name)?;
        let connection = match (self.state, self.connection.as_mut()) {
            (CoreState::Active, Some(connection)) => connection,
            _ => return Err(Error::ErrConnectionClosed),
        };
        if let Err(err) = connection.send(&packet) {
            self.on_connection_error(&err);
            return Err(err);
        }
        log::trace!("mdns: sent query for {name} ({typ})");
        Ok(())
    }

    /// Next datagram waiting on the sockets.
    pub(crate) fn recv_next(&mut self) -> Result<Option<BytesMut>> {
        let connection = match (self.state, self.connection.as_mut()) {
            (CoreState::Active, Some(connection)) => connection,
            _ => return Ok(None),
        };
        match connection.recv_next() {
            Ok(datagram) => Ok(datagram.map(|(data, src)| {
                log::trace!("mdns: {} bytes from {src}", data.len());
                BytesMut::from(data)
            })),
            Err(err) => {
                self.on_connection_error(&err);
                Err(err)
            }
        }
    }

    fn on_connection_error(&mut self, err: &Error) {
        log::error!("mdns: connection error: {err}");
        self.state = CoreState::Defunct;
    }

    /// Stores `record` and moves the cleanup deadline to the new soonest
    /// expiration.
    pub(crate) fn update_record(&mut self, record: RecordParsed) -> UpdateType {
        let update = self.cache.update_dns_record(record);
        self.schedule_cleanup(self.cache.next_expiration());
        update
    }

    pub(crate) fn schedule_cleanup(&mut self, deadline: Option<Instant>) {
        if self.scheduled_cleanup != deadline {
            self.scheduled_cleanup = deadline;
        }
    }

    pub(crate) fn scheduled_cleanup(&self) -> Option<Instant> {
        self.scheduled_cleanup
    }

    /// Evicts every record expired at `now` and returns them in expiration
    /// order.
    pub(crate) fn cleanup(&mut self, now: Instant) -> Vec<RecordParsed> {
        let mut removed = vec![];
        self.cache
            .cleanup_records(now, |record| removed.push(record.clone()));
        self.scheduled_cleanup = self.cache.next_expiration();
        removed
    }

    pub(crate) fn query_cache(&self, typ: DnsType, name: &str, now: Instant) -> Vec<RecordParsed> {
        self.cache
            .find_dns_records(typ, name, now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub(crate) fn add_listener(&mut self, key: ListenerKey, id: ListenerId) {
        let ids = self.listeners.entry(key).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    pub(crate) fn remove_listener(&mut self, key: &ListenerKey, id: ListenerId) {
        if let Some(ids) = self.listeners.get_mut(key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.listeners.remove(key);
            }
        }
    }

    /// Snapshot of the listeners registered under `key`.
    pub(crate) fn listeners_for(&self, key: &ListenerKey) -> Vec<ListenerId> {
        self.listeners.get(key).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn listener_keys(&self) -> usize {
        self.listeners.len()
    }
}
