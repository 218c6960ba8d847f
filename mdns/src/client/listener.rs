use crate::cache::UpdateType;
use crate::message::DnsType;

use super::TransactionId;

/// Identifies a listener created with
/// [`MdnsClient::create_listener`](crate::MdnsClient::create_listener).
pub type ListenerId = u64;

/// What happened to a record a listener is interested in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListenerUpdate {
    Added,
    Changed,
    Removed,
}

impl ListenerUpdate {
    /// The notification a cache update produces, if any.
    pub(crate) fn from_cache_update(update: UpdateType) -> Option<Self> {
        match update {
            UpdateType::RecordAdded => Some(ListenerUpdate::Added),
            UpdateType::RecordChanged => Some(ListenerUpdate::Changed),
            UpdateType::NoChange => None,
        }
    }
}

/// Listener registration key. An empty name matches every name of the type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ListenerKey {
    pub(crate) typ: DnsType,
    pub(crate) name: String,
}

impl ListenerKey {
    pub(crate) fn new(typ: DnsType, name: &str) -> Self {
        Self {
            typ,
            name: name.to_owned(),
        }
    }

    pub(crate) fn wildcard(typ: DnsType) -> Self {
        Self::new(typ, "")
    }
}

/// Who receives a listener's notifications.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ListenerOwner {
    /// Surfaced as [`MdnsEvent::RecordUpdate`](crate::MdnsEvent::RecordUpdate).
    User,
    /// Feeds the network phase of a transaction.
    Transaction(TransactionId),
}

pub(crate) struct Listener {
    pub(crate) key: ListenerKey,
    pub(crate) owner: ListenerOwner,
    pub(crate) started: bool,
}

impl Listener {
    pub(crate) fn new(typ: DnsType, name: &str, owner: ListenerOwner) -> Self {
        Self {
            key: ListenerKey::new(typ, name),
            owner,
            started: false,
        }
    }
}
