use std::time::Instant;

use bitflags::bitflags;

use crate::message::DnsType;

use super::ListenerId;

/// Identifies a transaction created with
/// [`MdnsClient::create_transaction`](crate::MdnsClient::create_transaction).
pub type TransactionId = u64;

bitflags! {
    /// How a transaction looks for records.
    ///
    /// At least one of `QUERY_CACHE` and `QUERY_NETWORK` must be set.
    pub struct TransactionFlags: u8 {
        /// Serve matching records already in the cache.
        const QUERY_CACHE = 0b001;
        /// Send a query and collect answers until the timeout.
        const QUERY_NETWORK = 0b010;
        /// Stop after the first record.
        const SINGLE_RESULT = 0b100;
    }
}

/// Outcome reported by a transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionResult {
    /// A matching record; the transaction keeps running unless it is
    /// `SINGLE_RESULT`.
    Record,
    /// A `SINGLE_RESULT` transaction finished without finding anything.
    NoResults,
    /// A multi-result transaction finished.
    Done,
}

pub(crate) struct Transaction {
    pub(crate) typ: DnsType,
    pub(crate) name: String,
    pub(crate) flags: TransactionFlags,
    pub(crate) started: bool,
    /// Cleared by a reset; an inactive transaction reports nothing more.
    pub(crate) active: bool,
    pub(crate) listener: Option<ListenerId>,
    pub(crate) timeout: Option<Instant>,
}

impl Transaction {
    pub(crate) fn new(typ: DnsType, name: &str, flags: TransactionFlags) -> Self {
        Self {
            typ,
            name: name.to_owned(),
            flags,
            started: false,
            active: false,
            listener: None,
            timeout: None,
        }
    }

    /// The result reported when the transaction ends without a record.
    pub(crate) fn over_result(&self) -> TransactionResult {
        if self.flags.contains(TransactionFlags::SINGLE_RESULT) {
            TransactionResult::NoResults
        } else {
            TransactionResult::Done
        }
    }
}
