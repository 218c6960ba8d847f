//! Record cache with per-record expiration.
//!
//! [`MdnsCache`] keeps the best-known version of every record the client has
//! heard, keyed by type and name, together with an index ordered by
//! expiration time so the soonest-expiring record is always at hand.


use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::message::DnsType;
use crate::message::name::trim_root;
use crate::message::rdata::RecordRdata;
use crate::message::record::RecordParsed;

// Goodbye records (TTL 0) are kept for one second before eviction.
const GOODBYE_TTL: u32 = 1;

/// Cache key of a record.
///
/// `optional` distinguishes records that share type and name but are
/// different records rather than different versions of one record. It is the
/// PTR target for PTR records and empty for everything else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    typ: DnsType,
    name: String,
    optional: String,
}

impl CacheKey {
    pub fn new(typ: DnsType, name: &str, optional: &str) -> Self {
        Self {
            typ,
            name: name.to_owned(),
            optional: optional.to_owned(),
        }
    }

    pub fn create_for(record: &RecordParsed) -> Self {
        let optional = match record.rdata() {
            RecordRdata::Ptr(target) => target.as_str(),
            _ => "",
        };
        Self::new(record.typ(), record.name(), optional)
    }

    pub fn typ(&self) -> DnsType {
        self.typ
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of [`MdnsCache::update_dns_record`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateType {
    RecordAdded,
    RecordChanged,
    NoChange,
}

#[derive(Default, Debug)]
pub struct MdnsCache {
    records: BTreeMap<CacheKey, RecordParsed>,
    expirations: BTreeSet<(Instant, CacheKey)>,
}

impl MdnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.expirations.clear();
    }

    /// Inserts or refreshes a record.
    ///
    /// A record whose content matches the cached one only refreshes the
    /// expiration and reports [`UpdateType::NoChange`].
    pub fn update_dns_record(&mut self, mut record: RecordParsed) -> UpdateType {
        if record.ttl() == 0 {
            record.set_ttl(GOODBYE_TTL);
        }

        let key = CacheKey::create_for(&record);
        let update = match self.records.get(&key) {
            None => UpdateType::RecordAdded,
            Some(existing) => {
                self.expirations
                    .remove(&(existing.expiration(), key.clone()));
                if existing.is_equal(&record, true) {
                    UpdateType::NoChange
                } else {
                    UpdateType::RecordChanged
                }
            }
        };

        self.expirations.insert((record.expiration(), key.clone()));
        self.records.insert(key, record);

        update
    }

    /// Returns the records of `typ` named `name` that have not expired at
    /// `now`. An empty `name` matches every name.
    pub fn find_dns_records(&self, typ: DnsType, name: &str, now: Instant) -> Vec<&RecordParsed> {
        let name = trim_root(name);
        let start = CacheKey::new(typ, name, "");

        let mut results = vec![];
        for (key, record) in self.records.range(start..) {
            if key.typ != typ || (!name.is_empty() && key.name != name) {
                break;
            }
            if record.expiration() > now {
                results.push(record);
            }
        }
        results
    }

    /// Evicts every record that expired at or before `now`, handing each one
    /// to `record_removed`.
    pub fn cleanup_records<F>(&mut self, now: Instant, mut record_removed: F)
    where
        F: FnMut(&RecordParsed),
    {
        while let Some((expiration, _)) = self.expirations.first() {
            if *expiration > now {
                break;
            }
            let Some((_, key)) = self.expirations.pop_first() else {
                break;
            };
            if let Some(record) = self.records.remove(&key) {
                record_removed(&record);
            }
        }
    }

    /// Soonest expiration among cached records, `None` when the cache is empty.
    pub fn next_expiration(&self) -> Option<Instant> {
        self.expirations.first().map(|(expiration, _)| *expiration)
    }
}
