use std::fmt;
use std::time::{Duration, Instant};

use super::name::trim_root;
use super::rdata::RecordRdata;
use super::*;

/// A resource record read from an mDNS response.
///
/// `time_created` is the reception time of the packet that carried the
/// record; together with the TTL it determines when the record expires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordParsed {
    name: String,
    typ: DnsType,
    class: DnsClass,
    ttl: u32,
    time_created: Instant,
    rdata: RecordRdata,
}

impl fmt::Display for RecordParsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ttl={} {}",
            self.name, self.class, self.typ, self.ttl, self.rdata
        )
    }
}

impl RecordParsed {
    pub fn new(
        name: &str,
        typ: DnsType,
        class: DnsClass,
        ttl: u32,
        rdata: RecordRdata,
        time_created: Instant,
    ) -> Self {
        Self {
            name: trim_root(name).to_owned(),
            typ,
            class,
            ttl,
            time_created,
            rdata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> DnsType {
        self.typ
    }

    /// The raw class, including the cache-flush bit.
    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn time_created(&self) -> Instant {
        self.time_created
    }

    pub fn rdata(&self) -> &RecordRdata {
        &self.rdata
    }

    pub fn expiration(&self) -> Instant {
        self.time_created + Duration::from_secs(u64::from(self.ttl))
    }

    pub fn cache_flush(&self) -> bool {
        self.class.cache_flush()
    }

    /// Compares name, type, class (ignoring the cache-flush bit) and payload,
    /// and the TTL unless `ignore_ttl` is set.
    pub fn is_equal(&self, other: &RecordParsed, ignore_ttl: bool) -> bool {
        self.name == other.name
            && self.typ == other.typ
            && self.class.masked() == other.class.masked()
            && (ignore_ttl || self.ttl == other.ttl)
            && self.rdata == other.rdata
    }

    pub(crate) fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }
}
