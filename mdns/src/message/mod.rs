#[cfg(test)]
mod message_test;

pub(crate) mod header;
pub(crate) mod name;
mod packer;
pub(crate) mod parser;
pub(crate) mod question;
pub(crate) mod rdata;
pub(crate) mod record;

use std::fmt;

use bytes::Bytes;
use header::*;
use name::*;
use question::*;

use shared::error::*;

// A Type is a type of DNS request and response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DnsType {
    A,
    Ns,
    Cname,
    Ptr,
    Txt,
    Aaaa,
    Srv,
    Nsec,
    Any,
    Unknown(u16),
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            2 => DnsType::Ns,
            5 => DnsType::Cname,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            47 => DnsType::Nsec,
            255 => DnsType::Any,
            _ => DnsType::Unknown(v),
        }
    }
}

impl From<DnsType> for u16 {
    fn from(t: DnsType) -> Self {
        match t {
            DnsType::A => 1,
            DnsType::Ns => 2,
            DnsType::Cname => 5,
            DnsType::Ptr => 12,
            DnsType::Txt => 16,
            DnsType::Aaaa => 28,
            DnsType::Srv => 33,
            DnsType::Nsec => 47,
            DnsType::Any => 255,
            DnsType::Unknown(v) => v,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DnsType::A => write!(f, "A"),
            DnsType::Ns => write!(f, "NS"),
            DnsType::Cname => write!(f, "CNAME"),
            DnsType::Ptr => write!(f, "PTR"),
            DnsType::Txt => write!(f, "TXT"),
            DnsType::Aaaa => write!(f, "AAAA"),
            DnsType::Srv => write!(f, "SRV"),
            DnsType::Nsec => write!(f, "NSEC"),
            DnsType::Any => write!(f, "ANY"),
            DnsType::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}

impl DnsType {
    // pack appends the wire format of field to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        packer::pack_uint16(msg, u16::from(*self))
    }
}

/// DNS class of a question or resource record.
///
/// mDNS reuses the top bit of the class field: in responses it is the
/// cache-flush bit, in questions the unicast-response bit. Use
/// [`DnsClass::is_inet`] to compare against IN with that bit masked off.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DnsClass(pub u16);

/// Internet class (IN).
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Mask that strips the mDNS cache-flush / unicast-response bit from a class.
pub const MDNS_CLASS_MASK: u16 = 0x7FFF;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.masked() {
            1 => write!(f, "ClassINET"),
            255 => write!(f, "ClassANY"),
            other => write!(f, "{other}"),
        }
    }
}

impl DnsClass {
    /// The class value without the mDNS top bit.
    pub fn masked(&self) -> u16 {
        self.0 & MDNS_CLASS_MASK
    }

    pub fn is_inet(&self) -> bool {
        self.masked() == DNSCLASS_INET.0
    }

    /// Whether the cache-flush bit is set.
    pub fn cache_flush(&self) -> bool {
        self.0 & !MDNS_CLASS_MASK != 0
    }

    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        packer::pack_uint16(msg, self.0)
    }
}

// An OpCode is a DNS operation code.
pub type OpCode = u16;

// An RCode is a DNS response status code.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RCode {
    // Message.Rcode
    #[default]
    Success = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    Unsupported,
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "RCodeSuccess",
            RCode::FormatError => "RCodeFormatError",
            RCode::ServerFailure => "RCodeServerFailure",
            RCode::NameError => "RCodeNameError",
            RCode::NotImplemented => "RCodeNotImplemented",
            RCode::Refused => "RCodeRefused",
            RCode::Unsupported => "RCodeUnsupported",
        };
        write!(f, "{s}")
    }
}

// Internal constants.

// UINT16LEN is the length (in bytes) of a uint16.
const UINT16LEN: usize = 2;

// UINT32LEN is the length (in bytes) of a uint32.
const UINT32LEN: usize = 4;

// HEADER_LEN is the length (in bytes) of a DNS header.
//
// A header is comprised of 6 uint16s and no padding.
const HEADER_LEN: usize = 6 * UINT16LEN;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

// Message is the outbound side of a DNS message. The client only ever sends
// questions, so answers are read through the Parser instead.
#[derive(Default, Debug)]
pub(crate) struct Message {
    pub(crate) header: Header,
    pub(crate) questions: Vec<Question>,
}

impl Message {
    // Pack packs a full Message.
    pub(crate) fn pack(&self) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }

        let (id, bits) = self.header.pack();
        let h = HeaderInternal {
            id,
            bits,
            questions: self.questions.len() as u16,
            ..Default::default()
        };

        let mut msg = h.pack(Vec::with_capacity(HEADER_LEN + 64));
        for question in &self.questions {
            msg = question.pack(msg)?;
        }

        Ok(msg)
    }
}

/// Builds an mDNS query for `typ` records of `name`.
///
/// The query has id 0, no flags set (in particular no "recursion desired"),
/// and a single IN-class question.
pub(crate) fn build_query(typ: DnsType, name: &str) -> Result<Bytes> {
    let msg = Message {
        header: Header::default(),
        questions: vec![Question {
            name: Name::new(name)?,
            typ,
            class: DNSCLASS_INET,
        }],
    };
    Ok(Bytes::from(msg.pack()?))
}
