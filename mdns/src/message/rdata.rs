use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;

use super::name::*;
use super::packer::*;
use super::*;

const A_LEN: usize = 4;
const AAAA_LEN: usize = 16;
// priority, weight and port followed by at least the root label.
const SRV_MIN_LEN: usize = 3 * UINT16LEN + 1;

/// Target of an SRV record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SrvRdata {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Type-specific payload of a resource record.
///
/// Names embedded in the payload are decompressed against the message they
/// were read from, so two payloads compare equal whenever they carry the same
/// data regardless of how the sender compressed them. Types the client does not
/// interpret are kept as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordRdata {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(String),
    Cname(String),
    Srv(SrvRdata),
    Txt(Vec<String>),
    Unknown(Bytes),
}

impl fmt::Display for RecordRdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRdata::A(ip) => write!(f, "{ip}"),
            RecordRdata::Aaaa(ip) => write!(f, "{ip}"),
            RecordRdata::Ptr(name) | RecordRdata::Cname(name) => write!(f, "{name}"),
            RecordRdata::Srv(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordRdata::Txt(strings) => write!(f, "{}", strings.join(" ")),
            RecordRdata::Unknown(data) => write!(f, "\\# {}", data.len()),
        }
    }
}

impl RecordRdata {
    // unpack decodes length bytes of rdata at off. The caller has already
    // checked that off + length lies within msg.
    pub(crate) fn unpack(typ: DnsType, msg: &[u8], off: usize, length: usize) -> Result<Self> {
        let end = off + length;
        let invalid = || Error::ErrInvalidRdata(u16::from(typ));

        let rdata = match typ {
            DnsType::A => {
                if length != A_LEN {
                    return Err(invalid());
                }
                let mut a = [0u8; A_LEN];
                a.copy_from_slice(&msg[off..end]);
                RecordRdata::A(Ipv4Addr::from(a))
            }
            DnsType::Aaaa => {
                if length != AAAA_LEN {
                    return Err(invalid());
                }
                let mut aaaa = [0u8; AAAA_LEN];
                aaaa.copy_from_slice(&msg[off..end]);
                RecordRdata::Aaaa(Ipv6Addr::from(aaaa))
            }
            DnsType::Ptr | DnsType::Cname => {
                let mut name = Name::default();
                let name_end = name.unpack(msg, off)?;
                if name_end != end {
                    return Err(invalid());
                }
                if typ == DnsType::Ptr {
                    RecordRdata::Ptr(name.data)
                } else {
                    RecordRdata::Cname(name.data)
                }
            }
            DnsType::Srv => {
                if length < SRV_MIN_LEN {
                    return Err(invalid());
                }
                let (priority, o) = unpack_uint16(msg, off)?;
                let (weight, o) = unpack_uint16(msg, o)?;
                let (port, o) = unpack_uint16(msg, o)?;
                let mut target = Name::default();
                let name_end = target.unpack(msg, o)?;
                if name_end != end {
                    return Err(invalid());
                }
                RecordRdata::Srv(SrvRdata {
                    priority,
                    weight,
                    port,
                    target: target.data,
                })
            }
            DnsType::Txt => {
                let mut strings = vec![];
                let mut o = off;
                while o < end {
                    let len = msg[o] as usize;
                    let (s, next) = unpack_bytes(&msg[..end], o + 1, len).map_err(|_| invalid())?;
                    strings.push(String::from_utf8_lossy(s).into_owned());
                    o = next;
                }
                RecordRdata::Txt(strings)
            }
            _ => RecordRdata::Unknown(Bytes::copy_from_slice(&msg[off..end])),
        };

        Ok(rdata)
    }
}
