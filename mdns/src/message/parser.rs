use std::time::Instant;

use super::header::*;
use super::name::*;
use super::packer::*;
use super::rdata::RecordRdata;
use super::record::RecordParsed;
use super::*;

// Parser reads the resource records of an mDNS response one at a time.
//
// The cursor only moves past a record once its header and rdata bounds are
// known to be valid, so callers can tell "skip this record" (cursor moved)
// from "the rest of the packet is unreadable" (cursor stuck).
pub(crate) struct Parser<'a> {
    msg: &'a [u8],
    header: HeaderInternal,
    off: usize,
}

impl<'a> Parser<'a> {
    // start_without_query parses the header and skips the question section
    // without checking it against any query we sent.
    pub(crate) fn start_without_query(msg: &'a [u8]) -> Result<Self> {
        let mut header = HeaderInternal::default();
        let mut off = header.unpack(msg, 0)?;

        for _ in 0..header.questions {
            off = Name::skip(msg, off)?;
            off = skip_uint16(msg, off)?; // type
            off = skip_uint16(msg, off)?; // class
        }

        Ok(Parser { msg, header, off })
    }

    pub(crate) fn header(&self) -> Header {
        self.header.header()
    }

    pub(crate) fn answer_count(&self) -> u16 {
        self.header.answers
    }

    pub(crate) fn authority_count(&self) -> u16 {
        self.header.authorities
    }

    pub(crate) fn additional_count(&self) -> u16 {
        self.header.additionals
    }

    pub(crate) fn offset(&self) -> usize {
        self.off
    }

    // record reads the next resource record, stamping it with the reception
    // time now.
    pub(crate) fn record(&mut self, now: Instant) -> Result<RecordParsed> {
        let (name, typ, class, ttl, rdata_off, length) = self.record_header()?;
        self.off = rdata_off + length;

        let rdata = RecordRdata::unpack(typ, self.msg, rdata_off, length)?;
        Ok(RecordParsed::new(&name.data, typ, class, ttl, rdata, now))
    }

    // skip_record moves past the next resource record without decoding its
    // payload.
    pub(crate) fn skip_record(&mut self) -> Result<()> {
        let (_, _, _, _, rdata_off, length) = self.record_header()?;
        self.off = rdata_off + length;
        Ok(())
    }

    fn record_header(&self) -> Result<(Name, DnsType, DnsClass, u32, usize, usize)> {
        let mut name = Name::default();
        let off = name.unpack(self.msg, self.off)?;
        let (typ, off) = unpack_uint16(self.msg, off)?;
        let (class, off) = unpack_uint16(self.msg, off)?;
        let (ttl, off) = unpack_uint32(self.msg, off)?;
        let (length, off) = unpack_uint16(self.msg, off)?;
        let length = length as usize;
        if off + length > self.msg.len() {
            return Err(Error::ErrResourceLen);
        }
        Ok((name, DnsType::from(typ), DnsClass(class), ttl, off, length))
    }
}
