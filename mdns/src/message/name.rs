use std::fmt;

use super::packer::*;
use super::*;

// Maximum length of a name in wire format, including the root label.
const NAME_LEN: usize = 255;

const MAX_LABEL_LEN: usize = 63;

// Maximum number of compression pointers followed while reading one name.
const MAX_PTR: usize = 10;

/// A domain name in dotted form without the trailing root dot, e.g.
/// `"printer._ipp._tcp.local"`.
///
/// A `.` or `\` inside a label is escaped with a backslash, so the
/// DNS-SD instance label `My.Printer` reads `My\.Printer._ipp._tcp.local`.
#[derive(Default, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub(crate) data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    /// Validates a dotted name for use in a query.
    ///
    /// A single trailing dot is accepted and dropped. Empty names, empty labels,
    /// labels longer than 63 bytes and names longer than 255 bytes on the wire
    /// are rejected.
    pub fn new(data: &str) -> Result<Self> {
        let data = trim_root(data);
        if data.is_empty() {
            return Err(Error::ErrEmptyName);
        }

        let mut wire_len = 1;
        for label in split_labels(data) {
            if label.is_empty() {
                return Err(Error::ErrZeroSegLen);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::ErrSegTooLong);
            }
            wire_len += label.len() + 1;
        }
        if wire_len > NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }

        Ok(Name {
            data: data.to_owned(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    // pack appends the uncompressed wire format of the name to msg.
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        if !self.data.is_empty() {
            for label in split_labels(&self.data) {
                if label.is_empty() {
                    return Err(Error::ErrZeroSegLen);
                }
                if label.len() > MAX_LABEL_LEN {
                    return Err(Error::ErrSegTooLong);
                }
                msg.push(label.len() as u8);
                msg.extend_from_slice(label.as_bytes());
            }
        }
        msg.push(0);
        Ok(msg)
    }

    // unpack reads a possibly compressed name starting at off and returns the
    // offset just past the name at its original position.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        // curr_off is the current working offset.
        let mut curr_off = off;

        // new_off is the offset where the next record will start. Pointers lead
        // to data that belongs to other names and thus doesn't count towards to
        // the usage of this name.
        let mut new_off = off;

        // ptr is the number of pointers followed.
        let mut ptr = 0;

        let mut labels: Vec<String> = vec![];
        let mut wire_len = 1;

        loop {
            if curr_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[curr_off] as usize;
            curr_off += 1;
            match c & 0xC0 {
                0x00 => {
                    // String segment
                    if c == 0x00 {
                        // A zero length signals the end of the name.
                        break;
                    }
                    let (label, end_off) = unpack_bytes(msg, curr_off, c)?;
                    wire_len += c + 1;
                    if wire_len > NAME_LEN {
                        return Err(Error::ErrNameTooLong);
                    }
                    labels.push(escape_label(&String::from_utf8_lossy(label)));
                    curr_off = end_off;
                }
                0xC0 => {
                    // Pointer
                    if curr_off >= msg.len() {
                        return Err(Error::ErrInvalidPtr);
                    }
                    let c1 = msg[curr_off] as usize;
                    curr_off += 1;
                    if ptr == 0 {
                        new_off = curr_off;
                    }
                    // Don't follow too many pointers, maybe there's a loop.
                    ptr += 1;
                    if ptr > MAX_PTR {
                        return Err(Error::ErrTooManyPtr);
                    }
                    let target = ((c ^ 0xC0) << 8) | c1;
                    // A pointer must refer to an earlier position than the
                    // pointer itself, which rules out loops.
                    if target >= curr_off - 2 {
                        return Err(Error::ErrInvalidPtr);
                    }
                    curr_off = target;
                }
                // Prefixes 0x80 and 0x40 are reserved.
                _ => return Err(Error::ErrReservedLabel),
            }
        }

        if ptr == 0 {
            new_off = curr_off;
        }
        self.data = labels.join(".");

        Ok(new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        let mut name = Name::default();
        name.unpack(msg, off)
    }
}

/// Drops a trailing root dot. An escaped trailing dot belongs to the last
/// label and is kept.
pub(crate) fn trim_root(name: &str) -> &str {
    match name.strip_suffix('.') {
        Some(rest) if rest.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 0 => rest,
        _ => name,
    }
}

fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c == '.' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// split_labels splits a dotted name on unescaped dots and unescapes each label.
fn split_labels(name: &str) -> Vec<String> {
    let mut labels = vec![];
    let mut label = String::new();
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => label.push(chars.next().unwrap_or('\\')),
            '.' => labels.push(std::mem::take(&mut label)),
            _ => label.push(c),
        }
    }
    labels.push(label);
    labels
}
