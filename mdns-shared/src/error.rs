#![allow(dead_code)]

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Wire format
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReservedLabel,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("name is empty")]
    ErrEmptyName,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("compression pointer does not point backwards")]
    ErrInvalidPtr,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("invalid resource data for type {0}")]
    ErrInvalidRdata(u16),
    #[error("too many Questions to pack (>65535)")]
    ErrTooManyQuestions,

    //mDNS client
    /// ErrConnectionClosed indicates an operation executed after the client
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,
    #[error("mdns: no listener with this id")]
    ErrListenerNotFound,
    #[error("mdns: no transaction with this id")]
    ErrTransactionNotFound,
    #[error("mdns: already started")]
    ErrAlreadyStarted,
    /// A transaction must query the cache, the network, or both.
    #[error("mdns: transaction flags must include QUERY_CACHE or QUERY_NETWORK")]
    ErrInvalidTransactionFlags,
    #[error("mdns: client is not listening")]
    ErrNotListening,
    #[error("mdns: failed to send query on any address family")]
    ErrSendFailed,

    //Third Party Error
    #[error("{0}")]
    Io(#[source] IoError),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_eq_by_kind() {
        let a: Error = io::Error::new(io::ErrorKind::AddrInUse, "a").into();
        let b: Error = io::Error::new(io::ErrorKind::AddrInUse, "b").into();
        let c: Error = io::Error::new(io::ErrorKind::PermissionDenied, "c").into();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
